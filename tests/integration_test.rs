//! End-to-end coverage for `c2pa-core`'s public surface: sign a manifest,
//! embed it into each supported format through the format-erased `Asset`
//! facade, extract it back out, and validate the pieces that don't need a
//! real X.509 certificate chain (see `DESIGN.md` for why the full
//! `validate_manifest` cert-policy path isn't exercised here — the test
//! signer only ever produces a bare SPKI wrapper, not a certificate).

mod common;

use c2pa_core::assertions::Assertion;
use c2pa_core::assets::Asset;
use c2pa_core::cose;
use c2pa_core::crypto::{EphemeralSigner, HashAlgorithm, Sha2Digester, X509Verifier};
use c2pa_core::error::Error;
use c2pa_core::hash_exclusion::Exclusion;

#[test]
fn jpeg_sign_embed_extract_and_validate_round_trip() {
    let signer = EphemeralSigner::generate();
    let raw_verifying_key = signer.verifying_key().to_bytes().to_vec();

    let mut asset = Asset::parse(common::minimal_jpeg()).unwrap();
    assert!(asset.get_manifest_jumbf().unwrap().is_none());

    common::embed_manifest(&mut asset, &signer, 1800);

    // Re-parse from scratch, as a reader opening the file fresh would.
    let asset = Asset::parse(asset.bytes().to_vec()).unwrap();
    let store = common::read_store(&asset);
    let manifest = store.active_manifest().unwrap();

    let Assertion::DataHash(data_hash) = manifest.assertion_by_label("c2pa.hash.data").unwrap() else {
        panic!("expected a data-hash assertion");
    };
    let digester = Sha2Digester::new(HashAlgorithm::Sha256);
    assert!(data_hash.validate(asset.bytes(), &digester).unwrap());

    let verifier = X509Verifier;
    let valid = cose::verify_cose_sign1(
        manifest.signature_bytes().unwrap(),
        &manifest.claim_cbor,
        &verifier,
        &raw_verifying_key,
    )
    .unwrap();
    assert!(valid);
}

#[test]
fn tampered_jpeg_bytes_outside_exclusion_fail_data_hash_validation() {
    let signer = EphemeralSigner::generate();
    let mut asset = Asset::parse(common::minimal_jpeg()).unwrap();
    common::embed_manifest(&mut asset, &signer, 1800);

    let mut tampered = asset.bytes().to_vec();
    let last = tampered.len() - 1;
    tampered[last] ^= 0xFF; // corrupt the EOI marker: outside the reserved manifest range

    let asset = Asset::parse(tampered).unwrap();
    let store = common::read_store(&asset);
    let manifest = store.active_manifest().unwrap();
    let Assertion::DataHash(data_hash) = manifest.assertion_by_label("c2pa.hash.data").unwrap() else {
        panic!("expected a data-hash assertion");
    };

    let digester = Sha2Digester::new(HashAlgorithm::Sha256);
    assert!(!data_hash.validate(asset.bytes(), &digester).unwrap());
}

#[test]
fn png_reserve_write_and_crc_round_trip() {
    let signer = EphemeralSigner::generate();
    let mut asset = Asset::parse(common::minimal_png()).unwrap();
    common::embed_manifest(&mut asset, &signer, 900);

    let store = common::read_store(&asset);
    assert_eq!(store.manifests.len(), 1);

    let jumbf = asset.get_manifest_jumbf().unwrap().unwrap();
    assert!(!jumbf.is_empty());
}

#[test]
fn png_write_longer_than_reserved_is_rejected() {
    let mut asset = Asset::parse(common::minimal_png()).unwrap();
    asset.ensure_manifest_space(32).unwrap();
    let result = asset.write_manifest_jumbf(&vec![0u8; 64]);
    assert!(matches!(
        result,
        Err(Error::ReservedSpaceMismatch { expected: 32, actual: 64 })
    ));
}

#[test]
fn bmff_sign_embed_and_extract_round_trip() {
    let signer = EphemeralSigner::generate();
    let mut asset = Asset::parse(common::minimal_heic()).unwrap();
    common::embed_manifest(&mut asset, &signer, 900);

    let store = common::read_store(&asset);
    let manifest = store.active_manifest().unwrap();
    assert_eq!(manifest.assertions.len(), 1);
    assert!(manifest.signature_bytes().is_some());
}

#[test]
fn jpeg_multi_segment_manifest_round_trips_through_asset_facade() {
    let mut asset = Asset::parse(common::minimal_jpeg()).unwrap();
    let total = 200_000;
    asset.ensure_manifest_space(total).unwrap();

    let mut jumbf = vec![0u8; total];
    for (i, b) in jumbf.iter_mut().enumerate() {
        *b = (i % 256) as u8;
    }
    asset.write_manifest_jumbf(&jumbf).unwrap();

    let asset = Asset::parse(asset.bytes().to_vec()).unwrap();
    let read_back = asset.get_manifest_jumbf().unwrap().unwrap();
    assert_eq!(read_back.len(), total);
    assert_eq!(read_back, jumbf);
}

#[test]
fn gif_never_carries_a_manifest() {
    let asset = Asset::parse(b"GIF89a".to_vec()).unwrap();
    assert!(asset.get_manifest_jumbf().unwrap().is_none());
    assert!(matches!(asset, Asset::Gif(_)));
}

#[test]
fn unrecognized_bytes_are_rejected() {
    let result = Asset::parse(vec![0u8; 32]);
    assert!(matches!(result, Err(Error::UnsupportedFormat)));
}

#[test]
fn asset_data_range_matches_embedded_exclusion_range() {
    let signer = EphemeralSigner::generate();
    let mut asset = Asset::parse(common::minimal_jpeg()).unwrap();
    common::embed_manifest(&mut asset, &signer, 1800);

    let range = asset.get_hash_exclusion_range().unwrap().unwrap();
    let excluded = asset.get_data_range(range).unwrap();
    assert_eq!(excluded.len(), range.length as usize);
}

#[test]
fn data_hash_assertion_excludes_its_own_reservation() {
    // Directly exercises the exclusion contract without going through a
    // format handler: a single exclusion over a byte range makes the
    // digest insensitive to whatever is written inside that range.
    let digester = Sha2Digester::new(HashAlgorithm::Sha256);
    let mut assertion = c2pa_core::assertions::data_hash::DataHashAssertion::new(
        HashAlgorithm::Sha256,
        vec![Exclusion::new(4, 4)],
    );
    assertion.compute_hash(b"XXXXsome bytes", &digester).unwrap();
    assert!(assertion.validate(b"XXXXsome bytes", &digester).unwrap());
    assert!(assertion.validate(b"XXXXchanged!!!", &digester).unwrap());
    assert!(!assertion.validate(b"YYYYsome bytes", &digester).unwrap());
}
