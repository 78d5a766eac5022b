//! Shared fixtures for the integration suite: minimal valid media buffers
//! for each format, and a full sign-and-embed pipeline built only out of
//! `c2pa_core`'s public API (no `pub(crate)` shortcuts), mirroring what an
//! embedding application built on this crate would actually write.

#![allow(dead_code)]

use c2pa_core::assertions::data_hash::DataHashAssertion;
use c2pa_core::assertions::Assertion;
use c2pa_core::assets::Asset;
use c2pa_core::claim::Claim;
use c2pa_core::cose;
use c2pa_core::crypto::{Digester, EphemeralSigner, HashAlgorithm, Sha2Digester};
use c2pa_core::hash_exclusion::Exclusion;
use c2pa_core::hashed_uri::HashedUri;
use c2pa_core::jumbf::{self, box_type, DescriptionBox, JumbfBox, SuperBox};
use c2pa_core::manifest::{Manifest, ManifestStore};

/// Size the Ed25519 test signature is padded to. Generous enough that a
/// handful of x5chain/timestamp-free signatures all fit without a second
/// `cose_sign` retry.
pub const SIG_BOX_SIZE: usize = 1200;

pub fn minimal_jpeg() -> Vec<u8> {
    let mut data = vec![0xFF, 0xD8]; // SOI
    data.extend_from_slice(&[0xFF, 0xE0, 0x00, 0x10]); // APP0 (JFIF)
    data.extend_from_slice(b"JFIF\0");
    data.extend_from_slice(&[0x01, 0x02, 0x00, 0x00, 0x01, 0x00, 0x01, 0x00, 0x00]);
    data.extend_from_slice(&[0xFF, 0xDA, 0x00, 0x02]); // SOS
    data.extend_from_slice(&[0xAB; 64]);
    data.extend_from_slice(&[0xFF, 0xD9]); // EOI
    data
}

pub fn minimal_png() -> Vec<u8> {
    fn crc32_ieee(bytes: &[u8]) -> u32 {
        // Matches `c2pa_core::assets::png`'s own table-free bit-at-a-time
        // implementation; duplicated here since it's a private helper.
        let mut crc: u32 = 0xFFFF_FFFF;
        for &b in bytes {
            crc ^= b as u32;
            for _ in 0..8 {
                crc = if crc & 1 != 0 { (crc >> 1) ^ 0xEDB8_8320 } else { crc >> 1 };
            }
        }
        !crc
    }
    fn chunk(kind: &[u8; 4], content: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&(content.len() as u32).to_be_bytes());
        out.extend_from_slice(kind);
        out.extend_from_slice(content);
        let crc = crc32_ieee(&out[4..]);
        out.extend_from_slice(&crc.to_be_bytes());
        out
    }

    let mut data = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
    let mut ihdr = Vec::new();
    ihdr.extend_from_slice(&1u32.to_be_bytes());
    ihdr.extend_from_slice(&1u32.to_be_bytes());
    ihdr.extend_from_slice(&[8, 2, 0, 0, 0]);
    data.extend_from_slice(&chunk(b"IHDR", &ihdr));
    data.extend_from_slice(&chunk(b"IDAT", &[1, 2, 3, 4]));
    data.extend_from_slice(&chunk(b"IEND", &[]));
    data
}

pub fn minimal_heic() -> Vec<u8> {
    fn simple_box(kind: &[u8; 4], content: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&((8 + content.len()) as u32).to_be_bytes());
        out.extend_from_slice(kind);
        out.extend_from_slice(content);
        out
    }

    let mut ftyp_content = Vec::new();
    ftyp_content.extend_from_slice(b"heic");
    ftyp_content.extend_from_slice(&0u32.to_be_bytes());
    ftyp_content.extend_from_slice(b"heic");
    ftyp_content.extend_from_slice(b"mif1");
    let ftyp = simple_box(b"ftyp", &ftyp_content);
    let mdat = simple_box(b"mdat", &[0xAB; 64]);

    let mut data = Vec::new();
    data.extend_from_slice(&ftyp);
    data.extend_from_slice(&mdat);
    data
}

/// Build a full, signed single-manifest store over `asset_bytes`, excluding
/// `exclusions` from the `c2pa.hash.data` digest, using only public API:
/// `Assertion::to_super_box`, `Manifest::new`/`with_signature_bytes`/
/// `to_super_box`, and `cose::cose_sign`.
pub fn build_store_bytes(asset_bytes: &[u8], exclusions: Vec<Exclusion>, signer: &EphemeralSigner) -> Vec<u8> {
    let digester = Sha2Digester::new(HashAlgorithm::Sha256);

    let mut data_hash = DataHashAssertion::new(HashAlgorithm::Sha256, exclusions);
    data_hash.compute_hash(asset_bytes, &digester).unwrap();
    let assertion = Assertion::DataHash(data_hash);
    let assertion_sbox = assertion.to_super_box().unwrap();
    let assertion_bytes = jumbf::serialize(&JumbfBox::Super(assertion_sbox)).unwrap();
    let assertion_digest = Digester::digest(&digester, &assertion_bytes[8..]);

    let mut claim = Claim::new(1, "image/jpeg", "xmp:iid:c2pa-core-integration-test", "c2pa-core-tests/0.1");
    claim.add_assertion(HashedUri::new(
        "self#jumbf=/c2pa/c2pa/c2pa.assertions/c2pa.hash.data",
        Some(HashAlgorithm::Sha256),
        assertion_digest,
    ));
    claim.signature_ref = "self#jumbf=/c2pa/c2pa/c2pa.signature".to_string();

    let manifest = Manifest::new("c2pa", claim, vec![assertion]).unwrap();
    let cose_bytes = cose::cose_sign(signer, &manifest.claim_cbor, None, SIG_BOX_SIZE).unwrap();
    let manifest = manifest.with_signature_bytes(cose_bytes).unwrap();
    let manifest_sbox = manifest.to_super_box("c2pa").unwrap();

    let store_sbox = SuperBox::new(DescriptionBox::new(box_type::MANIFEST_STORE_UUID).with_label("c2pa"))
        .with_child(JumbfBox::Super(manifest_sbox));

    jumbf::serialize(&JumbfBox::Super(store_sbox)).unwrap()
}

/// Reserve space for, build, and write a signed manifest into `asset`,
/// digesting `asset.bytes()` (with the reservation's own placeholder
/// excluded) for the `c2pa.hash.data` assertion. Mirrors the
/// reserve-measure-reserve-write sequence `AssetHandler`'s doc comment
/// describes: a manifest's exact byte length depends on the signature and
/// exclusion-range encoding, so the first reservation is only an estimate.
pub fn embed_manifest(asset: &mut Asset, signer: &EphemeralSigner, initial_guess: usize) {
    asset.ensure_manifest_space(initial_guess).unwrap();
    let range = asset.get_hash_exclusion_range().unwrap().unwrap();
    let store_bytes = build_store_bytes(asset.bytes(), vec![Exclusion::new(range.start, range.length)], signer);

    if store_bytes.len() == initial_guess {
        asset.write_manifest_jumbf(&store_bytes).unwrap();
        return;
    }

    // The placeholder guess was the wrong size, which shifted the exclusion
    // envelope's length (e.g. more JPEG APP11 segments). Re-reserve to the
    // size actually needed and rebuild once more against the new envelope.
    asset.ensure_manifest_space(store_bytes.len()).unwrap();
    let range = asset.get_hash_exclusion_range().unwrap().unwrap();
    let store_bytes = build_store_bytes(asset.bytes(), vec![Exclusion::new(range.start, range.length)], signer);
    asset.write_manifest_jumbf(&store_bytes).unwrap();
}

/// Extract, parse, and read back the manifest store embedded in `asset`.
pub fn read_store(asset: &Asset) -> ManifestStore {
    let jumbf = asset.get_manifest_jumbf().unwrap().expect("asset carries a manifest");
    let root = jumbf::parse(&jumbf).unwrap();
    ManifestStore::read(root).unwrap()
}
