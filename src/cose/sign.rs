//! COSE_Sign1 production, grounded on the real c2pa-rs `cose_sign`/
//! `pad_cose_sig` pair: build the protected/unprotected headers, invoke
//! the signer, strip the payload (it's carried alongside, not inside, the
//! COSE structure once embedded in JUMBF), then two-pass pad to the
//! exact pre-reserved box size.

use ciborium::value::Value;
use coset::{iana, CoseSign1, CoseSign1Builder, Header, HeaderBuilder, Label, TaggedCborSerializable};

use crate::crypto::{Signer, SigningAlg};
use crate::error::{Error, Result};
use crate::timestamp::{self, TimestampProvider};

const PAD: &str = "pad";
const PAD2: &str = "pad2";
/// Bytes a `pad` header entry's own CBOR encoding costs beyond its raw
/// byte-string length (label + major-type/length prefix), used to seed
/// the first padding guess close to the target in one shot.
const PAD_OFFSET: usize = 7;

/// Produce a padded, tagged COSE_Sign1 over `payload` (the claim's raw
/// CBOR bytes), sized to exactly `box_size`.
///
/// If `timestamp_provider` is given, the counter-signature is a genuine
/// C2PA v2.1 `sigTst2`: the message imprint is computed over the
/// CBOR-encoded *signature* bytes this call just produced, per spec.md
/// §4.4 ("v2: CBOR-encoded signature bytes") — not over the claim bytes,
/// which would make it a `sigTst` (v1) imprint under a v2 label. That
/// means the timestamp can only be requested after signing, so this
/// function signs first and attaches the counter-signature to the
/// already-built `sign1` before padding.
#[tracing::instrument(level = "debug", skip(signer, payload, timestamp_provider), fields(alg = ?signer.alg(), box_size))]
pub fn cose_sign(
    signer: &dyn Signer,
    payload: &[u8],
    timestamp_provider: Option<&dyn TimestampProvider>,
    box_size: usize,
) -> Result<Vec<u8>> {
    let alg = signer.alg();
    let protected = protected_header(alg);
    let unprotected = unprotected_header(signer)?;

    let sign1_builder = CoseSign1Builder::new()
        .protected(protected)
        .unprotected(unprotected)
        .payload(payload.to_vec())
        .try_create_signature(b"", |bytes| signer.sign(bytes))?;

    let mut sign1 = sign1_builder.build();
    sign1.payload = None;

    if let Some(provider) = timestamp_provider {
        attach_timestamp(&mut sign1, signer, provider)?;
    }

    pad_cose_sig(&mut sign1, box_size)
}

fn protected_header(alg: SigningAlg) -> Header {
    let iana_alg = match alg {
        SigningAlg::Es256 => iana::Algorithm::ES256,
        SigningAlg::Es384 => iana::Algorithm::ES384,
        SigningAlg::Es512 => iana::Algorithm::ES512,
        SigningAlg::Ps256 => iana::Algorithm::PS256,
        SigningAlg::Ps384 => iana::Algorithm::PS384,
        SigningAlg::Ps512 => iana::Algorithm::PS512,
        SigningAlg::Ed25519 => iana::Algorithm::EdDSA,
    };
    HeaderBuilder::new().algorithm(iana_alg).build()
}

fn unprotected_header(signer: &dyn Signer) -> Result<Header> {
    let certs = signer.certs()?;
    if certs.is_empty() {
        return Err(Error::MissingCertificate);
    }
    let x5chain = match certs.len() {
        1 => Value::Bytes(certs[0].clone()),
        _ => Value::Array(certs.into_iter().map(Value::Bytes).collect()),
    };

    Ok(HeaderBuilder::new().text_value("x5chain".to_string(), x5chain).build())
}

/// Counter-sign the already-produced `sign1.signature` bytes and attach
/// the result as a `sigTst2` entry in the unprotected header.
fn attach_timestamp(sign1: &mut CoseSign1, signer: &dyn Signer, provider: &dyn TimestampProvider) -> Result<()> {
    let hash_alg = signer.alg().hash_algorithm();
    let counter_signed_payload = super::counter_signature_payload(&sign1.signature)?;
    let digest = crate::crypto::Sha2Digester::new(hash_alg);
    let message_digest = crate::crypto::Digester::digest(&digest, &counter_signed_payload);

    let resp = provider.time_stamp(&message_digest, hash_alg)?;
    timestamp::parse_response(&resp)?;

    let sig_tst = Value::Map(vec![(
        Value::Text("tstTokens".to_string()),
        Value::Array(vec![Value::Map(vec![(
            Value::Text("val".to_string()),
            Value::Bytes(resp),
        )])]),
    )]);
    sign1
        .unprotected
        .rest
        .push((Label::Text("sigTst2".to_string()), sig_tst));
    Ok(())
}

/// Two-pass size solve: pad the unprotected header's `pad` (and, if one
/// padding guess can't land exactly, a second `pad2`) entry until the
/// tagged COSE_Sign1 serializes to exactly `end_size` bytes.
fn pad_cose_sig(sign1: &mut CoseSign1, end_size: usize) -> Result<Vec<u8>> {
    let unpadded = sign1
        .clone()
        .to_tagged_vec()
        .map_err(|e| Error::CoseSignature(e.to_string()))?;
    let cur_size = unpadded.len();

    if cur_size == end_size {
        return Ok(unpadded);
    }
    if cur_size + PAD_OFFSET > end_size {
        return Err(Error::CoseSignature(format!(
            "reserved box size {end_size} is smaller than the unpadded signature ({cur_size} bytes)"
        )));
    }

    let mut target_guess = end_size - cur_size - PAD_OFFSET;
    let mut last_pad = 0usize;

    loop {
        let mut candidate = sign1.clone();
        let mut pad_found = false;
        for (label, value) in &mut candidate.unprotected.rest {
            if *label == Label::Text(PAD.to_string()) {
                if let Value::Bytes(b) = value {
                    last_pad = b.len();
                }
                *value = Value::Bytes(vec![0u8; target_guess]);
                pad_found = true;
                break;
            }
        }
        if !pad_found {
            candidate
                .unprotected
                .rest
                .push((Label::Text(PAD.to_string()), Value::Bytes(vec![0u8; target_guess])));
            *sign1 = candidate;
            return pad_cose_sig(sign1, end_size);
        }

        let candidate_vec = candidate
            .to_tagged_vec()
            .map_err(|e| Error::CoseSignature(e.to_string()))?;

        match candidate_vec.len().cmp(&end_size) {
            std::cmp::Ordering::Less => target_guess += 1,
            std::cmp::Ordering::Equal => return Ok(candidate_vec),
            std::cmp::Ordering::Greater => break,
        }
    }

    if last_pad < 10 {
        return Err(Error::CoseSignature(
            "could not solve padding to the reserved box size".into(),
        ));
    }
    sign1.unprotected.rest.push((
        Label::Text(PAD2.to_string()),
        Value::Bytes(vec![0u8; last_pad - 10]),
    ));
    pad_cose_sig(sign1, end_size)
}
