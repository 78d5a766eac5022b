//! COSE_Sign1 parsing and signature verification (C6 read side).

use ciborium::value::Value;
use coset::{CoseSign1, Label, TaggedCborSerializable};

use crate::crypto::{SignatureVerifier, SigningAlg};
use crate::error::{Error, Result};
use crate::signature::Signature;
use crate::timestamp;

/// Parse a tagged COSE_Sign1 byte sequence into this crate's [`Signature`]
/// model: algorithm, certificate chain, padding accounting, and any
/// attached timestamp tokens.
pub fn parse_signature(cose_bytes: &[u8]) -> Result<Signature> {
    let sign1 = CoseSign1::from_tagged_slice(cose_bytes)
        .map_err(|e| Error::CoseSignature(format!("malformed COSE_Sign1: {e}")))?;

    let algorithm = algorithm_from_header(&sign1)?;
    let (certificate, chain_certificates) = x5chain_from_header(&sign1)?;
    let raw_protected_bucket = sign1.protected.original_data.clone().unwrap_or_default();

    let mut timestamp_tokens = Vec::new();
    for (label, version) in [("sigTst2", 2u8), ("sigTst", 1u8)] {
        if let Some(resp_der) = timestamp_response_bytes(&sign1, label) {
            timestamp_tokens.push(timestamp::parse_response(&resp_der)?.with_version(version));
        }
    }

    let padding_length = sign1
        .unprotected
        .rest
        .iter()
        .filter(|(label, _)| {
            *label == Label::Text("pad".to_string()) || *label == Label::Text("pad2".to_string())
        })
        .map(|(_, value)| match value {
            Value::Bytes(b) => b.len(),
            _ => 0,
        })
        .sum();

    Ok(Signature {
        algorithm,
        certificate,
        chain_certificates,
        raw_protected_bucket,
        signature: sign1.signature.clone(),
        timestamp_tokens,
        padding_length,
    })
}

/// Verify the COSE_Sign1 signature over `payload` (the claim bytes,
/// supplied out of band since it was stripped from the structure before
/// padding) using `public_key_der` (the signing certificate's SPKI).
#[tracing::instrument(level = "debug", skip(cose_bytes, payload, verifier, public_key_der))]
pub fn verify_cose_sign1(
    cose_bytes: &[u8],
    payload: &[u8],
    verifier: &dyn SignatureVerifier,
    public_key_der: &[u8],
) -> Result<bool> {
    let mut sign1 = CoseSign1::from_tagged_slice(cose_bytes)
        .map_err(|e| Error::CoseSignature(format!("malformed COSE_Sign1: {e}")))?;
    sign1.payload = Some(payload.to_vec());

    let alg = algorithm_from_header(&sign1)?;
    let result = sign1.verify_signature(b"", |sig, data| {
        verifier
            .verify(alg, public_key_der, data, sig)
            .map_err(|e| e.to_string())
            .and_then(|ok| if ok { Ok(()) } else { Err("signature mismatch".to_string()) })
    });
    let valid = result.is_ok();
    if !valid {
        tracing::warn!("COSE_Sign1 signature verification failed");
    }
    Ok(valid)
}

fn algorithm_from_header(sign1: &CoseSign1) -> Result<SigningAlg> {
    let alg = sign1
        .protected
        .header
        .alg
        .as_ref()
        .ok_or(Error::MissingAlgorithm)?;
    match alg {
        coset::RegisteredLabelWithPrivate::Assigned(a) => match a {
            coset::iana::Algorithm::ES256 => Ok(SigningAlg::Es256),
            coset::iana::Algorithm::ES384 => Ok(SigningAlg::Es384),
            coset::iana::Algorithm::ES512 => Ok(SigningAlg::Es512),
            coset::iana::Algorithm::PS256 => Ok(SigningAlg::Ps256),
            coset::iana::Algorithm::PS384 => Ok(SigningAlg::Ps384),
            coset::iana::Algorithm::PS512 => Ok(SigningAlg::Ps512),
            coset::iana::Algorithm::EdDSA => Ok(SigningAlg::Ed25519),
            other => Err(Error::UnsupportedAlgorithm(format!("{other:?}"))),
        },
        _ => Err(Error::MissingAlgorithm),
    }
}

fn x5chain_from_header(sign1: &CoseSign1) -> Result<(Vec<u8>, Vec<Vec<u8>>)> {
    let value = sign1
        .unprotected
        .rest
        .iter()
        .find(|(label, _)| *label == Label::Text("x5chain".to_string()))
        .map(|(_, value)| value)
        .ok_or(Error::MissingCertificate)?;

    match value {
        Value::Bytes(single) => Ok((single.clone(), Vec::new())),
        Value::Array(certs) => {
            let mut der_certs = Vec::new();
            for cert in certs {
                match cert {
                    Value::Bytes(b) => der_certs.push(b.clone()),
                    _ => return Err(Error::MissingCertificate),
                }
            }
            let (first, rest) = der_certs.split_first().ok_or(Error::MissingCertificate)?;
            Ok((first.clone(), rest.to_vec()))
        }
        _ => Err(Error::MissingCertificate),
    }
}

fn timestamp_response_bytes(sign1: &CoseSign1, label: &str) -> Option<Vec<u8>> {
    let (_, value) = sign1
        .unprotected
        .rest
        .iter()
        .find(|(l, _)| *l == Label::Text(label.to_string()))?;
    let Value::Map(entries) = value else { return None };
    let (_, tokens) = entries
        .iter()
        .find(|(k, _)| matches!(k, Value::Text(t) if t == "tstTokens"))?;
    let Value::Array(tokens) = tokens else { return None };
    let first = tokens.first()?;
    let Value::Map(token_fields) = first else { return None };
    let (_, val) = token_fields
        .iter()
        .find(|(k, _)| matches!(k, Value::Text(t) if t == "val"))?;
    match val {
        Value::Bytes(b) => Some(b.clone()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cose::sign::cose_sign;
    use crate::crypto::{EphemeralSigner, X509Verifier};

    #[test]
    fn parses_algorithm_and_certificate() {
        let signer = EphemeralSigner::generate();
        let payload = b"claim bytes";
        let signed = cose_sign(&signer, payload, None, 1000).unwrap();

        let parsed = parse_signature(&signed).unwrap();
        assert_eq!(parsed.algorithm, SigningAlg::Ed25519);
        assert!(parsed.chain_certificates.is_empty());
        assert!(parsed.padding_length > 0);
    }

    #[test]
    fn verifies_valid_signature_and_rejects_tampering() {
        let signer = EphemeralSigner::generate();
        let payload = b"claim bytes to protect".to_vec();
        let signed = cose_sign(&signer, &payload, None, 1000).unwrap();

        let raw_key = signer.verifying_key().to_bytes();
        let verifier = X509Verifier;
        assert!(verify_cose_sign1(&signed, &payload, &verifier, &raw_key).unwrap());

        let mut tampered_payload = payload.clone();
        tampered_payload[0] ^= 0xFF;
        assert!(!verify_cose_sign1(&signed, &tampered_payload, &verifier, &raw_key).unwrap());
    }
}
