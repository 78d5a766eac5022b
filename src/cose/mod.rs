//! COSE_Sign1 production and verification (C6).
//!
//! `CoseSign1` is a 4-tuple `[protected_bucket_bytes, unprotected_bucket,
//! external_aad, signature_bytes]` (RFC 9052). The protected bucket
//! carries the signing algorithm; the unprotected bucket carries the
//! `x5chain` certificate DERs, optional `sigTst`/`sigTst2` timestamp
//! containers, and padding. See [`sign`] and [`validate`].

pub mod sign;
pub mod validate;

pub use sign::cose_sign;
pub use validate::verify_cose_sign1;

use crate::error::Result;

/// CBOR-encode `signature_bytes` as a lone byte string: the payload a v2
/// (`sigTst2`) counter-signature imprints over, per spec.md §4.4 ("v2:
/// CBOR-encoded signature bytes"). A v1 (`sigTst`) counter-signature
/// imprints over the claim bytes directly instead — see
/// [`sign::cose_sign`] and [`validate::parse_signature`].
pub(crate) fn counter_signature_payload(signature_bytes: &[u8]) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    ciborium::ser::into_writer(&ciborium::value::Value::Bytes(signature_bytes.to_vec()), &mut buf)?;
    Ok(buf)
}
