//! The `Signature` data model (§3): COSE_Sign1 plus the timestamp tokens
//! attached to it, as stored in the `c2pa.signature` JUMBF UUID box.

use crate::crypto::SigningAlg;
use crate::timestamp::TimeStampToken;

/// `{algorithm, certificate, chain_certificates, raw_protected_bucket,
/// signature, timestamp_tokens, padding_length}`.
#[derive(Debug, Clone)]
pub struct Signature {
    pub algorithm: SigningAlg,
    /// DER-encoded signing certificate (`x5chain[0]`).
    pub certificate: Vec<u8>,
    /// DER-encoded chain certificates, in `x5chain[1..]` order.
    pub chain_certificates: Vec<Vec<u8>>,
    /// The raw bytes of the COSE protected header bucket, kept around so
    /// re-verification reconstructs exactly the `Sig_structure1` that was
    /// originally signed rather than a freshly re-encoded (and possibly
    /// differently-ordered) map.
    pub raw_protected_bucket: Vec<u8>,
    pub signature: Vec<u8>,
    /// Parsed `sigTst`/`sigTst2` tokens, in the order they were found
    /// (C2PA v2.1 permits only one, but reading tolerates either label).
    pub timestamp_tokens: Vec<TimeStampToken>,
    /// Length, in bytes, of the `pad`/`pad2` unprotected header entries
    /// consumed solely to hit the reserved JUMBF box size.
    pub padding_length: usize,
}

impl Signature {
    pub fn has_timestamp(&self) -> bool {
        !self.timestamp_tokens.is_empty()
    }
}
