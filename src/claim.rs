//! The C2PA claim (§3 C5): the signed core document naming a manifest's
//! assertions and describing the asset and tool that produced it.

use serde::{Deserialize, Serialize};

use crate::crypto::HashAlgorithm;
use crate::error::Result;
use crate::hashed_uri::HashedUri;

/// `{version ∈ {1,2}, format, instance_id, default_hash_algorithm,
/// assertions: [HashedURI], signature_ref, redactions?, generator,
/// generator_info?}`. Serialized as CBOR; its raw CBOR bytes are the
/// COSE_Sign1 payload signed by [`crate::cose`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claim {
    pub version: u8,
    #[serde(rename = "dc:format")]
    pub format: String,
    #[serde(rename = "instanceID")]
    pub instance_id: String,
    pub default_hash_algorithm: HashAlgorithm,
    pub assertions: Vec<HashedUri>,
    pub signature_ref: String,
    /// Assertion URIs this claim declares redacted from an earlier,
    /// superseded manifest. Present only when non-empty.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub redactions: Vec<String>,
    pub generator: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub generator_info: Option<String>,
}

impl Claim {
    pub fn new(
        version: u8,
        format: impl Into<String>,
        instance_id: impl Into<String>,
        generator: impl Into<String>,
    ) -> Self {
        Self {
            version,
            format: format.into(),
            instance_id: instance_id.into(),
            default_hash_algorithm: HashAlgorithm::default(),
            assertions: Vec::new(),
            signature_ref: String::new(),
            redactions: Vec::new(),
            generator: generator.into(),
            generator_info: None,
        }
    }

    pub fn add_assertion(&mut self, assertion: HashedUri) {
        self.assertions.push(assertion);
    }

    /// Encode the claim as the raw CBOR bytes that become the COSE_Sign1
    /// payload. Must be deterministic: signing and later re-verifying the
    /// claim both call this and require byte-identical output.
    pub fn to_cbor(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        ciborium::ser::into_writer(self, &mut out)?;
        Ok(out)
    }

    pub fn from_cbor(bytes: &[u8]) -> Result<Self> {
        Ok(ciborium::de::from_reader(bytes)?)
    }

    /// True when this claim declares a redaction for `uri`: a previously
    /// signed assertion that a later manifest supersedes without deleting
    /// the original bytes (so older HashedURIs elsewhere keep resolving).
    pub fn redacts(&self, uri: &str) -> bool {
        self.redactions.iter().any(|r| r == uri)
    }

    /// True when `uri` is this (version-2) claim's own self-reference to
    /// its signature box. §4.3 requires a v2 claim to carry a `signature`
    /// HashedURI "in addition to assertions"; that reference can never
    /// carry a real content-integrity hash, because the claim's raw CBOR
    /// bytes are the COSE_Sign1 *payload* — the signature doesn't exist
    /// until after this claim is finalized and signed, so nothing inside
    /// the claim can hash it without signing it twice. This crate adds the
    /// reference (see `ManifestBuilderConfig::build`) with an empty `hash`
    /// and has the validation pipeline recognize and skip it by URI rather
    /// than attempt to verify a digest that cannot exist.
    pub fn is_signature_self_reference(&self, uri: &str) -> bool {
        self.version >= 2 && uri == self.signature_ref
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_cbor() {
        let mut claim = Claim::new(1, "image/jpeg", "xmp:iid:1234", "c2pa-core/0.1");
        claim.add_assertion(HashedUri::new(
            "self#jumbf=/c2pa/c2pa.assertions/c2pa.hash.data",
            Some(HashAlgorithm::Sha256),
            vec![1u8; 32],
        ));
        claim.signature_ref = "self#jumbf=/c2pa/c2pa.signature".to_string();

        let bytes = claim.to_cbor().unwrap();
        let parsed = Claim::from_cbor(&bytes).unwrap();
        assert_eq!(parsed, claim);
    }

    #[test]
    fn redactions_round_trip_when_present() {
        let mut claim = Claim::new(2, "image/png", "xmp:iid:5678", "c2pa-core/0.1");
        claim.redactions.push("self#jumbf=/c2pa/c2pa.assertions/c2pa.metadata".to_string());

        let bytes = claim.to_cbor().unwrap();
        let parsed = Claim::from_cbor(&bytes).unwrap();
        assert!(parsed.redacts("self#jumbf=/c2pa/c2pa.assertions/c2pa.metadata"));
    }

    #[test]
    fn signature_self_reference_is_recognized_only_for_v2_plus() {
        let mut v1 = Claim::new(1, "image/jpeg", "xmp:iid:1234", "c2pa-core/0.1");
        v1.signature_ref = "self#jumbf=/c2pa/c2pa/c2pa.signature".to_string();
        assert!(!v1.is_signature_self_reference(&v1.signature_ref.clone()));

        let mut v2 = Claim::new(2, "image/jpeg", "xmp:iid:1234", "c2pa-core/0.1");
        v2.signature_ref = "self#jumbf=/c2pa/c2pa/c2pa.signature".to_string();
        assert!(v2.is_signature_self_reference(&v2.signature_ref.clone()));
        assert!(!v2.is_signature_self_reference("self#jumbf=/c2pa/c2pa/c2pa.assertions/c2pa.hash.data"));
    }
}
