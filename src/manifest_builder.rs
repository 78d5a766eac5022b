//! Recognized configuration for manifest creation (§6): a builder that
//! collects the handful of fields a caller actually chooses (asset format,
//! instance ID, hash algorithm, claim version) before signing, mirroring
//! the teacher's `Updates` builder (`Updates::new().set_xmp(..)` chaining)
//! rather than a single flat constructor argument list.

use crate::assertions::Assertion;
use crate::claim::Claim;
use crate::cose;
use crate::crypto::{HashAlgorithm, Signer};
use crate::error::{Error, Result};
use crate::manifest::Manifest;
use crate::timestamp::TimestampProvider;

/// Configuration for building one signed [`Manifest`]. Defaults match
/// `Claim::new`'s own defaults (SHA-256, claim version 1) so a caller only
/// needs to override what differs from the common case.
#[derive(Debug, Clone)]
pub struct ManifestBuilderConfig {
    asset_format: String,
    instance_id: String,
    default_hash_algorithm: HashAlgorithm,
    claim_version: u8,
    generator: String,
    box_size: usize,
}

impl ManifestBuilderConfig {
    /// Start a config for an asset of the given MIME `asset_format`,
    /// identified by `instance_id`, produced by `generator`. Claim version
    /// 1, SHA-256, and a 1200-byte signature reservation are assumed until
    /// overridden.
    pub fn new(
        asset_format: impl Into<String>,
        instance_id: impl Into<String>,
        generator: impl Into<String>,
    ) -> Self {
        Self {
            asset_format: asset_format.into(),
            instance_id: instance_id.into(),
            default_hash_algorithm: HashAlgorithm::default(),
            claim_version: 1,
            generator: generator.into(),
            box_size: 1200,
        }
    }

    pub fn with_hash_algorithm(mut self, alg: HashAlgorithm) -> Self {
        self.default_hash_algorithm = alg;
        self
    }

    /// Select the claim field layout and ingredient version. Only 1 and 2
    /// are defined; anything else is rejected at [`ManifestBuilderConfig::build`] time
    /// rather than here, so the builder itself never fails.
    pub fn with_claim_version(mut self, version: u8) -> Self {
        self.claim_version = version;
        self
    }

    /// Reserve `box_size` bytes for the COSE_Sign1 structure padding (see
    /// [`crate::cose::cose_sign`]). Must be large enough for the signer's
    /// certificate chain and, if present, a timestamp token; too small a
    /// reservation fails at build time rather than silently truncating.
    pub fn with_box_size(mut self, box_size: usize) -> Self {
        self.box_size = box_size;
        self
    }

    /// Assemble a claim from this config plus `assertions`, sign it with
    /// `signer` (and `timestamp_provider`, if given), and return a
    /// complete, signed [`Manifest`] ready for [`Manifest::to_super_box`].
    pub fn build(
        self,
        label: impl Into<String>,
        assertions: Vec<Assertion>,
        signer: &dyn Signer,
        timestamp_provider: Option<&dyn TimestampProvider>,
    ) -> Result<Manifest> {
        if self.claim_version != 1 && self.claim_version != 2 {
            return Err(Error::MalformedContent(format!(
                "unsupported claim version {}",
                self.claim_version
            )));
        }

        let mut claim = Claim::new(self.claim_version, self.asset_format, self.instance_id, self.generator);
        claim.default_hash_algorithm = self.default_hash_algorithm;

        let manifest_label = label.into();
        for assertion in &assertions {
            claim.add_assertion(crate::hashed_uri::HashedUri::new(
                format!(
                    "self#jumbf=/c2pa/{manifest_label}/c2pa.assertions/{}",
                    assertion.label()
                ),
                Some(self.default_hash_algorithm),
                assertion_digest(assertion, self.default_hash_algorithm)?,
            ));
        }
        claim.signature_ref = format!("self#jumbf=/c2pa/{manifest_label}/c2pa.signature");

        // §4.3: a v2 claim carries a `signature` HashedURI in addition to
        // its assertion references. Its `hash` is left empty rather than
        // computed — see `Claim::is_signature_self_reference` for why —
        // and the validation pipeline recognizes and skips this one entry
        // rather than trying to verify a digest that can't exist yet.
        if self.claim_version == 2 {
            claim.add_assertion(crate::hashed_uri::HashedUri::new(claim.signature_ref.clone(), None, Vec::new()));
        }

        let manifest = Manifest::new(manifest_label, claim, assertions)?;
        let cose_bytes = cose::cose_sign(signer, &manifest.claim_cbor, timestamp_provider, self.box_size)?;
        manifest.with_signature_bytes(cose_bytes)
    }
}

fn assertion_digest(assertion: &Assertion, alg: HashAlgorithm) -> Result<Vec<u8>> {
    use crate::crypto::{Digester, Sha2Digester};
    let sbox = assertion.to_super_box()?;
    let bytes = crate::jumbf::serialize(&crate::jumbf::JumbfBox::Super(sbox))?;
    let digester = Sha2Digester::new(alg);
    Ok(digester.digest(&bytes[8..]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assertions::data_hash::DataHashAssertion;
    use crate::crypto::EphemeralSigner;
    use crate::hash_exclusion::Exclusion;

    #[test]
    fn builds_a_signed_manifest_with_one_data_hash_assertion() {
        let signer = EphemeralSigner::generate();
        let digester = crate::crypto::Sha2Digester::new(HashAlgorithm::Sha256);

        let mut data_hash = DataHashAssertion::new(HashAlgorithm::Sha256, vec![Exclusion::new(0, 0)]);
        data_hash.compute_hash(b"asset bytes", &digester).unwrap();

        let manifest = ManifestBuilderConfig::new("image/jpeg", "xmp:iid:test", "c2pa-core/0.1")
            .with_box_size(1200)
            .build("c2pa", vec![Assertion::DataHash(data_hash)], &signer, None)
            .unwrap();

        assert_eq!(manifest.claim.assertions.len(), 1);
        assert!(manifest.signature_bytes().is_some());
    }

    #[test]
    fn v2_claim_carries_a_signature_hashed_uri_in_addition_to_assertions() {
        let signer = EphemeralSigner::generate();
        let digester = crate::crypto::Sha2Digester::new(HashAlgorithm::Sha256);

        let mut data_hash = DataHashAssertion::new(HashAlgorithm::Sha256, vec![Exclusion::new(0, 0)]);
        data_hash.compute_hash(b"asset bytes", &digester).unwrap();

        let manifest = ManifestBuilderConfig::new("image/jpeg", "xmp:iid:test", "c2pa-core/0.1")
            .with_claim_version(2)
            .with_box_size(1200)
            .build("c2pa", vec![Assertion::DataHash(data_hash)], &signer, None)
            .unwrap();

        // One entry for the data-hash assertion, one self-reference to
        // the claim's own signature box.
        assert_eq!(manifest.claim.assertions.len(), 2);
        assert!(manifest
            .claim
            .assertions
            .iter()
            .any(|href| manifest.claim.is_signature_self_reference(&href.uri)));
    }

    #[test]
    fn rejects_an_unsupported_claim_version() {
        let signer = EphemeralSigner::generate();
        let result = ManifestBuilderConfig::new("image/jpeg", "xmp:iid:test", "c2pa-core/0.1")
            .with_claim_version(9)
            .build("c2pa", Vec::new(), &signer, None);
        assert!(result.is_err());
    }
}
