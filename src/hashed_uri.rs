//! `HashedURI` (§3, design note §9): a self-reference inside the manifest
//! graph, modelled as a value (uri, algorithm, hash) rather than a live
//! pointer, and resolved against a URI→box map built once per
//! [`crate::manifest::ManifestStore`].

use serde::{Deserialize, Serialize};

use crate::crypto::HashAlgorithm;
use crate::error::{Error, Result};
use crate::jumbf::SuperBox;

/// A URI plus the digest a correctly-resolving box must produce.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashedUri {
    pub uri: String,
    #[serde(rename = "alg", skip_serializing_if = "Option::is_none")]
    pub algorithm: Option<HashAlgorithm>,
    #[serde(with = "serde_bytes")]
    pub hash: Vec<u8>,
}

impl HashedUri {
    pub fn new(uri: impl Into<String>, algorithm: Option<HashAlgorithm>, hash: Vec<u8>) -> Self {
        Self {
            uri: uri.into(),
            algorithm,
            hash,
        }
    }

    /// Recompute the digest of the superbox this URI resolves to (digested
    /// over the box's content bytes, i.e. everything after its own 8-byte
    /// header) and compare against the stored hash.
    pub fn verify(&self, target: &SuperBox, digester: &dyn crate::crypto::Digester) -> Result<bool> {
        let content = crate::jumbf::writer::serialize(&crate::jumbf::JumbfBox::Super(target.clone()))?;
        // Strip the 8-byte outer header: the digest covers content, not the
        // length/type prefix of the box being referenced.
        if content.len() < 8 {
            return Err(Error::MalformedContent(
                "hashed-uri target serialized shorter than a box header".into(),
            ));
        }
        let digest = digester.digest(&content[8..]);
        Ok(digest == self.hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{Sha2Digester, Digester};
    use crate::jumbf::box_type;
    use crate::jumbf::description_box::DescriptionBox;

    #[test]
    fn verify_matches_recomputed_digest() {
        let desc = DescriptionBox::new(box_type::ASSERTION_STORE_UUID).with_label("c2pa.hash.data");
        let sbox = SuperBox::new(desc);
        let content = crate::jumbf::writer::serialize(&crate::jumbf::JumbfBox::Super(sbox.clone())).unwrap();

        let digester = Sha2Digester::new(HashAlgorithm::Sha256);
        let hash = digester.digest(&content[8..]);

        let hashed_uri = HashedUri::new("self#jumbf=/c2pa/c2pa.hash.data", Some(HashAlgorithm::Sha256), hash);
        assert!(hashed_uri.verify(&sbox, &digester).unwrap());
    }

    #[test]
    fn verify_rejects_tampered_target() {
        let desc = DescriptionBox::new(box_type::ASSERTION_STORE_UUID).with_label("c2pa.hash.data");
        let sbox = SuperBox::new(desc.clone());
        let digester = Sha2Digester::new(HashAlgorithm::Sha256);

        let hashed_uri = HashedUri::new("self#jumbf=/c2pa/c2pa.hash.data", Some(HashAlgorithm::Sha256), vec![0u8; 32]);
        assert!(!hashed_uri.verify(&sbox, &digester).unwrap());
        let _ = desc;
    }
}
