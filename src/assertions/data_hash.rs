//! `c2pa.hash.data` (§4.2 design note, §9): a whole-asset digest over every
//! byte except a declared set of exclusion ranges (the manifest's own
//! storage, plus any format envelope bytes that move when it's resized).

use serde::{Deserialize, Serialize};

use crate::crypto::{Digester, HashAlgorithm};
use crate::error::Result;
use crate::hash_exclusion::{self, Exclusion};
use crate::jumbf::data_box::CborBox;
use crate::jumbf::description_box::DescriptionBox;
use crate::jumbf::{box_type, JumbfBox, SuperBox};

pub const LABEL: &str = "c2pa.hash.data";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataHashAssertion {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub name: Option<String>,
    pub exclusions: Vec<Exclusion>,
    pub alg: HashAlgorithm,
    #[serde(with = "serde_bytes")]
    pub hash: Vec<u8>,
    #[serde(with = "serde_bytes", skip_serializing_if = "Vec::is_empty", default)]
    pub pad: Vec<u8>,
}

impl DataHashAssertion {
    pub fn new(alg: HashAlgorithm, exclusions: Vec<Exclusion>) -> Self {
        Self {
            name: None,
            exclusions,
            alg,
            hash: Vec::new(),
            pad: Vec::new(),
        }
    }

    /// Compute this assertion's hash field against `asset_bytes`, replacing
    /// whatever was there before.
    pub fn compute_hash(&mut self, asset_bytes: &[u8], digester: &dyn Digester) -> Result<()> {
        self.hash = hash_exclusion::digest_with_exclusions(digester, asset_bytes, &self.exclusions)?;
        Ok(())
    }

    /// Recompute against `asset_bytes` and compare with the stored hash.
    pub fn validate(&self, asset_bytes: &[u8], digester: &dyn Digester) -> Result<bool> {
        let recomputed = hash_exclusion::digest_with_exclusions(digester, asset_bytes, &self.exclusions)?;
        Ok(recomputed == self.hash)
    }

    pub(crate) fn parse(sbox: &SuperBox) -> Result<Self> {
        let cbor = sbox
            .children
            .iter()
            .find_map(JumbfBox::as_cbor)
            .ok_or_else(|| crate::error::Error::MalformedContent("data-hash assertion missing cbor box".into()))?;
        Ok(ciborium::de::from_reader(cbor.raw.as_slice())?)
    }

    pub(crate) fn to_super_box(&self) -> Result<SuperBox> {
        let mut raw = Vec::new();
        ciborium::ser::into_writer(self, &mut raw)?;
        let desc = DescriptionBox::new(box_type::CBOR_ASSERTION_UUID).with_label(LABEL);
        Ok(SuperBox::new(desc).with_child(JumbfBox::Cbor(CborBox { tag: None, raw })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::Sha2Digester;

    #[test]
    fn round_trips_through_super_box() {
        let mut assertion = DataHashAssertion::new(HashAlgorithm::Sha256, vec![Exclusion::new(0, 4)]);
        let digester = Sha2Digester::new(HashAlgorithm::Sha256);
        assertion.compute_hash(b"XXXXhello world", &digester).unwrap();

        let sbox = assertion.to_super_box().unwrap();
        let parsed = DataHashAssertion::parse(&sbox).unwrap();
        assert_eq!(parsed.hash, assertion.hash);
        assert!(parsed.validate(b"YYYYhello world", &digester).unwrap());
        assert!(!parsed.validate(b"YYYYtampered!!!!", &digester).unwrap());
    }
}
