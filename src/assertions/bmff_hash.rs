//! `c2pa.hash.bmff[.v2]` (§4.2): a BMFF/HEIC-specific whole-asset digest
//! whose exclusions are expressed as box paths (`xpath`) rather than raw
//! byte offsets, since a BMFF asset's box layout is stable across the
//! patches `ensure_manifest_space`/`write_manifest_jumbf` make to `iloc`.

use serde::{Deserialize, Serialize};

use crate::crypto::{Digester, HashAlgorithm, MerkleHashProvider};
use crate::error::{Error, Result};
use crate::jumbf::data_box::CborBox;
use crate::jumbf::description_box::DescriptionBox;
use crate::jumbf::{box_type, JumbfBox, SuperBox};

pub const LABEL_V1: &str = "c2pa.hash.bmff";
pub const LABEL_V2: &str = "c2pa.hash.bmff.v2";
/// Fragmented/streamed BMFF hashing via a Merkle tree of fragment digests
/// (spec.md §9 Non-goals: the tree algorithm is out of scope, the label
/// and interface are not). No `parse`/`to_super_box` support is wired in
/// for this label since this crate never builds or validates the tree
/// itself — see [`crate::crypto::MerkleHashProvider`].
pub const LABEL_V3: &str = "c2pa.hash.bmff.v3";

/// One excluded box, named by its BMFF path (e.g. `/uuid`, `/ftyp`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BmffExclusionRange {
    pub xpath: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub offset: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub length: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BmffHashAssertion {
    #[serde(skip)]
    pub version: u8,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub name: Option<String>,
    pub exclusions: Vec<BmffExclusionRange>,
    pub alg: HashAlgorithm,
    #[serde(with = "serde_bytes")]
    pub hash: Vec<u8>,
}

impl BmffHashAssertion {
    pub fn new(version: u8, alg: HashAlgorithm, exclusions: Vec<BmffExclusionRange>) -> Self {
        Self {
            version,
            name: None,
            exclusions,
            alg,
            hash: Vec::new(),
        }
    }

    pub fn label(&self) -> &'static str {
        match self.version {
            1 => LABEL_V1,
            _ => LABEL_V2,
        }
    }

    /// Validate against a pre-excluded digest (the BMFF asset handler is
    /// the one that knows how to resolve `xpath`s into byte ranges; this
    /// just compares the already-computed digest to what was stored).
    pub fn validate_digest(&self, recomputed: &[u8]) -> bool {
        recomputed == self.hash.as_slice()
    }

    pub fn compute(&mut self, digester: &dyn Digester, excluded_bytes: &[u8]) {
        self.hash = digester.digest(excluded_bytes);
    }

    /// Recompute `hash` as a Merkle root over per-fragment digests (v3
    /// only). Always fails against [`crate::crypto::NotImplemented`],
    /// matching spec.md §9's "Merkle-tree BMFF v3 hashing beyond the
    /// interfaces noted" Non-goal — the interface exists, the algorithm
    /// doesn't.
    pub fn compute_merkle(
        &mut self,
        provider: &dyn MerkleHashProvider,
        leaf_hashes: &[Vec<u8>],
    ) -> Result<()> {
        self.hash = provider.merkle_root(leaf_hashes)?;
        Ok(())
    }

    pub(crate) fn parse(sbox: &SuperBox) -> Result<Self> {
        let label = sbox.description.label.as_deref().unwrap_or(LABEL_V1);
        let version = if label == LABEL_V1 { 1 } else { 2 };
        let cbor = sbox
            .children
            .iter()
            .find_map(JumbfBox::as_cbor)
            .ok_or_else(|| Error::MalformedContent("bmff-hash assertion missing cbor box".into()))?;
        let mut parsed: BmffHashAssertion = ciborium::de::from_reader(cbor.raw.as_slice())?;
        parsed.version = version;
        Ok(parsed)
    }

    pub(crate) fn to_super_box(&self) -> Result<SuperBox> {
        let mut raw = Vec::new();
        ciborium::ser::into_writer(self, &mut raw)?;
        let desc = DescriptionBox::new(box_type::CBOR_ASSERTION_UUID).with_label(self.label());
        Ok(SuperBox::new(desc).with_child(JumbfBox::Cbor(CborBox { tag: None, raw })))
    }
}
