//! The manifest store (§3 C5): `ManifestStore.read` walks a parsed JUMBF
//! tree, promoting each child whose description-box UUID matches the C2PA
//! manifest UUID into a [`Manifest`] — a `Claim` plus its resolved
//! assertions and its `Signature`. Construction is the write-side dual.

use std::collections::HashMap;

use crate::assertions::Assertion;
use crate::claim::Claim;
use crate::cose;
use crate::error::{Error, Result};
use crate::jumbf::description_box::DescriptionBox;
use crate::jumbf::{box_type, uri, JumbfBox, SuperBox};
use crate::signature::Signature;

const ASSERTIONS_LABEL: &str = "c2pa.assertions";

/// A single manifest: its claim, the assertions the claim's `assertions`
/// list of HashedURIs points at, and the signature over the claim bytes.
#[derive(Debug, Clone)]
pub struct Manifest {
    pub label: String,
    pub claim: Claim,
    pub claim_cbor: Vec<u8>,
    pub assertions: Vec<Assertion>,
    pub signature: Signature,
    /// The exact bytes of the `uuid` signature box's content this manifest
    /// was parsed from, or `None` for a manifest built fresh in memory.
    /// `to_super_box` reuses these verbatim for an unmodified manifest;
    /// [`Manifest::with_signature_bytes`] replaces them after signing.
    raw_signature_bytes: Option<Vec<u8>>,
}

impl Manifest {
    /// Find an assertion by the label the claim's `assertions` list names.
    pub fn assertion_by_label(&self, label: &str) -> Option<&Assertion> {
        self.assertions.iter().find(|a| a.label() == label)
    }

    /// The raw COSE_Sign1 bytes this manifest carries, if any (see
    /// [`Manifest::with_signature_bytes`]). Used by [`crate::validation`]
    /// to re-verify the signature against the claim bytes.
    pub fn signature_bytes(&self) -> Option<&[u8]> {
        self.raw_signature_bytes.as_deref()
    }

    fn parse(sbox: &SuperBox) -> Result<Self> {
        let label = sbox.uri.clone();

        let assertion_store = sbox
            .find_by_label(ASSERTIONS_LABEL)
            .ok_or_else(|| Error::MalformedContent("manifest missing c2pa.assertions".into()))?;
        let mut assertions = Vec::new();
        for child in &assertion_store.children {
            if let JumbfBox::Super(assertion_box) = child {
                assertions.push(Assertion::from_super_box(assertion_box)?);
            }
        }

        let claim_cbor = sbox
            .children
            .iter()
            .find_map(|c| match c {
                JumbfBox::Cbor(cbor) => Some(cbor.raw.clone()),
                _ => None,
            })
            .ok_or_else(|| Error::MalformedContent("manifest missing c2pa.claim".into()))?;
        let claim = Claim::from_cbor(&claim_cbor)?;

        let signature_bytes = sbox
            .children
            .iter()
            .find_map(|c| match c {
                JumbfBox::Uuid(u) if u.uuid == box_type::SIGNATURE_UUID => Some(u.data.clone()),
                _ => None,
            })
            .ok_or_else(|| Error::MalformedContent("manifest missing c2pa.signature".into()))?;
        let signature = cose::validate::parse_signature(&signature_bytes)?;

        Ok(Self {
            label,
            claim,
            claim_cbor,
            assertions,
            signature,
            raw_signature_bytes: Some(signature_bytes),
        })
    }

    /// Build a fresh, unsigned manifest from its parts. The claim is
    /// encoded to CBOR immediately so `claim_cbor` stays consistent with
    /// `claim`; call [`Manifest::with_signature_bytes`] once signed.
    pub fn new(label: impl Into<String>, claim: Claim, assertions: Vec<Assertion>) -> Result<Self> {
        let claim_cbor = claim.to_cbor()?;
        Ok(Self {
            label: label.into(),
            claim,
            claim_cbor,
            assertions,
            signature: Signature {
                algorithm: crate::crypto::SigningAlg::Es256,
                certificate: Vec::new(),
                chain_certificates: Vec::new(),
                raw_protected_bucket: Vec::new(),
                signature: Vec::new(),
                timestamp_tokens: Vec::new(),
                padding_length: 0,
            },
            raw_signature_bytes: None,
        })
    }

    /// Record the COSE_Sign1 bytes produced for this manifest's claim
    /// (from [`crate::cose::sign::cose_sign`]) and the [`Signature`]
    /// `parse_signature` would recover from them, so a subsequent
    /// `to_super_box` embeds exactly what was signed.
    pub fn with_signature_bytes(mut self, cose_bytes: Vec<u8>) -> Result<Self> {
        self.signature = cose::validate::parse_signature(&cose_bytes)?;
        self.raw_signature_bytes = Some(cose_bytes);
        Ok(self)
    }

    /// Rebuild this manifest's JUMBF superbox. The claim's own CBOR bytes
    /// (`claim_cbor`) are reused verbatim rather than re-encoded, and the
    /// signature box is the exact bytes [`Manifest::with_signature_bytes`]
    /// (or `parse`) recorded, so a manifest that was only read and never
    /// re-signed round-trips byte-identically.
    pub fn to_super_box(&self, manifest_label: &str) -> Result<SuperBox> {
        let mut assertion_store = SuperBox::new(
            DescriptionBox::new(box_type::ASSERTION_STORE_UUID).with_label(ASSERTIONS_LABEL),
        );
        for assertion in &self.assertions {
            assertion_store = assertion_store.with_child(JumbfBox::Super(assertion.to_super_box()?));
        }

        let claim_box = JumbfBox::Cbor(crate::jumbf::data_box::CborBox {
            tag: None,
            raw: self.claim_cbor.clone(),
        });
        let signature_bytes = self.raw_signature_bytes.clone().ok_or_else(|| {
            Error::MalformedContent(
                "manifest has no signature bytes; call with_signature_bytes after signing".into(),
            )
        })?;
        let signature_box = JumbfBox::Uuid(crate::jumbf::data_box::UuidBox {
            uuid: box_type::SIGNATURE_UUID,
            data: signature_bytes,
        });

        let desc = DescriptionBox::new(box_type::MANIFEST_UUID).with_label(manifest_label);
        Ok(SuperBox::new(desc)
            .with_child(JumbfBox::Super(assertion_store))
            .with_child(claim_box)
            .with_child(signature_box))
    }
}

/// A manifest store: every manifest embedded in an asset, with one marked
/// active (the one a renderer should show provenance for).
#[derive(Debug, Clone)]
pub struct ManifestStore {
    pub manifests: Vec<Manifest>,
    pub active_label: String,
    /// URI → box map built once per store, used to resolve every
    /// `HashedUri` in every manifest's claim and assertions without a
    /// separate tree walk per reference.
    uri_map: HashMap<String, SuperBox>,
}

impl ManifestStore {
    /// Parse a manifest store from its top-level JUMBF superbox (the root
    /// returned by [`crate::jumbf::parse`], after [`uri::assign_uris`] has
    /// run over it).
    #[tracing::instrument(level = "debug", skip(root))]
    pub fn read(mut root: SuperBox) -> Result<Self> {
        uri::assign_uris(&mut root);

        if root.description.uuid != box_type::MANIFEST_STORE_UUID {
            return Err(Error::MalformedContent(
                "root box is not a C2PA manifest store".into(),
            ));
        }

        let mut uri_map = HashMap::new();
        index_boxes(&root, &mut uri_map);

        let mut manifests = Vec::new();
        for child in &root.children {
            if let JumbfBox::Super(sbox) = child {
                if sbox.description.uuid == box_type::MANIFEST_UUID {
                    manifests.push(Manifest::parse(sbox)?);
                }
            }
        }

        let active_label = manifests
            .last()
            .map(|m| m.label.clone())
            .ok_or_else(|| Error::MalformedContent("manifest store has no manifests".into()))?;

        tracing::debug!(manifest_count = manifests.len(), active = %active_label, "read manifest store");

        Ok(Self {
            manifests,
            active_label,
            uri_map,
        })
    }

    pub fn active_manifest(&self) -> Option<&Manifest> {
        self.manifests.iter().find(|m| m.label == self.active_label)
    }

    /// Resolve a `HashedUri`'s `uri` field against the store's URI→box map.
    pub fn resolve(&self, uri: &str) -> Option<&SuperBox> {
        let stripped = uri.split("#xpointer").next().unwrap_or(uri);
        self.uri_map.get(stripped).or_else(|| self.uri_map.get(uri))
    }
}

fn index_boxes(node: &SuperBox, map: &mut HashMap<String, SuperBox>) {
    if !node.uri.is_empty() {
        map.insert(node.uri.clone(), node.clone());
    }
    for child in &node.children {
        if let JumbfBox::Super(sbox) = child {
            index_boxes(sbox, map);
        }
    }
}
