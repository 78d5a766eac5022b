//! The assertion model (§3 C5): polymorphic over the assertion label,
//! each stored as a SuperBox under `c2pa.assertions` carrying one content
//! box (CBOR, JSON, or an embedded file pair).

pub mod action;
pub mod bmff_hash;
pub mod data_hash;
pub mod ingredient;
pub mod metadata;
pub mod thumbnail;
pub mod unknown;

pub use action::ActionAssertion;
pub use bmff_hash::BmffHashAssertion;
pub use data_hash::DataHashAssertion;
pub use ingredient::IngredientAssertion;
pub use metadata::MetadataAssertion;
pub use thumbnail::ThumbnailAssertion;
pub use unknown::UnknownAssertion;

use crate::error::Result;
use crate::jumbf::SuperBox;

/// An assertion, dispatched on its SuperBox's description-box label.
#[derive(Debug, Clone)]
pub enum Assertion {
    DataHash(DataHashAssertion),
    BmffHash(BmffHashAssertion),
    Ingredient(IngredientAssertion),
    Action(ActionAssertion),
    Thumbnail(ThumbnailAssertion),
    Metadata(MetadataAssertion),
    Unknown(UnknownAssertion),
}

impl Assertion {
    /// The assertion label this would be stored under (e.g.
    /// `c2pa.hash.data`, `c2pa.ingredient.v2`).
    pub fn label(&self) -> &str {
        match self {
            Assertion::DataHash(_) => data_hash::LABEL,
            Assertion::BmffHash(a) => a.label(),
            Assertion::Ingredient(a) => a.label(),
            Assertion::Action(a) => a.label(),
            Assertion::Thumbnail(a) => &a.label,
            Assertion::Metadata(_) => metadata::LABEL,
            Assertion::Unknown(a) => &a.label,
        }
    }

    /// Parse an assertion's SuperBox, dispatching on its description-box
    /// label. Labels not recognized become [`UnknownAssertion`], which
    /// still participates in HashedURI verification as an opaque blob.
    pub fn from_super_box(sbox: &SuperBox) -> Result<Assertion> {
        let label = sbox
            .description
            .label
            .clone()
            .unwrap_or_else(|| "c2pa.unknown".to_string());

        if label == data_hash::LABEL {
            return Ok(Assertion::DataHash(data_hash::DataHashAssertion::parse(sbox)?));
        }
        if label == bmff_hash::LABEL_V1 || label == bmff_hash::LABEL_V2 {
            return Ok(Assertion::BmffHash(bmff_hash::BmffHashAssertion::parse(sbox)?));
        }
        if ingredient::LABELS.contains(&label.as_str()) {
            return Ok(Assertion::Ingredient(ingredient::IngredientAssertion::parse(sbox)?));
        }
        if action::LABELS.contains(&label.as_str()) {
            return Ok(Assertion::Action(action::ActionAssertion::parse(sbox)?));
        }
        if label.starts_with(thumbnail::LABEL_PREFIX) {
            return Ok(Assertion::Thumbnail(thumbnail::ThumbnailAssertion::parse(sbox)?));
        }
        if label == metadata::LABEL {
            return Ok(Assertion::Metadata(metadata::MetadataAssertion::parse(sbox)?));
        }

        Ok(Assertion::Unknown(unknown::UnknownAssertion::parse(&label, sbox)?))
    }

    /// Serialize back to a SuperBox. Round-trips byte-identically except
    /// where a canonically-ordered new field (e.g. an Ingredient version
    /// bump) adds content the source never had.
    pub fn to_super_box(&self) -> Result<SuperBox> {
        match self {
            Assertion::DataHash(a) => a.to_super_box(),
            Assertion::BmffHash(a) => a.to_super_box(),
            Assertion::Ingredient(a) => a.to_super_box(),
            Assertion::Action(a) => a.to_super_box(),
            Assertion::Thumbnail(a) => a.to_super_box(),
            Assertion::Metadata(a) => a.to_super_box(),
            Assertion::Unknown(a) => a.to_super_box(),
        }
    }
}
