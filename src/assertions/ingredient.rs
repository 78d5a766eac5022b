//! `c2pa.ingredient[.v2|.v3]` (§3): a reference to another asset (or its own
//! embedded manifest) that contributed to the one carrying this manifest.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::hashed_uri::HashedUri;
use crate::jumbf::data_box::CborBox;
use crate::jumbf::description_box::DescriptionBox;
use crate::jumbf::{box_type, JumbfBox, SuperBox};

pub const LABEL_V1: &str = "c2pa.ingredient";
pub const LABEL_V2: &str = "c2pa.ingredient.v2";
pub const LABEL_V3: &str = "c2pa.ingredient.v3";
pub const LABELS: &[&str] = &[LABEL_V1, LABEL_V2, LABEL_V3];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Relationship {
    ParentOf,
    ComponentOf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngredientAssertion {
    #[serde(skip)]
    pub version: u8,
    pub title: String,
    pub format: String,
    #[serde(rename = "instanceID")]
    pub instance_id: String,
    pub relationship: Relationship,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub document_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub thumbnail: Option<HashedUri>,
    #[serde(rename = "c2pa.manifest", skip_serializing_if = "Option::is_none", default)]
    pub c2pa_manifest: Option<HashedUri>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub validation_status: Vec<String>,
    /// v3-only: a hashed reference to the ingredient's own raw source bytes
    /// (as opposed to `c2pa_manifest`, which references its *manifest*).
    /// Absent from the v1/v2 field layout; `None` for those versions.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub data: Option<HashedUri>,
}

impl IngredientAssertion {
    pub fn new(version: u8, title: impl Into<String>, format: impl Into<String>, instance_id: impl Into<String>, relationship: Relationship) -> Self {
        Self {
            version,
            title: title.into(),
            format: format.into(),
            instance_id: instance_id.into(),
            relationship,
            document_id: None,
            thumbnail: None,
            c2pa_manifest: None,
            validation_status: Vec::new(),
            data: None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self.version {
            1 => LABEL_V1,
            2 => LABEL_V2,
            _ => LABEL_V3,
        }
    }

    /// Attach the v3-only `data` field: a hashed reference to this
    /// ingredient's raw source bytes, distinct from `c2pa_manifest`'s
    /// reference to its manifest. Only meaningful when `version == 3`;
    /// kept as a plain setter rather than version-gated so existing v1/v2
    /// callers that never call it continue to produce the identical v1/v2
    /// layout.
    pub fn with_data(mut self, data: HashedUri) -> Self {
        self.data = Some(data);
        self
    }

    pub(crate) fn parse(sbox: &SuperBox) -> Result<Self> {
        let label = sbox.description.label.as_deref().unwrap_or(LABEL_V1);
        let version = match label {
            LABEL_V1 => 1,
            LABEL_V2 => 2,
            _ => 3,
        };
        let cbor = sbox
            .children
            .iter()
            .find_map(JumbfBox::as_cbor)
            .ok_or_else(|| Error::MalformedContent("ingredient assertion missing cbor box".into()))?;
        let mut parsed: IngredientAssertion = ciborium::de::from_reader(cbor.raw.as_slice())?;
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_super_box() {
        let mut ingredient = IngredientAssertion::new(2, "background.jpg", "image/jpeg", "xmp:iid:aaa", Relationship::ComponentOf);
        ingredient.thumbnail = Some(HashedUri::new("self#jumbf=/c2pa/c2pa.assertions/c2pa.thumbnail.ingredient", None, vec![1u8; 32]));

        let sbox = ingredient.to_super_box().unwrap();
        assert_eq!(sbox.description.label.as_deref(), Some(LABEL_V2));

        let parsed = IngredientAssertion::parse(&sbox).unwrap();
        assert_eq!(parsed.version, 2);
        assert_eq!(parsed.relationship, Relationship::ComponentOf);
        assert!(parsed.thumbnail.is_some());
        assert!(parsed.data.is_none());
    }

    #[test]
    fn v3_field_layout_carries_a_data_reference_v1_v2_never_serialize() {
        let v3 = IngredientAssertion::new(3, "source.jpg", "image/jpeg", "xmp:iid:bbb", Relationship::ParentOf)
            .with_data(HashedUri::new("self#jumbf=/c2pa/c2pa.assertions/c2pa.ingredient.v3", None, vec![2u8; 32]));
        let v3_sbox = v3.to_super_box().unwrap();
        assert_eq!(v3_sbox.description.label.as_deref(), Some(LABEL_V3));

        let parsed_v3 = IngredientAssertion::parse(&v3_sbox).unwrap();
        assert_eq!(parsed_v3.version, 3);
        assert!(parsed_v3.data.is_some());

        let v2 = IngredientAssertion::new(2, "source.jpg", "image/jpeg", "xmp:iid:bbb", Relationship::ParentOf);
        let v2_sbox = v2.to_super_box().unwrap();
        let parsed_v2 = IngredientAssertion::parse(&v2_sbox).unwrap();
        assert!(parsed_v2.data.is_none());
    }
}
