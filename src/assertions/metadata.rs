//! `c2pa.metadata` (§3): free-form structured metadata, the one assertion
//! carried in a JSON content box rather than CBOR.

use crate::error::{Error, Result};
use crate::jumbf::data_box::JsonBox;
use crate::jumbf::description_box::DescriptionBox;
use crate::jumbf::{box_type, JumbfBox, SuperBox};

pub const LABEL: &str = "c2pa.metadata";

#[derive(Debug, Clone)]
pub struct MetadataAssertion {
    pub value: serde_json::Value,
}

impl MetadataAssertion {
    pub fn new(value: serde_json::Value) -> Self {
        Self { value }
    }

    pub(crate) fn parse(sbox: &SuperBox) -> Result<Self> {
        let json = sbox
            .children
            .iter()
            .find_map(JumbfBox::as_json)
            .ok_or_else(|| Error::MalformedContent("metadata assertion missing json box".into()))?;
        Ok(Self { value: json.value()? })
    }

    pub(crate) fn to_super_box(&self) -> Result<SuperBox> {
        let desc = DescriptionBox::new(box_type::JSON_ASSERTION_UUID).with_label(LABEL);
        let json_box = JsonBox::from_value(&self.value)?;
        Ok(SuperBox::new(desc).with_child(JumbfBox::Json(json_box)))
    }
}
