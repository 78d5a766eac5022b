//! Passthrough for any assertion label this crate does not interpret.
//! Kept as the exact child box it was parsed from so it still participates
//! correctly in HashedURI verification and round-trips byte-identically.

use crate::error::{Error, Result};
use crate::jumbf::description_box::DescriptionBox;
use crate::jumbf::{JumbfBox, SuperBox};

/// An assertion whose label this crate does not interpret. Its
/// description box is preserved verbatim (not resynthesized from a fixed
/// content-type UUID) since the real UUID depends on a content type this
/// crate never parsed.
#[derive(Debug, Clone)]
pub struct UnknownAssertion {
    pub label: String,
    pub description: DescriptionBox,
    pub content: JumbfBox,
}

impl UnknownAssertion {
    pub(crate) fn parse(label: &str, sbox: &SuperBox) -> Result<Self> {
        let content = sbox
            .children
            .first()
            .cloned()
            .ok_or_else(|| Error::MalformedContent(format!("assertion {label} has no content box")))?;
        Ok(Self {
            label: label.to_string(),
            description: sbox.description.clone(),
            content,
        })
    }

    pub(crate) fn to_super_box(&self) -> Result<SuperBox> {
        Ok(SuperBox::new(self.description.clone()).with_child(self.content.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jumbf::box_type;
    use crate::jumbf::data_box::CborBox;

    #[test]
    fn round_trips_opaque_content() {
        let inner = JumbfBox::Cbor(CborBox { tag: None, raw: vec![0x01, 0x02, 0x03] });
        let desc = DescriptionBox::new(box_type::CBOR_ASSERTION_UUID).with_label("c2pa.custom.extension");
        let sbox = SuperBox::new(desc).with_child(inner.clone());

        let parsed = UnknownAssertion::parse("c2pa.custom.extension", &sbox).unwrap();
        assert_eq!(parsed.content, inner);
        let rebuilt = parsed.to_super_box().unwrap();
        assert_eq!(rebuilt, sbox);
    }
}
