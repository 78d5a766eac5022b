//! `c2pa.thumbnail.*` (§3): a rendered preview of the claim's asset (or an
//! ingredient's asset), carried as an embedded-file description/content
//! box pair rather than CBOR.

use crate::error::{Error, Result};
use crate::jumbf::data_box::{EmbeddedFileContentBox, EmbeddedFileDescriptionBox};
use crate::jumbf::description_box::DescriptionBox;
use crate::jumbf::{box_type, JumbfBox, SuperBox};

pub const LABEL_PREFIX: &str = "c2pa.thumbnail";

#[derive(Debug, Clone)]
pub struct ThumbnailAssertion {
    pub label: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

impl ThumbnailAssertion {
    pub fn new(label: impl Into<String>, content_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            label: label.into(),
            content_type: content_type.into(),
            data,
        }
    }

    pub(crate) fn parse(sbox: &SuperBox) -> Result<Self> {
        let label = sbox
            .description
            .label
            .clone()
            .unwrap_or_else(|| LABEL_PREFIX.to_string());

        let description = sbox.children.iter().find_map(|c| match c {
            JumbfBox::EmbeddedFileDescription(d) => Some(d),
            _ => None,
        });
        let content = sbox.children.iter().find_map(|c| match c {
            JumbfBox::EmbeddedFile(f) => Some(f),
            _ => None,
        });

        let (description, content) = match (description, content) {
            (Some(d), Some(c)) => (d, c),
            _ => {
                return Err(Error::MalformedContent(
                    "thumbnail assertion missing embedded file description or content box".into(),
                ))
            }
        };

        Ok(Self {
            label,
            content_type: description.media_type.clone(),
            data: content.data.clone(),
        })
    }

    pub(crate) fn to_super_box(&self) -> Result<SuperBox> {
        let desc = DescriptionBox::new(box_type::EMBEDDED_FILE_ASSERTION_UUID).with_label(&self.label);
        let file_desc = EmbeddedFileDescriptionBox {
            media_type: self.content_type.clone(),
            file_name: None,
        };
        Ok(SuperBox::new(desc)
            .with_child(JumbfBox::EmbeddedFileDescription(file_desc))
            .with_child(JumbfBox::EmbeddedFile(EmbeddedFileContentBox { data: self.data.clone() })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_super_box() {
        let thumb = ThumbnailAssertion::new("c2pa.thumbnail.claim.jpeg", "image/jpeg", vec![0xFF, 0xD8, 0xFF, 0xD9]);
        let sbox = thumb.to_super_box().unwrap();
        let parsed = ThumbnailAssertion::parse(&sbox).unwrap();
        assert_eq!(parsed.content_type, "image/jpeg");
        assert_eq!(parsed.data, vec![0xFF, 0xD8, 0xFF, 0xD9]);
        assert_eq!(parsed.label, "c2pa.thumbnail.claim.jpeg");
    }
}
