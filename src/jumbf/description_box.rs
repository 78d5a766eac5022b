//! JUMBF description box (`jumd`) — the first child of every superbox.

use std::io::Write;

use crate::binary;
use crate::error::{Error, Result};

pub mod toggles {
    pub const REQUESTABLE: u8 = 0x01;
    pub const HAS_LABEL: u8 = 0x02;
    pub const HAS_ID: u8 = 0x04;
    pub const HAS_HASH: u8 = 0x08;
    pub const HAS_PRIVATE: u8 = 0x10;
}

/// A JUMBF description box. Describes the contents of the superbox it
/// belongs to: an application-specific UUID, an optional label used to
/// build the containing superbox's URI, an optional numeric id, an
/// optional digest of the superbox's payload, and optional nested
/// "private" boxes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptionBox {
    pub uuid: [u8; 16],
    pub requestable: bool,
    pub label: Option<String>,
    pub id: Option<u32>,
    pub hash: Option<[u8; 32]>,
    /// Raw bytes of nested private boxes, preserved uninterpreted.
    pub private: Option<Vec<u8>>,
}

impl DescriptionBox {
    pub fn new(uuid: [u8; 16]) -> Self {
        Self {
            uuid,
            requestable: true,
            label: None,
            id: None,
            hash: None,
            private: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_hash(mut self, hash: [u8; 32]) -> Self {
        self.hash = Some(hash);
        self
    }

    fn toggle_byte(&self) -> u8 {
        let mut t = 0u8;
        if self.requestable {
            t |= toggles::REQUESTABLE;
        }
        if self.label.is_some() {
            t |= toggles::HAS_LABEL;
        }
        if self.id.is_some() {
            t |= toggles::HAS_ID;
        }
        if self.hash.is_some() {
            t |= toggles::HAS_HASH;
        }
        if self.private.is_some() {
            t |= toggles::HAS_PRIVATE;
        }
        t
    }

    /// Parse a description box's content (everything after the 8-byte
    /// `length`+`jumd` header has already been stripped).
    pub fn parse(content: &[u8]) -> Result<Self> {
        if content.len() < 17 {
            return Err(Error::MalformedContent(
                "description box shorter than uuid+toggle".into(),
            ));
        }

        let mut uuid = [0u8; 16];
        uuid.copy_from_slice(&content[..16]);
        let toggle = content[16];
        let mut rest = &content[17..];

        let requestable = toggle & toggles::REQUESTABLE != 0;

        let label = if toggle & toggles::HAS_LABEL != 0 {
            let (label, remainder) = binary::split_null_terminated(rest)?;
            rest = remainder;
            Some(label)
        } else {
            None
        };

        let id = if toggle & toggles::HAS_ID != 0 {
            if rest.len() < 4 {
                return Err(Error::MalformedContent("truncated description box id".into()));
            }
            let id = u32::from_be_bytes(rest[..4].try_into().unwrap());
            rest = &rest[4..];
            Some(id)
        } else {
            None
        };

        let hash = if toggle & toggles::HAS_HASH != 0 {
            if rest.len() < 32 {
                return Err(Error::MalformedContent(
                    "truncated description box hash".into(),
                ));
            }
            let mut h = [0u8; 32];
            h.copy_from_slice(&rest[..32]);
            rest = &rest[32..];
            Some(h)
        } else {
            None
        };

        let private = if toggle & toggles::HAS_PRIVATE != 0 {
            Some(rest.to_vec())
        } else if !rest.is_empty() {
            return Err(Error::MalformedContent(
                "trailing bytes after description box fields with no private-box toggle".into(),
            ));
        } else {
            None
        };

        Ok(Self {
            uuid,
            requestable,
            label,
            id,
            hash,
            private,
        })
    }

    /// Serialize this description box's content (without the outer
    /// length+type header — the caller, [`super::super_box`], prepends it).
    pub fn write_content<W: Write>(&self, w: &mut W) -> Result<()> {
        w.write_all(&self.uuid)?;
        w.write_all(&[self.toggle_byte()])?;
        if let Some(label) = &self.label {
            w.write_all(label.as_bytes())?;
            w.write_all(&[0u8])?;
        }
        if let Some(id) = self.id {
            w.write_all(&id.to_be_bytes())?;
        }
        if let Some(hash) = &self.hash {
            w.write_all(hash)?;
        }
        if let Some(private) = &self.private {
            w.write_all(private)?;
        }
        Ok(())
    }

    pub fn content_len(&self) -> usize {
        16 + 1
            + self.label.as_ref().map_or(0, |l| l.len() + 1)
            + self.id.map_or(0, |_| 4)
            + self.hash.map_or(0, |_| 32)
            + self.private.as_ref().map_or(0, |p| p.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_label_id_and_hash() {
        let desc = DescriptionBox::new([0x42; 16])
            .with_label("c2pa.claim")
            .with_hash([7u8; 32]);

        let mut buf = Vec::new();
        desc.write_content(&mut buf).unwrap();
        assert_eq!(buf.len(), desc.content_len());

        let parsed = DescriptionBox::parse(&buf).unwrap();
        assert_eq!(parsed, desc);
    }

    #[test]
    fn rejects_trailing_bytes_without_private_toggle() {
        let mut content = vec![0u8; 17];
        content.extend_from_slice(b"unexpected");
        assert!(DescriptionBox::parse(&content).is_err());
    }
}
