//! Leaf JUMBF content box variants (C3): CBOR, JSON, embedded file
//! description/content, C2PA salt, generic UUID, codestream, and a
//! bytes-preserving fallback for anything unrecognized.

use ciborium::value::Value as CborValue;
use serde_json::Value as JsonValue;

use crate::binary;
use crate::error::{Error, Result};
use crate::jumbf::box_type::{self, BoxType};

/// A CBOR content box. The outermost value may carry a CBOR tag (e.g. for
/// COSE_Sign1, tag 18); both the tag and the raw encoded bytes are
/// preserved so re-serialization is byte-identical.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CborBox {
    pub tag: Option<u64>,
    pub raw: Vec<u8>,
}

impl CborBox {
    pub fn from_value(value: &CborValue) -> Result<Self> {
        let (tag, inner) = match value {
            CborValue::Tag(t, inner) => (Some(*t), inner.as_ref().clone()),
            other => (None, other.clone()),
        };
        let mut raw = Vec::new();
        ciborium::ser::into_writer(&inner, &mut raw)?;
        Ok(Self { tag, raw })
    }

    pub fn value(&self) -> Result<CborValue> {
        let inner: CborValue = ciborium::de::from_reader(self.raw.as_slice())?;
        Ok(match self.tag {
            Some(t) => CborValue::Tag(t, Box::new(inner)),
            None => inner,
        })
    }

    pub fn parse(content: &[u8]) -> Result<Self> {
        let value: CborValue = ciborium::de::from_reader(content)?;
        match value {
            CborValue::Tag(t, inner) => {
                let mut raw = Vec::new();
                ciborium::ser::into_writer(inner.as_ref(), &mut raw)?;
                Ok(Self { tag: Some(t), raw })
            }
            _ => Ok(Self {
                tag: None,
                raw: content.to_vec(),
            }),
        }
    }

    pub fn write_content(&self) -> Result<Vec<u8>> {
        match self.tag {
            None => Ok(self.raw.clone()),
            Some(t) => {
                let inner: CborValue = ciborium::de::from_reader(self.raw.as_slice())?;
                let mut out = Vec::new();
                ciborium::ser::into_writer(&CborValue::Tag(t, Box::new(inner)), &mut out)?;
                Ok(out)
            }
        }
    }
}

/// A JSON content box.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonBox {
    pub raw: Vec<u8>,
}

impl JsonBox {
    pub fn from_value(value: &JsonValue) -> Result<Self> {
        Ok(Self {
            raw: serde_json::to_vec(value)?,
        })
    }

    pub fn value(&self) -> Result<JsonValue> {
        Ok(serde_json::from_slice(&self.raw)?)
    }

    pub fn parse(content: &[u8]) -> Result<Self> {
        // Validate it's well-formed JSON without discarding original bytes.
        let _: JsonValue = serde_json::from_slice(content)?;
        Ok(Self {
            raw: content.to_vec(),
        })
    }
}

/// Embedded file description box (`bfdb`): MIME type and optional file
/// name for a sibling embedded file content box (`bidb`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedFileDescriptionBox {
    pub media_type: String,
    pub file_name: Option<String>,
}

impl EmbeddedFileDescriptionBox {
    const HAS_FILE_NAME: u8 = 0x01;

    pub fn parse(content: &[u8]) -> Result<Self> {
        if content.is_empty() {
            return Err(Error::MalformedContent(
                "empty embedded file description box".into(),
            ));
        }
        let toggle = content[0];
        let (media_type, rest) = binary::split_null_terminated(&content[1..])?;
        let file_name = if toggle & Self::HAS_FILE_NAME != 0 {
            let (name, _) = binary::split_null_terminated(rest)?;
            Some(name)
        } else {
            None
        };
        Ok(Self {
            media_type,
            file_name,
        })
    }

    pub fn write_content(&self) -> Vec<u8> {
        let mut out = Vec::new();
        let toggle = if self.file_name.is_some() {
            Self::HAS_FILE_NAME
        } else {
            0
        };
        out.push(toggle);
        out.extend_from_slice(self.media_type.as_bytes());
        out.push(0);
        if let Some(name) = &self.file_name {
            out.extend_from_slice(name.as_bytes());
            out.push(0);
        }
        out
    }
}

/// Embedded file content box (`bidb`): the raw bytes of the embedded file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedFileContentBox {
    pub data: Vec<u8>,
}

/// C2PA salt box: random padding bytes used to defeat known-plaintext
/// attacks on assertion hashes, carried as a generic `uuid` content box
/// with [`box_type::C2PA_SALT_BOX_UUID`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct C2paSaltBox {
    pub salt: Vec<u8>,
}

/// A generic `uuid` content box not recognized as a C2PA salt box.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UuidBox {
    pub uuid: [u8; 16],
    pub data: Vec<u8>,
}

impl UuidBox {
    pub fn parse(content: &[u8]) -> Result<Self> {
        if content.len() < 16 {
            return Err(Error::MalformedContent("uuid box shorter than 16 bytes".into()));
        }
        let mut uuid = [0u8; 16];
        uuid.copy_from_slice(&content[..16]);
        Ok(Self {
            uuid,
            data: content[16..].to_vec(),
        })
    }
}

/// A codestream content box (`jp2c`): raw, uninterpreted bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodestreamBox {
    pub data: Vec<u8>,
}

/// Fallback box preserving the raw type tag and content of any box type
/// not otherwise recognized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownBox {
    pub box_type: BoxType,
    pub data: Vec<u8>,
}

/// Decode a `uuid` content box into either a [`C2paSaltBox`] or a plain
/// [`UuidBox`], based on the UUID in its first 16 bytes.
pub fn parse_uuid_content(content: &[u8]) -> Result<UuidContent> {
    if content.len() >= 16 && content[..16] == box_type::C2PA_SALT_BOX_UUID {
        Ok(UuidContent::Salt(C2paSaltBox {
            salt: content[16..].to_vec(),
        }))
    } else {
        Ok(UuidContent::Uuid(UuidBox::parse(content)?))
    }
}

pub enum UuidContent {
    Salt(C2paSaltBox),
    Uuid(UuidBox),
}
