//! JUMBF box reading (C3): `parse(bytes) -> Box tree`.
//!
//! Reading walks boxes greedily. A box header is 4-byte big-endian
//! `length` (inclusive of the header) followed by a 4-byte ASCII `type`.
//! `length` of 0 means "extends to the end of the enclosing container";
//! `length` in `1..=7` is too small to hold even the header and is
//! malformed. The 1-plus-8-byte extended length form from the base JUMBF
//! spec is not used by C2PA and is rejected here.

use crate::binary;
use crate::error::{Error, Result};
use crate::jumbf::box_type::{self, BoxType};
use crate::jumbf::data_box::{
    self, CborBox, CodestreamBox, EmbeddedFileContentBox, EmbeddedFileDescriptionBox, JsonBox,
    UnknownBox,
};
use crate::jumbf::description_box::DescriptionBox;
use crate::jumbf::super_box::{JumbfBox, SuperBox};

const HEADER_LEN: usize = 8;

struct BoxHeader {
    box_type: BoxType,
    /// Length of this box's content, not including the 8-byte header.
    content_len: usize,
}

/// Read one box header from the front of `bytes` and determine its content
/// length, resolving a `length == 0` "extends to container end" marker
/// against the number of bytes actually available.
fn read_header(bytes: &[u8]) -> Result<BoxHeader> {
    if bytes.len() < HEADER_LEN {
        return Err(Error::MalformedContent(
            "truncated box header (need at least 8 bytes)".into(),
        ));
    }
    let declared_len = binary::read_u32_be(&mut &bytes[0..4])? as usize;
    let mut tag = [0u8; 4];
    tag.copy_from_slice(&bytes[4..8]);
    let box_type = BoxType(tag);

    let content_len = match declared_len {
        0 => bytes.len() - HEADER_LEN,
        1..=7 => {
            return Err(Error::MalformedContent(format!(
                "box length {declared_len} is smaller than the header itself"
            )))
        }
        n => {
            if n < HEADER_LEN {
                return Err(Error::MalformedContent(format!(
                    "box length {n} smaller than header"
                )));
            }
            let content_len = n - HEADER_LEN;
            if bytes.len() < n {
                return Err(Error::MalformedContent(format!(
                    "box declares length {n} but only {} bytes available",
                    bytes.len()
                )));
            }
            content_len
        }
    };

    Ok(BoxHeader {
        box_type,
        content_len,
    })
}

/// Parse a single box from the front of `bytes`, returning the box and the
/// unconsumed remainder.
pub fn parse_one(bytes: &[u8]) -> Result<(JumbfBox, &[u8])> {
    let header = read_header(bytes)?;
    let content = &bytes[HEADER_LEN..HEADER_LEN + header.content_len];
    let remainder = &bytes[HEADER_LEN + header.content_len..];

    let parsed = parse_content(header.box_type, content)?;
    Ok((parsed, remainder))
}

fn parse_content(box_type: BoxType, content: &[u8]) -> Result<JumbfBox> {
    if box_type == box_type::SUPER_BOX {
        Ok(JumbfBox::Super(parse_super_box_content(content)?))
    } else if box_type == box_type::CBOR_BOX {
        Ok(JumbfBox::Cbor(CborBox::parse(content)?))
    } else if box_type == box_type::JSON_BOX {
        Ok(JumbfBox::Json(JsonBox::parse(content)?))
    } else if box_type == box_type::EMBEDDED_FILE_DESCRIPTION_BOX {
        Ok(JumbfBox::EmbeddedFileDescription(
            EmbeddedFileDescriptionBox::parse(content)?,
        ))
    } else if box_type == box_type::EMBEDDED_FILE_CONTENT_BOX {
        Ok(JumbfBox::EmbeddedFile(EmbeddedFileContentBox {
            data: content.to_vec(),
        }))
    } else if box_type == box_type::CODESTREAM_BOX {
        Ok(JumbfBox::Codestream(CodestreamBox {
            data: content.to_vec(),
        }))
    } else if box_type == box_type::UUID_BOX {
        Ok(match data_box::parse_uuid_content(content)? {
            data_box::UuidContent::Salt(s) => JumbfBox::Salt(s),
            data_box::UuidContent::Uuid(u) => JumbfBox::Uuid(u),
        })
    } else {
        Ok(JumbfBox::Unknown(UnknownBox {
            box_type,
            data: content.to_vec(),
        }))
    }
}

/// Parse a superbox's content: the first child must be a description box,
/// the rest are content boxes, each read recursively.
fn parse_super_box_content(content: &[u8]) -> Result<SuperBox> {
    let header = read_header(content)?;
    if header.box_type != box_type::DESCRIPTION_BOX {
        return Err(Error::MalformedContent(format!(
            "superbox's first child must be a description box, found {}",
            header.box_type
        )));
    }
    let desc_content = &content[HEADER_LEN..HEADER_LEN + header.content_len];
    let description = DescriptionBox::parse(desc_content)?;
    let mut rest = &content[HEADER_LEN + header.content_len..];

    let mut children = Vec::new();
    while !rest.is_empty() {
        let (child, remainder) = parse_one(rest)?;
        children.push(child);
        rest = remainder;
    }

    Ok(SuperBox {
        description,
        children,
        uri: String::new(),
    })
}

/// Parse a complete JUMBF byte sequence expected to contain a single
/// top-level superbox (the usual shape: a manifest store or an individual
/// box extracted by an asset handler).
#[tracing::instrument(level = "debug", skip(bytes), fields(len = bytes.len()))]
pub fn parse(bytes: &[u8]) -> Result<SuperBox> {
    let (boxed, remainder) = parse_one(bytes)?;
    if !remainder.is_empty() {
        return Err(Error::MalformedContent(format!(
            "{} trailing bytes after top-level box",
            remainder.len()
        )));
    }
    match boxed {
        JumbfBox::Super(s) => {
            tracing::debug!(box_type = %s.box_type(), children = s.children.len(), "parsed top-level jumbf box");
            Ok(s)
        }
        other => Err(Error::MalformedContent(format!(
            "expected a top-level superbox, found {}",
            other.box_type()
        ))),
    }
}
