//! JUMBF box writing (C3): `serialize(Box) -> bytes` and `measure(Box) -> len`.
//!
//! Every box is written with its full `length` recorded explicitly (the
//! `length == 0` "extends to container end" form is a reader convenience
//! only; this writer never emits it, so output is always self-describing
//! even when embedded inside another container).

use crate::error::Result;
use crate::jumbf::box_type::BoxType;
use crate::jumbf::super_box::{JumbfBox, SuperBox};

const HEADER_LEN: usize = 8;

/// Serialize a box (and, if it is a superbox, all of its descendants) to
/// its full JUMBF byte representation, including the 8-byte header.
pub fn serialize(jumbf_box: &JumbfBox) -> Result<Vec<u8>> {
    let content = content_bytes(jumbf_box)?;
    Ok(wrap(jumbf_box.box_type(), &content))
}

/// The total serialized length of `jumbf_box`, including its header and
/// (recursively) all descendants. Equivalent to `serialize(b).len()` but
/// avoids building the byte buffer when only the size is needed, e.g. to
/// size-check a reserved space before a box's final content is known.
pub fn measure(jumbf_box: &JumbfBox) -> Result<usize> {
    Ok(HEADER_LEN + content_len(jumbf_box)?)
}

fn wrap(box_type: BoxType, content: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_LEN + content.len());
    out.extend_from_slice(&((content.len() + HEADER_LEN) as u32).to_be_bytes());
    out.extend_from_slice(&box_type.0);
    out.extend_from_slice(content);
    out
}

fn content_bytes(jumbf_box: &JumbfBox) -> Result<Vec<u8>> {
    match jumbf_box {
        JumbfBox::Super(s) => serialize_super_content(s),
        JumbfBox::Cbor(c) => c.write_content(),
        JumbfBox::Json(j) => Ok(j.raw.clone()),
        JumbfBox::Salt(s) => {
            let mut out = crate::jumbf::box_type::C2PA_SALT_BOX_UUID.to_vec();
            out.extend_from_slice(&s.salt);
            Ok(out)
        }
        JumbfBox::EmbeddedFile(e) => Ok(e.data.clone()),
        JumbfBox::EmbeddedFileDescription(e) => Ok(e.write_content()),
        JumbfBox::Codestream(c) => Ok(c.data.clone()),
        JumbfBox::Uuid(u) => {
            let mut out = u.uuid.to_vec();
            out.extend_from_slice(&u.data);
            Ok(out)
        }
        JumbfBox::Unknown(u) => Ok(u.data.clone()),
    }
}

fn content_len(jumbf_box: &JumbfBox) -> Result<usize> {
    Ok(match jumbf_box {
        JumbfBox::Super(s) => super_content_len(s)?,
        JumbfBox::Cbor(c) => c.write_content()?.len(),
        JumbfBox::Json(j) => j.raw.len(),
        JumbfBox::Salt(s) => 16 + s.salt.len(),
        JumbfBox::EmbeddedFile(e) => e.data.len(),
        JumbfBox::EmbeddedFileDescription(e) => e.write_content().len(),
        JumbfBox::Codestream(c) => c.data.len(),
        JumbfBox::Uuid(u) => 16 + u.data.len(),
        JumbfBox::Unknown(u) => u.data.len(),
    })
}

fn serialize_super_content(s: &SuperBox) -> Result<Vec<u8>> {
    let mut desc_content = Vec::new();
    s.description.write_content(&mut desc_content)?;
    let mut out = wrap(crate::jumbf::box_type::DESCRIPTION_BOX, &desc_content);
    for child in &s.children {
        out.extend_from_slice(&serialize(child)?);
    }
    Ok(out)
}

fn super_content_len(s: &SuperBox) -> Result<usize> {
    let mut total = HEADER_LEN + s.description.content_len();
    for child in &s.children {
        total += measure(child)?;
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jumbf::box_type;
    use crate::jumbf::data_box::{CborBox, JsonBox};
    use crate::jumbf::description_box::DescriptionBox;

    #[test]
    fn measure_matches_serialized_length() {
        let cbor = CborBox::from_value(&ciborium::value::Value::Integer(7.into())).unwrap();
        let json = JsonBox::from_value(&serde_json::json!({"a": 1})).unwrap();

        let desc = DescriptionBox::new(box_type::MANIFEST_UUID).with_label("c2pa.claim");
        let sbox = SuperBox::new(desc)
            .with_child(JumbfBox::Cbor(cbor))
            .with_child(JumbfBox::Json(json));

        let boxed = JumbfBox::Super(sbox);
        let bytes = serialize(&boxed).unwrap();
        assert_eq!(bytes.len(), measure(&boxed).unwrap());
    }

    #[test]
    fn round_trips_through_reader() {
        let desc = DescriptionBox::new(box_type::ASSERTION_STORE_UUID).with_label("c2pa.assertions");
        let sbox = SuperBox::new(desc).with_child(JumbfBox::Unknown(
            crate::jumbf::data_box::UnknownBox {
                box_type: BoxType::new(b"test"),
                data: vec![1, 2, 3, 4],
            },
        ));
        let bytes = serialize(&JumbfBox::Super(sbox.clone())).unwrap();
        let parsed = crate::jumbf::reader::parse(&bytes).unwrap();
        assert_eq!(parsed, sbox);
    }
}
