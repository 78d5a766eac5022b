//! The JUMBF superbox and the tagged union over all box kinds (C3).

use crate::jumbf::box_type::BoxType;
use crate::jumbf::data_box::{
    C2paSaltBox, CborBox, CodestreamBox, EmbeddedFileContentBox, EmbeddedFileDescriptionBox,
    JsonBox, UnknownBox, UuidBox,
};
use crate::jumbf::description_box::DescriptionBox;

/// A parsed JUMBF box. `SuperBox` is the only recursive variant; everything
/// else is a leaf whose raw bytes were captured by [`crate::jumbf::reader`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JumbfBox {
    Super(SuperBox),
    Cbor(CborBox),
    Json(JsonBox),
    Salt(C2paSaltBox),
    EmbeddedFile(EmbeddedFileContentBox),
    EmbeddedFileDescription(EmbeddedFileDescriptionBox),
    Codestream(CodestreamBox),
    Uuid(UuidBox),
    Unknown(UnknownBox),
}

impl JumbfBox {
    /// The box's 4-byte type tag.
    pub fn box_type(&self) -> BoxType {
        match self {
            JumbfBox::Super(_) => crate::jumbf::box_type::SUPER_BOX,
            JumbfBox::Cbor(_) => crate::jumbf::box_type::CBOR_BOX,
            JumbfBox::Json(_) => crate::jumbf::box_type::JSON_BOX,
            JumbfBox::Salt(_) => crate::jumbf::box_type::UUID_BOX,
            JumbfBox::EmbeddedFile(_) => crate::jumbf::box_type::EMBEDDED_FILE_CONTENT_BOX,
            JumbfBox::EmbeddedFileDescription(_) => {
                crate::jumbf::box_type::EMBEDDED_FILE_DESCRIPTION_BOX
            }
            JumbfBox::Codestream(_) => crate::jumbf::box_type::CODESTREAM_BOX,
            JumbfBox::Uuid(_) => crate::jumbf::box_type::UUID_BOX,
            JumbfBox::Unknown(u) => u.box_type,
        }
    }

    pub fn as_super(&self) -> Option<&SuperBox> {
        match self {
            JumbfBox::Super(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_super_mut(&mut self) -> Option<&mut SuperBox> {
        match self {
            JumbfBox::Super(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_cbor(&self) -> Option<&CborBox> {
        match self {
            JumbfBox::Cbor(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_json(&self) -> Option<&JsonBox> {
        match self {
            JumbfBox::Json(j) => Some(j),
            _ => None,
        }
    }
}

/// A JUMBF superbox: exactly one [`DescriptionBox`] followed by zero or
/// more content boxes. `uri` is assigned by [`crate::jumbf::uri`] after a
/// full tree has been parsed, so it starts empty on direct construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuperBox {
    pub description: DescriptionBox,
    pub children: Vec<JumbfBox>,
    pub uri: String,
}

impl SuperBox {
    pub fn new(description: DescriptionBox) -> Self {
        Self {
            description,
            children: Vec::new(),
            uri: String::new(),
        }
    }

    pub fn with_child(mut self, child: JumbfBox) -> Self {
        self.children.push(child);
        self
    }

    /// Find a direct child superbox by its description box's label.
    pub fn find_by_label(&self, label: &str) -> Option<&SuperBox> {
        self.children.iter().find_map(|c| match c {
            JumbfBox::Super(s) if s.description.label.as_deref() == Some(label) => Some(s),
            _ => None,
        })
    }

    pub fn find_by_label_mut(&mut self, label: &str) -> Option<&mut SuperBox> {
        self.children.iter_mut().find_map(|c| match c {
            JumbfBox::Super(s) if s.description.label.as_deref() == Some(label) => Some(s),
            _ => None,
        })
    }

    /// All direct child superboxes whose description box UUID matches.
    pub fn children_with_uuid<'a>(&'a self, uuid: &'a [u8; 16]) -> impl Iterator<Item = &'a SuperBox> {
        self.children.iter().filter_map(move |c| match c {
            JumbfBox::Super(s) if &s.description.uuid == uuid => Some(s),
            _ => None,
        })
    }
}
