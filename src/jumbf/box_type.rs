//! JUMBF box type tags (C3).
//!
//! A box type is a 4-byte big-endian value, conventionally written and
//! compared as an ASCII string (`b"jumb"`). Kept as a distinct newtype
//! (rather than a bare `[u8; 4]`) so `Debug` renders the ASCII form when
//! printable, matching how the teacher's `Container`/`MediaType` enums
//! render themselves for diagnostics.

use std::fmt;

#[derive(Clone, Copy, Eq, PartialEq, Hash)]
pub struct BoxType(pub [u8; 4]);

impl BoxType {
    pub const fn new(tag: &[u8; 4]) -> Self {
        Self(*tag)
    }

    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.0).ok()
    }
}

impl From<[u8; 4]> for BoxType {
    fn from(tag: [u8; 4]) -> Self {
        Self(tag)
    }
}

impl fmt::Debug for BoxType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_str() {
            Some(s) if s.chars().all(|c| c.is_ascii_graphic() || c == ' ') => {
                write!(f, "BoxType({s:?})")
            }
            _ => write!(f, "BoxType({:02x?})", self.0),
        }
    }
}

impl fmt::Display for BoxType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_str() {
            Some(s) => write!(f, "{s}"),
            None => write!(f, "{:02x?}", self.0),
        }
    }
}

/// JUMBF superbox.
pub const SUPER_BOX: BoxType = BoxType(*b"jumb");

/// JUMBF description box.
pub const DESCRIPTION_BOX: BoxType = BoxType(*b"jumd");

/// CBOR content box.
pub const CBOR_BOX: BoxType = BoxType(*b"cbor");

/// JSON content box.
pub const JSON_BOX: BoxType = BoxType(*b"json");

/// Embedded file description box (carries a MIME type and optional name).
pub const EMBEDDED_FILE_DESCRIPTION_BOX: BoxType = BoxType(*b"bfdb");

/// Embedded file content box (carries the raw file bytes).
pub const EMBEDDED_FILE_CONTENT_BOX: BoxType = BoxType(*b"bidb");

/// Generic UUID content box. Disambiguated by the UUID in its first 16
/// bytes: the C2PA salt box uses a well-known UUID and is promoted to
/// [`crate::jumbf::data_box::C2paSaltBox`] by the reader.
pub const UUID_BOX: BoxType = BoxType(*b"uuid");

/// Codestream content box (e.g. a raw JPEG 2000 codestream).
pub const CODESTREAM_BOX: BoxType = BoxType(*b"jp2c");

/// UUID identifying a C2PA salt box's content when carried in a
/// [`UUID_BOX`] (JUMBF generic "uuid" content box).
pub const C2PA_SALT_BOX_UUID: [u8; 16] = [
    0x3c, 0xd3, 0xbc, 0xfb, 0x26, 0xea, 0x47, 0x74, 0xae, 0xaf, 0x50, 0x0c, 0x01, 0x68, 0xba, 0xe9,
];

/// C2PA manifest store UUID (ASCII "c2cs" in the first 4 bytes).
pub const MANIFEST_STORE_UUID: [u8; 16] = [
    0x63, 0x32, 0x63, 0x73, 0x00, 0x11, 0x00, 0x10, 0x80, 0x00, 0x00, 0xaa, 0x00, 0x38, 0x9b, 0x71,
];

/// C2PA manifest (a single manifest within the store) UUID.
pub const MANIFEST_UUID: [u8; 16] = [
    0x63, 0x32, 0x70, 0x61, 0x00, 0x11, 0x00, 0x10, 0x80, 0x00, 0x00, 0xaa, 0x00, 0x38, 0x9b, 0x71,
];

/// C2PA assertion store UUID.
pub const ASSERTION_STORE_UUID: [u8; 16] = [
    0x63, 0x32, 0x61, 0x73, 0x00, 0x11, 0x00, 0x10, 0x80, 0x00, 0x00, 0xaa, 0x00, 0x38, 0x9b, 0x71,
];

/// C2PA BMFF user-type UUID for the top-level C2PA box embedded in BMFF
/// assets (HEIC/MP4/MOV).
pub const BMFF_C2PA_USER_TYPE_UUID: [u8; 16] = [
    0xd8, 0xfe, 0xc3, 0xd6, 0x1b, 0x0e, 0x48, 0x3c, 0x92, 0x97, 0x58, 0x28, 0x87, 0x7e, 0xc4, 0x81,
];

/// C2PA signature UUID, identifying the `uuid` content box (directly under
/// a manifest superbox) that carries the tagged COSE_Sign1 bytes.
pub const SIGNATURE_UUID: [u8; 16] = [
    0x63, 0x32, 0x73, 0x67, 0x00, 0x11, 0x00, 0x10, 0x80, 0x00, 0x00, 0xaa, 0x00, 0x38, 0x9b, 0x71,
];

/// Content-type UUID for an assertion superbox whose payload is a single
/// CBOR content box — the ASCII content-box tag (`cbor`) plus the same
/// fixed suffix every JUMBF content-type UUID in this module shares. This
/// is the assertion's own description box UUID, distinct from (and
/// unrelated to) [`ASSERTION_STORE_UUID`], which only identifies the
/// assertion *store* superbox that contains every assertion.
pub const CBOR_ASSERTION_UUID: [u8; 16] = [
    0x63, 0x62, 0x6f, 0x72, 0x00, 0x11, 0x00, 0x10, 0x80, 0x00, 0x00, 0xaa, 0x00, 0x38, 0x9b, 0x71,
];

/// Content-type UUID for an assertion superbox whose payload is a single
/// JSON content box.
pub const JSON_ASSERTION_UUID: [u8; 16] = [
    0x6a, 0x73, 0x6f, 0x6e, 0x00, 0x11, 0x00, 0x10, 0x80, 0x00, 0x00, 0xaa, 0x00, 0x38, 0x9b, 0x71,
];

/// Content-type UUID for an assertion superbox whose payload is an
/// embedded-file description/content box pair (thumbnails).
pub const EMBEDDED_FILE_ASSERTION_UUID: [u8; 16] = [
    0x62, 0x66, 0x64, 0x62, 0x00, 0x11, 0x00, 0x10, 0x80, 0x00, 0x00, 0xaa, 0x00, 0x38, 0x9b, 0x71,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manifest_store_uuid_starts_with_c2cs() {
        assert_eq!(&MANIFEST_STORE_UUID[..4], b"c2cs");
    }

    #[test]
    fn assertion_store_uuid_starts_with_c2as() {
        assert_eq!(&ASSERTION_STORE_UUID[..4], b"c2as");
    }

    #[test]
    fn box_type_debug_renders_ascii() {
        assert_eq!(format!("{:?}", SUPER_BOX), "BoxType(\"jumb\")");
    }
}
