//! TIFF asset handling (spec.md §4.2): read-only. The manifest, when
//! present, lives in IFD tag `0xCD41` (52545) of type `UNDEFINED`,
//! holding the raw big-endian JUMBF bytes directly as the tag's value.
//! This crate never writes a TIFF manifest tag — embedding C2PA into
//! TIFF is out of scope, matching the Open Question spec.md leaves for
//! this format.

use byteorder::{BigEndian, ByteOrder, LittleEndian};

use super::{AssetHandler, ByteRange};
use crate::error::{Error, Result};

const MANIFEST_TAG: u16 = 0xCD41;
const TYPE_UNDEFINED: u16 = 7;

#[derive(Clone, Copy)]
enum Endian {
    Big,
    Little,
}

impl Endian {
    fn u16(self, b: &[u8]) -> u16 {
        match self {
            Endian::Big => BigEndian::read_u16(b),
            Endian::Little => LittleEndian::read_u16(b),
        }
    }
    fn u32(self, b: &[u8]) -> u32 {
        match self {
            Endian::Big => BigEndian::read_u32(b),
            Endian::Little => LittleEndian::read_u32(b),
        }
    }
}

pub struct TiffAsset {
    data: Vec<u8>,
}

fn detect_endian(header: &[u8]) -> Result<Endian> {
    match &header[..2] {
        b"II" => Ok(Endian::Little),
        b"MM" => Ok(Endian::Big),
        _ => Err(Error::MalformedContent("not a TIFF (bad byte-order mark)".into())),
    }
}

/// Each IFD entry: tag(2) type(2) count(4) value_or_offset(4).
const IFD_ENTRY_LEN: usize = 12;

fn find_manifest_tag(data: &[u8], endian: Endian) -> Result<Option<(u16, u32, u32)>> {
    if data.len() < 8 {
        return Err(Error::MalformedContent("TIFF header truncated".into()));
    }
    let magic = endian.u16(&data[2..4]);
    if magic != 42 {
        return Err(Error::MalformedContent("TIFF magic number mismatch".into()));
    }
    let mut ifd_offset = endian.u32(&data[4..8]) as usize;

    while ifd_offset != 0 {
        if ifd_offset + 2 > data.len() {
            return Err(Error::MalformedContent("TIFF IFD offset out of bounds".into()));
        }
        let entry_count = endian.u16(&data[ifd_offset..ifd_offset + 2]) as usize;
        let entries_start = ifd_offset + 2;
        let entries_end = entries_start + entry_count * IFD_ENTRY_LEN;
        if entries_end + 4 > data.len() {
            return Err(Error::MalformedContent("TIFF IFD entries out of bounds".into()));
        }

        for i in 0..entry_count {
            let entry = &data[entries_start + i * IFD_ENTRY_LEN..entries_start + (i + 1) * IFD_ENTRY_LEN];
            let tag = endian.u16(&entry[0..2]);
            if tag == MANIFEST_TAG {
                let field_type = endian.u16(&entry[2..4]);
                let count = endian.u32(&entry[4..8]);
                let value_offset = endian.u32(&entry[8..12]);
                return Ok(Some((field_type, count, value_offset)));
            }
        }

        ifd_offset = endian.u32(&data[entries_end..entries_end + 4]) as usize;
    }

    Ok(None)
}

impl AssetHandler for TiffAsset {
    fn can_read(header: &[u8]) -> bool {
        header.len() >= 4 && (&header[..2] == b"II" || &header[..2] == b"MM") && {
            let endian = if &header[..2] == b"II" { Endian::Little } else { Endian::Big };
            endian.u16(&header[2..4]) == 42
        }
    }

    fn parse(data: Vec<u8>) -> Result<Self> {
        let endian = detect_endian(&data)?;
        find_manifest_tag(&data, endian)?;
        Ok(Self { data })
    }

    fn bytes(&self) -> &[u8] {
        &self.data
    }

    fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    fn get_manifest_jumbf(&self) -> Result<Option<Vec<u8>>> {
        let endian = detect_endian(&self.data)?;
        let Some((field_type, count, value_offset)) = find_manifest_tag(&self.data, endian)? else {
            return Ok(None);
        };
        if field_type != TYPE_UNDEFINED {
            return Err(Error::MalformedContent("TIFF manifest tag has unexpected type".into()));
        }
        let count = count as usize;
        let start = value_offset as usize;
        let end = start + count;
        self.data
            .get(start..end)
            .map(|s| s.to_vec())
            .map(Some)
            .ok_or_else(|| Error::MalformedContent("TIFF manifest tag value out of bounds".into()))
    }

    fn ensure_manifest_space(&mut self, _size: usize) -> Result<()> {
        Err(Error::UnsupportedFormat)
    }

    fn get_hash_exclusion_range(&self) -> Result<Option<ByteRange>> {
        Ok(None)
    }

    fn write_manifest_jumbf(&mut self, _jumbf: &[u8]) -> Result<()> {
        Err(Error::UnsupportedFormat)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_tiff_with_manifest(jumbf: &[u8]) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(b"MM");
        data.extend_from_slice(&42u16.to_be_bytes());
        data.extend_from_slice(&8u32.to_be_bytes()); // IFD offset

        let value_offset = 8 + 2 + 1 * IFD_ENTRY_LEN as u32 + 4;
        data.extend_from_slice(&1u16.to_be_bytes()); // entry count
        data.extend_from_slice(&MANIFEST_TAG.to_be_bytes());
        data.extend_from_slice(&TYPE_UNDEFINED.to_be_bytes());
        data.extend_from_slice(&(jumbf.len() as u32).to_be_bytes());
        data.extend_from_slice(&value_offset.to_be_bytes());
        data.extend_from_slice(&0u32.to_be_bytes()); // next IFD offset
        data.extend_from_slice(jumbf);
        data
    }

    #[test]
    fn can_read_big_and_little_endian() {
        assert!(TiffAsset::can_read(&build_tiff_with_manifest(b"x")[..8]));
        let mut le = build_tiff_with_manifest(b"x");
        le[0] = b'I';
        le[1] = b'I';
        // magic bytes must flip too for a genuine little-endian header
        le[2] = 42;
        le[3] = 0;
        assert!(TiffAsset::can_read(&le[..8]));
    }

    #[test]
    fn reads_manifest_tag() {
        let jumbf = b"tiff embedded jumbf bytes";
        let asset = TiffAsset::parse(build_tiff_with_manifest(jumbf)).unwrap();
        assert_eq!(asset.get_manifest_jumbf().unwrap().unwrap(), jumbf);
    }

    #[test]
    fn no_manifest_tag_is_none() {
        let mut data = Vec::new();
        data.extend_from_slice(b"MM");
        data.extend_from_slice(&42u16.to_be_bytes());
        data.extend_from_slice(&8u32.to_be_bytes());
        data.extend_from_slice(&0u16.to_be_bytes()); // zero entries
        data.extend_from_slice(&0u32.to_be_bytes());
        let asset = TiffAsset::parse(data).unwrap();
        assert!(asset.get_manifest_jumbf().unwrap().is_none());
    }

    #[test]
    fn writing_is_unsupported() {
        let mut asset = TiffAsset::parse(build_tiff_with_manifest(b"x")).unwrap();
        assert!(matches!(asset.ensure_manifest_space(10), Err(Error::UnsupportedFormat)));
    }
}
