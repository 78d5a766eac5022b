//! Fixed/variable-width integer and string reads shared by the JUMBF codec
//! and the asset handlers (C1).
//!
//! Kept free of any box- or container-specific knowledge so it can be used
//! from `jumbf::reader`, `assets::jpeg`, `assets::png`, and `assets::bmff`
//! alike.

use byteorder::{BigEndian, ReadBytesExt};
use std::io::{self, Read};

use crate::error::{Error, Result};

/// Read a big-endian `u32` length-prefix.
pub fn read_u32_be<R: Read>(r: &mut R) -> Result<u32> {
    Ok(r.read_u32::<BigEndian>()?)
}

/// Read a big-endian `u16`.
pub fn read_u16_be<R: Read>(r: &mut R) -> Result<u16> {
    Ok(r.read_u16::<BigEndian>()?)
}

/// Read a big-endian `u64`.
pub fn read_u64_be<R: Read>(r: &mut R) -> Result<u64> {
    Ok(r.read_u64::<BigEndian>()?)
}

/// Read a 4-byte ASCII box/chunk type tag.
pub fn read_tag<R: Read>(r: &mut R) -> Result<[u8; 4]> {
    let mut tag = [0u8; 4];
    r.read_exact(&mut tag)?;
    Ok(tag)
}

/// Read a null-terminated UTF-8 string from the front of `bytes`, returning
/// the string and the remaining slice after the terminator.
pub fn split_null_terminated(bytes: &[u8]) -> Result<(String, &[u8])> {
    let nul = bytes
        .iter()
        .position(|&b| b == 0)
        .ok_or_else(|| Error::MalformedContent("expected null-terminated string".into()))?;
    let s = std::str::from_utf8(&bytes[..nul])
        .map_err(|e| Error::MalformedContent(format!("invalid UTF-8 in label: {e}")))?;
    Ok((s.to_owned(), &bytes[nul + 1..]))
}

/// Decode an ID3v2 synchsafe integer: 4 bytes, each contributing 7 bits,
/// high bit of each byte always clear.
pub fn read_synchsafe_u32(bytes: [u8; 4]) -> u32 {
    ((bytes[0] as u32) << 21)
        | ((bytes[1] as u32) << 14)
        | ((bytes[2] as u32) << 7)
        | (bytes[3] as u32)
}

/// Encode a `u32` (must be < 2^28) as an ID3v2 synchsafe integer.
pub fn write_synchsafe_u32(value: u32) -> [u8; 4] {
    [
        ((value >> 21) & 0x7F) as u8,
        ((value >> 14) & 0x7F) as u8,
        ((value >> 7) & 0x7F) as u8,
        (value & 0x7F) as u8,
    ]
}

/// Read a variable-width big-endian unsigned integer of 0, 4, or 8 bytes,
/// as used by BMFF `iloc` offset/length/base-offset fields.
pub fn read_variable_uint<R: Read>(r: &mut R, size: u8) -> Result<u64> {
    match size {
        0 => Ok(0),
        4 => Ok(read_u32_be(r)? as u64),
        8 => read_u64_be(r),
        other => Err(Error::MalformedContent(format!(
            "unsupported variable integer width: {other}"
        ))),
    }
}

/// Write a variable-width big-endian unsigned integer of 0, 4, or 8 bytes.
pub fn write_variable_uint<W: io::Write>(w: &mut W, size: u8, value: u64) -> Result<()> {
    use byteorder::WriteBytesExt;
    match size {
        0 => Ok(()),
        4 => {
            w.write_u32::<BigEndian>(value as u32)?;
            Ok(())
        }
        8 => {
            w.write_u64::<BigEndian>(value)?;
            Ok(())
        }
        other => Err(Error::MalformedContent(format!(
            "unsupported variable integer width: {other}"
        ))),
    }
}

/// Byte-equality helper used throughout the box readers for magic/tag checks.
pub fn bytes_eq(a: &[u8], b: &[u8]) -> bool {
    a == b
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synchsafe_round_trip() {
        for v in [0u32, 1, 127, 128, 16384, 0x0FFF_FFFF] {
            let encoded = write_synchsafe_u32(v);
            assert_eq!(read_synchsafe_u32(encoded), v);
        }
    }

    #[test]
    fn split_null_terminated_finds_terminator() {
        let data = b"c2pa.claim\0trailing";
        let (label, rest) = split_null_terminated(data).unwrap();
        assert_eq!(label, "c2pa.claim");
        assert_eq!(rest, b"trailing");
    }

    #[test]
    fn split_null_terminated_requires_terminator() {
        let data = b"no terminator here";
        assert!(split_null_terminated(data).is_err());
    }

    #[test]
    fn variable_uint_round_trip() {
        let mut buf = Vec::new();
        write_variable_uint(&mut buf, 4, 0x1234_5678).unwrap();
        let mut cursor = &buf[..];
        assert_eq!(read_variable_uint(&mut cursor, 4).unwrap(), 0x1234_5678);

        let mut buf8 = Vec::new();
        write_variable_uint(&mut buf8, 8, 0x0102_0304_0506_0708).unwrap();
        let mut cursor8 = &buf8[..];
        assert_eq!(
            read_variable_uint(&mut cursor8, 8).unwrap(),
            0x0102_0304_0506_0708
        );
    }
}
