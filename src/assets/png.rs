//! PNG asset handling (spec.md §4.2): the manifest lives in a single
//! ancillary, private, safe-to-copy chunk of type `caBX`, inserted
//! immediately before the first `IDAT` chunk (or just before `IEND` if
//! the stream somehow has none). The chunk carries the raw JUMBF bytes
//! directly as its data; PNG's own CRC-32/IEEE trailer is recomputed
//! over the chunk's type plus data on every write.

use byteorder::{BigEndian, ByteOrder};

use super::{AssetHandler, ByteRange};
use crate::error::{Error, Result};

const SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1a, b'\n'];
const C2PA_CHUNK: [u8; 4] = *b"caBX";
const IDAT: [u8; 4] = *b"IDAT";
const IEND: [u8; 4] = *b"IEND";

struct Reservation {
    insertion_point: usize,
    total_len: usize,
}

pub struct PngAsset {
    data: Vec<u8>,
    reservation: Option<Reservation>,
}

struct Chunk {
    /// Offset of the 4-byte length field that opens the chunk.
    offset: usize,
    kind: [u8; 4],
    data: std::ops::Range<usize>,
    /// Total on-disk size: 4 (len) + 4 (type) + data + 4 (crc).
    total_len: usize,
}

fn scan_chunks(data: &[u8]) -> Result<Vec<Chunk>> {
    if data.len() < SIGNATURE.len() || data[..SIGNATURE.len()] != SIGNATURE {
        return Err(Error::MalformedContent("not a PNG (bad signature)".into()));
    }
    let mut chunks = Vec::new();
    let mut pos = SIGNATURE.len();
    while pos + 8 <= data.len() {
        let len = BigEndian::read_u32(&data[pos..pos + 4]) as usize;
        let mut kind = [0u8; 4];
        kind.copy_from_slice(&data[pos + 4..pos + 8]);
        let data_start = pos + 8;
        let data_end = data_start + len;
        let crc_end = data_end + 4;
        if crc_end > data.len() {
            return Err(Error::MalformedContent("truncated PNG chunk".into()));
        }
        chunks.push(Chunk {
            offset: pos,
            kind,
            data: data_start..data_end,
            total_len: crc_end - pos,
        });
        pos = crc_end;
        if kind == IEND {
            break;
        }
    }
    Ok(chunks)
}

fn insertion_point(chunks: &[Chunk]) -> usize {
    chunks
        .iter()
        .find(|c| c.kind == IDAT || c.kind == IEND)
        .map(|c| c.offset)
        .unwrap_or(SIGNATURE.len())
}

fn build_chunk(jumbf: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(12 + jumbf.len());
    out.extend_from_slice(&(jumbf.len() as u32).to_be_bytes());
    out.extend_from_slice(&C2PA_CHUNK);
    out.extend_from_slice(jumbf);
    let crc = crc32_ieee(&out[4..]);
    out.extend_from_slice(&crc.to_be_bytes());
    out
}

/// CRC-32/IEEE, the polynomial PNG's own chunk trailers use.
fn crc32_ieee(data: &[u8]) -> u32 {
    let mut crc: u32 = 0xFFFF_FFFF;
    for &byte in data {
        crc ^= byte as u32;
        for _ in 0..8 {
            let mask = (crc & 1).wrapping_neg();
            crc = (crc >> 1) ^ (0xEDB8_8320 & mask);
        }
    }
    !crc
}

impl AssetHandler for PngAsset {
    fn can_read(header: &[u8]) -> bool {
        header.len() >= SIGNATURE.len() && header[..SIGNATURE.len()] == SIGNATURE
    }

    fn parse(data: Vec<u8>) -> Result<Self> {
        scan_chunks(&data)?;
        Ok(Self {
            data,
            reservation: None,
        })
    }

    fn bytes(&self) -> &[u8] {
        &self.data
    }

    fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    fn get_manifest_jumbf(&self) -> Result<Option<Vec<u8>>> {
        let chunks = scan_chunks(&self.data)?;
        let matches: Vec<&Chunk> = chunks.iter().filter(|c| c.kind == C2PA_CHUNK).collect();
        match matches.as_slice() {
            [] => Ok(None),
            [only] => Ok(Some(self.data[only.data.clone()].to_vec())),
            _ => Ok(None), // multiple caBX chunks: treat as missing, mirrors JPEG's multi-group rule
        }
    }

    fn ensure_manifest_space(&mut self, size: usize) -> Result<()> {
        let chunks = scan_chunks(&self.data)?;
        let mut cleaned = self.data.clone();
        let mut remove: Vec<(usize, usize)> = chunks
            .iter()
            .filter(|c| c.kind == C2PA_CHUNK)
            .map(|c| (c.offset, c.total_len))
            .collect();
        remove.sort_by_key(|(offset, _)| *offset);
        for (offset, len) in remove.into_iter().rev() {
            cleaned.drain(offset..offset + len);
        }

        let chunks = scan_chunks(&cleaned)?;
        let insertion_point = insertion_point(&chunks);
        let placeholder_chunk = build_chunk(&vec![0u8; size]);

        let mut new_data = cleaned[..insertion_point].to_vec();
        new_data.extend_from_slice(&placeholder_chunk);
        new_data.extend_from_slice(&cleaned[insertion_point..]);

        self.data = new_data;
        self.reservation = Some(Reservation {
            insertion_point,
            total_len: size,
        });
        Ok(())
    }

    fn get_hash_exclusion_range(&self) -> Result<Option<ByteRange>> {
        let Some(reservation) = &self.reservation else {
            return Ok(None);
        };
        Ok(Some(ByteRange::new(
            reservation.insertion_point as u64,
            (12 + reservation.total_len) as u64,
        )))
    }

    fn write_manifest_jumbf(&mut self, jumbf: &[u8]) -> Result<()> {
        let reservation = self
            .reservation
            .as_ref()
            .ok_or_else(|| Error::MalformedContent("write_manifest_jumbf without a reservation".into()))?;
        if jumbf.len() != reservation.total_len {
            return Err(Error::ReservedSpaceMismatch {
                expected: reservation.total_len,
                actual: jumbf.len(),
            });
        }
        let chunk = build_chunk(jumbf);
        let start = reservation.insertion_point;
        self.data.splice(start..start + chunk.len(), chunk.iter().copied());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_png() -> Vec<u8> {
        let mut data = SIGNATURE.to_vec();
        // IHDR chunk with a bogus but correctly-CRC'd payload.
        let mut ihdr_data = Vec::new();
        ihdr_data.extend_from_slice(&1u32.to_be_bytes()); // width
        ihdr_data.extend_from_slice(&1u32.to_be_bytes()); // height
        ihdr_data.extend_from_slice(&[8, 2, 0, 0, 0]); // bit depth, color type, etc.
        let mut ihdr = Vec::new();
        ihdr.extend_from_slice(&(ihdr_data.len() as u32).to_be_bytes());
        ihdr.extend_from_slice(b"IHDR");
        ihdr.extend_from_slice(&ihdr_data);
        let crc = crc32_ieee(&ihdr[4..]);
        ihdr.extend_from_slice(&crc.to_be_bytes());
        data.extend_from_slice(&ihdr);

        // Minimal IDAT (content doesn't need to be valid zlib for this test).
        let mut idat = Vec::new();
        idat.extend_from_slice(&4u32.to_be_bytes());
        idat.extend_from_slice(b"IDAT");
        idat.extend_from_slice(&[1, 2, 3, 4]);
        let crc = crc32_ieee(&idat[4..]);
        idat.extend_from_slice(&crc.to_be_bytes());
        data.extend_from_slice(&idat);

        // IEND
        let mut iend = Vec::new();
        iend.extend_from_slice(&0u32.to_be_bytes());
        iend.extend_from_slice(b"IEND");
        let crc = crc32_ieee(&iend[4..]);
        iend.extend_from_slice(&crc.to_be_bytes());
        data.extend_from_slice(&iend);

        data
    }

    #[test]
    fn can_read_requires_signature() {
        assert!(PngAsset::can_read(&SIGNATURE));
        assert!(!PngAsset::can_read(b"not a png"));
    }

    #[test]
    fn no_manifest_in_fresh_png() {
        let asset = PngAsset::parse(minimal_png()).unwrap();
        assert!(asset.get_manifest_jumbf().unwrap().is_none());
    }

    #[test]
    fn reserve_write_and_read_back_manifest_before_idat() {
        let mut asset = PngAsset::parse(minimal_png()).unwrap();
        let jumbf = b"fake jumbf payload bytes";
        asset.ensure_manifest_space(jumbf.len()).unwrap();

        let range = asset.get_hash_exclusion_range().unwrap().unwrap();
        assert_eq!(range.length, (12 + jumbf.len()) as u64);

        asset.write_manifest_jumbf(jumbf).unwrap();
        let read_back = asset.get_manifest_jumbf().unwrap().unwrap();
        assert_eq!(read_back, jumbf);

        // Chunk lands before IDAT.
        let chunks = scan_chunks(asset.bytes()).unwrap();
        let cabx_idx = chunks.iter().position(|c| c.kind == C2PA_CHUNK).unwrap();
        let idat_idx = chunks.iter().position(|c| c.kind == IDAT).unwrap();
        assert!(cabx_idx < idat_idx);
    }

    #[test]
    fn crc_is_valid_ieee() {
        let chunk = build_chunk(b"hello");
        let len = chunk.len();
        let crc_stored = BigEndian::read_u32(&chunk[len - 4..]);
        let crc_recomputed = crc32_ieee(&chunk[4..len - 4]);
        assert_eq!(crc_stored, crc_recomputed);
    }

    #[test]
    fn reinserting_space_removes_previous_manifest() {
        let mut asset = PngAsset::parse(minimal_png()).unwrap();
        asset.ensure_manifest_space(10).unwrap();
        asset.write_manifest_jumbf(&vec![1u8; 10]).unwrap();

        asset.ensure_manifest_space(3).unwrap();
        asset.write_manifest_jumbf(&vec![2u8; 3]).unwrap();

        assert_eq!(asset.get_manifest_jumbf().unwrap().unwrap(), vec![2u8; 3]);
    }
}
