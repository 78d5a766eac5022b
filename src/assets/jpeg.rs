//! JPEG asset handling (spec.md §4.2): the manifest lives in one or more
//! APP11 segments, common identifier `"JP"`, a box-instance number held
//! constant across a segment group, and sequence numbers starting at 1.
//! The first segment's payload opens directly with the JUMBF box's own
//! 8-byte length+type header; continuation segments repeat that 8-byte
//! prefix ahead of their own chunk so a reader can identify an orphaned
//! segment's owning box without having seen segment 1.

use byteorder::{BigEndian, ByteOrder};

use super::{AssetHandler, ByteRange};
use crate::error::{Error, Result};
use crate::jumbf::box_type::SUPER_BOX;

const SOI: [u8; 2] = [0xFF, 0xD8];
const MARKER_PREFIX: u8 = 0xFF;
const APP0: u8 = 0xE0;
const APP11: u8 = 0xEB;
const SOS: u8 = 0xDA;
const EOI: u8 = 0xD9;
const CI: [u8; 2] = *b"JP";

/// Max value the 2-byte APP11 length field can hold.
const MAX_SEGMENT_LEN_FIELD: usize = 0xFFFF;
/// Bytes of `CI`+`En`+`Z` present in every APP11/C2PA segment.
const ENVELOPE_LEN: usize = 8;
/// Bytes of the repeated jumbf length+type prefix carried by continuation
/// segments (Z > 1).
const CONTINUATION_PREFIX_LEN: usize = 8;
/// Conservative per-segment JUMBF payload budget used for every segment
/// (matches spec.md §8 scenario 4's `0xFFFF - 4 - 8` sizing).
pub const MAX_PAYLOAD_PER_SEGMENT: usize = MAX_SEGMENT_LEN_FIELD - 4 - CONTINUATION_PREFIX_LEN;

const BOX_INSTANCE: u16 = 1;

struct Reservation {
    insertion_point: usize,
    total_len: usize,
    chunk_lengths: Vec<usize>,
}

pub struct JpegAsset {
    data: Vec<u8>,
    reservation: Option<Reservation>,
}

struct Marker {
    /// Offset of the leading `0xFF` byte.
    header_offset: usize,
    kind: u8,
    /// Offset of the 2-byte length field, if this marker has one.
    length_field: Option<usize>,
    /// Total segment length including the 2-byte length field.
    segment_len: usize,
}

/// Walk markers from just after the SOI until SOS or EOI (inclusive of
/// that terminal marker), skipping markers with no length field.
fn scan_markers(data: &[u8]) -> Result<Vec<Marker>> {
    let mut markers = Vec::new();
    let mut pos = 2usize;

    while pos + 1 < data.len() {
        if data[pos] != MARKER_PREFIX {
            return Err(Error::MalformedContent(format!(
                "expected marker prefix at offset {pos}"
            )));
        }
        let mut kind_pos = pos + 1;
        while kind_pos < data.len() && data[kind_pos] == MARKER_PREFIX {
            kind_pos += 1; // fill bytes
        }
        if kind_pos >= data.len() {
            break;
        }
        let kind = data[kind_pos];
        let header_offset = pos;

        if (0xD0..=0xD7).contains(&kind) || kind == 0x01 {
            markers.push(Marker {
                header_offset,
                kind,
                length_field: None,
                segment_len: kind_pos + 1 - header_offset,
            });
            pos = kind_pos + 1;
            continue;
        }

        if kind_pos + 2 > data.len() {
            return Err(Error::MalformedContent("truncated JPEG marker length".into()));
        }
        let len = BigEndian::read_u16(&data[kind_pos + 1..kind_pos + 3]) as usize;
        if len < 2 {
            return Err(Error::MalformedContent("JPEG marker length shorter than itself".into()));
        }
        let segment_len = (kind_pos + 1 - header_offset) + len;
        markers.push(Marker {
            header_offset,
            kind,
            length_field: Some(kind_pos + 1),
            segment_len,
        });
        pos = header_offset + segment_len;

        if kind == SOS || kind == EOI {
            break;
        }
    }

    Ok(markers)
}

/// Offset at which new APP11 segments should be inserted: immediately
/// after the APP0 segment, or right after the SOI if there is none.
fn insertion_point(markers: &[Marker]) -> usize {
    markers
        .iter()
        .find(|m| m.kind == APP0)
        .map(|m| m.header_offset + m.segment_len)
        .unwrap_or(2)
}

/// A C2PA APP11 segment's parsed envelope (CI, En, Z) plus its payload
/// slice (the bytes after the envelope, trimmed of any continuation
/// prefix).
struct C2paSegment {
    header_offset: usize,
    segment_len: usize,
    box_instance: u16,
    sequence: u32,
    payload: std::ops::Range<usize>,
}

fn parse_c2pa_segments(data: &[u8], markers: &[Marker]) -> Result<Vec<C2paSegment>> {
    let mut out = Vec::new();
    for m in markers {
        if m.kind != APP11 {
            continue;
        }
        let Some(length_field) = m.length_field else { continue };
        let content_start = length_field + 2;
        let content_end = m.header_offset + m.segment_len;
        if content_end - content_start < ENVELOPE_LEN {
            continue; // not large enough to be a C2PA segment; ignore
        }
        if &data[content_start..content_start + 2] != CI {
            continue; // some other APP11 use (not C2PA)
        }
        let box_instance = BigEndian::read_u16(&data[content_start + 2..content_start + 4]);
        let sequence = BigEndian::read_u32(&data[content_start + 4..content_start + 8]);
        let mut payload_start = content_start + ENVELOPE_LEN;
        if sequence > 1 {
            if content_end - payload_start < CONTINUATION_PREFIX_LEN {
                return Err(Error::MalformedContent(
                    "C2PA continuation segment missing repeated jumbf header".into(),
                ));
            }
            payload_start += CONTINUATION_PREFIX_LEN;
        }
        out.push(C2paSegment {
            header_offset: m.header_offset,
            segment_len: m.segment_len,
            box_instance,
            sequence,
            payload: payload_start..content_end,
        });
    }
    Ok(out)
}

/// Reassemble the JUMBF bytes from one manifest segment group, or `None`
/// if there is no group, or more than one distinct box-instance number is
/// present (spec.md §4.2: "Multiple valid manifest groups → treat as
/// invalid/missing").
fn reassemble(data: &[u8], segments: &[C2paSegment]) -> Option<Vec<u8>> {
    if segments.is_empty() {
        return None;
    }
    let instances: std::collections::BTreeSet<u16> = segments.iter().map(|s| s.box_instance).collect();
    if instances.len() != 1 {
        return None;
    }
    let mut ordered: Vec<&C2paSegment> = segments.iter().collect();
    ordered.sort_by_key(|s| s.sequence);
    for (i, seg) in ordered.iter().enumerate() {
        if seg.sequence != (i + 1) as u32 {
            return None; // gap or duplicate sequence number
        }
    }
    let mut out = Vec::new();
    for seg in ordered {
        out.extend_from_slice(&data[seg.payload.clone()]);
    }
    Some(out)
}

/// Split `total_len` JUMBF bytes into the payload-chunk sizes each
/// segment will carry, honoring [`MAX_PAYLOAD_PER_SEGMENT`].
fn chunk_lengths(total_len: usize) -> Vec<usize> {
    if total_len == 0 {
        return vec![0];
    }
    let mut remaining = total_len;
    let mut chunks = Vec::new();
    while remaining > 0 {
        let take = remaining.min(MAX_PAYLOAD_PER_SEGMENT);
        chunks.push(take);
        remaining -= take;
    }
    chunks
}

/// Build the full byte sequence of APP11 segments carrying `jumbf`
/// (either the real bytes, for `write_manifest_jumbf`, or an all-zero
/// placeholder of the same total length, for `ensure_manifest_space`).
fn build_segments(jumbf: &[u8], chunk_lengths: &[usize]) -> Vec<u8> {
    let total_len = jumbf.len() as u32;
    let mut out = Vec::new();
    let mut cursor = 0usize;
    for (i, &chunk_len) in chunk_lengths.iter().enumerate() {
        let sequence = (i + 1) as u32;
        let mut content = Vec::with_capacity(ENVELOPE_LEN + CONTINUATION_PREFIX_LEN + chunk_len);
        content.extend_from_slice(&CI);
        content.extend_from_slice(&BOX_INSTANCE.to_be_bytes());
        content.extend_from_slice(&sequence.to_be_bytes());
        if sequence > 1 {
            content.extend_from_slice(&total_len.to_be_bytes());
            content.extend_from_slice(&SUPER_BOX.0);
        }
        content.extend_from_slice(&jumbf[cursor..cursor + chunk_len]);
        cursor += chunk_len;

        let segment_len_field = content.len() + 2;
        assert!(segment_len_field <= MAX_SEGMENT_LEN_FIELD);

        out.push(MARKER_PREFIX);
        out.push(APP11);
        out.extend_from_slice(&(segment_len_field as u16).to_be_bytes());
        out.extend_from_slice(&content);
    }
    out
}

impl AssetHandler for JpegAsset {
    fn can_read(header: &[u8]) -> bool {
        header.len() >= 2 && header[..2] == SOI
    }

    fn parse(data: Vec<u8>) -> Result<Self> {
        if !Self::can_read(&data) {
            return Err(Error::MalformedContent("not a JPEG (missing SOI)".into()));
        }
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
        let markers = scan_markers(&self.data)?;
        let segments = parse_c2pa_segments(&self.data, &markers)?;
        Ok(reassemble(&self.data, &segments))
    }

    fn ensure_manifest_space(&mut self, size: usize) -> Result<()> {
        let markers = scan_markers(&self.data)?;
        let existing = parse_c2pa_segments(&self.data, &markers)?;

        // Remove every existing C2PA APP11 segment (regardless of group).
        let mut remove_ranges: Vec<(usize, usize)> =
            existing.iter().map(|s| (s.header_offset, s.segment_len)).collect();
        remove_ranges.sort_by_key(|(offset, _)| *offset);
        let mut cleaned = self.data.clone();
        for (offset, len) in remove_ranges.into_iter().rev() {
            cleaned.drain(offset..offset + len);
        }

        let markers = scan_markers(&cleaned)?;
        let insertion_point = insertion_point(&markers);
        let chunks = chunk_lengths(size);
        let placeholder = vec![0u8; size];
        let segment_bytes = build_segments(&placeholder, &chunks);

        let mut new_data = cleaned[..insertion_point].to_vec();
        new_data.extend_from_slice(&segment_bytes);
        new_data.extend_from_slice(&cleaned[insertion_point..]);

        self.data = new_data;
        self.reservation = Some(Reservation {
            insertion_point,
            total_len: size,
            chunk_lengths: chunks,
        });
        Ok(())
    }

    fn get_hash_exclusion_range(&self) -> Result<Option<ByteRange>> {
        let Some(reservation) = &self.reservation else {
            return Ok(None);
        };
        let segment_bytes = build_segments(&vec![0u8; reservation.total_len], &reservation.chunk_lengths);
        Ok(Some(ByteRange::new(
            reservation.insertion_point as u64,
            segment_bytes.len() as u64,
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
        let segment_bytes = build_segments(jumbf, &reservation.chunk_lengths);
        let start = reservation.insertion_point;
        self.data
            .splice(start..start + segment_bytes.len(), segment_bytes.iter().copied());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_jpeg() -> Vec<u8> {
        let mut data = SOI.to_vec();
        // APP0 (JFIF) segment: FF E0 00 10 "JFIF\0" 01 02 00 00 01 00 01 00 00
        data.extend_from_slice(&[0xFF, APP0, 0x00, 0x10]);
        data.extend_from_slice(b"JFIF\0");
        data.extend_from_slice(&[0x01, 0x02, 0x00, 0x00, 0x01, 0x00, 0x01, 0x00, 0x00]);
        // SOS + fake scan data + EOI
        data.extend_from_slice(&[0xFF, SOS, 0x00, 0x02]);
        data.extend_from_slice(&[0xAB; 20]);
        data.extend_from_slice(&[0xFF, EOI]);
        data
    }

    #[test]
    fn can_read_requires_soi() {
        assert!(JpegAsset::can_read(&SOI));
        assert!(!JpegAsset::can_read(&[0x89, 0x50]));
    }

    #[test]
    fn no_manifest_in_fresh_jpeg() {
        let asset = JpegAsset::parse(minimal_jpeg()).unwrap();
        assert!(asset.get_manifest_jumbf().unwrap().is_none());
    }

    #[test]
    fn reserve_write_and_read_back_small_manifest() {
        let mut asset = JpegAsset::parse(minimal_jpeg()).unwrap();
        let jumbf = b"a fake but plausible jumbf payload of c2pa bytes!!";
        asset.ensure_manifest_space(jumbf.len()).unwrap();

        let range = asset.get_hash_exclusion_range().unwrap().unwrap();
        assert!(range.length >= jumbf.len() as u64);
        assert!(range.end() <= asset.bytes().len() as u64);

        asset.write_manifest_jumbf(jumbf).unwrap();
        let read_back = asset.get_manifest_jumbf().unwrap().unwrap();
        assert_eq!(read_back, jumbf);
    }

    #[test]
    fn write_wrong_length_is_rejected() {
        let mut asset = JpegAsset::parse(minimal_jpeg()).unwrap();
        asset.ensure_manifest_space(10).unwrap();
        let result = asset.write_manifest_jumbf(b"too short");
        assert!(matches!(result, Err(Error::ReservedSpaceMismatch { .. })));
    }

    #[test]
    fn multi_segment_round_trip() {
        let mut asset = JpegAsset::parse(minimal_jpeg()).unwrap();
        let total = 200_000;
        asset.ensure_manifest_space(total).unwrap();

        let expected_segments = (total as f64 / MAX_PAYLOAD_PER_SEGMENT as f64).ceil() as usize;
        let markers = scan_markers(asset.bytes()).unwrap();
        let segments = parse_c2pa_segments(asset.bytes(), &markers).unwrap();
        assert_eq!(segments.len(), expected_segments);
        for (i, seg) in segments.iter().enumerate() {
            assert_eq!(seg.sequence, (i + 1) as u32);
            assert_eq!(seg.box_instance, BOX_INSTANCE);
        }

        let mut jumbf = vec![0u8; total];
        for (i, b) in jumbf.iter_mut().enumerate() {
            *b = (i % 256) as u8;
        }
        asset.write_manifest_jumbf(&jumbf).unwrap();
        let read_back = asset.get_manifest_jumbf().unwrap().unwrap();
        assert_eq!(read_back, jumbf);
    }

    #[test]
    fn reinserting_space_removes_previous_manifest() {
        let mut asset = JpegAsset::parse(minimal_jpeg()).unwrap();
        asset.ensure_manifest_space(100).unwrap();
        asset.write_manifest_jumbf(&vec![1u8; 100]).unwrap();

        asset.ensure_manifest_space(50).unwrap();
        asset.write_manifest_jumbf(&vec![2u8; 50]).unwrap();

        let read_back = asset.get_manifest_jumbf().unwrap().unwrap();
        assert_eq!(read_back, vec![2u8; 50]);
    }
}
