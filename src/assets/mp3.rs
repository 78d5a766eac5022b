//! MP3 asset handling (spec.md §4.2): the manifest travels inside an
//! ID3v2.4 tag as a single `GEOB` (general encapsulated object) frame —
//! MIME type `application/x-c2pa-manifest-store`, filename `c2pa`,
//! description `c2pa manifest store` — placed first among the tag's
//! frames. ID3v2 frame and tag sizes are "synchsafe": each byte holds
//! only 7 bits so a decoder scanning for frame sync codes never
//! mistakes tag metadata for an MPEG frame header.

use byteorder::{BigEndian, ByteOrder};

use super::{AssetHandler, ByteRange};
use crate::binary;
use crate::error::{Error, Result};

const ID3_MAGIC: [u8; 3] = *b"ID3";
const GEOB: [u8; 4] = *b"GEOB";
const MIME_TYPE: &str = "application/x-c2pa-manifest-store";
const FILENAME: &str = "c2pa";
const DESCRIPTION: &str = "c2pa manifest store";
const ENCODING_LATIN1: u8 = 0;

struct Reservation {
    insertion_point: usize,
    total_len: usize,
}

pub struct Mp3Asset {
    data: Vec<u8>,
    reservation: Option<Reservation>,
}

/// `(tag_body_len, header_total_len)` for an existing ID3v2 tag, or
/// `None` if the asset opens directly with MPEG frame data.
fn existing_tag(data: &[u8]) -> Result<Option<(usize, usize)>> {
    if data.len() < 10 || data[..3] != ID3_MAGIC {
        return Ok(None);
    }
    let flags = data[5];
    if flags & 0x10 != 0 {
        return Err(Error::MalformedContent("ID3v2 footer present; unsupported".into()));
    }
    let mut size_bytes = [0u8; 4];
    size_bytes.copy_from_slice(&data[6..10]);
    let body_len = binary::read_synchsafe_u32(size_bytes) as usize;
    Ok(Some((body_len, 10 + body_len)))
}

fn build_geob_frame(jumbf: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.push(ENCODING_LATIN1);
    body.extend_from_slice(MIME_TYPE.as_bytes());
    body.push(0);
    body.extend_from_slice(FILENAME.as_bytes());
    body.push(0);
    body.extend_from_slice(DESCRIPTION.as_bytes());
    body.push(0);
    body.extend_from_slice(jumbf);

    let mut frame = Vec::with_capacity(10 + body.len());
    frame.extend_from_slice(&GEOB);
    frame.extend_from_slice(&binary::write_synchsafe_u32(body.len() as u32));
    frame.extend_from_slice(&[0, 0]); // flags
    frame.extend_from_slice(&body);
    frame
}

fn find_geob_jumbf(frame_body: &[u8]) -> Result<Vec<u8>> {
    if frame_body.is_empty() {
        return Err(Error::MalformedContent("empty GEOB frame".into()));
    }
    let mut pos = 1usize; // skip text-encoding byte
    let mime_end = frame_body[pos..]
        .iter()
        .position(|&b| b == 0)
        .ok_or_else(|| Error::MalformedContent("GEOB mime type not terminated".into()))?;
    pos += mime_end + 1;
    let filename_end = frame_body[pos..]
        .iter()
        .position(|&b| b == 0)
        .ok_or_else(|| Error::MalformedContent("GEOB filename not terminated".into()))?;
    pos += filename_end + 1;
    let description_end = frame_body[pos..]
        .iter()
        .position(|&b| b == 0)
        .ok_or_else(|| Error::MalformedContent("GEOB description not terminated".into()))?;
    pos += description_end + 1;
    Ok(frame_body[pos..].to_vec())
}

/// Walk an ID3v2 tag body's frames, returning `(frame_id, header_offset,
/// total_frame_len, body_range)` for each.
fn scan_frames(tag_body: &[u8], tag_body_offset: usize) -> Result<Vec<(([u8; 4]), usize, usize, std::ops::Range<usize>)>> {
    let mut frames = Vec::new();
    let mut pos = 0usize;
    while pos + 10 <= tag_body.len() {
        if tag_body[pos] == 0 {
            break; // padding
        }
        let mut id = [0u8; 4];
        id.copy_from_slice(&tag_body[pos..pos + 4]);
        let mut size_bytes = [0u8; 4];
        size_bytes.copy_from_slice(&tag_body[pos + 4..pos + 8]);
        let size = binary::read_synchsafe_u32(size_bytes) as usize;
        let header_len = 10;
        if pos + header_len + size > tag_body.len() {
            return Err(Error::MalformedContent("ID3v2 frame size out of bounds".into()));
        }
        let body_start = tag_body_offset + pos + header_len;
        frames.push((id, tag_body_offset + pos, header_len + size, body_start..body_start + size));
        pos += header_len + size;
    }
    Ok(frames)
}

impl AssetHandler for Mp3Asset {
    fn can_read(header: &[u8]) -> bool {
        (header.len() >= 3 && header[..3] == ID3_MAGIC)
            || (header.len() >= 2 && header[0] == 0xFF && header[1] & 0xE0 == 0xE0)
    }

    fn parse(data: Vec<u8>) -> Result<Self> {
        if !Self::can_read(&data) {
            return Err(Error::MalformedContent("not an MP3 (no ID3 tag or frame sync)".into()));
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
        let Some((body_len, _)) = existing_tag(&self.data)? else {
            return Ok(None);
        };
        let frames = scan_frames(&self.data[10..10 + body_len], 10)?;
        let geob_frames: Vec<_> = frames.iter().filter(|(id, ..)| *id == GEOB).collect();
        match geob_frames.as_slice() {
            [] => Ok(None),
            [(_, _, _, body)] => Ok(Some(find_geob_jumbf(&self.data[body.clone()])?)),
            _ => Ok(None), // multiple GEOB frames: ambiguous, treat as missing
        }
    }

    fn ensure_manifest_space(&mut self, size: usize) -> Result<()> {
        let (mut tag_body, header_exists) = match existing_tag(&self.data)? {
            Some((body_len, _)) => (self.data[10..10 + body_len].to_vec(), true),
            None => (Vec::new(), false),
        };

        if header_exists {
            let frames = scan_frames(&tag_body, 10)?;
            let mut remove: Vec<(usize, usize)> = frames
                .iter()
                .filter(|(id, ..)| *id == GEOB)
                .map(|(_, offset, len, _)| (*offset - 10, *len))
                .collect();
            remove.sort_by_key(|(offset, _)| *offset);
            for (offset, len) in remove.into_iter().rev() {
                tag_body.drain(offset..offset + len);
            }
        }

        let placeholder_frame = build_geob_frame(&vec![0u8; size]);
        let mut new_body = placeholder_frame.clone();
        new_body.extend_from_slice(&tag_body);

        let mut new_data = Vec::with_capacity(10 + new_body.len() + (self.data.len()));
        new_data.extend_from_slice(&ID3_MAGIC);
        new_data.push(4); // major version
        new_data.push(0); // revision
        new_data.push(0); // flags
        new_data.extend_from_slice(&binary::write_synchsafe_u32(new_body.len() as u32));
        new_data.extend_from_slice(&new_body);

        let rest_start = match existing_tag(&self.data)? {
            Some((body_len, total_len)) => {
                let _ = body_len;
                total_len
            }
            None => 0,
        };
        new_data.extend_from_slice(&self.data[rest_start..]);

        self.data = new_data;
        self.reservation = Some(Reservation {
            insertion_point: 10,
            total_len: size,
        });
        Ok(())
    }

    fn get_hash_exclusion_range(&self) -> Result<Option<ByteRange>> {
        let Some(reservation) = &self.reservation else {
            return Ok(None);
        };
        let placeholder_len = build_geob_frame(&vec![0u8; reservation.total_len]).len();
        Ok(Some(ByteRange::new(
            reservation.insertion_point as u64,
            placeholder_len as u64,
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
        let frame = build_geob_frame(jumbf);
        let start = reservation.insertion_point;
        self.data.splice(start..start + frame.len(), frame.iter().copied());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_mp3_no_tag() -> Vec<u8> {
        let mut data = vec![0xFF, 0xFB, 0x90, 0x00]; // MPEG frame sync
        data.extend_from_slice(&[0u8; 64]);
        data
    }

    #[test]
    fn can_read_id3_or_frame_sync() {
        assert!(Mp3Asset::can_read(b"ID3\x04\x00\x00\x00\x00\x00\x00"));
        assert!(Mp3Asset::can_read(&[0xFF, 0xFB]));
        assert!(!Mp3Asset::can_read(b"RIFF"));
    }

    #[test]
    fn no_manifest_in_tagless_file() {
        let asset = Mp3Asset::parse(minimal_mp3_no_tag()).unwrap();
        assert!(asset.get_manifest_jumbf().unwrap().is_none());
    }

    #[test]
    fn reserve_write_and_read_back_manifest_with_no_prior_tag() {
        let mut asset = Mp3Asset::parse(minimal_mp3_no_tag()).unwrap();
        let jumbf = b"mp3 jumbf manifest bytes";
        asset.ensure_manifest_space(jumbf.len()).unwrap();
        asset.write_manifest_jumbf(jumbf).unwrap();

        assert_eq!(asset.bytes()[..3], ID3_MAGIC);
        let read_back = asset.get_manifest_jumbf().unwrap().unwrap();
        assert_eq!(read_back, jumbf);
    }

    #[test]
    fn reinserting_space_removes_previous_geob() {
        let mut asset = Mp3Asset::parse(minimal_mp3_no_tag()).unwrap();
        asset.ensure_manifest_space(20).unwrap();
        asset.write_manifest_jumbf(&vec![1u8; 20]).unwrap();

        asset.ensure_manifest_space(5).unwrap();
        asset.write_manifest_jumbf(&vec![2u8; 5]).unwrap();

        assert_eq!(asset.get_manifest_jumbf().unwrap().unwrap(), vec![2u8; 5]);
    }

    #[test]
    fn synchsafe_round_trip_sanity() {
        let encoded = binary::write_synchsafe_u32(200_000);
        let decoded = binary::read_synchsafe_u32(encoded);
        assert_eq!(decoded, 200_000);
    }
}
