//! GIF asset handling (spec.md §4.2, Open Questions): GIF has no defined
//! C2PA manifest embedding path, so this handler is read-only recognition
//! only. `get_manifest_jumbf` always returns `None` and the write-side
//! operations are unsupported — an asset of this format can never carry
//! a manifest, not merely "doesn't have one yet".

use super::{AssetHandler, ByteRange};
use crate::error::{Error, Result};

const GIF87A: [u8; 6] = *b"GIF87a";
const GIF89A: [u8; 6] = *b"GIF89a";

pub struct GifAsset {
    data: Vec<u8>,
}

impl AssetHandler for GifAsset {
    fn can_read(header: &[u8]) -> bool {
        header.len() >= 6 && (header[..6] == GIF87A || header[..6] == GIF89A)
    }

    fn parse(data: Vec<u8>) -> Result<Self> {
        if !Self::can_read(&data) {
            return Err(Error::MalformedContent("not a GIF (bad signature)".into()));
        }
        Ok(Self { data })
    }

    fn bytes(&self) -> &[u8] {
        &self.data
    }

    fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    fn get_manifest_jumbf(&self) -> Result<Option<Vec<u8>>> {
        Ok(None)
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

    #[test]
    fn can_read_both_gif_versions() {
        assert!(GifAsset::can_read(&GIF87A));
        assert!(GifAsset::can_read(&GIF89A));
        assert!(!GifAsset::can_read(b"PNG!!!"));
    }

    #[test]
    fn manifest_is_always_none() {
        let asset = GifAsset::parse(GIF89A.to_vec()).unwrap();
        assert!(asset.get_manifest_jumbf().unwrap().is_none());
    }

    #[test]
    fn writing_is_unsupported() {
        let mut asset = GifAsset::parse(GIF89A.to_vec()).unwrap();
        assert!(matches!(asset.ensure_manifest_space(10), Err(Error::UnsupportedFormat)));
    }
}
