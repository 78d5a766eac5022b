//! Asset handlers (C4): per-format routines that reserve space for, embed,
//! extract, and compute hash-exclusion ranges for the JUMBF manifest inside
//! a media file. Every format operates on an in-memory byte buffer — the
//! `Asset` lifecycle described in spec.md §3 ("bytes of a media file plus
//! per-format parse tree") never requires more than that for the
//! reserve/write/extract contract this crate implements.
//!
//! Each concrete handler implements [`AssetHandler`]; [`Asset`] is the
//! format-erased enum a caller actually holds, picked by [`Asset::parse`]
//! via each handler's `can_read`.

pub mod bmff;
pub mod gif;
pub mod jpeg;
pub mod mp3;
pub mod png;
pub mod tiff;

use crate::error::{Error, Result};

/// A contiguous byte range within an asset: the manifest's own storage
/// plus whatever format envelope around it would change bit-exactly if
/// the manifest payload changed size (spec.md §4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub length: u64,
}

impl ByteRange {
    pub fn new(start: u64, length: u64) -> Self {
        Self { start, length }
    }

    pub fn end(&self) -> u64 {
        self.start + self.length
    }

    pub fn contains(&self, whole: u64) -> bool {
        self.end() <= whole
    }
}

/// Per-format asset I/O contract (spec.md §4.2).
///
/// `ensure_manifest_space(n)` must leave the asset such that a following
/// `write_manifest_jumbf(j)` with `j.len() == n` is legal, and
/// `get_hash_exclusion_range()` then returns the exact envelope around
/// that reservation. Existing manifest containers are removed first.
pub trait AssetHandler: Sized {
    /// Sniff whether `header` (the first handful of bytes of the asset)
    /// looks like this format. Never consumes more than a header probe.
    fn can_read(header: &[u8]) -> bool;

    /// Parse `data` into this handler, retaining the full byte buffer.
    fn parse(data: Vec<u8>) -> Result<Self>;

    /// The current (possibly just-written) byte buffer.
    fn bytes(&self) -> &[u8];

    /// Consume the handler, returning the final byte buffer.
    fn into_bytes(self) -> Vec<u8>;

    /// Extract the manifest JUMBF bytes currently embedded, if any.
    fn get_manifest_jumbf(&self) -> Result<Option<Vec<u8>>>;

    /// Remove any existing manifest container and reserve exactly `size`
    /// bytes of JUMBF storage (plus this format's framing) at the
    /// format-defined insertion point.
    fn ensure_manifest_space(&mut self, size: usize) -> Result<()>;

    /// The byte range a data-hash assertion must exclude: the reserved
    /// manifest storage plus any framing bytes that move with its size.
    fn get_hash_exclusion_range(&self) -> Result<Option<ByteRange>>;

    /// Write `jumbf` into the space reserved by `ensure_manifest_space`.
    /// `jumbf.len()` must equal the size most recently reserved.
    fn write_manifest_jumbf(&mut self, jumbf: &[u8]) -> Result<()>;
}

/// A format-erased asset, dispatched to one of the per-format handlers.
pub enum Asset {
    #[cfg(feature = "jpeg")]
    Jpeg(jpeg::JpegAsset),
    #[cfg(feature = "png")]
    Png(png::PngAsset),
    #[cfg(feature = "bmff")]
    Bmff(bmff::BmffAsset),
    #[cfg(feature = "tiff")]
    Tiff(tiff::TiffAsset),
    #[cfg(feature = "mp3")]
    Mp3(mp3::Mp3Asset),
    #[cfg(feature = "gif")]
    Gif(gif::GifAsset),
}

macro_rules! dispatch {
    ($self:ident, $variant:ident => $expr:expr) => {
        match $self {
            #[cfg(feature = "jpeg")]
            Asset::Jpeg($variant) => $expr,
            #[cfg(feature = "png")]
            Asset::Png($variant) => $expr,
            #[cfg(feature = "bmff")]
            Asset::Bmff($variant) => $expr,
            #[cfg(feature = "tiff")]
            Asset::Tiff($variant) => $expr,
            #[cfg(feature = "mp3")]
            Asset::Mp3($variant) => $expr,
            #[cfg(feature = "gif")]
            Asset::Gif($variant) => $expr,
        }
    };
}

impl Asset {
    /// Detect the format from `data`'s header and parse it fully.
    #[tracing::instrument(level = "debug", skip(data), fields(len = data.len()))]
    pub fn parse(data: Vec<u8>) -> Result<Self> {
        let header: Vec<u8> = data.iter().take(16).copied().collect();

        #[cfg(feature = "jpeg")]
        if jpeg::JpegAsset::can_read(&header) {
            tracing::debug!(format = "jpeg", "detected asset format");
            return Ok(Asset::Jpeg(jpeg::JpegAsset::parse(data)?));
        }
        #[cfg(feature = "png")]
        if png::PngAsset::can_read(&header) {
            tracing::debug!(format = "png", "detected asset format");
            return Ok(Asset::Png(png::PngAsset::parse(data)?));
        }
        #[cfg(feature = "bmff")]
        if bmff::BmffAsset::can_read(&header) {
            tracing::debug!(format = "bmff", "detected asset format");
            return Ok(Asset::Bmff(bmff::BmffAsset::parse(data)?));
        }
        #[cfg(feature = "tiff")]
        if tiff::TiffAsset::can_read(&header) {
            tracing::debug!(format = "tiff", "detected asset format");
            return Ok(Asset::Tiff(tiff::TiffAsset::parse(data)?));
        }
        #[cfg(feature = "mp3")]
        if mp3::Mp3Asset::can_read(&header) {
            tracing::debug!(format = "mp3", "detected asset format");
            return Ok(Asset::Mp3(mp3::Mp3Asset::parse(data)?));
        }
        #[cfg(feature = "gif")]
        if gif::GifAsset::can_read(&header) {
            tracing::debug!(format = "gif", "detected asset format");
            return Ok(Asset::Gif(gif::GifAsset::parse(data)?));
        }

        tracing::warn!("no asset handler recognized this header");
        Err(Error::UnsupportedFormat)
    }

    pub fn bytes(&self) -> &[u8] {
        dispatch!(self, h => h.bytes())
    }

    pub fn into_bytes(self) -> Vec<u8> {
        dispatch!(self, h => h.into_bytes())
    }

    pub fn get_manifest_jumbf(&self) -> Result<Option<Vec<u8>>> {
        dispatch!(self, h => h.get_manifest_jumbf())
    }

    pub fn ensure_manifest_space(&mut self, size: usize) -> Result<()> {
        dispatch!(self, h => h.ensure_manifest_space(size))
    }

    pub fn get_hash_exclusion_range(&self) -> Result<Option<ByteRange>> {
        dispatch!(self, h => h.get_hash_exclusion_range())
    }

    pub fn write_manifest_jumbf(&mut self, jumbf: &[u8]) -> Result<()> {
        dispatch!(self, h => h.write_manifest_jumbf(jumbf))
    }

    /// Read a byte range out of the current buffer, e.g. for the data-hash
    /// assertion to digest something other than the whole asset.
    pub fn get_data_range(&self, range: ByteRange) -> Result<&[u8]> {
        let bytes = self.bytes();
        let start = range.start as usize;
        let end = range.end() as usize;
        bytes
            .get(start..end)
            .ok_or_else(|| Error::MalformedContent("byte range outside asset bounds".into()))
    }
}
