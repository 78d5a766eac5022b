//! Exclusion-aware asset digesting (spec design note §9): a data-hash or
//! BMFF-hash assertion digests an asset while skipping byte ranges that
//! would change bit-exactly with the manifest's own size (the JUMBF
//! storage itself, and any format envelope around it), optionally
//! replacing a skipped range with an 8-byte big-endian position marker
//! instead of omitting it outright.

use serde::{Deserialize, Serialize};

use crate::crypto::Digester;
use crate::error::{Error, Result};

/// One excluded byte range within an asset. Serializes into a data-hash or
/// BMFF-hash assertion's `exclusions` array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exclusion {
    pub start: u64,
    pub length: u64,
    /// If set, the excluded range is replaced by an 8-byte big-endian
    /// marker holding this value rather than omitted from the digest.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub offset_marker: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub name: Option<String>,
}

impl Exclusion {
    pub fn new(start: u64, length: u64) -> Self {
        Self {
            start,
            length,
            offset_marker: None,
            name: None,
        }
    }

    pub fn with_offset_marker(mut self, value: u64) -> Self {
        self.offset_marker = Some(value);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    fn end(&self) -> u64 {
        self.start + self.length
    }
}

/// Digest `data` while skipping (or replacing with an offset marker) the
/// given exclusion ranges. Ranges may be given in any order and must not
/// overlap.
pub fn digest_with_exclusions(
    digester: &dyn Digester,
    data: &[u8],
    exclusions: &[Exclusion],
) -> Result<Vec<u8>> {
    let mut sorted: Vec<&Exclusion> = exclusions.iter().collect();
    sorted.sort_by_key(|e| e.start);
    for pair in sorted.windows(2) {
        if pair[0].end() > pair[1].start {
            return Err(Error::MalformedContent(
                "overlapping hash exclusion ranges".into(),
            ));
        }
    }

    let mut session = digester.start();
    let mut cursor: u64 = 0;

    for exclusion in &sorted {
        if exclusion.start > data.len() as u64 || exclusion.end() > data.len() as u64 {
            return Err(Error::MalformedContent(
                "hash exclusion range outside asset bounds".into(),
            ));
        }
        if exclusion.start > cursor {
            session.update(&data[cursor as usize..exclusion.start as usize]);
        }
        if let Some(marker) = exclusion.offset_marker {
            session.update(&marker.to_be_bytes());
        }
        cursor = exclusion.end();
    }

    if (cursor as usize) < data.len() {
        session.update(&data[cursor as usize..]);
    }

    Ok(session.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::Sha2Digester;
    use crate::crypto::HashAlgorithm;

    #[test]
    fn no_exclusions_matches_plain_digest() {
        let digester = Sha2Digester::new(HashAlgorithm::Sha256);
        let data = b"the quick brown fox";
        let excluded = digest_with_exclusions(&digester, data, &[]).unwrap();
        let plain = digester.digest(data);
        assert_eq!(excluded, plain);
    }

    #[test]
    fn excluded_range_is_skipped() {
        let digester = Sha2Digester::new(HashAlgorithm::Sha256);
        let with_zeros = b"AAAA0000BBBB".to_vec();
        let without = b"AAAABBBB".to_vec();

        let excluded = digest_with_exclusions(
            &digester,
            &with_zeros,
            &[Exclusion::new(4, 4)],
        )
        .unwrap();
        let plain = digester.digest(&without);
        assert_eq!(excluded, plain);
    }

    #[test]
    fn offset_marker_replaces_range_with_position() {
        let digester = Sha2Digester::new(HashAlgorithm::Sha256);
        let data = b"AAAA0000BBBB".to_vec();
        let marked = digest_with_exclusions(
            &digester,
            &data,
            &[Exclusion::new(4, 4).with_offset_marker(4)],
        )
        .unwrap();

        let mut expected = Vec::new();
        expected.extend_from_slice(b"AAAA");
        expected.extend_from_slice(&4u64.to_be_bytes());
        expected.extend_from_slice(b"BBBB");
        let plain = digester.digest(&expected);
        assert_eq!(marked, plain);
    }

    #[test]
    fn rejects_overlapping_exclusions() {
        let digester = Sha2Digester::new(HashAlgorithm::Sha256);
        let data = vec![0u8; 20];
        let result = digest_with_exclusions(
            &digester,
            &data,
            &[Exclusion::new(0, 10), Exclusion::new(5, 10)],
        );
        assert!(result.is_err());
    }
}
