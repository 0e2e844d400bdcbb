use crate::error::{Result, ValidationError};
use crate::utils::nucleotide;
use serde::{Deserialize, Serialize};

const PHRED33_OFFSET: u8 = 33;
const PHRED64_OFFSET: u8 = 64;
/// Highest score that still renders as printable Phred+33.
pub const MAX_PHRED: u8 = 93;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Strand {
    #[default]
    Forward,
    Reverse,
}

impl Strand {
    pub fn flip(self) -> Self {
        match self {
            Strand::Forward => Strand::Reverse,
            Strand::Reverse => Strand::Forward,
        }
    }

    pub fn symbol(self) -> char {
        match self {
            Strand::Forward => '+',
            Strand::Reverse => '-',
        }
    }
}

/// One sequencing read.
///
/// Quality is held as Phred scores (not ASCII) and always has the same
/// length as the bases, whichever constructor was used.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SequenceRecord {
    name: String,
    bases: Vec<u8>,
    quality: Vec<u8>,
    strand: Strand,
    has_quality: bool,
}

impl SequenceRecord {
    /// Build from FASTQ text. `quality` is ASCII; with `phred64` set the
    /// scores are shifted down to the Phred+33 scale and clamped at 0.
    pub fn from_raw(
        name: impl Into<String>,
        bases: &[u8],
        strand: Strand,
        quality: &[u8],
        phred64: bool,
    ) -> Result<Self> {
        if bases.len() != quality.len() {
            return Err(ValidationError::LengthMismatch {
                bases: bases.len(),
                quality: quality.len(),
            }
            .into());
        }

        let scores = if phred64 {
            quality
                .iter()
                .map(|&q| q.saturating_sub(PHRED64_OFFSET))
                .collect()
        } else {
            quality
                .iter()
                .map(|&q| {
                    q.checked_sub(PHRED33_OFFSET)
                        .ok_or(ValidationError::InvalidQuality { value: q })
                })
                .collect::<std::result::Result<Vec<u8>, _>>()?
        };

        Ok(Self {
            name: name.into(),
            bases: bases.to_ascii_uppercase(),
            quality: scores,
            strand,
            has_quality: true,
        })
    }

    /// Build from an existing base sequence and Phred scores.
    pub fn new(
        name: impl Into<String>,
        bases: Vec<u8>,
        strand: Strand,
        quality: Vec<u8>,
    ) -> Result<Self> {
        if bases.len() != quality.len() {
            return Err(ValidationError::LengthMismatch {
                bases: bases.len(),
                quality: quality.len(),
            }
            .into());
        }
        Ok(Self {
            name: name.into(),
            bases,
            quality,
            strand,
            has_quality: true,
        })
    }

    /// A bare sequence. Quality is zero-filled and flagged as absent.
    pub fn without_quality(name: impl Into<String>, bases: Vec<u8>, strand: Strand) -> Self {
        let quality = vec![0; bases.len()];
        Self {
            name: name.into(),
            bases,
            quality,
            strand,
            has_quality: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bases(&self) -> &[u8] {
        &self.bases
    }

    pub fn quality(&self) -> &[u8] {
        &self.quality
    }

    pub fn strand(&self) -> Strand {
        self.strand
    }

    pub fn has_quality(&self) -> bool {
        self.has_quality
    }

    pub fn len(&self) -> usize {
        self.bases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bases.is_empty()
    }

    /// Complemented and reversed copy with the strand flipped.
    pub fn reverse_complement(&self) -> Self {
        Self {
            name: self.name.clone(),
            bases: nucleotide::reverse_complement(&self.bases),
            quality: self.quality.iter().rev().copied().collect(),
            strand: self.strand.flip(),
            has_quality: self.has_quality,
        }
    }

    /// Truncate to `new_len`. Never extends.
    pub fn resize(&mut self, new_len: usize) {
        if new_len < self.bases.len() {
            self.bases.truncate(new_len);
            self.quality.truncate(new_len);
        }
    }

    /// Drop up to `n` leading bases, always keeping at least one.
    pub fn trim_front(&mut self, n: usize) {
        if self.bases.is_empty() {
            return;
        }
        let n = n.min(self.bases.len() - 1);
        self.bases.drain(..n);
        self.quality.drain(..n);
    }

    /// Sample index from an Illumina header such as
    /// `A00403:136:HFMYWDSXX:2:1101:7672:1000 1:N:0:GAGAGGCA+GAGAGGC`.
    /// For dual indexes this is the i7 part.
    pub fn first_index(&self) -> &str {
        let name = self.name.as_bytes();
        if name.len() < 5 {
            return "";
        }
        let mut end = name.len();
        for i in (0..=name.len() - 3).rev() {
            match name[i] {
                b'+' => end = i,
                b':' => return &self.name[i + 1..end],
                _ => {}
            }
        }
        ""
    }

    /// Last sample index in the header (the i5 part for dual indexes).
    pub fn last_index(&self) -> &str {
        let name = self.name.as_bytes();
        if name.len() < 5 {
            return "";
        }
        (0..=name.len() - 3)
            .rev()
            .find(|&i| name[i] == b':' || name[i] == b'+')
            .map_or("", |i| &self.name[i + 1..])
    }

    /// Number of bases with Phred score below `threshold`.
    pub fn low_qual_count(&self, threshold: u8) -> usize {
        self.quality.iter().filter(|&&q| q < threshold).count()
    }

    pub fn gc_count(&self) -> usize {
        self.bases.iter().filter(|&&b| nucleotide::is_gc(b)).count()
    }

    /// Phred+33 rendering of the quality scores.
    pub fn quality_string(&self) -> String {
        self.quality
            .iter()
            .map(|&q| (q.min(MAX_PHRED) + PHRED33_OFFSET) as char)
            .collect()
    }

    /// Checks the base/quality invariant and that there is something to count.
    pub(crate) fn validate_for_ingest(&self) -> Result<()> {
        if self.bases.is_empty() {
            return Err(ValidationError::EmptySequence.into());
        }
        if !self.has_quality {
            return Err(ValidationError::MissingQuality.into());
        }
        if self.bases.len() != self.quality.len() {
            return Err(ValidationError::LengthMismatch {
                bases: self.bases.len(),
                quality: self.quality.len(),
            }
            .into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::QcError;

    fn record(bases: &str, quality: &str) -> SequenceRecord {
        SequenceRecord::from_raw("r1", bases.as_bytes(), Strand::Forward, quality.as_bytes(), false)
            .unwrap()
    }

    #[test]
    fn test_from_raw_converts_phred33() {
        let r = record("acgt", "!+5I");
        assert_eq!(r.bases(), b"ACGT");
        assert_eq!(r.quality(), &[0, 10, 20, 40]);
        assert_eq!(r.quality_string(), "!+5I");
    }

    #[test]
    fn test_length_mismatch_is_rejected() {
        let err = SequenceRecord::from_raw("r", b"ACGT", Strand::Forward, b"II", false).unwrap_err();
        assert_eq!(
            err,
            QcError::Validation(ValidationError::LengthMismatch { bases: 4, quality: 2 })
        );
        let err = SequenceRecord::new("r", b"ACGT".to_vec(), Strand::Forward, vec![30; 3]).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_phred64_is_normalized_and_clamped() {
        // 'h' = 104 -> Q40, '@' = 64 -> Q0, ';' = 59 -> clamped to Q0
        let r = SequenceRecord::from_raw("r", b"ACG", Strand::Forward, b"h@;", true).unwrap();
        assert_eq!(r.quality(), &[40, 0, 0]);
    }

    #[test]
    fn test_phred33_below_floor_is_rejected() {
        let err = SequenceRecord::from_raw("r", b"A", Strand::Forward, b" ", false).unwrap_err();
        assert_eq!(err, QcError::Validation(ValidationError::InvalidQuality { value: b' ' }));
    }

    #[test]
    fn test_without_quality_keeps_lengths_equal() {
        let r = SequenceRecord::without_quality("r", b"ACGTN".to_vec(), Strand::Forward);
        assert_eq!(r.bases().len(), r.quality().len());
        assert!(!r.has_quality());
        assert!(r.validate_for_ingest().is_err());
    }

    #[test]
    fn test_reverse_complement() {
        let r = record("AACGN", "ABCDE");
        let rc = r.reverse_complement();
        assert_eq!(rc.bases(), b"NCGTT");
        assert_eq!(rc.quality_string(), "EDCBA");
        assert_eq!(rc.strand(), Strand::Reverse);
        assert_eq!(r.bases(), b"AACGN");
        assert_eq!(rc.reverse_complement(), r);
    }

    #[test]
    fn test_resize_only_truncates() {
        let mut r = record("ACGTACGT", "IIIIIIII");
        r.resize(20);
        assert_eq!(r.len(), 8);
        r.resize(3);
        assert_eq!(r.bases(), b"ACG");
        assert_eq!(r.quality().len(), 3);
        r.resize(0);
        assert!(r.is_empty());
        assert!(r.quality().is_empty());
    }

    #[test]
    fn test_trim_front_keeps_one_base() {
        let mut r = record("ACGT", "ABCD");
        r.trim_front(2);
        assert_eq!(r.bases(), b"GT");
        assert_eq!(r.quality_string(), "CD");
        r.trim_front(10);
        assert_eq!(r.bases(), b"T");
    }

    #[test]
    fn test_sample_indexes() {
        let r = SequenceRecord::from_raw(
            "A00403:136:HFMYWDSXX:2:1101:7672:1000 1:N:0:GAGAGGCA+GAGAGGC",
            b"A",
            Strand::Forward,
            b"I",
            false,
        )
        .unwrap();
        assert_eq!(r.first_index(), "GAGAGGCA");
        assert_eq!(r.last_index(), "GAGAGGC");

        let single = SequenceRecord::without_quality("x 1:N:0:ACGTAC", vec![], Strand::Forward);
        assert_eq!(single.first_index(), "ACGTAC");
        assert_eq!(single.last_index(), "ACGTAC");

        let short = SequenceRecord::without_quality("x:1", vec![], Strand::Forward);
        assert_eq!(short.first_index(), "");
    }

    #[test]
    fn test_low_qual_and_gc() {
        let r = record("GGCAT", "+5?II");
        assert_eq!(r.low_qual_count(20), 1);
        assert_eq!(r.low_qual_count(30), 2);
        assert_eq!(r.gc_count(), 3);
    }
}
