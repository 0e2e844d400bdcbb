use super::base::fraction;
use crate::error::Result;
use crate::utils::nucleotide::reverse_complement;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Mismatches only count against the limit within this many compared bases.
const COMPLETE_COMPARE_REQUIRE: usize = 50;

/// Where mate 2 (reverse-complemented) sits against mate 1.
///
/// A non-negative `offset` means the fragment is at least as long as the
/// reads and mate 2 starts `offset` bases into mate 1. A negative offset means
/// the fragment is shorter than the reads and both mates ran into adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OverlapResult {
    pub overlapped: bool,
    pub offset: isize,
    pub overlap_len: usize,
    pub diff: usize,
}

impl OverlapResult {
    fn found(offset: isize, overlap_len: usize, diff: usize) -> Self {
        Self {
            overlapped: true,
            offset,
            overlap_len,
            diff,
        }
    }

    /// Estimated fragment length, given the read length of mate 2.
    pub fn insert_size(&self, len2: usize) -> Option<usize> {
        if !self.overlapped {
            None
        } else if self.offset >= 0 {
            Some(self.offset as usize + len2)
        } else {
            Some(self.overlap_len)
        }
    }

    pub fn has_adapter(&self) -> bool {
        self.overlapped && self.offset < 0
    }
}

pub struct OverlapAnalysis;

impl OverlapAnalysis {
    /// Scan for the first offset at which `s1` and the reverse complement of
    /// `s2` agree over at least `overlap_require` bases with fewer than
    /// `diff_limit` mismatches.
    pub fn analyze(s1: &[u8], s2: &[u8], diff_limit: usize, overlap_require: usize) -> OverlapResult {
        if s1.is_empty() || s2.is_empty() {
            return OverlapResult::default();
        }
        let rs2 = reverse_complement(s2);
        let len1 = s1.len() as isize;
        let len2 = rs2.len() as isize;
        let require = overlap_require as isize;

        let mut offset = 0isize;
        while offset < len1 - require {
            let overlap_len = (len1 - offset).min(len2) as usize;
            let diff = accepted_diff(&s1[offset as usize..], &rs2, overlap_len, diff_limit);
            if let Some(diff) = diff {
                return OverlapResult::found(offset, overlap_len, diff);
            }
            offset += 1;
        }

        offset = 0;
        while offset > require - len2 {
            let overlap_len = len1.min(len2 + offset) as usize;
            let diff = accepted_diff(s1, &rs2[(-offset) as usize..], overlap_len, diff_limit);
            if let Some(diff) = diff {
                return OverlapResult::found(offset, overlap_len, diff);
            }
            offset -= 1;
        }

        OverlapResult::default()
    }
}

fn accepted_diff(a: &[u8], b: &[u8], len: usize, diff_limit: usize) -> Option<usize> {
    let mut diff = 0;
    let mut compared = 0;
    while compared < len {
        if a[compared] != b[compared] {
            diff += 1;
            if diff >= diff_limit && compared < COMPLETE_COMPARE_REQUIRE {
                break;
            }
        }
        compared += 1;
    }
    if diff < diff_limit || compared > COMPLETE_COMPARE_REQUIRE {
        Some(diff)
    } else {
        None
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlapSummary {
    pub pairs: u64,
    pub overlapped: u64,
    pub overlap_fraction: f64,
    pub adapter_read_through: u64,
    pub adapter_fraction: f64,
    pub mean_overlap_len: f64,
    pub mean_insert_size: f64,
    pub insert_sizes: BTreeMap<usize, u64>,
}

/// Mate-overlap diagnostics across all pairs seen.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlapStats {
    pairs: u64,
    overlapped: u64,
    adapter_read_through: u64,
    overlap_len_sum: u64,
    insert_sizes: BTreeMap<usize, u64>,
}

impl OverlapStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, result: &OverlapResult, len2: usize) {
        self.pairs += 1;
        if !result.overlapped {
            return;
        }
        self.overlapped += 1;
        self.overlap_len_sum += result.overlap_len as u64;
        if result.has_adapter() {
            self.adapter_read_through += 1;
        }
        if let Some(size) = result.insert_size(len2) {
            *self.insert_sizes.entry(size).or_insert(0) += 1;
        }
    }

    pub fn pairs(&self) -> u64 {
        self.pairs
    }

    pub fn overlapped(&self) -> u64 {
        self.overlapped
    }

    pub fn merge_with(&mut self, other: &Self) -> Result<()> {
        self.pairs += other.pairs;
        self.overlapped += other.overlapped;
        self.adapter_read_through += other.adapter_read_through;
        self.overlap_len_sum += other.overlap_len_sum;
        for (&size, &count) in &other.insert_sizes {
            *self.insert_sizes.entry(size).or_insert(0) += count;
        }
        Ok(())
    }

    pub fn summary(&self) -> OverlapSummary {
        let insert_total: u64 = self
            .insert_sizes
            .iter()
            .map(|(&size, &count)| size as u64 * count)
            .sum();
        let insert_count: u64 = self.insert_sizes.values().sum();
        OverlapSummary {
            pairs: self.pairs,
            overlapped: self.overlapped,
            overlap_fraction: fraction(self.overlapped, self.pairs),
            adapter_read_through: self.adapter_read_through,
            adapter_fraction: fraction(self.adapter_read_through, self.pairs),
            mean_overlap_len: fraction(self.overlap_len_sum, self.overlapped),
            mean_insert_size: fraction(insert_total, insert_count),
            insert_sizes: self.insert_sizes.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // 80bp template
    const TEMPLATE: &[u8] =
        b"GATCCTAGGCTTACCGATGCATGCAAGTCCGATTAGGCATCGAAGTTGCAAGCTTAGCCGATAGGCTTACGTACGATCGA";
    const ADAPTER: &[u8] = b"AGATCGGAAGAGCACACGTCTGAACTCCAGTCAC";

    #[test]
    fn test_long_template_overlap() {
        // mates of 60bp from an 80bp fragment overlap by 40bp
        let r1 = &TEMPLATE[..60];
        let r2 = reverse_complement(&TEMPLATE[20..]);
        let result = OverlapAnalysis::analyze(r1, &r2, 5, 30);
        assert_eq!(result, OverlapResult::found(20, 40, 0));
        assert_eq!(result.insert_size(r2.len()), Some(80));
        assert!(!result.has_adapter());
    }

    #[test]
    fn test_short_template_reads_into_adapter() {
        // 40bp fragment sequenced with 50bp reads; both mates end in adapter
        let fragment = &TEMPLATE[..40];
        let mut r1 = fragment.to_vec();
        r1.extend_from_slice(&ADAPTER[..10]);
        let mut r2 = reverse_complement(fragment);
        r2.extend_from_slice(&ADAPTER[..10]);

        let result = OverlapAnalysis::analyze(&r1, &r2, 5, 30);
        assert!(result.overlapped);
        assert_eq!(result.offset, -10);
        assert_eq!(result.overlap_len, 40);
        assert_eq!(result.insert_size(r2.len()), Some(40));
        assert!(result.has_adapter());
    }

    #[test]
    fn test_unrelated_mates_do_not_overlap() {
        let r1 = &TEMPLATE[..60];
        let r2 = vec![b'A'; 60];
        let result = OverlapAnalysis::analyze(r1, &r2, 5, 30);
        assert!(!result.overlapped);
        assert_eq!(result, OverlapResult::default());
        assert_eq!(OverlapAnalysis::analyze(b"", r1, 5, 30), OverlapResult::default());
    }

    #[test]
    fn test_stats_summary_and_merge() {
        let mut a = OverlapStats::new();
        a.record(&OverlapResult::found(20, 40, 0), 60);
        a.record(&OverlapResult::default(), 60);
        let mut b = OverlapStats::new();
        b.record(&OverlapResult::found(-10, 40, 1), 50);

        let mut ab = a.clone();
        ab.merge_with(&b).unwrap();
        let mut ba = b.clone();
        ba.merge_with(&a).unwrap();
        assert_eq!(ab, ba);

        let summary = ab.summary();
        assert_eq!(summary.pairs, 3);
        assert_eq!(summary.overlapped, 2);
        assert_eq!(summary.adapter_read_through, 1);
        assert_eq!(summary.mean_overlap_len, 40.0);
        assert_eq!(summary.mean_insert_size, 60.0);
        assert_eq!(summary.insert_sizes.get(&80), Some(&1));
    }
}
