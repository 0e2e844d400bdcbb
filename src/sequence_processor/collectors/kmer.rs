use super::base::{fraction, StatsCollector};
use crate::error::{Result, ValidationError};
use crate::sequence_processor::core::SequenceRecord;
use crate::utils::nucleotide::{canonical_code, decode_kmer, encode_kmer, KmerCodes};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Strand-symmetric k-mer counts. Every window is folded onto the smaller
/// of itself and its reverse complement; windows containing anything other
/// than A/C/G/T are skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KmerTable {
    k: usize,
    counts: HashMap<u64, u64>,
    total: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedCount {
    pub sequence: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KmerSummary {
    pub k: usize,
    pub total: u64,
    pub distinct: usize,
    pub min_count: u64,
    pub max_count: u64,
    /// Shannon entropy (natural log) of the canonical k-mer distribution.
    pub shannon_diversity: f64,
    pub counts: BTreeMap<String, u64>,
    pub top: Vec<RankedCount>,
}

impl KmerTable {
    pub fn new(k: usize) -> Self {
        Self {
            k,
            counts: HashMap::new(),
            total: 0,
        }
    }

    pub fn k(&self) -> usize {
        self.k
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn distinct(&self) -> usize {
        self.counts.len()
    }

    /// Count for `kmer` after canonicalization, so a k-mer and its reverse
    /// complement report the same value.
    pub fn count(&self, kmer: &str) -> u64 {
        if kmer.len() != self.k {
            return 0;
        }
        encode_kmer(kmer.as_bytes())
            .and_then(|code| self.counts.get(&canonical_code(code, self.k)))
            .copied()
            .unwrap_or(0)
    }

    fn sorted_codes(&self) -> Vec<(u64, u64)> {
        let mut entries: Vec<(u64, u64)> = self.counts.iter().map(|(&k, &v)| (k, v)).collect();
        entries.sort_unstable();
        entries
    }

    /// Counts keyed by the canonical k-mer string, in lexicographic order.
    pub fn sorted_counts(&self) -> BTreeMap<String, u64> {
        self.counts
            .iter()
            .map(|(&code, &count)| (decode_kmer(code, self.k), count))
            .collect()
    }

    /// Most frequent canonical k-mers; ties go to the lexicographically smaller.
    pub fn top(&self, n: usize) -> Vec<RankedCount> {
        let mut entries = self.sorted_codes();
        // codes sort in lexicographic order, so a stable sort keeps ties ordered
        entries.sort_by(|a, b| b.1.cmp(&a.1));
        entries
            .into_iter()
            .take(n)
            .map(|(code, count)| RankedCount {
                sequence: decode_kmer(code, self.k),
                count,
            })
            .collect()
    }

    /// Summed in key order so the result does not depend on hash layout.
    pub fn shannon_diversity(&self) -> f64 {
        self.sorted_codes()
            .into_iter()
            .map(|(_, count)| fraction(count, self.total))
            .filter(|&p| p > 0.0)
            .map(|p| -p * p.ln())
            .sum()
    }

    pub fn summary(&self, top_n: usize) -> KmerSummary {
        KmerSummary {
            k: self.k,
            total: self.total,
            distinct: self.distinct(),
            min_count: self.counts.values().copied().min().unwrap_or(0),
            max_count: self.counts.values().copied().max().unwrap_or(0),
            shannon_diversity: self.shannon_diversity(),
            counts: self.sorted_counts(),
            top: self.top(top_n),
        }
    }
}

impl StatsCollector for KmerTable {
    fn process_record(&mut self, record: &SequenceRecord) {
        for code in KmerCodes::new(record.bases(), self.k) {
            *self.counts.entry(canonical_code(code, self.k)).or_insert(0) += 1;
            self.total += 1;
        }
    }

    fn merge_with(&mut self, other: &Self) -> Result<()> {
        if self.k != other.k {
            return Err(ValidationError::IncompatibleConfig { field: "kmer_len" }.into());
        }
        for (&code, &count) in &other.counts {
            *self.counts.entry(code).or_insert(0) += count;
        }
        self.total += other.total;
        Ok(())
    }
}
