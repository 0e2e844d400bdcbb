use super::base::{fraction, StatsCollector};
use crate::error::{Result, ValidationError};
use crate::sequence_processor::core::SequenceRecord;
use crate::utils::nucleotide::encode_kmer;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::Entry;
use std::collections::HashMap;

const FINGERPRINT_LEN: usize = 32;
/// Bases left out at the 3' end when taking a single read's fingerprint.
const TAIL_SKIP: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct DupEntry {
    fingerprint: u64,
    count: u64,
    /// Sum of per-read GC fractions scaled to 0..=255.
    gc_sum: u64,
}

impl DupEntry {
    /// Keeps the smallest fingerprint seen for a key, which makes the result
    /// independent of arrival order.
    fn absorb(&mut self, other: DupEntry) {
        if other.fingerprint == self.fingerprint {
            self.count += other.count;
            self.gc_sum += other.gc_sum;
        } else if other.fingerprint < self.fingerprint {
            *self = other;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicationSummary {
    pub rate: f64,
    /// `histogram[i]` = keys seen `i + 1` times; the last bucket holds the rest.
    pub histogram: Vec<u64>,
    pub mean_gc: Vec<f64>,
}

/// Approximate duplication level. Reads are bucketed by a short prefix key
/// and compared by a 32-mer fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicationEstimator {
    key_len: usize,
    hist_size: usize,
    entries: HashMap<u64, DupEntry>,
}

impl DuplicationEstimator {
    pub fn new(key_len: usize, hist_size: usize) -> Self {
        Self {
            key_len,
            hist_size,
            entries: HashMap::new(),
        }
    }

    fn add(&mut self, key: u64, entry: DupEntry) {
        match self.entries.entry(key) {
            Entry::Occupied(mut existing) => existing.get_mut().absorb(entry),
            Entry::Vacant(slot) => {
                slot.insert(entry);
            }
        }
    }

    /// Mates are keyed on mate 1's prefix and fingerprinted on mate 2's.
    pub fn process_pair(&mut self, left: &SequenceRecord, right: &SequenceRecord) {
        if left.len() < FINGERPRINT_LEN || right.len() < FINGERPRINT_LEN {
            return;
        }
        let Some(key) = encode_kmer(&left.bases()[..self.key_len]) else {
            return;
        };
        let Some(fingerprint) = encode_kmer(&right.bases()[..FINGERPRINT_LEN]) else {
            return;
        };
        let gc = scaled_gc(
            (left.gc_count() + right.gc_count()) as u64,
            (left.len() + right.len()) as u64,
        );
        self.add(
            key,
            DupEntry {
                fingerprint,
                count: 1,
                gc_sum: gc,
            },
        );
    }

    pub fn keys(&self) -> usize {
        self.entries.len()
    }

    pub fn summary(&self) -> DuplicationSummary {
        let mut histogram = vec![0u64; self.hist_size];
        let mut reads_per_level = vec![0u64; self.hist_size];
        let mut gc_per_level = vec![0u64; self.hist_size];
        let mut total = 0u64;

        for entry in self.entries.values() {
            let level = (entry.count as usize).min(self.hist_size) - 1;
            histogram[level] += 1;
            reads_per_level[level] += entry.count;
            gc_per_level[level] += entry.gc_sum;
            total += entry.count;
        }

        let mean_gc = gc_per_level
            .iter()
            .zip(&reads_per_level)
            .map(|(&gc, &reads)| fraction(gc, reads) / 255.0)
            .collect();

        DuplicationSummary {
            rate: fraction(total - self.entries.len() as u64, total),
            histogram,
            mean_gc,
        }
    }
}

fn scaled_gc(gc: u64, len: u64) -> u64 {
    (255.0 * fraction(gc, len)).round() as u64
}

impl StatsCollector for DuplicationEstimator {
    fn process_record(&mut self, record: &SequenceRecord) {
        if record.len() < FINGERPRINT_LEN {
            return;
        }
        let bases = record.bases();
        let Some(key) = encode_kmer(&bases[..self.key_len]) else {
            return;
        };
        let start = bases.len().saturating_sub(FINGERPRINT_LEN + TAIL_SKIP);
        let Some(fingerprint) = encode_kmer(&bases[start..start + FINGERPRINT_LEN]) else {
            return;
        };
        let gc = scaled_gc(record.gc_count() as u64, record.len() as u64);
        self.add(
            key,
            DupEntry {
                fingerprint,
                count: 1,
                gc_sum: gc,
            },
        );
    }

    fn merge_with(&mut self, other: &Self) -> Result<()> {
        if self.key_len != other.key_len {
            return Err(ValidationError::IncompatibleConfig { field: "dup_key_len" }.into());
        }
        if self.hist_size != other.hist_size {
            return Err(ValidationError::IncompatibleConfig { field: "dup_hist_size" }.into());
        }
        for (&key, &entry) in &other.entries {
            self.add(key, entry);
        }
        Ok(())
    }
}
