use super::base::{fraction, StatsCollector};
use crate::error::Result;
use crate::sequence_processor::core::SequenceRecord;
use crate::utils::nucleotide::{base_index, BASES};
use serde::{Deserialize, Serialize};

pub const Q20: u8 = 20;
pub const Q30: u8 = 30;

/// Raw sums for one read position.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleStats {
    /// Indexed A, C, G, T, other.
    pub base_counts: [u64; 5],
    pub base_quality_sums: [u64; 5],
    pub quality_sum: u64,
    pub quality_sum_squares: u64,
    pub quality_count: u64,
    /// Bases scoring strictly above [`Q20`].
    pub q20_bases: u64,
    /// Bases scoring strictly above [`Q30`].
    pub q30_bases: u64,
}

impl CycleStats {
    fn observe(&mut self, base: u8, quality: u8) {
        let slot = base_index(base);
        let q = quality as u64;
        self.base_counts[slot] += 1;
        self.base_quality_sums[slot] += q;
        self.quality_sum += q;
        self.quality_sum_squares += q * q;
        self.quality_count += 1;
        if quality > Q20 {
            self.q20_bases += 1;
        }
        if quality > Q30 {
            self.q30_bases += 1;
        }
    }

    fn absorb(&mut self, other: &CycleStats) {
        for slot in 0..BASES.len() {
            self.base_counts[slot] += other.base_counts[slot];
            self.base_quality_sums[slot] += other.base_quality_sums[slot];
        }
        self.quality_sum += other.quality_sum;
        self.quality_sum_squares += other.quality_sum_squares;
        self.quality_count += other.quality_count;
        self.q20_bases += other.q20_bases;
        self.q30_bases += other.q30_bases;
    }

    pub fn base_count(&self, base: u8) -> u64 {
        self.base_counts[base_index(base)]
    }

    pub fn gc_count(&self) -> u64 {
        self.base_counts[1] + self.base_counts[2]
    }

    pub fn mean_quality(&self) -> f64 {
        fraction(self.quality_sum, self.quality_count)
    }

    /// Population standard deviation of the quality scores at this cycle.
    pub fn quality_std_dev(&self) -> f64 {
        if self.quality_count == 0 {
            return 0.0;
        }
        let mean = self.mean_quality();
        let variance = fraction(self.quality_sum_squares, self.quality_count) - mean * mean;
        variance.max(0.0).sqrt()
    }

    pub fn base_mean_quality(&self, slot: usize) -> f64 {
        fraction(self.base_quality_sums[slot], self.base_counts[slot])
    }
}

/// Per-cycle histograms. Grows to the longest read seen; shorter reads
/// simply leave the tail cycles alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleTable {
    cycles: Vec<CycleStats>,
    min_quality: Option<u8>,
    max_quality: Option<u8>,
}

impl CycleTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cycles(&self) -> &[CycleStats] {
        &self.cycles
    }

    pub fn len(&self) -> usize {
        self.cycles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cycles.is_empty()
    }

    pub fn total_bases(&self) -> u64 {
        self.cycles.iter().map(|c| c.quality_count).sum()
    }

    pub fn q20_bases(&self) -> u64 {
        self.cycles.iter().map(|c| c.q20_bases).sum()
    }

    pub fn q30_bases(&self) -> u64 {
        self.cycles.iter().map(|c| c.q30_bases).sum()
    }

    pub fn min_quality(&self) -> Option<u8> {
        self.min_quality
    }

    pub fn max_quality(&self) -> Option<u8> {
        self.max_quality
    }
}

impl StatsCollector for CycleTable {
    fn process_record(&mut self, record: &SequenceRecord) {
        if record.len() > self.cycles.len() {
            self.cycles.resize(record.len(), CycleStats::default());
        }
        for (i, (&base, &quality)) in record.bases().iter().zip(record.quality()).enumerate() {
            self.cycles[i].observe(base, quality);
        }
        if let (Some(&lo), Some(&hi)) = (
            record.quality().iter().min(),
            record.quality().iter().max(),
        ) {
            self.min_quality = Some(self.min_quality.map_or(lo, |m| m.min(lo)));
            self.max_quality = Some(self.max_quality.map_or(hi, |m| m.max(hi)));
        }
    }

    fn merge_with(&mut self, other: &Self) -> Result<()> {
        if other.cycles.len() > self.cycles.len() {
            self.cycles.resize(other.cycles.len(), CycleStats::default());
        }
        for (mine, theirs) in self.cycles.iter_mut().zip(&other.cycles) {
            mine.absorb(theirs);
        }
        self.min_quality = match (self.min_quality, other.min_quality) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        self.max_quality = match (self.max_quality, other.max_quality) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };
        Ok(())
    }
}
