use super::base::fraction;
use super::cycle::CycleStats;
use super::duplication::DuplicationSummary;
use super::kmer::KmerSummary;
use super::overlap::OverlapSummary;
use super::overrep::OverrepSummary;
use crate::utils::nucleotide::OTHER_SLOT;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseCounts {
    pub a: u64,
    pub c: u64,
    pub g: u64,
    pub t: u64,
    pub n: u64,
}

impl From<[u64; 5]> for BaseCounts {
    fn from(counts: [u64; 5]) -> Self {
        let [a, c, g, t, n] = counts;
        Self { a, c, g, t, n }
    }
}

/// Derived view of one read position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleSummary {
    pub cycle: usize,
    pub bases: u64,
    pub base_counts: BaseCounts,
    /// Percent of bases at this cycle, indexed A, C, G, T, N.
    pub base_percent: [f64; 5],
    pub gc_percent: f64,
    pub mean_quality: f64,
    pub quality_std_dev: f64,
    /// Mean quality of each base, indexed A, C, G, T, N.
    pub base_mean_quality: [f64; 5],
    pub q20_bases: u64,
    pub q30_bases: u64,
}

impl CycleSummary {
    pub fn from_stats(cycle: usize, stats: &CycleStats) -> Self {
        let bases = stats.quality_count;
        let mut base_percent = [0.0; 5];
        let mut base_mean_quality = [0.0; 5];
        for slot in 0..=OTHER_SLOT {
            base_percent[slot] = 100.0 * fraction(stats.base_counts[slot], bases);
            base_mean_quality[slot] = stats.base_mean_quality(slot);
        }
        Self {
            cycle,
            bases,
            base_counts: stats.base_counts.into(),
            base_percent,
            gc_percent: 100.0 * fraction(stats.gc_count(), bases),
            mean_quality: stats.mean_quality(),
            quality_std_dev: stats.quality_std_dev(),
            base_mean_quality,
            q20_bases: stats.q20_bases,
            q30_bases: stats.q30_bases,
        }
    }
}

/// Everything a renderer needs, computed once from the raw sums.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportPayload {
    pub total_reads: u64,
    pub total_bases: u64,
    pub total_pairs: u64,
    pub gc_bases: u64,
    pub n_bases: u64,
    pub gc_percent: f64,
    pub q20_bases: u64,
    pub q30_bases: u64,
    pub q20_percent: f64,
    pub q30_percent: f64,
    pub min_read_length: usize,
    pub max_read_length: usize,
    pub mean_read_length: f64,
    pub min_quality: Option<u8>,
    pub max_quality: Option<u8>,
    pub cycles: Vec<CycleSummary>,
    pub length_distribution: BTreeMap<usize, u64>,
    pub kmers: KmerSummary,
    pub overrepresented: OverrepSummary,
    pub duplication: DuplicationSummary,
    /// Present once at least one complete pair was ingested.
    pub pair_overlap: Option<OverlapSummary>,
}

impl ReportPayload {
    pub fn cycle(&self, index: usize) -> Option<&CycleSummary> {
        self.cycles.get(index)
    }

    /// Mean quality curve across cycles.
    pub fn mean_quality_curve(&self) -> Vec<f64> {
        self.cycles.iter().map(|c| c.mean_quality).collect()
    }

    pub fn gc_curve(&self) -> Vec<f64> {
        self.cycles.iter().map(|c| c.gc_percent).collect()
    }
}
