use super::base::{fraction, StatsCollector};
use super::cycle::CycleTable;
use super::duplication::DuplicationEstimator;
use super::kmer::KmerTable;
use super::overlap::{OverlapAnalysis, OverlapStats};
use super::overrep::OverrepSampler;
use super::report::{CycleSummary, ReportPayload};
use crate::config::StatsParams;
use crate::error::{Result, StateError, ValidationError};
use crate::sequence_processor::core::{ReadPair, SequenceProcessor, SequenceRecord};
use crate::utils::nucleotide::{base_index, is_gc, OTHER_SLOT};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AccumulatorState {
    #[default]
    Empty,
    Accumulating,
    Finalized,
}

/// QC statistics for a stream of reads.
///
/// Each worker owns one accumulator; partial accumulators are folded
/// together with [`StatsAccumulator::merge`]. Every collector inside merges
/// by summation (or by an order-free minimum), so the final report does not
/// depend on how reads were ordered or partitioned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsAccumulator {
    params: StatsParams,
    state: AccumulatorState,
    cycles: CycleTable,
    kmers: KmerTable,
    overrep: OverrepSampler,
    duplication: DuplicationEstimator,
    overlap: OverlapStats,
    total_reads: u64,
    total_bases: u64,
    total_pairs: u64,
    gc_count: u64,
    n_count: u64,
    length_hist: BTreeMap<usize, u64>,
}

impl StatsAccumulator {
    pub fn new(params: StatsParams) -> Result<Self> {
        params.validate()?;
        Ok(Self::empty(params))
    }

    fn empty(params: StatsParams) -> Self {
        Self {
            cycles: CycleTable::new(),
            kmers: KmerTable::new(params.kmer_len),
            overrep: OverrepSampler::new(&params.probe_lengths, params.overrep_sample_rate),
            duplication: DuplicationEstimator::new(params.dup_key_len, params.dup_hist_size),
            overlap: OverlapStats::new(),
            state: AccumulatorState::Empty,
            total_reads: 0,
            total_bases: 0,
            total_pairs: 0,
            gc_count: 0,
            n_count: 0,
            length_hist: BTreeMap::new(),
            params,
        }
    }

    pub fn params(&self) -> &StatsParams {
        &self.params
    }

    pub fn state(&self) -> AccumulatorState {
        self.state
    }

    pub fn is_finalized(&self) -> bool {
        self.state == AccumulatorState::Finalized
    }

    pub fn total_reads(&self) -> u64 {
        self.total_reads
    }

    pub fn total_bases(&self) -> u64 {
        self.total_bases
    }

    pub fn total_pairs(&self) -> u64 {
        self.total_pairs
    }

    pub fn gc_count(&self) -> u64 {
        self.gc_count
    }

    pub fn cycles(&self) -> &CycleTable {
        &self.cycles
    }

    pub fn kmers(&self) -> &KmerTable {
        &self.kmers
    }

    pub fn overrep(&self) -> &OverrepSampler {
        &self.overrep
    }

    pub fn duplication(&self) -> &DuplicationEstimator {
        &self.duplication
    }

    pub fn overlap(&self) -> &OverlapStats {
        &self.overlap
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_finalized() {
            return Err(StateError::IngestAfterFinalize.into());
        }
        Ok(())
    }

    /// Fold one read into every summary. A rejected record leaves the
    /// accumulator exactly as it was.
    pub fn ingest(&mut self, record: &SequenceRecord) -> Result<()> {
        self.ensure_open()?;
        record.validate_for_ingest()?;
        self.observe(record);
        self.duplication.process_record(record);
        self.state = AccumulatorState::Accumulating;
        Ok(())
    }

    /// Ingest both mates of a fragment. When both are present the pair also
    /// feeds the duplication estimate and the mate-overlap diagnostics.
    pub fn ingest_pair(&mut self, pair: &ReadPair) -> Result<()> {
        self.ensure_open()?;
        let sides: Vec<&SequenceRecord> = pair.left().into_iter().chain(pair.right()).collect();
        if sides.is_empty() {
            return Err(ValidationError::EmptySequence.into());
        }
        for record in &sides {
            record.validate_for_ingest()?;
        }

        for record in &sides {
            self.observe(record);
        }
        match (pair.left(), pair.right()) {
            (Some(left), Some(right)) => {
                self.duplication.process_pair(left, right);
                let result = OverlapAnalysis::analyze(
                    left.bases(),
                    right.bases(),
                    self.params.overlap_diff_limit,
                    self.params.overlap_require,
                );
                self.overlap.record(&result, right.len());
                self.total_pairs += 1;
            }
            (Some(single), None) | (None, Some(single)) => {
                self.duplication.process_record(single);
            }
            (None, None) => {}
        }
        self.state = AccumulatorState::Accumulating;
        Ok(())
    }

    /// Insert a probe straight into the overrepresentation tree of length
    /// `depth`, bypassing read sampling.
    pub fn insert_probe(&mut self, probe: &[u8], depth: usize) -> Result<()> {
        self.ensure_open()?;
        self.overrep.insert_probe(probe, depth)?;
        self.state = AccumulatorState::Accumulating;
        Ok(())
    }

    fn observe(&mut self, record: &SequenceRecord) {
        self.cycles.process_record(record);
        self.kmers.process_record(record);
        self.overrep.process_record(record);

        self.total_reads += 1;
        self.total_bases += record.len() as u64;
        for &base in record.bases() {
            if is_gc(base) {
                self.gc_count += 1;
            } else if base_index(base) == OTHER_SLOT {
                self.n_count += 1;
            }
        }
        *self.length_hist.entry(record.len()).or_insert(0) += 1;
    }

    /// Fold `other` into this accumulator. `other` may be in any state; this
    /// one must not be finalized. Nothing is changed when the two were built
    /// with different parameters.
    pub fn merge(&mut self, other: &Self) -> Result<()> {
        if self.is_finalized() {
            return Err(StateError::MergeIntoFinalized.into());
        }
        if let Some(field) = first_difference(&self.params, &other.params) {
            return Err(ValidationError::IncompatibleConfig { field }.into());
        }

        self.cycles.merge_with(&other.cycles)?;
        self.kmers.merge_with(&other.kmers)?;
        self.overrep.merge_with(&other.overrep)?;
        self.duplication.merge_with(&other.duplication)?;
        self.overlap.merge_with(&other.overlap)?;

        self.total_reads += other.total_reads;
        self.total_bases += other.total_bases;
        self.total_pairs += other.total_pairs;
        self.gc_count += other.gc_count;
        self.n_count += other.n_count;
        for (&len, &count) in &other.length_hist {
            *self.length_hist.entry(len).or_insert(0) += count;
        }

        if self.state == AccumulatorState::Empty && other.state != AccumulatorState::Empty {
            self.state = AccumulatorState::Accumulating;
        }
        Ok(())
    }

    /// Close the accumulator to further input and build the report.
    /// Calling it again returns an equal payload.
    pub fn finalize(&mut self) -> ReportPayload {
        if !self.is_finalized() {
            debug!(
                "Finalizing accumulator: {} reads, {} bases",
                self.total_reads, self.total_bases
            );
            self.state = AccumulatorState::Finalized;
        }
        self.build_report()
    }

    pub fn report(&self) -> Result<ReportPayload> {
        if !self.is_finalized() {
            return Err(StateError::NotFinalized.into());
        }
        Ok(self.build_report())
    }

    fn build_report(&self) -> ReportPayload {
        let q20_bases = self.cycles.q20_bases();
        let q30_bases = self.cycles.q30_bases();
        let length_sum: u64 = self
            .length_hist
            .iter()
            .map(|(&len, &count)| len as u64 * count)
            .sum();

        ReportPayload {
            total_reads: self.total_reads,
            total_bases: self.total_bases,
            total_pairs: self.total_pairs,
            gc_bases: self.gc_count,
            n_bases: self.n_count,
            gc_percent: 100.0 * fraction(self.gc_count, self.total_bases),
            q20_bases,
            q30_bases,
            q20_percent: 100.0 * fraction(q20_bases, self.total_bases),
            q30_percent: 100.0 * fraction(q30_bases, self.total_bases),
            min_read_length: self.length_hist.keys().next().copied().unwrap_or(0),
            max_read_length: self.length_hist.keys().next_back().copied().unwrap_or(0),
            mean_read_length: fraction(length_sum, self.total_reads),
            min_quality: self.cycles.min_quality(),
            max_quality: self.cycles.max_quality(),
            cycles: self
                .cycles
                .cycles()
                .iter()
                .enumerate()
                .map(|(i, stats)| CycleSummary::from_stats(i, stats))
                .collect(),
            length_distribution: self.length_hist.clone(),
            kmers: self.kmers.summary(self.params.top_n),
            overrepresented: self.overrep.summarize(self.params.top_n, self.total_bases),
            duplication: self.duplication.summary(),
            pair_overlap: (self.overlap.pairs() > 0).then(|| self.overlap.summary()),
        }
    }
}

fn first_difference(a: &StatsParams, b: &StatsParams) -> Option<&'static str> {
    if a.kmer_len != b.kmer_len {
        Some("kmer_len")
    } else if a.probe_lengths != b.probe_lengths {
        Some("probe_lengths")
    } else if a.overrep_sample_rate != b.overrep_sample_rate {
        Some("overrep_sample_rate")
    } else if a.top_n != b.top_n {
        Some("top_n")
    } else if a.dup_key_len != b.dup_key_len {
        Some("dup_key_len")
    } else if a.dup_hist_size != b.dup_hist_size {
        Some("dup_hist_size")
    } else if a.overlap_diff_limit != b.overlap_diff_limit {
        Some("overlap_diff_limit")
    } else if a.overlap_require != b.overlap_require {
        Some("overlap_require")
    } else {
        None
    }
}

impl SequenceProcessor for StatsAccumulator {
    fn process_record(&mut self, record: &SequenceRecord) -> Result<()> {
        self.ingest(record)
    }

    fn process_pair(&mut self, pair: &ReadPair) -> Result<()> {
        self.ingest_pair(pair)
    }

    fn get_min_length(&self) -> usize {
        1
    }

    fn fork(&self) -> Self {
        Self::empty(self.params.clone())
    }

    fn supports_parallel(&self) -> bool {
        true
    }

    fn merge_processor(&mut self, other: &Self) -> Result<()> {
        self.merge(other)
    }
}
