use super::base::{fraction, StatsCollector};
use super::nucleotide_tree::{OverrepresentationTree, DOMINANT_MIN_TOTAL, DOMINANT_RATIO};
use crate::error::{QcError, Result, ValidationError};
use crate::sequence_processor::core::SequenceRecord;
use seahash::SeaHasher;
use serde::{Deserialize, Serialize};
use std::hash::Hasher;

/// Sampled count above which a probe of the given length is flagged.
fn pass_threshold(probe_len: usize) -> u64 {
    match probe_len {
        10 => 500,
        20 => 200,
        40 => 100,
        100 => 50,
        _ => 20,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverrepresentedSequence {
    pub sequence: String,
    /// Hits among sampled reads.
    pub count: u64,
    /// `count` scaled back up by the sample rate.
    pub estimated_count: u64,
    pub percent_of_bases: f64,
    /// Observed hits over the hits expected if every base were uniform.
    pub fold_enrichment: f64,
    pub significant: bool,
    /// Sampled hits by the 0-based read cycle the probe started at.
    pub positions: Vec<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeSummary {
    pub probe_len: usize,
    pub probes: u64,
    pub distinct: usize,
    pub dominant_prefix: String,
    pub sequences: Vec<OverrepresentedSequence>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverrepSummary {
    pub sample_rate: u64,
    pub sampled_reads: u64,
    pub probes: Vec<ProbeSummary>,
}

/// Sampled probe counting, one tree per probe length.
///
/// Whether a read is sampled depends only on its name and bases, so the same
/// reads are picked however the input is ordered or partitioned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverrepSampler {
    sample_rate: u64,
    trees: Vec<OverrepresentationTree>,
    sampled_reads: u64,
}

impl OverrepSampler {
    pub fn new(probe_lengths: &[usize], sample_rate: u64) -> Self {
        Self {
            sample_rate,
            trees: probe_lengths
                .iter()
                .map(|&len| OverrepresentationTree::new(len))
                .collect(),
            sampled_reads: 0,
        }
    }

    pub fn sample_rate(&self) -> u64 {
        self.sample_rate
    }

    pub fn sampled_reads(&self) -> u64 {
        self.sampled_reads
    }

    pub fn trees(&self) -> &[OverrepresentationTree] {
        &self.trees
    }

    pub fn tree(&self, depth: usize) -> Option<&OverrepresentationTree> {
        self.trees.iter().find(|t| t.depth() == depth)
    }

    pub fn is_sampled(&self, record: &SequenceRecord) -> bool {
        if self.sample_rate == 0 {
            return false;
        }
        let mut hasher = SeaHasher::new();
        hasher.write(record.name().as_bytes());
        hasher.write_u8(0);
        hasher.write(record.bases());
        hasher.finish() % self.sample_rate == 0
    }

    /// Insert one probe directly into the tree of the given depth. Only the
    /// first `depth` bases are used.
    pub fn insert_probe(&mut self, probe: &[u8], depth: usize) -> Result<()> {
        let tree = self
            .trees
            .iter_mut()
            .find(|t| t.depth() == depth)
            .ok_or_else(|| {
                QcError::invalid_parameter("probe_lengths", format!("no tree of depth {depth}"))
            })?;
        if probe.len() < depth {
            return Err(ValidationError::ProbeTooShort {
                len: probe.len(),
                depth,
            }
            .into());
        }
        tree.insert(&probe[..depth]);
        Ok(())
    }

    pub fn summarize(&self, top_n: usize, total_bases: u64) -> OverrepSummary {
        let rate = self.sample_rate;
        let probes = self
            .trees
            .iter()
            .map(|tree| {
                let len = tree.depth();
                let probes = tree.total_hits();
                let expected = probes as f64 / 4f64.powi(len as i32);
                let sequences = tree
                    .top_n(top_n)
                    .map(|(sequence, count)| OverrepresentedSequence {
                        positions: tree.positions(sequence.as_bytes()).to_vec(),
                        sequence,
                        count,
                        estimated_count: count * rate,
                        percent_of_bases: 100.0
                            * fraction(count * len as u64 * rate, total_bases),
                        fold_enrichment: if expected > 0.0 {
                            count as f64 / expected
                        } else {
                            0.0
                        },
                        significant: count * rate > pass_threshold(len),
                    })
                    .collect();
                ProbeSummary {
                    probe_len: len,
                    probes,
                    distinct: tree.distinct_paths(),
                    dominant_prefix: tree.dominant_path(DOMINANT_MIN_TOTAL, DOMINANT_RATIO),
                    sequences,
                }
            })
            .collect();

        OverrepSummary {
            sample_rate: rate,
            sampled_reads: self.sampled_reads,
            probes,
        }
    }

    fn compatible(&self, other: &Self) -> Result<()> {
        if self.sample_rate != other.sample_rate {
            return Err(ValidationError::IncompatibleConfig {
                field: "overrep_sample_rate",
            }
            .into());
        }
        let depths = self.trees.iter().map(|t| t.depth());
        if !depths.eq(other.trees.iter().map(|t| t.depth())) {
            return Err(ValidationError::IncompatibleConfig {
                field: "probe_lengths",
            }
            .into());
        }
        Ok(())
    }
}

impl StatsCollector for OverrepSampler {
    fn process_record(&mut self, record: &SequenceRecord) {
        if !self.is_sampled(record) {
            return;
        }
        self.sampled_reads += 1;
        let bases = record.bases();
        for tree in &mut self.trees {
            let len = tree.depth();
            let mut start = 0;
            while start + len <= bases.len() {
                tree.insert_at(&bases[start..start + len], start);
                start += len;
            }
        }
    }

    fn merge_with(&mut self, other: &Self) -> Result<()> {
        self.compatible(other)?;
        for (mine, theirs) in self.trees.iter_mut().zip(&other.trees) {
            mine.merge(theirs)?;
        }
        self.sampled_reads += other.sampled_reads;
        Ok(())
    }
}
