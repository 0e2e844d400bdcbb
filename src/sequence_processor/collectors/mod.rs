pub mod accumulator;
pub mod base;
pub mod cycle;
pub mod duplication;
pub mod kmer;
pub mod nucleotide_tree;
pub mod overlap;
pub mod overrep;
pub mod report;

pub use accumulator::{AccumulatorState, StatsAccumulator};
pub use nucleotide_tree::OverrepresentationTree;
pub use overlap::{OverlapAnalysis, OverlapResult};
pub use report::ReportPayload;
