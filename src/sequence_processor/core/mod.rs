pub(crate) mod pair;
pub(crate) mod processor;
pub(crate) mod sequence;
pub(crate) mod stats;
mod reader;

pub use pair::ReadPair;
pub use processor::SequenceProcessor;
pub use reader::SequenceReader;
pub use sequence::{SequenceRecord, Strand, MAX_PHRED};
pub use stats::ProcessingStats;
