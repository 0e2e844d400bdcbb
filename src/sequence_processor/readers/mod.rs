mod fastq;

pub use fastq::{FastqPairReader, FastqReader};
