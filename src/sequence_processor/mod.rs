pub mod collectors;
pub mod core;
pub mod readers;
pub mod threading;

// Re-export commonly used items
pub use collectors::base::StatsCollector;
pub use collectors::{ReportPayload, StatsAccumulator};
pub use self::core::{ReadPair, SequenceProcessor, SequenceReader, SequenceRecord, Strand};
pub use threading::CancellationToken;
