pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod export;
pub mod sequence_processor;
pub mod utils;

// Re-export main API
pub use config::{QcConfig, StatsParams};
pub use error::{QcError, StateError, ValidationError};
pub use sequence_processor::collectors::{
    AccumulatorState, OverrepresentationTree, ReportPayload, StatsAccumulator,
};
pub use sequence_processor::core::{ReadPair, SequenceRecord, Strand};
