//! Error types for the QC accumulator.

use thiserror::Error;

/// Result type alias for accumulator operations
pub type Result<T> = std::result::Result<T, QcError>;

/// Malformed input or incompatible configuration.
///
/// A single bad record produces one of these; the accumulator that rejected
/// it is left untouched and can keep ingesting.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("quality length {quality} does not match sequence length {bases}")]
    LengthMismatch { bases: usize, quality: usize },

    #[error("record has an empty sequence")]
    EmptySequence,

    #[error("record has no quality scores")]
    MissingQuality,

    #[error("quality character {value:#04x} is below the Phred+33 floor")]
    InvalidQuality { value: u8 },

    #[error("probe of length {len} is shorter than tree depth {depth}")]
    ProbeTooShort { len: usize, depth: usize },

    #[error("cannot merge accumulators with different '{field}' settings")]
    IncompatibleConfig { field: &'static str },

    #[error("Invalid parameter '{parameter}': {reason}")]
    InvalidParameter { parameter: String, reason: String },
}

/// Operation not allowed in the accumulator's current lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StateError {
    #[error("cannot ingest into a finalized accumulator")]
    IngestAfterFinalize,

    #[error("cannot merge into a finalized accumulator")]
    MergeIntoFinalized,

    #[error("report requested before finalize")]
    NotFinalized,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QcError {
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("state error: {0}")]
    State(#[from] StateError),
}

impl QcError {
    /// True for per-record problems the caller may skip over.
    pub fn is_validation(&self) -> bool {
        matches!(self, QcError::Validation(_))
    }

    pub fn invalid_parameter(parameter: &str, reason: impl Into<String>) -> Self {
        QcError::Validation(ValidationError::InvalidParameter {
            parameter: parameter.to_string(),
            reason: reason.into(),
        })
    }
}
