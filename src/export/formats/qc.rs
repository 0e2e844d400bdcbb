use crate::config::StatsParams;
use crate::sequence_processor::collectors::ReportPayload;
use crate::sequence_processor::core::ProcessingStats;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QcExport {
    /// SHA-256 of the serialized report; equal inputs and parameters give
    /// the same digest regardless of thread count.
    pub hexdigest: String,
    pub parameters: QcParameters,
    pub processing: QcProcessing,
    pub report: ReportPayload,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QcParameters {
    pub phred64: bool,
    #[serde(flatten)]
    pub stats: StatsParams,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QcProcessing {
    pub records_processed: u64,
    pub records_skipped: u64,
    pub records_rejected: u64,
    pub records_too_short: u64,
    pub cancelled: bool,
}

impl From<&ProcessingStats> for QcProcessing {
    fn from(stats: &ProcessingStats) -> Self {
        Self {
            records_processed: stats.processed,
            records_skipped: stats.skipped,
            records_rejected: stats.errors,
            records_too_short: stats.too_short,
            cancelled: stats.cancelled,
        }
    }
}

impl QcExport {
    pub fn new(
        stats_params: &StatsParams,
        phred64: bool,
        processing: &ProcessingStats,
        report: ReportPayload,
    ) -> Result<Self> {
        Ok(Self {
            hexdigest: report_digest(&report)?,
            parameters: QcParameters {
                phred64,
                stats: stats_params.clone(),
            },
            processing: processing.into(),
            report,
        })
    }
}

pub fn report_digest(report: &ReportPayload) -> Result<String> {
    let mut hasher = Sha256::new();
    hasher.update(serde_json::to_vec(report)?);
    Ok(format!("{:x}", hasher.finalize()))
}
