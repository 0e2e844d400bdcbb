pub mod formats;

use crate::export::formats::qc::QcExport;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::de::{Deserializer, Error};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

const RECORD_TYPE: &str = "org.fqlib.qc.analysis";
const EXPORT_VERSION: &str = "1.0";

/// Root structure for all exports
#[derive(Debug, Serialize, Deserialize)]
pub struct AnalysisExport {
    #[serde(rename = "$type")]
    pub record_type: String,

    pub version: String,
    #[serde(serialize_with = "serialize_datetime", deserialize_with = "deserialize_datetime")]
    pub created_at: DateTime<Utc>,
    pub tool_version: String,

    #[serde(flatten)]
    pub data: AnalysisData,

    pub metadata: ExportMetadata,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum AnalysisData {
    Qc(QcExport),
}

fn serialize_datetime<S>(date: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&date.to_rfc3339())
}

fn deserialize_datetime<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(D::Error::custom)
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ExportMetadata {
    pub sample_id: Option<String>,
    pub inputs: Vec<String>,
    pub tags: Vec<String>,
}

impl AnalysisExport {
    pub fn qc(export: QcExport, metadata: ExportMetadata) -> Self {
        Self {
            record_type: RECORD_TYPE.to_string(),
            version: EXPORT_VERSION.to_string(),
            created_at: Utc::now(),
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
            data: AnalysisData::Qc(export),
            metadata,
        }
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        let file = File::create(path)
            .with_context(|| format!("Failed to create report file {}", path.display()))?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
        Ok(())
    }
}
