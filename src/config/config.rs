use crate::error::{QcError, Result};
use anyhow::Context;
use directories::ProjectDirs;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Settings that shape the statistics themselves. Two accumulators can only
/// be merged when these are identical.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsParams {
    #[serde(default = "default_kmer_len")]
    pub kmer_len: usize,
    #[serde(default = "default_probe_lengths")]
    pub probe_lengths: Vec<usize>,
    /// One read in this many is sampled for overrepresentation; 0 turns it off.
    #[serde(default = "default_overrep_sample_rate")]
    pub overrep_sample_rate: u64,
    #[serde(default = "default_top_n")]
    pub top_n: usize,
    #[serde(default = "default_dup_key_len")]
    pub dup_key_len: usize,
    #[serde(default = "default_dup_hist_size")]
    pub dup_hist_size: usize,
    #[serde(default = "default_overlap_diff_limit")]
    pub overlap_diff_limit: usize,
    #[serde(default = "default_overlap_require")]
    pub overlap_require: usize,
}

fn default_kmer_len() -> usize {
    5
}

fn default_probe_lengths() -> Vec<usize> {
    vec![10, 20, 40, 100]
}

fn default_overrep_sample_rate() -> u64 {
    20
}

fn default_top_n() -> usize {
    20
}

fn default_dup_key_len() -> usize {
    12
}

fn default_dup_hist_size() -> usize {
    32
}

fn default_overlap_diff_limit() -> usize {
    5
}

fn default_overlap_require() -> usize {
    30
}

impl Default for StatsParams {
    fn default() -> Self {
        Self {
            kmer_len: default_kmer_len(),
            probe_lengths: default_probe_lengths(),
            overrep_sample_rate: default_overrep_sample_rate(),
            top_n: default_top_n(),
            dup_key_len: default_dup_key_len(),
            dup_hist_size: default_dup_hist_size(),
            overlap_diff_limit: default_overlap_diff_limit(),
            overlap_require: default_overlap_require(),
        }
    }
}

impl StatsParams {
    pub fn validate(&self) -> Result<()> {
        if !(1..=31).contains(&self.kmer_len) {
            return Err(QcError::invalid_parameter("kmer_len", "must be between 1 and 31"));
        }
        if self.probe_lengths.is_empty() {
            return Err(QcError::invalid_parameter("probe_lengths", "needs at least one length"));
        }
        if self.probe_lengths.contains(&0) {
            return Err(QcError::invalid_parameter("probe_lengths", "lengths must be positive"));
        }
        let mut sorted = self.probe_lengths.clone();
        sorted.sort_unstable();
        sorted.dedup();
        if sorted.len() != self.probe_lengths.len() {
            return Err(QcError::invalid_parameter("probe_lengths", "lengths must be distinct"));
        }
        if !(1..=16).contains(&self.dup_key_len) {
            return Err(QcError::invalid_parameter("dup_key_len", "must be between 1 and 16"));
        }
        if self.dup_hist_size == 0 {
            return Err(QcError::invalid_parameter("dup_hist_size", "must be positive"));
        }
        if self.top_n == 0 {
            return Err(QcError::invalid_parameter("top_n", "must be positive"));
        }
        if self.overlap_diff_limit == 0 {
            return Err(QcError::invalid_parameter("overlap_diff_limit", "must be positive"));
        }
        if self.overlap_require == 0 {
            return Err(QcError::invalid_parameter("overlap_require", "must be positive"));
        }
        Ok(())
    }
}

/// Run configuration, read from `config.toml`.
///
/// ```toml
/// threads = 4
///
/// [stats]
/// kmer_len = 7
/// probe_lengths = [10, 20]
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QcConfig {
    #[serde(default = "default_threads")]
    pub threads: usize,
    #[serde(default)]
    pub phred64: bool,
    #[serde(default)]
    pub stats: StatsParams,
}

fn default_threads() -> usize {
    1
}

impl Default for QcConfig {
    fn default() -> Self {
        Self {
            threads: default_threads(),
            phred64: false,
            stats: StatsParams::default(),
        }
    }
}

impl QcConfig {
    fn project_dirs() -> Option<ProjectDirs> {
        ProjectDirs::from("com", "fqlib", "fqlib-tools")
    }

    /// User config if one exists and parses, defaults otherwise.
    pub fn load() -> Self {
        if let Some(proj_dirs) = Self::project_dirs() {
            let config_path = proj_dirs.config_dir().join("config.toml");
            if config_path.exists() {
                match Self::from_file(&config_path) {
                    Ok(config) => return config,
                    Err(e) => warn!("Ignoring {}: {:#}", config_path.display(), e),
                }
            }
        }
        debug!("Using default configuration");
        QcConfig::default()
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: QcConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        config.stats.validate()?;
        Ok(config)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        if let Some(proj_dirs) = Self::project_dirs() {
            let config_dir = proj_dirs.config_dir();
            fs::create_dir_all(config_dir)?;
            self.save_to(&config_dir.join("config.toml"))?;
        }
        Ok(())
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write config {}", path.display()))?;
        Ok(())
    }
}
