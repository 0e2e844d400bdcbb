mod config;

pub use config::{QcConfig, StatsParams};
