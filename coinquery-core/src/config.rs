//! Run configuration.
//!
//! One explicit struct passed into each component at construction, instead
//! of process-wide globals. Defaults reproduce the deployed task runtime
//! conventions (`IEXEC_IN`/`IEXEC_OUT` directories, `bigquery.json`
//! descriptor); a TOML deployment profile and environment variables can
//! override them.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Fixed default ticker list, in declared backfill order.
pub const DEFAULT_TICKERS: &[&str] = &["BTC", "ETH"];

/// Tickers must be strictly shorter than this (exclusive bound).
pub const DEFAULT_MAX_TICKER_LEN: usize = 6;

/// Accepted-token cap applied while scanning arguments, before dedup.
pub const DEFAULT_MAX_INPUT: usize = 10;

/// Errors from loading a deployment profile.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
}

/// How the fixed default tickers combine with user input.
///
/// Observed deployments differ: earlier ones always union in the defaults,
/// later ones only top up small sets. Both behaviors are one config value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DefaultTickerPolicy {
    /// Union the full default list into every query.
    AlwaysIncludeDefaults,
    /// Add defaults one at a time, in declared order, each at most once,
    /// until the set holds at least `min` tickers.
    BackfillToMinimum { min: usize },
}

/// Whether a failing run also emits the ABI-encoded callback payload in the
/// completion descriptor. The error marker is written either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallbackPolicy {
    Emit,
    LogOnly,
}

/// Complete configuration for one invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DappConfig {
    /// Directory holding the dataset descriptor.
    pub input_dir: PathBuf,
    /// Directory receiving the artifact set. Fresh per invocation.
    pub output_dir: PathBuf,
    /// Dataset descriptor filename inside `input_dir`.
    pub dataset_filename: String,
    /// Exclusive upper bound on ticker token length.
    pub max_ticker_len: usize,
    /// Maximum number of accepted input tokens per run.
    pub max_input: usize,
    /// Fixed default tickers, in backfill order.
    pub default_tickers: Vec<String>,
    pub default_policy: DefaultTickerPolicy,
    pub callback_policy: CallbackPolicy,
    /// Query endpoint for the HTTP source, if deployed online.
    pub source_endpoint: Option<String>,
}

impl Default for DappConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("./iexec_in"),
            output_dir: PathBuf::from("./iexec_out"),
            dataset_filename: "bigquery.json".into(),
            max_ticker_len: DEFAULT_MAX_TICKER_LEN,
            max_input: DEFAULT_MAX_INPUT,
            default_tickers: DEFAULT_TICKERS.iter().map(|s| s.to_string()).collect(),
            default_policy: DefaultTickerPolicy::BackfillToMinimum { min: 2 },
            callback_policy: CallbackPolicy::Emit,
            source_endpoint: None,
        }
    }
}

impl DappConfig {
    /// Defaults with environment overrides applied.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        cfg.apply_env();
        cfg
    }

    /// Overlay the task runtime's environment variables onto this config.
    pub fn apply_env(&mut self) {
        if let Ok(dir) = std::env::var("IEXEC_IN") {
            self.input_dir = PathBuf::from(dir);
        }
        if let Ok(dir) = std::env::var("IEXEC_OUT") {
            self.output_dir = PathBuf::from(dir);
        }
        if let Ok(name) = std::env::var("IEXEC_DATASET_FILENAME") {
            self.dataset_filename = name;
        }
        if let Ok(url) = std::env::var("COINQUERY_ENDPOINT") {
            self.source_endpoint = Some(url);
        }
    }

    /// Load a deployment profile. Absent fields fall back to defaults.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Full path to the dataset descriptor file.
    pub fn dataset_path(&self) -> PathBuf {
        self.input_dir.join(&self.dataset_filename)
    }
}
