//! Artifact writers for a run's output directory.
//!
//! File names are part of the external contract — the task runtime and the
//! worker network locate results by these exact names. Each file is
//! written at most once per run, whole, never partially overwritten.

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

pub const LOG_FILE: &str = "log.txt";
pub const DATA_FILE: &str = "data.csv";
pub const RECEIPT_FILE: &str = "receipt.txt";
pub const DETERMINISTIC_FILE: &str = "result.txt";
pub const DESCRIPTOR_FILE: &str = "computed.json";
pub const ERROR_FILE: &str = "ERROR.txt";

/// Completion descriptor: what the task runtime inspects after the run to
/// find the deterministic artifact and any inline callback payload.
#[derive(Debug, Clone, Serialize)]
pub struct CompletionDescriptor {
    #[serde(rename = "deterministic-output-path")]
    pub deterministic_output_path: String,
    #[serde(rename = "callback-data", skip_serializing_if = "Option::is_none")]
    pub callback_data: Option<String>,
}

/// Writes artifacts into one run's output directory.
#[derive(Debug, Clone)]
pub struct ArtifactWriter {
    output_dir: PathBuf,
}

impl ArtifactWriter {
    pub fn new(output_dir: impl AsRef<Path>) -> Result<Self> {
        let output_dir = output_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&output_dir).with_context(|| {
            format!("failed to create output directory {}", output_dir.display())
        })?;
        Ok(Self { output_dir })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn data_path(&self) -> PathBuf {
        self.output_dir.join(DATA_FILE)
    }

    /// Write the deterministic fingerprint file. Returns its path; the
    /// completion descriptor must point at exactly this.
    pub fn write_fingerprint(&self, digest_hex: &str) -> Result<PathBuf> {
        let path = self.output_dir.join(DETERMINISTIC_FILE);
        std::fs::write(&path, digest_hex)
            .with_context(|| format!("failed to write {}", path.display()))?;
        Ok(path)
    }

    /// Write the completion descriptor pointing at the fingerprint file.
    pub fn write_descriptor(
        &self,
        fingerprint_path: &Path,
        callback_data: Option<String>,
    ) -> Result<PathBuf> {
        let descriptor = CompletionDescriptor {
            deterministic_output_path: fingerprint_path.display().to_string(),
            callback_data,
        };
        let json = serde_json::to_string_pretty(&descriptor)
            .context("failed to serialize completion descriptor")?;
        let path = self.output_dir.join(DESCRIPTOR_FILE);
        std::fs::write(&path, json)
            .with_context(|| format!("failed to write {}", path.display()))?;
        Ok(path)
    }

    /// Write the human receipt (success only).
    pub fn write_receipt(&self, text: &str) -> Result<PathBuf> {
        let path = self.output_dir.join(RECEIPT_FILE);
        std::fs::write(&path, text)
            .with_context(|| format!("failed to write {}", path.display()))?;
        Ok(path)
    }

    /// Write the error marker (failure only): `(<code>) <message>`.
    pub fn write_error_marker(&self, code: u8, message: &str) -> Result<PathBuf> {
        let path = self.output_dir.join(ERROR_FILE);
        std::fs::write(&path, format!("({code}) {message}\n"))
            .with_context(|| format!("failed to write {}", path.display()))?;
        Ok(path)
    }
}

/// Append-only run log.
///
/// Stands in for stdout inside the enclave, where regular stdout is not
/// captured. Write failures are swallowed: diagnostics must never take
/// down finalization.
#[derive(Debug, Clone)]
pub struct RunLog {
    path: PathBuf,
}

impl RunLog {
    pub fn new(output_dir: &Path) -> Self {
        Self {
            path: output_dir.join(LOG_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one timestamped line.
    pub fn line(&self, msg: &str) {
        let stamped = format!("[{}] {msg}\n", Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ"));
        if let Ok(mut file) = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
        {
            let _ = file.write_all(stamped.as_bytes());
        }
    }
}
