//! Run finalization — the terminal state machine.
//!
//! A run ends in exactly one of three states, and every one of them leaves
//! a complete, self-consistent artifact set behind. The deterministic
//! fingerprint file and the completion descriptor are written on every
//! terminal path without exception: without a deterministic file the
//! worker network freezes, so that postcondition outranks everything else
//! in this module, including the catch-all for failures nothing mapped.

use crate::artifacts::{ArtifactWriter, RunLog, DATA_FILE, RECEIPT_FILE};
use crate::callback::encode_error_callback;
use crate::config::{CallbackPolicy, DappConfig};
use crate::error::DappError;
use crate::fingerprint;
use crate::query::{apply_default_policy, build_query, DatasetDescriptor, PriceQuery};
use crate::source::{PriceSource, QueryOutcome, SourceError};
use crate::table::CanonicalTable;
use crate::ticker::{sanitize_tokens, SanitizedInput};
use std::path::PathBuf;
use thiserror::Error;

/// Terminal state of a finalized run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Succeeded,
    FailedKnown(DappError),
    FailedUnknown,
}

impl RunState {
    /// The taxonomy entry behind a failed state, if any. Unclassified
    /// failures surface as the catch-all code.
    pub fn failure(&self) -> Option<DappError> {
        match self {
            RunState::Succeeded => None,
            RunState::FailedKnown(e) => Some(*e),
            RunState::FailedUnknown => Some(DappError::Unknown),
        }
    }
}

/// Artifact locations present after finalization. `fingerprint` and
/// `descriptor` exist on every path; the rest depend on the outcome.
#[derive(Debug, Clone)]
pub struct ArtifactSet {
    pub log: PathBuf,
    pub fingerprint: PathBuf,
    pub descriptor: PathBuf,
    pub data: Option<PathBuf>,
    pub receipt: Option<PathBuf>,
    pub error_marker: Option<PathBuf>,
}

/// Everything a finished run reports back to its caller.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub state: RunState,
    /// Hex digest written to the fingerprint file.
    pub digest: String,
    /// Rows returned by the source (before projection).
    pub row_count: usize,
    /// Rows retained in the canonical table.
    pub kept_count: usize,
    pub query_text: Option<String>,
    pub artifacts: ArtifactSet,
}

/// The run could not produce the fingerprint file or the completion
/// descriptor. Downstream consensus has no fallback for that, so this is
/// a defect, not an outcome — the only error `run()` can return.
#[derive(Debug, Error)]
#[error("finalization defect: {0}")]
pub struct FatalDefect(pub anyhow::Error);

/// A failure on its way to the failure finalizer.
enum RunFailure {
    Known(DappError),
    Unexpected(anyhow::Error),
}

impl From<DappError> for RunFailure {
    fn from(e: DappError) -> Self {
        RunFailure::Known(e)
    }
}

/// Execute and finalize one run.
///
/// `tokens` are the candidate ticker arguments with the program name
/// already stripped. Every path through this function — success, every
/// known failure, and anything unclassified — terminates with the
/// fingerprint file and completion descriptor on disk.
pub fn run(
    config: &DappConfig,
    tokens: &[String],
    source: &dyn PriceSource,
) -> Result<RunReport, FatalDefect> {
    let writer = ArtifactWriter::new(&config.output_dir).map_err(FatalDefect)?;
    let log = RunLog::new(writer.output_dir());

    log.line("Start");
    log.line(&format!("Max Input: {}", config.max_input));
    log.line(&format!("Default Coins: {:?}", config.default_tickers));
    log.line(&format!("Input: {tokens:?}"));

    match execute(config, tokens, source, &log) {
        Ok(executed) => match finalize_success(&writer, &log, executed) {
            Ok(report) => {
                log.line("Done");
                Ok(report)
            }
            Err(failure) => finalize_failure(config, &writer, &log, failure),
        },
        Err(failure) => finalize_failure(config, &writer, &log, failure),
    }
}

/// One executed query, ready for success finalization.
struct Executed {
    query: PriceQuery,
    outcome: QueryOutcome,
}

/// Sanitize, build the query set, and call the collaborator — one fallible
/// sequence from the finalizer's perspective.
fn execute(
    config: &DappConfig,
    tokens: &[String],
    source: &dyn PriceSource,
    log: &RunLog,
) -> Result<Executed, RunFailure> {
    let tickers = match sanitize_tokens(tokens, config.max_ticker_len, config.max_input) {
        SanitizedInput::SelfTest => return Err(DappError::SelfTest.into()),
        SanitizedInput::Tickers(t) => t,
    };
    let names: Vec<&str> = tickers.iter().map(|t| t.as_str()).collect();
    log.line(&format!("Valid Input: {names:?}"));

    let effective = apply_default_policy(&tickers, config);
    let descriptor = DatasetDescriptor::load(&config.dataset_path())?;
    let query = build_query(&descriptor.dataset, &effective);

    log.line(&format!("querying {} source...", source.name()));
    let outcome = match source.query(&query) {
        Ok(outcome) => outcome,
        Err(err) => {
            log.line(&format!("source error: {err}"));
            return Err(match err {
                SourceError::NotFound(_) => DappError::SourceUnreachable,
                SourceError::Other(_) => DappError::SourceFailure,
            }
            .into());
        }
    };
    log.line("results received...");

    if outcome.rows.is_empty() {
        return Err(DappError::NoResults.into());
    }

    Ok(Executed { query, outcome })
}

fn finalize_success(
    writer: &ArtifactWriter,
    log: &RunLog,
    executed: Executed,
) -> Result<RunReport, RunFailure> {
    let table = CanonicalTable::from_rows(&executed.outcome.rows);
    let data_path = writer.data_path();
    table.write_csv(&data_path)?;
    log.line("data.csv created...");

    let receipt_path = writer
        .write_receipt(&render_receipt(&executed))
        .map_err(RunFailure::Unexpected)?;
    log.line("receipt.txt created...");

    let digest = fingerprint::success_digest(&executed.query.text);
    let fingerprint_path = writer
        .write_fingerprint(&digest)
        .map_err(RunFailure::Unexpected)?;
    let descriptor_path = writer
        .write_descriptor(&fingerprint_path, None)
        .map_err(RunFailure::Unexpected)?;
    log.line("deterministic file created...");

    Ok(RunReport {
        state: RunState::Succeeded,
        digest,
        row_count: executed.outcome.rows.len(),
        kept_count: table.len(),
        query_text: Some(executed.query.text),
        artifacts: ArtifactSet {
            log: log.path().to_path_buf(),
            fingerprint: fingerprint_path,
            descriptor: descriptor_path,
            data: Some(data_path),
            receipt: Some(receipt_path),
            error_marker: None,
        },
    })
}

fn finalize_failure(
    config: &DappConfig,
    writer: &ArtifactWriter,
    log: &RunLog,
    failure: RunFailure,
) -> Result<RunReport, FatalDefect> {
    let (state, error) = match failure {
        RunFailure::Known(e) => (RunState::FailedKnown(e), e),
        RunFailure::Unexpected(err) => {
            log.line(&format!("unexpected failure: {err:#}"));
            (RunState::FailedUnknown, DappError::Unknown)
        }
    };
    log.line(&format!("ERROR: ({}) {error}", error.code()));

    // A failed run must not look half-succeeded: drop any success artifact
    // written before the failure surfaced.
    for leftover in [DATA_FILE, RECEIPT_FILE] {
        let _ = std::fs::remove_file(writer.output_dir().join(leftover));
    }

    // The hard invariant: fingerprint first, descriptor last. If either of
    // these cannot be written the run is a defect, not a failure outcome.
    let digest = fingerprint::error_digest();
    let fingerprint_path = writer.write_fingerprint(&digest).map_err(FatalDefect)?;
    log.line("deterministic error file created...");

    let error_marker = match writer.write_error_marker(error.code(), &error.to_string()) {
        Ok(path) => {
            log.line("error file created...");
            Some(path)
        }
        Err(err) => {
            // Best effort: the marker is diagnostic, the fingerprint and
            // descriptor are not.
            log.line(&format!("error marker write failed: {err:#}"));
            None
        }
    };

    let callback_data = match config.callback_policy {
        CallbackPolicy::Emit => Some(encode_error_callback(error.code())),
        CallbackPolicy::LogOnly => None,
    };
    let descriptor_path = writer
        .write_descriptor(&fingerprint_path, callback_data)
        .map_err(FatalDefect)?;

    log.line("Done");

    Ok(RunReport {
        state,
        digest,
        row_count: 0,
        kept_count: 0,
        query_text: None,
        artifacts: ArtifactSet {
            log: log.path().to_path_buf(),
            fingerprint: fingerprint_path,
            descriptor: descriptor_path,
            data: None,
            receipt: None,
            error_marker,
        },
    })
}

/// Render the human receipt: collaborator-supplied metadata, verbatim.
fn render_receipt(executed: &Executed) -> String {
    let receipt = &executed.outcome.receipt;
    format!(
        "Price Query Receipt\n\
         Job ID: {}\n\
         Created: {}\n\
         Location: {}\n\
         Project: {}\n\
         Query: {}\n\
         Results: {}\n\
         Bytes Processed: {}\n\
         Bytes Billed: {}\n\
         ETag: {}\n\
         Ended: {}\n",
        receipt.job_id,
        receipt.created,
        receipt.location,
        receipt.project,
        executed.query.text,
        executed.outcome.rows.len(),
        receipt.bytes_processed,
        receipt.bytes_billed,
        receipt.etag,
        receipt.ended,
    )
}
