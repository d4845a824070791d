//! Price source boundary.
//!
//! The dataset query engine is an external collaborator: it takes the
//! built query text and either returns ordered rows plus receipt metadata
//! or fails in one of two distinguishable ways. Retry, backoff and
//! timeouts are the collaborator's concern — one query per run, no retries
//! on this side.

mod http;
mod synthetic;

pub use http::HttpSource;
pub use synthetic::SyntheticSource;

use crate::query::PriceQuery;
use crate::table::PriceRow;
use thiserror::Error;

/// Failures at the source boundary.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The source rejected the query outright: unknown dataset, missing or
    /// rejected credentials.
    #[error("source not found: {0}")]
    NotFound(String),

    /// Everything else: transport failures, server errors, malformed
    /// responses, enforced timeouts.
    #[error("source failure: {0}")]
    Other(String),
}

/// Collaborator-supplied query metadata, rendered verbatim into the
/// receipt. Free-form strings on purpose: nothing downstream parses them.
#[derive(Debug, Clone, Default)]
pub struct QueryReceipt {
    pub job_id: String,
    pub created: String,
    pub ended: String,
    pub location: String,
    pub project: String,
    pub bytes_processed: u64,
    pub bytes_billed: u64,
    pub etag: String,
}

/// One executed query: ordered rows plus receipt metadata.
#[derive(Debug, Clone)]
pub struct QueryOutcome {
    pub rows: Vec<PriceRow>,
    pub receipt: QueryReceipt,
}

/// A dataset query engine.
pub trait PriceSource: Send + Sync {
    /// Human-readable name for the run log.
    fn name(&self) -> &str;

    /// Execute the query. Rows come back ordered by coin then date,
    /// ascending. Zero rows is a valid outcome here; classifying it is the
    /// finalizer's job.
    fn query(&self, query: &PriceQuery) -> Result<QueryOutcome, SourceError>;
}
