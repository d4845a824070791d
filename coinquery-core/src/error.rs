//! Closed failure taxonomy for a run.
//!
//! Every failure a run can reach maps to exactly one of these variants.
//! Each carries a stable numeric code and a fixed message; both are written
//! verbatim into the error marker and (optionally) ABI-encoded into the
//! on-chain callback payload, so independent re-executions of the same
//! failing run agree on the outcome. Codes must never be renumbered for a
//! deployed dataset.

use thiserror::Error;

/// Terminal failure classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DappError {
    /// Dataset descriptor file absent, unreadable, or missing its key.
    #[error("no dataset file found")]
    DatasetUnavailable,

    /// The price source rejected the query outright: unknown dataset or
    /// missing/rejected credentials.
    #[error("price source not found or credentials rejected")]
    SourceUnreachable,

    /// Any other failure from the price source.
    #[error("general price source query error")]
    SourceFailure,

    /// The data table could not be written.
    #[error("error creating csv")]
    Serialization,

    /// The operational self-test sentinel was present in the input.
    #[error("auto callback test error")]
    SelfTest,

    /// The query executed but returned zero rows.
    #[error("query returned no rows")]
    NoResults,

    /// Anything not covered above. The catch-all still finalizes through
    /// the full failure path.
    #[error("general dapp error")]
    Unknown,
}

impl DappError {
    /// Stable numeric code, as surfaced in `ERROR.txt` and the callback.
    pub fn code(&self) -> u8 {
        match self {
            DappError::DatasetUnavailable => 1,
            DappError::SourceUnreachable => 2,
            DappError::SourceFailure => 3,
            DappError::Serialization => 4,
            DappError::SelfTest => 5,
            DappError::NoResults => 6,
            DappError::Unknown => 7,
        }
    }
}
