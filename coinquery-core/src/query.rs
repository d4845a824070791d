//! Query-set construction — default-ticker policy, filter clause, query text.
//!
//! The query text feeds the success-path fingerprint, so everything here is
//! ordering- and byte-stable: identical effective ticker sets against the
//! same table produce identical text across runs and machines.

use crate::config::{DappConfig, DefaultTickerPolicy};
use crate::error::DappError;
use crate::ticker::{TickerSet, TickerSymbol};
use serde::Deserialize;
use std::path::Path;

/// Dataset descriptor file: names the queryable table.
#[derive(Debug, Clone, Deserialize)]
pub struct DatasetDescriptor {
    pub dataset: String,
}

impl DatasetDescriptor {
    /// Load the descriptor. Absent file, unreadable file, bad JSON and a
    /// missing `dataset` key are all the same taxonomy entry.
    pub fn load(path: &Path) -> Result<Self, DappError> {
        let content =
            std::fs::read_to_string(path).map_err(|_| DappError::DatasetUnavailable)?;
        serde_json::from_str(&content).map_err(|_| DappError::DatasetUnavailable)
    }
}

/// Merge the configured default tickers into a sanitized set.
///
/// Defaults are parsed under the same validation rules as user input; a
/// misconfigured default is skipped, not fatal. Under backfill, each
/// default is tried at most once, in declared order, and merging stops as
/// soon as the minimum is met.
pub fn apply_default_policy(sanitized: &TickerSet, config: &DappConfig) -> TickerSet {
    let mut merged = sanitized.clone();
    let defaults = config
        .default_tickers
        .iter()
        .filter_map(|raw| TickerSymbol::parse(raw, config.max_ticker_len));

    match config.default_policy {
        DefaultTickerPolicy::AlwaysIncludeDefaults => {
            for symbol in defaults {
                merged.insert(symbol);
            }
        }
        DefaultTickerPolicy::BackfillToMinimum { min } => {
            for symbol in defaults {
                if merged.len() >= min {
                    break;
                }
                merged.insert(symbol);
            }
        }
    }
    merged
}

/// SQL-style literal list: lexicographic, double-quoted, comma-joined.
/// Symbols are already validated alphanumeric, so no escaping is needed.
pub fn filter_clause(tickers: &TickerSet) -> String {
    tickers
        .iter()
        .map(|t| format!("\"{t}\""))
        .collect::<Vec<_>>()
        .join(", ")
}

/// The query handed to the price source. `text` is the exact string the
/// collaborator executes and the success fingerprint digests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceQuery {
    pub table: String,
    pub tickers: TickerSet,
    pub text: String,
}

/// Assemble the executed query text.
pub fn build_query(table: &str, tickers: &TickerSet) -> PriceQuery {
    let text = format!(
        "SELECT coin, price, cap, date FROM `{table}` WHERE coin IN ({}) ORDER BY coin, date ASC",
        filter_clause(tickers)
    );
    PriceQuery {
        table: table.to_string(),
        tickers: tickers.clone(),
        text,
    }
}
