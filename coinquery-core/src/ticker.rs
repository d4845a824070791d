//! Input sanitization — raw argument tokens into a validated ticker set.
//!
//! Malformed tokens are filtered, never fatal: user error must not take a
//! run down. The sole exception is the self-test sentinel, which is checked
//! before any filtering and forces the synthetic failure path.

use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

/// Operational self-test token. Its presence anywhere in the input
/// short-circuits the run into the designated failure code.
pub const SELF_TEST_TOKEN: &str = "E5CB";

/// A validated ticker symbol: non-empty, ASCII alphanumeric, uppercase,
/// strictly shorter than the configured length limit.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct TickerSymbol(String);

impl TickerSymbol {
    /// Parse a raw token, normalizing to uppercase. Returns `None` for
    /// anything failing validation — callers filter, they do not error.
    pub fn parse(raw: &str, max_len: usize) -> Option<Self> {
        if raw.is_empty() || raw.len() >= max_len {
            return None;
        }
        if !raw.chars().all(|c| c.is_ascii_alphanumeric()) {
            return None;
        }
        Some(Self(raw.to_ascii_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TickerSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Deduplicated tickers with deterministic lexicographic iteration order.
/// Everything externally visible (query text, logs, hashes) reads from
/// this order, never from input order.
pub type TickerSet = BTreeSet<TickerSymbol>;

/// Outcome of scanning the raw token list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SanitizedInput {
    Tickers(TickerSet),
    /// The self-test sentinel was present; all other input is ignored.
    SelfTest,
}

/// Sanitize the candidate ticker tokens (program name already stripped).
///
/// Acceptance counting happens while scanning, before dedup: once
/// `max_input` tokens have been accepted, the rest of the arguments are
/// not examined at all.
pub fn sanitize_tokens(tokens: &[String], max_ticker_len: usize, max_input: usize) -> SanitizedInput {
    // Sentinel first: it must not be stripped by the alphanumeric/length
    // rules below.
    if tokens.iter().any(|t| t == SELF_TEST_TOKEN) {
        return SanitizedInput::SelfTest;
    }

    let mut accepted = 0usize;
    let mut set = TickerSet::new();
    for token in tokens {
        if let Some(symbol) = TickerSymbol::parse(token, max_ticker_len) {
            accepted += 1;
            set.insert(symbol);
            if accepted >= max_input {
                break;
            }
        }
    }
    SanitizedInput::Tickers(set)
}
