//! CoinQuery Core — price-query dapp pipeline and result finalization.
//!
//! One invocation flows strictly forward:
//! raw tokens → validated ticker set → query filter → (external source) →
//! rows → canonical table + finalization artifacts.
//!
//! - Input sanitizer and ticker types (`ticker`)
//! - Default-ticker policy and deterministic query text (`query`)
//! - Price source boundary: trait, HTTP client, synthetic source (`source`)
//! - Canonical table projection and CSV rendering (`table`)
//! - Finalizer state machine and its artifact guarantees (`finalize`,
//!   `artifacts`, `fingerprint`, `callback`)
//! - Closed failure taxonomy (`error`) and run configuration (`config`)

pub mod artifacts;
pub mod callback;
pub mod config;
pub mod error;
pub mod finalize;
pub mod fingerprint;
pub mod query;
pub mod source;
pub mod table;
pub mod ticker;

pub use config::{CallbackPolicy, DappConfig, DefaultTickerPolicy};
pub use error::DappError;
pub use finalize::{run, FatalDefect, RunReport, RunState};
pub use source::{HttpSource, PriceSource, SyntheticSource};
pub use ticker::{TickerSet, TickerSymbol};
