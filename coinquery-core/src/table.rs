//! Canonical tabular serialization of query results.
//!
//! Rows arrive ordered by coin then date from the source. This module only
//! projects them: zero-cap placeholder rows are dropped, (coin, date)
//! collisions keep the later row, and the survivors render as CSV under a
//! fixed header. Row *content* is not validated here — that is the source's
//! contract. The single failure mode is an unwritable destination.

use crate::error::DappError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// One (coin, price, market cap, date) observation. A cap of exactly zero
/// marks a placeholder, not a real data point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceRow {
    pub coin: String,
    pub price: f64,
    pub cap: f64,
    pub date: NaiveDate,
}

/// Fixed data table header. Columns render in this order.
pub const TABLE_HEADER: [&str; 4] = ["coin", "price", "cap", "date"];

/// Deduplicated per-coin/per-date projection of the retained rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CanonicalTable {
    entries: BTreeMap<(String, NaiveDate), (f64, f64)>,
}

impl CanonicalTable {
    /// Build from rows in input order. Later rows overwrite earlier ones
    /// on the same (coin, date) key.
    pub fn from_rows(rows: &[PriceRow]) -> Self {
        let mut entries = BTreeMap::new();
        for row in rows {
            if row.cap == 0.0 {
                continue;
            }
            entries.insert((row.coin.clone(), row.date), (row.price, row.cap));
        }
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Retained (price, cap) pair for a key, if any.
    pub fn get(&self, coin: &str, date: NaiveDate) -> Option<(f64, f64)> {
        self.entries.get(&(coin.to_string(), date)).copied()
    }

    /// Render as CSV text. Numeric fields are written verbatim via their
    /// shortest round-trip representation; no extra rounding.
    pub fn to_csv(&self) -> Result<String, DappError> {
        let mut wtr = csv::Writer::from_writer(vec![]);
        wtr.write_record(TABLE_HEADER)
            .map_err(|_| DappError::Serialization)?;
        for ((coin, date), (price, cap)) in &self.entries {
            wtr.write_record([
                coin.clone(),
                price.to_string(),
                cap.to_string(),
                date.to_string(),
            ])
            .map_err(|_| DappError::Serialization)?;
        }
        let bytes = wtr.into_inner().map_err(|_| DappError::Serialization)?;
        String::from_utf8(bytes).map_err(|_| DappError::Serialization)
    }

    /// Write the data table file.
    pub fn write_csv(&self, path: &Path) -> Result<(), DappError> {
        let text = self.to_csv()?;
        std::fs::write(path, text).map_err(|_| DappError::Serialization)
    }
}
