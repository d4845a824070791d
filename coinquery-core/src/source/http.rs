//! HTTP price source.
//!
//! Thin blocking client for a query endpoint: POSTs the query text as
//! JSON, receives rows plus job metadata back. One request per run — if
//! the operator wants retries or backoff, that lives behind the endpoint.

use super::{PriceSource, QueryOutcome, QueryReceipt, SourceError};
use crate::query::PriceQuery;
use crate::table::PriceRow;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Serialize)]
struct QueryRequest<'a> {
    query: &'a str,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    rows: Vec<WireRow>,
    #[serde(default)]
    job: WireJob,
}

#[derive(Debug, Deserialize)]
struct WireRow {
    coin: String,
    price: f64,
    cap: f64,
    date: NaiveDate,
}

#[derive(Debug, Default, Deserialize)]
struct WireJob {
    #[serde(default)]
    job_id: String,
    #[serde(default)]
    created: String,
    #[serde(default)]
    ended: String,
    #[serde(default)]
    location: String,
    #[serde(default)]
    project: String,
    #[serde(default)]
    bytes_processed: u64,
    #[serde(default)]
    bytes_billed: u64,
    #[serde(default)]
    etag: String,
}

/// Blocking HTTP client for a query endpoint.
pub struct HttpSource {
    client: reqwest::blocking::Client,
    endpoint: String,
}

impl HttpSource {
    pub fn new(endpoint: impl Into<String>) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("failed to build HTTP client");

        Self {
            client,
            endpoint: endpoint.into(),
        }
    }
}

impl PriceSource for HttpSource {
    fn name(&self) -> &str {
        "http"
    }

    fn query(&self, query: &PriceQuery) -> Result<QueryOutcome, SourceError> {
        let resp = self
            .client
            .post(&self.endpoint)
            .json(&QueryRequest { query: &query.text })
            .send()
            .map_err(|e| SourceError::Other(format!("request failed: {e}")))?;

        let status = resp.status();
        if matches!(
            status,
            reqwest::StatusCode::UNAUTHORIZED
                | reqwest::StatusCode::FORBIDDEN
                | reqwest::StatusCode::NOT_FOUND
        ) {
            return Err(SourceError::NotFound(format!("endpoint returned {status}")));
        }
        if !status.is_success() {
            return Err(SourceError::Other(format!("endpoint returned {status}")));
        }

        let parsed: QueryResponse = resp
            .json()
            .map_err(|e| SourceError::Other(format!("malformed response: {e}")))?;

        let rows = parsed
            .rows
            .into_iter()
            .map(|r| PriceRow {
                coin: r.coin,
                price: r.price,
                cap: r.cap,
                date: r.date,
            })
            .collect();

        Ok(QueryOutcome {
            rows,
            receipt: QueryReceipt {
                job_id: parsed.job.job_id,
                created: parsed.job.created,
                ended: parsed.job.ended,
                location: parsed.job.location,
                project: parsed.job.project,
                bytes_processed: parsed.job.bytes_processed,
                bytes_billed: parsed.job.bytes_billed,
                etag: parsed.job.etag,
            },
        })
    }
}
