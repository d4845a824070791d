//! End-to-end finalization: every terminal path must leave the invariant
//! artifact set behind.

use chrono::NaiveDate;
use coinquery_core::artifacts::{
    DATA_FILE, DESCRIPTOR_FILE, DETERMINISTIC_FILE, ERROR_FILE, LOG_FILE, RECEIPT_FILE,
};
use coinquery_core::config::{CallbackPolicy, DappConfig};
use coinquery_core::error::DappError;
use coinquery_core::finalize::{run, RunState};
use coinquery_core::query::PriceQuery;
use coinquery_core::source::{PriceSource, QueryOutcome, QueryReceipt, SourceError};
use coinquery_core::table::PriceRow;
use coinquery_core::{callback, fingerprint};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use tempfile::TempDir;

/// Scripted collaborator: returns a fixed outcome and records whether it
/// was called at all.
struct ScriptedSource {
    behavior: Behavior,
    called: AtomicBool,
}

enum Behavior {
    Rows(Vec<PriceRow>),
    NotFound,
    Fails,
}

impl ScriptedSource {
    fn new(behavior: Behavior) -> Self {
        Self {
            behavior,
            called: AtomicBool::new(false),
        }
    }

    fn was_called(&self) -> bool {
        self.called.load(Ordering::SeqCst)
    }
}

impl PriceSource for ScriptedSource {
    fn name(&self) -> &str {
        "scripted"
    }

    fn query(&self, _query: &PriceQuery) -> Result<QueryOutcome, SourceError> {
        self.called.store(true, Ordering::SeqCst);
        match &self.behavior {
            Behavior::Rows(rows) => Ok(QueryOutcome {
                rows: rows.clone(),
                receipt: QueryReceipt {
                    job_id: "scripted-job".into(),
                    bytes_processed: 64,
                    bytes_billed: 64,
                    ..QueryReceipt::default()
                },
            }),
            Behavior::NotFound => Err(SourceError::NotFound("no such dataset".into())),
            Behavior::Fails => Err(SourceError::Other("backend exploded".into())),
        }
    }
}

/// Fresh input/output directories plus a config pointing at them.
struct TestEnv {
    _input: TempDir,
    output: TempDir,
    config: DappConfig,
}

impl TestEnv {
    fn new() -> Self {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        let config = DappConfig {
            input_dir: input.path().to_path_buf(),
            output_dir: output.path().to_path_buf(),
            ..DappConfig::default()
        };
        Self {
            _input: input,
            output,
            config,
        }
    }

    fn with_descriptor(table: &str) -> Self {
        let env = Self::new();
        std::fs::write(
            env.config.dataset_path(),
            format!(r#"{{"dataset": "{table}"}}"#),
        )
        .unwrap();
        env
    }

    fn out(&self, name: &str) -> std::path::PathBuf {
        self.output.path().join(name)
    }

    fn read(&self, name: &str) -> String {
        std::fs::read_to_string(self.out(name)).unwrap()
    }

    fn exists(&self, name: &str) -> bool {
        self.out(name).exists()
    }
}

fn tokens(raw: &[&str]) -> Vec<String> {
    raw.iter().map(|s| s.to_string()).collect()
}

fn d(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2021, 1, day).unwrap()
}

fn row(coin: &str, price: f64, cap: f64, day: u32) -> PriceRow {
    PriceRow {
        coin: coin.into(),
        price,
        cap,
        date: d(day),
    }
}

/// The invariant every terminal path must satisfy: fingerprint file and
/// completion descriptor exist, are non-empty, and the descriptor's path
/// reference resolves to the fingerprint file.
fn assert_invariant_artifacts(env: &TestEnv, expected_digest: &str) {
    let digest = env.read(DETERMINISTIC_FILE);
    assert!(!digest.is_empty());
    assert_eq!(digest, expected_digest);

    let descriptor: serde_json::Value = serde_json::from_str(&env.read(DESCRIPTOR_FILE)).unwrap();
    let pointed = descriptor["deterministic-output-path"].as_str().unwrap();
    assert_eq!(std::fs::read_to_string(Path::new(pointed)).unwrap(), digest);

    assert!(env.exists(LOG_FILE));
    assert!(!env.read(LOG_FILE).is_empty());
}

#[test]
fn success_writes_the_full_artifact_set() {
    let env = TestEnv::with_descriptor("crypto.prices");
    let source = ScriptedSource::new(Behavior::Rows(vec![
        row("BTC", 1.0, 0.0, 1),   // placeholder, dropped
        row("BTC", 2.0, 5.0, 1),   // survives (later row wins anyway)
        row("ETH", 10.0, 100.0, 2),
    ]));

    let report = run(&env.config, &tokens(&["btc", "eth"]), &source).unwrap();

    assert_eq!(report.state, RunState::Succeeded);
    assert_eq!(report.row_count, 3);
    assert_eq!(report.kept_count, 2);

    let query_text = report.query_text.as_deref().unwrap();
    assert_eq!(
        query_text,
        "SELECT coin, price, cap, date FROM `crypto.prices` \
         WHERE coin IN (\"BTC\", \"ETH\") ORDER BY coin, date ASC"
    );
    assert_invariant_artifacts(&env, &fingerprint::success_digest(query_text));

    let data = env.read(DATA_FILE);
    let lines: Vec<&str> = data.lines().collect();
    assert_eq!(lines[0], "coin,price,cap,date");
    assert_eq!(lines[1], "BTC,2,5,2021-01-01");
    assert_eq!(lines[2], "ETH,10,100,2021-01-02");

    let receipt = env.read(RECEIPT_FILE);
    assert!(receipt.contains("Job ID: scripted-job"));
    assert!(receipt.contains("Results: 3"));

    assert!(!env.exists(ERROR_FILE));
}

#[test]
fn missing_descriptor_fails_with_dataset_code() {
    let env = TestEnv::new(); // no descriptor written
    let source = ScriptedSource::new(Behavior::Rows(vec![row("BTC", 1.0, 2.0, 1)]));

    let report = run(&env.config, &tokens(&["btc"]), &source).unwrap();

    assert_eq!(
        report.state,
        RunState::FailedKnown(DappError::DatasetUnavailable)
    );
    assert!(!source.was_called());
    assert_invariant_artifacts(&env, &fingerprint::error_digest());
    assert!(!env.exists(DATA_FILE));
    assert!(!env.exists(RECEIPT_FILE));
    assert_eq!(env.read(ERROR_FILE), "(1) no dataset file found\n");

    // Default policy emits the ABI-encoded code inline as well.
    let descriptor: serde_json::Value = serde_json::from_str(&env.read(DESCRIPTOR_FILE)).unwrap();
    assert_eq!(
        descriptor["callback-data"].as_str().unwrap(),
        callback::encode_error_callback(1)
    );
}

#[test]
fn zero_rows_fails_with_no_results_code() {
    let env = TestEnv::with_descriptor("crypto.prices");
    let source = ScriptedSource::new(Behavior::Rows(vec![]));

    let report = run(&env.config, &tokens(&["btc"]), &source).unwrap();

    assert_eq!(report.state, RunState::FailedKnown(DappError::NoResults));
    assert_invariant_artifacts(&env, &fingerprint::error_digest());
    assert!(!env.exists(DATA_FILE));
    assert_eq!(env.read(ERROR_FILE), "(6) query returned no rows\n");
}

#[test]
fn self_test_sentinel_wins_regardless_of_other_input() {
    let env = TestEnv::with_descriptor("crypto.prices");
    let source = ScriptedSource::new(Behavior::Rows(vec![row("BTC", 1.0, 2.0, 1)]));

    let report = run(&env.config, &tokens(&["btc", "E5CB", "eth"]), &source).unwrap();

    assert_eq!(report.state, RunState::FailedKnown(DappError::SelfTest));
    assert!(!source.was_called());
    assert_invariant_artifacts(&env, &fingerprint::error_digest());
    assert_eq!(env.read(ERROR_FILE), "(5) auto callback test error\n");
}

#[test]
fn source_not_found_maps_to_unreachable_code() {
    let env = TestEnv::with_descriptor("crypto.prices");
    let source = ScriptedSource::new(Behavior::NotFound);

    let report = run(&env.config, &tokens(&["btc"]), &source).unwrap();
    assert_eq!(
        report.state,
        RunState::FailedKnown(DappError::SourceUnreachable)
    );
    assert_eq!(
        env.read(ERROR_FILE),
        "(2) price source not found or credentials rejected\n"
    );
}

#[test]
fn source_generic_failure_maps_to_failure_code() {
    let env = TestEnv::with_descriptor("crypto.prices");
    let source = ScriptedSource::new(Behavior::Fails);

    let report = run(&env.config, &tokens(&["btc"]), &source).unwrap();
    assert_eq!(report.state, RunState::FailedKnown(DappError::SourceFailure));
    assert_invariant_artifacts(&env, &fingerprint::error_digest());
}

#[test]
fn unwritable_data_table_fails_with_serialization_code() {
    let env = TestEnv::with_descriptor("crypto.prices");
    // Occupy the data.csv name with a directory so the table write fails.
    std::fs::create_dir(env.out(DATA_FILE)).unwrap();
    let source = ScriptedSource::new(Behavior::Rows(vec![row("BTC", 1.0, 2.0, 1)]));

    let report = run(&env.config, &tokens(&["btc"]), &source).unwrap();

    assert_eq!(
        report.state,
        RunState::FailedKnown(DappError::Serialization)
    );
    assert_invariant_artifacts(&env, &fingerprint::error_digest());
    assert_eq!(env.read(ERROR_FILE), "(4) error creating csv\n");
}

#[test]
fn unclassified_failure_still_finalizes_with_catch_all_code() {
    let env = TestEnv::with_descriptor("crypto.prices");
    // Occupy the receipt name with a directory: the data table writes
    // fine, then the receipt write blows up with a plain I/O error that
    // maps to nothing in the taxonomy.
    std::fs::create_dir(env.out(RECEIPT_FILE)).unwrap();
    let source = ScriptedSource::new(Behavior::Rows(vec![row("BTC", 1.0, 2.0, 1)]));

    let report = run(&env.config, &tokens(&["btc"]), &source).unwrap();

    assert_eq!(report.state, RunState::FailedUnknown);
    assert_eq!(report.state.failure(), Some(DappError::Unknown));
    assert_invariant_artifacts(&env, &fingerprint::error_digest());
    // The half-written data table is cleaned up.
    assert!(!env.exists(DATA_FILE));
    assert_eq!(env.read(ERROR_FILE), "(7) general dapp error\n");
}

#[test]
fn log_only_policy_omits_the_callback_payload() {
    let mut env = TestEnv::new();
    env.config.callback_policy = CallbackPolicy::LogOnly;
    let source = ScriptedSource::new(Behavior::Rows(vec![]));

    let report = run(&env.config, &tokens(&["btc"]), &source).unwrap();
    assert!(report.state.failure().is_some());

    let descriptor: serde_json::Value = serde_json::from_str(&env.read(DESCRIPTOR_FILE)).unwrap();
    assert!(descriptor.get("callback-data").is_none());
    // The fingerprint is still there — the callback is never a substitute.
    assert_invariant_artifacts(&env, &fingerprint::error_digest());
}

#[test]
fn repeated_runs_produce_byte_identical_fingerprints() {
    let rows = vec![row("BTC", 1.0, 2.0, 1)];

    let env_a = TestEnv::with_descriptor("crypto.prices");
    let a = run(
        &env_a.config,
        &tokens(&["doge", "btc"]),
        &ScriptedSource::new(Behavior::Rows(rows.clone())),
    )
    .unwrap();

    let env_b = TestEnv::with_descriptor("crypto.prices");
    let b = run(
        &env_b.config,
        &tokens(&["btc", "doge"]), // permuted input
        &ScriptedSource::new(Behavior::Rows(rows)),
    )
    .unwrap();

    assert_eq!(a.query_text, b.query_text);
    assert_eq!(
        env_a.read(DETERMINISTIC_FILE),
        env_b.read(DETERMINISTIC_FILE)
    );
}

#[test]
fn success_and_failure_fingerprints_differ() {
    let env_ok = TestEnv::with_descriptor("crypto.prices");
    run(
        &env_ok.config,
        &tokens(&["btc"]),
        &ScriptedSource::new(Behavior::Rows(vec![row("BTC", 1.0, 2.0, 1)])),
    )
    .unwrap();

    let env_err = TestEnv::with_descriptor("crypto.prices");
    run(
        &env_err.config,
        &tokens(&["btc"]),
        &ScriptedSource::new(Behavior::Fails),
    )
    .unwrap();

    assert_ne!(
        env_ok.read(DETERMINISTIC_FILE),
        env_err.read(DETERMINISTIC_FILE)
    );
}

#[test]
fn backfill_reaches_the_minimum_for_tiny_input() {
    let env = TestEnv::with_descriptor("crypto.prices");
    let source = ScriptedSource::new(Behavior::Rows(vec![row("BTC", 1.0, 2.0, 1)]));

    let report = run(&env.config, &tokens(&["doge"]), &source).unwrap();
    // DOGE alone is below the minimum of 2; BTC gets backfilled.
    assert!(report
        .query_text
        .unwrap()
        .contains("IN (\"BTC\", \"DOGE\")"));
}
