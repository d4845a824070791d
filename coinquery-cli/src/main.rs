//! CoinQuery CLI — one finalized price-query run per invocation.
//!
//! Positional arguments are the candidate ticker tokens; everything else
//! about the run (directories, limits, policies) comes from a deployment
//! profile, the environment, and flags, in that order of precedence.
//!
//! The process exits 0 for failed runs too: failure is signaled through
//! the artifact set, not the exit code. A non-zero exit means the run
//! could not even finalize — the one case with no artifact fallback.

use anyhow::{bail, Result};
use clap::Parser;
use coinquery_core::finalize::{run, RunReport, RunState};
use coinquery_core::source::{HttpSource, PriceSource, SyntheticSource};
use coinquery_core::DappConfig;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "coinquery",
    about = "CoinQuery — confidential price-query task with guaranteed result finalization"
)]
struct Cli {
    /// Candidate ticker tokens. Malformed tokens are filtered, not fatal.
    tickers: Vec<String>,

    /// Deployment profile (TOML). Environment and flags override it.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Input directory holding the dataset descriptor. Defaults to
    /// $IEXEC_IN, then ./iexec_in.
    #[arg(long)]
    input_dir: Option<PathBuf>,

    /// Output directory for the artifact set. Defaults to $IEXEC_OUT,
    /// then ./iexec_out.
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Query endpoint URL. Defaults to $COINQUERY_ENDPOINT.
    #[arg(long)]
    endpoint: Option<String>,

    /// Use the deterministic synthetic source instead of the network.
    #[arg(long, default_value_t = false)]
    offline: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => DappConfig::from_file(path)?,
        None => DappConfig::default(),
    };
    config.apply_env();
    if let Some(dir) = cli.input_dir {
        config.input_dir = dir;
    }
    if let Some(dir) = cli.output_dir {
        config.output_dir = dir;
    }
    if let Some(url) = cli.endpoint {
        config.source_endpoint = Some(url);
    }

    let source: Box<dyn PriceSource> = if cli.offline {
        Box::new(SyntheticSource::default())
    } else {
        match &config.source_endpoint {
            Some(url) => Box::new(HttpSource::new(url)),
            None => bail!(
                "no query endpoint configured: pass --endpoint, set $COINQUERY_ENDPOINT, \
                 or use --offline"
            ),
        }
    };

    let report = run(&config, &cli.tickers, source.as_ref())?;
    print_summary(&report);
    Ok(())
}

fn print_summary(report: &RunReport) {
    println!();
    println!("=== Run Finalized ===");
    match report.state {
        RunState::Succeeded => {
            println!("Outcome:      Succeeded");
            println!(
                "Rows:         {} returned, {} kept",
                report.row_count, report.kept_count
            );
        }
        RunState::FailedKnown(err) => {
            println!("Outcome:      Failed ({}) {err}", err.code());
        }
        RunState::FailedUnknown => {
            println!("Outcome:      Failed (7) general dapp error");
        }
    }
    println!("Fingerprint:  {}", report.digest);
    println!(
        "Descriptor:   {}",
        report.artifacts.descriptor.display()
    );
    if let Some(data) = &report.artifacts.data {
        println!("Data:         {}", data.display());
    }
    if let Some(marker) = &report.artifacts.error_marker {
        println!("Error marker: {}", marker.display());
    }
    println!("Log:          {}", report.artifacts.log.display());
}
