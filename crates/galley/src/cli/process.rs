//! `galley process`: run the worker on one spreadsheet.

use anyhow::Context;
use chrono::Local;
use galley_worker::{CancellationToken, FlightRecord, GalleyConfig, Mode, Orchestrator, Upload};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::cli::error::HelpfulError;
use crate::cli::output::{format_size, print_flights};

#[derive(Debug, clap::Args)]
pub struct ProcessArgs {
    /// Spreadsheet to process (.xls)
    pub file: PathBuf,

    /// Processing mode: precommandes or commandes
    #[arg(short, long)]
    pub mode: String,

    /// Service category: salon or prestations
    #[arg(short, long)]
    pub category: String,

    /// Override the worker deadline in milliseconds
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Leave staged input and worker output on disk
    #[arg(long)]
    pub keep_artifacts: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn load_config(path: &Path) -> anyhow::Result<GalleyConfig> {
    GalleyConfig::load_or_default(path)
        .map_err(|e| HelpfulError::invalid_config(path, e).into())
}

pub fn run(args: ProcessArgs, config_path: &Path) -> anyhow::Result<()> {
    let mut config = load_config(config_path)?;
    if let Some(timeout_ms) = args.timeout_ms {
        config.worker.timeout_ms = timeout_ms;
    }
    if args.keep_artifacts {
        config.staging.keep_artifacts = true;
    }

    if !args.file.is_file() {
        return Err(HelpfulError::file_not_found(&args.file).into());
    }

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    rt.block_on(run_process(args, config))
}

async fn run_process(args: ProcessArgs, config: GalleyConfig) -> anyhow::Result<()> {
    let orchestrator = Orchestrator::new(config);
    let worker = orchestrator.worker_config().clone();
    let to_helpful = |e: galley_worker::InvocationError| HelpfulError::from_invocation(&e, &worker);

    let upload = Upload::from_path(&args.file).await.map_err(to_helpful)?;
    info!(
        "Processing {} ({}) as {}/{}",
        upload.file_name(),
        format_size(upload.size()),
        args.mode,
        args.category
    );

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping worker");
            on_interrupt.cancel();
        }
    });

    let records = orchestrator
        .process_upload(&upload, &args.mode, &args.category, &cancel)
        .await
        .map_err(to_helpful)?;

    // Filters were validated by the orchestrator.
    let mode: Mode = args.mode.parse()?;
    let target_date = mode.target_date(Local::now().date_naive());

    if args.json {
        print_json(&args, target_date, &records)?;
    } else {
        print_summary(&args, target_date, &records);
    }
    Ok(())
}

fn print_json(
    args: &ProcessArgs,
    target_date: chrono::NaiveDate,
    records: &[FlightRecord],
) -> anyhow::Result<()> {
    let output = serde_json::json!({
        "file": args.file.to_string_lossy(),
        "mode": args.mode,
        "category": args.category,
        "target_date": target_date.to_string(),
        "count": records.len(),
        "flights": records,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn print_summary(args: &ProcessArgs, target_date: chrono::NaiveDate, records: &[FlightRecord]) {
    if records.is_empty() {
        println!(
            "No flights for {} ({}, {})",
            target_date, args.mode, args.category
        );
        return;
    }

    print_flights(records);
    println!();
    println!(
        "{} flight(s) for {} ({}, {})",
        records.len(),
        target_date,
        args.mode,
        args.category
    );
}
