//! `data-digest`: daily ingestion run, single-file inspection and webhook notifications.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use rust_data_digest::config::{IngestConfig, PipelineConfig};
use rust_data_digest::ingestion::{
    CompositeObserver, FileObserver, IngestionObserver, IngestionOptions, TracingObserver, ingest_from_path,
};
use rust_data_digest::pipeline::run_batch;
use rust_data_digest::report::write_reports;

#[derive(Parser)]
#[command(name = "data-digest")]
#[command(about = "Ingest the raw CSV/JSON drops of a day, write processed outputs and a report")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Process every source dated `--date` (default: today) and write the reports
    Run(RunArgs),
    /// Ingest a single file and print the result as JSON
    Inspect {
        path: PathBuf,
        /// JSON configuration file; only its `ingest` section is used
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Send a message to a Discord webhook
    #[cfg(feature = "notify")]
    Notify {
        #[arg(long, env = "DISCORD_WEBHOOK_URL")]
        webhook: String,
        #[arg(long)]
        message: String,
        #[arg(long)]
        title: Option<String>,
    },
}

#[derive(Args)]
struct RunArgs {
    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,
    /// Base directory holding `data/raw`, `data/processed` and `data/reports`
    #[arg(long, default_value = ".")]
    base_dir: PathBuf,
    #[arg(long)]
    raw_dir: Option<PathBuf>,
    #[arg(long)]
    processed_dir: Option<PathBuf>,
    #[arg(long)]
    report_dir: Option<PathBuf>,
    /// Run date, YYYY-MM-DD
    #[arg(long)]
    date: Option<NaiveDate>,
    /// Append ingestion events to this file
    #[arg(long)]
    event_log: Option<PathBuf>,
    /// Discord webhook notified with the run summary
    #[arg(long, env = "DISCORD_WEBHOOK_URL")]
    webhook: Option<String>,
}

fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    match Cli::parse().command {
        Command::Run(args) => run(args),
        Command::Inspect { path, config } => {
            let ingest = match config {
                Some(p) => load_config(&p)?.ingest,
                None => IngestConfig::default(),
            };
            let opts = IngestionOptions {
                observer: Some(Arc::new(TracingObserver)),
                ..Default::default()
            };
            let result = ingest_from_path(&path, &ingest, &opts)
                .with_context(|| format!("ingesting {}", path.display()))?;
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(ExitCode::SUCCESS)
        }
        #[cfg(feature = "notify")]
        Command::Notify {
            webhook,
            message,
            title,
        } => {
            let mut msg = rust_data_digest::notify::DiscordMessage::new(message);
            if let Some(title) = title {
                msg = msg.with_title(title);
            }
            rust_data_digest::notify::DiscordWebhook::new(webhook)?.send(&msg)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn run(args: RunArgs) -> Result<ExitCode> {
    let mut config = match &args.config {
        Some(p) => load_config(p)?,
        None => PipelineConfig::new(&args.base_dir),
    };
    if let Some(dir) = args.raw_dir {
        config.raw_dir = dir;
    }
    if let Some(dir) = args.processed_dir {
        config.processed_dir = dir;
    }
    if let Some(dir) = args.report_dir {
        config.report_dir = dir;
    }
    if args.webhook.is_some() {
        config.discord_webhook = args.webhook;
    }
    let date = args.date.unwrap_or_else(|| Local::now().date_naive());

    let mut observers: Vec<Arc<dyn IngestionObserver>> = vec![Arc::new(TracingObserver)];
    if let Some(log) = &args.event_log {
        observers.push(Arc::new(FileObserver::new(log)));
    }
    let observer: Arc<dyn IngestionObserver> = Arc::new(CompositeObserver::new(observers));

    info!(raw_dir = %config.raw_dir.display(), %date, "starting run");
    let report = run_batch(&config, date, Some(observer)).context("batch run failed")?;
    let paths = write_reports(&report, &config.report_dir).context("writing reports")?;
    println!("{}", paths.html.display());

    notify_run(&config, &report, &paths.html);

    if report.files.is_empty() {
        warn!("no sources found for {date}");
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

#[cfg(feature = "notify")]
fn notify_run(
    config: &PipelineConfig,
    report: &rust_data_digest::pipeline::BatchReport,
    html: &std::path::Path,
) {
    use rust_data_digest::notify::{DiscordWebhook, summary_message};

    let Some(url) = &config.discord_webhook else {
        return;
    };
    let sent = DiscordWebhook::new(url.clone()).and_then(|hook| hook.send(&summary_message(report, Some(html))));
    if let Err(e) = sent {
        warn!(error = %e, "run summary not delivered");
    }
}

#[cfg(not(feature = "notify"))]
fn notify_run(
    config: &PipelineConfig,
    _report: &rust_data_digest::pipeline::BatchReport,
    _html: &std::path::Path,
) {
    if config.discord_webhook.is_some() {
        warn!("webhook configured but the `notify` feature is disabled");
    }
}

fn load_config(path: &std::path::Path) -> Result<PipelineConfig> {
    PipelineConfig::from_json_file(path).with_context(|| format!("loading config {}", path.display()))
}
