//! Terminal front end for the bundle tracker.
//!
//! Presentation only: renders the pipeline's event stream with
//! timestamps and severity colors and prints the final status. All
//! tracking logic lives in `bundle-tracker`.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use bundle_tracker::{
    default_resources, BundleFetcher, ChannelSink, CsvRecordSink, HttpBundleFetcher, Orchestrator,
    RecordSink, Severity, TrackerConfig, TrackerEvent,
};
use chrono::Local;
use clap::{Parser, Subcommand};
use console::style;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sgs-tracker")]
#[command(about = "Track remote game config bundles and record newly added entries")]
#[command(version)]
struct Cli {
    /// Working directory for archives, payloads, record tables and logs
    #[arg(long, default_value = "sgs_data", global = true)]
    dir: PathBuf,

    /// Override the remote base URL
    #[arg(long, global = true)]
    base_url: Option<url::Url>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one update pass over all tracked resources
    Run,

    /// Keep running update passes on an interval
    Watch {
        /// Seconds between passes
        #[arg(long, default_value_t = 3600)]
        interval_secs: u64,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if let Err(e) = run().await {
        eprintln!("Error: {:#}", e);
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    let mut config = TrackerConfig::default().with_work_dir(&cli.dir);
    if let Some(base_url) = cli.base_url.clone() {
        config = config.with_base_url(base_url);
    }

    let fetcher = HttpBundleFetcher::new(&config);
    let sink = CsvRecordSink::new(config.work_dir.clone());
    let orchestrator = Orchestrator::new(config, default_resources(), fetcher, sink);

    match cli.command {
        Commands::Run => run_once(&orchestrator).await,
        Commands::Watch { interval_secs } => loop {
            run_once(&orchestrator).await?;
            tokio::time::sleep(Duration::from_secs(interval_secs)).await;
        },
    }
}

async fn run_once<F, S>(orchestrator: &Orchestrator<F, S>) -> Result<()>
where
    F: BundleFetcher,
    S: RecordSink,
{
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let printer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            render(&event);
        }
    });

    let sink = ChannelSink::new(tx);
    let result = orchestrator.run(&sink).await;
    drop(sink);
    let _ = printer.await;

    let summary = result.context("update run failed")?;

    if summary.had_updates {
        println!("{}", style(format!("updates found: {}", summary.message)).green().bold());
    } else {
        println!("{}", style(format!("no updates: {}", summary.message)).dim());
    }

    Ok(())
}

fn render(event: &TrackerEvent) {
    let timestamp = event.at.with_timezone(&Local).format("%H:%M:%S");
    let message = match event.severity {
        Severity::Info => style(event.message.clone()),
        Severity::Success => style(event.message.clone()).green(),
        Severity::Warning => style(event.message.clone()).yellow(),
        Severity::Error => style(event.message.clone()).red(),
    };
    println!("[{}] {}", timestamp, message);
}
