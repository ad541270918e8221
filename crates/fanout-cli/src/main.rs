use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use fanout_core::app::{ExitStatus, Orchestrator, RunPlan};
use fanout_core::config::JobConfig;
use fanout_core::impls::{self, Backend};

#[derive(Debug, Parser)]
#[command(name = "fanout")]
#[command(about = "Run one worker session per (date, partition) with bounded concurrency")]
#[command(version)]
struct Cli {
    /// Job description (YAML)
    #[arg(env = "FANOUT_CONFIG")]
    config: PathBuf,

    /// Validate the job and list its tasks without creating any session
    #[arg(long)]
    dry_run: bool,

    /// More log output (-v debug, -vv trace). RUST_LOG is used when absent.
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Print the final report (or the dry-run plan) as JSON on stdout
    #[arg(long)]
    json: bool,
}

fn env_filter(verbose: u8) -> EnvFilter {
    match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // stdout は report 用、ログは stderr へ
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(cli.verbose))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    match run(cli).await {
        Ok(status) => ExitCode::from(status.code()),
        Err(e) => {
            error!(error = %format!("{e:#}"), "fanout failed");
            ExitCode::from(ExitStatus::InternalError.code())
        }
    }
}

async fn run(cli: Cli) -> Result<ExitStatus> {
    let config = JobConfig::load(&cli.config)
        .with_context(|| format!("invalid job description {}", cli.config.display()))?;
    let config = Arc::new(config);
    let backend = Backend::from_url(&config.connection.url)?;

    if cli.dry_run {
        let plan = RunPlan::for_job(&config);
        info!(tasks = plan.tasks.len(), ?backend, "dry run; no sessions will be created");
        if cli.json {
            println!("{}", serde_json::to_string_pretty(&plan)?);
        } else {
            for line in plan.summary_lines() {
                println!("{line}");
            }
        }
        return Ok(ExitStatus::Success);
    }

    let client = impls::connect(&config.connection).context("connecting to session backend")?;

    let cancel = CancellationToken::new();
    let signals = tokio::spawn(forward_signals(cancel.clone()));

    let mut orchestrator = Orchestrator::for_job(client, Arc::clone(&config));
    let report = orchestrator
        .run(config.tasks(), &cancel)
        .await
        .context("orchestration failed")?;
    signals.abort();

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for line in report.summary_lines() {
            println!("{line}");
        }
    }
    Ok(report.exit_status())
}

/// SIGINT / SIGTERM をキャンセルトークンに橋渡しする
async fn forward_signals(cancel: CancellationToken) {
    shutdown_signal().await;
    warn!("shutdown signal received; finishing current iteration");
    cancel.cancel();
}

#[cfg(unix)]
async fn shutdown_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(e) => {
            warn!(error = %e, "SIGTERM handler unavailable; listening for Ctrl-C only");
            let _ = tokio::signal::ctrl_c().await;
            return;
        }
    };
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = sigterm.recv() => {}
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
