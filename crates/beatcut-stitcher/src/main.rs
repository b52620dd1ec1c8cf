//! `beatcut` binary.

use std::io::{self, IsTerminal};

use anyhow::Context;
use clap::Parser;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use beatcut_media::{check_ffmpeg, check_ffprobe, FfmpegEngine, FfmpegRunner, OnsetBeatTracker};
use beatcut_stitcher::{Cli, StitchPipeline};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    dotenvy::dotenv().ok();

    if let Err(e) = init_tracing() {
        eprintln!("Failed to initialize logging: {:#}", e);
        std::process::exit(1);
    }

    if let Err(e) = run().await {
        error!("Stitching failed: {:#}", e);
        std::process::exit(1);
    }
}

fn init_tracing() -> anyhow::Result<()> {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env().add_directive("beatcut=info".parse()?);

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(io::stderr().is_terminal())
                    .with_target(true)
                    .with_writer(io::stderr),
            )
            .with(env_filter)
            .init();
    }
    Ok(())
}

async fn run() -> anyhow::Result<()> {
    let mut cli = Cli::parse();
    if cli.interactive {
        let stdin = io::stdin();
        cli = cli
            .prompt_missing(&mut stdin.lock(), &mut io::stdout())
            .context("reading interactive answers")?;
    }
    let dry_run = cli.dry_run;
    let config = cli.into_config()?;

    check_ffmpeg()?;
    check_ffprobe()?;

    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Received interrupt, cancelling run");
            let _ = cancel_tx.send(true);
        }
    });

    let runner = FfmpegRunner::new()
        .with_cancel(cancel_rx.clone())
        .with_timeout(config.ffmpeg_timeout_secs);
    let engine = FfmpegEngine::new(config.encoding.clone())
        .with_cancel(cancel_rx.clone())
        .with_timeout(config.ffmpeg_timeout_secs);
    let detector = OnsetBeatTracker::new(runner);

    info!(clips_dir = %config.clips_dir.display(), dry_run, "Starting beatcut");

    let pipeline = StitchPipeline::new(config, engine, detector)
        .with_cancel(cancel_rx)
        .with_dry_run(dry_run);
    let report = pipeline.run().await?;

    if dry_run {
        println!("{}", serde_json::to_string_pretty(&report.manifest)?);
    } else if let Some(output) = &report.output_path {
        println!("{}", output.display());
    }

    info!(
        run_id = %report.run_id,
        status = %report.status,
        plans = report.plan_count,
        realized = report.segments_realized,
        failed = report.segments_failed,
        seed = report.seed,
        "Run finished"
    );
    Ok(())
}
