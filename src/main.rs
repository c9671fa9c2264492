//! CLI entry point for listing-mirror.

use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use listing_mirror::config::{CrawlConfig, FileConfig};
use listing_mirror::download::RetryPolicy;
use listing_mirror::failure::FailureReport;
use listing_mirror::{CrawlError, Crawler};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

mod cli;
mod prompt;

use cli::Args;
use prompt::{Prompter, Supplied};

/// Exit code for a run stopped by Ctrl-C.
const EXIT_CANCELLED: u8 = 130;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    debug!(?args, "CLI arguments parsed");

    let config = resolve_config(&args)?;
    let retry_policy = RetryPolicy::new(args.max_retries, Duration::from_secs(args.retry_delay));
    let crawler = Crawler::new(config).with_retry_policy(retry_policy);

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, finishing in-flight downloads");
            interrupt.cancel();
        }
    });

    match crawler.run(&cancel).await {
        Ok(stats) => {
            info!(
                directories = stats.directories,
                downloaded = stats.downloaded,
                skipped = stats.skipped,
                "Finished."
            );
            Ok(ExitCode::SUCCESS)
        }
        Err(e) if e.is_cancelled() => {
            warn!("Cancelled. Run again to resume; finished files are skipped.");
            Ok(ExitCode::from(EXIT_CANCELLED))
        }
        Err(e) => {
            error!(error = %e, "crawl failed");
            let report = crawler.failure_report(&e);
            error!("\n{report}");
            let written = write_report(&report, &args.report_dir, args.json_report)
                .context("failed to write error report")?;
            for path in written {
                error!(path = %path.display(), "error report written; attach it when reporting the problem");
            }
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Merges config file, flags, and interactive answers, in that order.
fn resolve_config(args: &Args) -> Result<CrawlConfig> {
    let mut builder = CrawlConfig::builder();
    let mut file = FileConfig::default();

    if let Some(path) = &args.config {
        file = FileConfig::load(path).map_err(CrawlError::from)?;
        builder = file.apply(builder);
    }
    builder = args.apply(builder);

    if args.interactive {
        let supplied = Supplied {
            base_path: builder.has_base_path(),
            url: args.url.is_some() || file.url.is_some(),
            mode: args.download_mode().is_some() || file.download_mode().is_some(),
            ignored_types: !args.ignored_types().is_empty() || !file.ignored_types.is_empty(),
            concurrency: args.concurrency.is_some() || file.concurrency.is_some(),
        };
        let stdin = io::stdin();
        let answers = Prompter::new(stdin.lock(), io::stdout())
            .ask(supplied)
            .context("failed to read answers")?;
        builder = answers.apply(builder);
    } else if !builder.has_base_path() {
        anyhow::bail!("no output folder given; pass --output <DIR>, set `output` in --config, or use --interactive");
    }

    let config = builder.build().map_err(CrawlError::from)?;
    Ok(config)
}

/// Writes the text report (and JSON when asked) into `dir`.
fn write_report(report: &FailureReport, dir: &Path, json: bool) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("cannot create report folder {}", dir.display()))?;

    let stem = report.file_stem();
    let text_path = dir.join(format!("{stem}.txt"));
    std::fs::write(&text_path, report.to_string())
        .with_context(|| format!("cannot write {}", text_path.display()))?;
    let mut written = vec![text_path];

    if json {
        let json_path = dir.join(format!("{stem}.json"));
        std::fs::write(&json_path, report.to_json()?)
            .with_context(|| format!("cannot write {}", json_path.display()))?;
        written.push(json_path);
    }
    Ok(written)
}
