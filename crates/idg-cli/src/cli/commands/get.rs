//! `idg get <url>`: download one URL and print the final path.

use anyhow::{bail, Result};
use idg_core::config::IdgConfig;
use idg_core::retry::RetryPolicy;
use idg_core::{Downloader, ProgressStats};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

use super::RequestArgs;

const PROGRESS_INTERVAL_MS: u64 = 500;

#[derive(Debug, Clone)]
pub struct GetArgs {
    pub request: RequestArgs,
    pub connections: Option<usize>,
    pub dir: Option<PathBuf>,
    pub retries: Option<u32>,
    pub backoff_ms: Option<u64>,
}

/// CLI flags override the config file; the config overrides built-in defaults.
fn build_downloader(cfg: &IdgConfig, args: GetArgs) -> Result<Downloader> {
    let dir = match args.dir.or_else(|| cfg.download_dir.clone()) {
        Some(d) => d,
        None => std::env::current_dir()?,
    };
    let connections = args.connections.unwrap_or(cfg.connections);
    if connections == 0 {
        bail!("--connections must be at least 1");
    }
    let base = cfg.retry_policy();
    let policy = RetryPolicy::new(
        args.retries.unwrap_or(base.max_attempts),
        args.backoff_ms
            .map(Duration::from_millis)
            .unwrap_or(base.backoff),
    );
    let request = args.request.into_request()?;
    Ok(Downloader::from_config(request, dir, cfg)
        .connections(connections)
        .retry_policy(policy))
}

fn render(stats: &ProgressStats) {
    let done_mib = stats.bytes_done as f64 / 1_048_576.0;
    let total_mib = stats.total_bytes as f64 / 1_048_576.0;
    let rate_mib = stats.bytes_per_sec() / 1_048_576.0;
    let eta = stats
        .eta_secs()
        .map(|s| format!("{:.0}s", s))
        .unwrap_or_else(|| "?".to_string());
    eprint!(
        "\r  {:.1} / {:.1} MiB ({:.1}%)  {:.2} MiB/s  ETA {}  ",
        done_mib,
        total_mib,
        stats.fraction() * 100.0,
        rate_mib,
        eta
    );
}

pub async fn run_get(cfg: &IdgConfig, args: GetArgs) -> Result<()> {
    let (progress_tx, mut progress_rx) = mpsc::channel::<ProgressStats>(16);
    let downloader = build_downloader(cfg, args)?.progress(progress_tx);

    let progress_handle = tokio::spawn(async move {
        let mut last_print: Option<Instant> = None;
        while let Some(stats) = progress_rx.recv().await {
            let due = last_print
                .map_or(true, |t| t.elapsed() >= Duration::from_millis(PROGRESS_INTERVAL_MS));
            if due || stats.done {
                render(&stats);
                last_print = Some(Instant::now());
            }
            if stats.done {
                break;
            }
        }
        eprintln!();
    });

    let result = downloader.download().await;
    drop(downloader);
    let _ = progress_handle.await;

    let completed = result?;
    tracing::info!(
        path = %completed.path.display(),
        bytes = completed.bytes_transferred,
        segments = completed.segments.len(),
        "download finished"
    );
    println!("{}", completed.path.display());
    Ok(())
}
