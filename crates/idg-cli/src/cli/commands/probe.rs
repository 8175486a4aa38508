//! `idg probe <url>`: print name, size and range support.

use anyhow::{Context, Result};
use idg_core::config::IdgConfig;
use idg_core::probe::probe;
use idg_core::transport::{Transport, TransportOptions};

use super::RequestArgs;

pub async fn run_probe(cfg: &IdgConfig, args: RequestArgs) -> Result<()> {
    let request = args.into_request()?;
    let options = cfg
        .transport
        .as_ref()
        .map(TransportOptions::from)
        .unwrap_or_default();
    let dir = std::env::current_dir()?;
    let resource = tokio::task::spawn_blocking(move || {
        probe(&Transport::new(options), &request, &dir)
    })
    .await
    .context("probe task join")??;

    println!("  URL:     {}", resource.url);
    println!("  Name:    {}", resource.name);
    println!(
        "  Size:    {} bytes ({:.2} MiB)",
        resource.size,
        resource.size as f64 / 1_048_576.0
    );
    println!(
        "  Ranges:  {}",
        if resource.accept_ranges {
            "supported"
        } else {
            "not supported (single stream)"
        }
    );
    Ok(())
}
