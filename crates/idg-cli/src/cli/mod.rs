//! CLI for the IDG range downloader.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use idg_core::config;
use idg_core::resource::Cookie;
use std::path::PathBuf;

use commands::{run_config, run_get, run_probe, GetArgs, RequestArgs};

/// Top-level CLI for the IDG downloader.
#[derive(Debug, Parser)]
#[command(name = "idg")]
#[command(about = "IDG: concurrent HTTP range downloader", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Download a URL in parallel segments.
    Get {
        /// Direct HTTP/HTTPS URL to download.
        url: String,

        /// Number of segments / concurrent connections (default from config).
        #[arg(short = 'c', long, value_name = "N")]
        connections: Option<usize>,

        /// Destination directory (default from config, else current directory).
        #[arg(short = 'd', long = "dir", value_name = "DIR")]
        dir: Option<PathBuf>,

        /// Extra request header, repeatable.
        #[arg(
            short = 'H',
            long = "header",
            value_name = "NAME: VALUE",
            value_parser = parse_header
        )]
        headers: Vec<(String, String)>,

        /// Cookie sent with every request, repeatable.
        #[arg(long = "cookie", value_name = "NAME=VALUE", value_parser = parse_cookie)]
        cookies: Vec<Cookie>,

        /// Attempts per segment, first one included (default from config).
        #[arg(long, value_name = "N")]
        retries: Option<u32>,

        /// Delay between attempts in milliseconds (default from config).
        #[arg(long, value_name = "MS")]
        backoff_ms: Option<u64>,
    },

    /// Show what a download of URL would fetch, without downloading it.
    Probe {
        /// Direct HTTP/HTTPS URL to probe.
        url: String,

        /// Extra request header, repeatable.
        #[arg(
            short = 'H',
            long = "header",
            value_name = "NAME: VALUE",
            value_parser = parse_header
        )]
        headers: Vec<(String, String)>,

        /// Cookie sent with the request, repeatable.
        #[arg(long = "cookie", value_name = "NAME=VALUE", value_parser = parse_cookie)]
        cookies: Vec<Cookie>,
    },

    /// Print the config file location and effective settings.
    Config,
}

/// `"Name: value"` -> `("Name", "value")`.
fn parse_header(s: &str) -> Result<(String, String), String> {
    let (name, value) = s
        .split_once(':')
        .ok_or_else(|| format!("expected NAME: VALUE, got {:?}", s))?;
    let name = name.trim();
    if name.is_empty() || name.contains(char::is_whitespace) {
        return Err(format!("invalid header name in {:?}", s));
    }
    Ok((name.to_string(), value.trim().to_string()))
}

fn parse_cookie(s: &str) -> Result<Cookie, String> {
    Cookie::parse(s).ok_or_else(|| format!("expected NAME=VALUE, got {:?}", s))
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Get {
                url,
                connections,
                dir,
                headers,
                cookies,
                retries,
                backoff_ms,
            } => {
                let args = GetArgs {
                    request: RequestArgs {
                        url,
                        headers,
                        cookies,
                    },
                    connections,
                    dir,
                    retries,
                    backoff_ms,
                };
                run_get(&cfg, args).await?;
            }
            CliCommand::Probe {
                url,
                headers,
                cookies,
            } => {
                let request = RequestArgs {
                    url,
                    headers,
                    cookies,
                };
                run_probe(&cfg, request).await?;
            }
            CliCommand::Config => run_config(&cfg)?,
        }

        Ok(())
    }
}
