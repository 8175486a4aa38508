//! `idg config`: show where the config lives and what is in effect.

use anyhow::Result;
use idg_core::config::{self, IdgConfig};

pub fn run_config(cfg: &IdgConfig) -> Result<()> {
    println!("# {}", config::config_path()?.display());
    print!("{}", toml::to_string_pretty(cfg)?);
    let policy = cfg.retry_policy();
    println!(
        "# effective retry: {} attempt(s), {} ms backoff",
        policy.max_attempts,
        policy.backoff.as_millis()
    );
    Ok(())
}
