use anyhow::{Context, Result};
use clap::ArgMatches;

use crate::core::config::MonitorConfig;

/// Config from `--config`, or the defaults, with `--interval` applied on top
pub fn load(matches: &ArgMatches) -> Result<MonitorConfig> {
    let mut config = match matches.get_one::<String>("config") {
        Some(path) => MonitorConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config from {}", path))?,
        None => MonitorConfig::default(),
    };

    if let Some(interval) = matches.get_one::<u64>("interval") {
        config.tick_interval_ms = *interval;
    }

    config.validate().context("Invalid monitor configuration")?;
    Ok(config)
}
