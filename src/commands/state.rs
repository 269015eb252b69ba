//! One-shot system state report.

use anyhow::{Context, Result};
use clap::ArgMatches;

use crate::core::system_monitor::Monitor;
use crate::ui::print_snapshot;

use super::monitor_config;

pub fn execute(matches: &ArgMatches) -> Result<()> {
    let config = monitor_config::load(matches)?;
    let monitor = Monitor::new(config).context("Failed to create monitor")?;

    let snapshot = monitor.state().context("Failed to sample system state")?;

    if matches.get_flag("json") {
        println!("{}", snapshot.to_json(true)?);
    } else {
        print_snapshot(&snapshot);
    }

    Ok(())
}
