//! Evaluate thresholds once and report what fired.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::ArgMatches;
use colored::*;

use crate::core::system_monitor::{AlertEvent, FnHandler, Monitor};
use crate::ui::format_alert;

use super::monitor_config;

pub fn execute(matches: &ArgMatches) -> Result<()> {
    let config = monitor_config::load(matches)?;
    let quiet_console = config.handlers.is_empty();

    let mut builder = Monitor::builder(config);
    if quiet_console {
        // events are printed below instead
        builder = builder.handler(Arc::new(FnHandler::new("silent", |_: &AlertEvent| Ok(()))));
    }
    let monitor = builder.build().context("Failed to create monitor")?;

    let events = monitor.check().context("Failed to check thresholds")?;
    if events.is_empty() {
        println!("{}", "All metrics within thresholds".green());
    } else {
        for event in &events {
            println!("{}", format_alert(event));
        }
    }

    // give configured handlers a moment to deliver
    if !quiet_console && !events.is_empty() {
        std::thread::sleep(Duration::from_millis(500));
    }

    Ok(())
}
