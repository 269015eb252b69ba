//! Run the background monitor until Ctrl+C.

use std::sync::mpsc;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::ArgMatches;
use colored::*;

use crate::core::system_monitor::{AlertEvent, FnHandler, Monitor, StopOutcome};
use crate::ui::format_alert;

use super::monitor_config;

pub fn execute(matches: &ArgMatches) -> Result<()> {
    let config = monitor_config::load(matches)?;
    let interval = config.tick_interval();
    let pretty_console = config.handlers.is_empty();

    let mut builder = Monitor::builder(config);
    if pretty_console {
        builder = builder.handler(Arc::new(FnHandler::new("console", |event: &AlertEvent| {
            println!("{}", format_alert(event));
            Ok(())
        })));
    }
    let monitor = builder.build().context("Failed to create monitor")?;

    let (stop_tx, stop_rx) = mpsc::channel();
    ctrlc::set_handler(move || {
        let _ = stop_tx.send(());
    })
    .map_err(|e| anyhow::anyhow!("Failed to set Ctrl+C handler: {}", e))?;

    monitor.start();
    println!(
        "{} (every {:?}, Ctrl+C to stop)",
        "Monitoring started".bold().green(),
        interval
    );

    let _ = stop_rx.recv();
    println!();
    println!("{}", "Stopping monitor...".yellow().bold());

    match monitor.stop() {
        StopOutcome::Abandoned => println!(
            "{}",
            "Monitoring loop did not stop in time and was abandoned".red()
        ),
        _ => println!("{}", "Monitoring stopped.".green()),
    }

    let ticks = monitor.scheduler_stats();
    let delivery = monitor.dispatch_stats();
    println!(
        "{}",
        format!(
            "{} tick(s), {} fault(s); alerts delivered {}, failed {}, timed out {}, dropped {}",
            ticks.ticks,
            ticks.faults,
            delivery.delivered,
            delivery.failed,
            delivery.timed_out,
            delivery.dropped
        )
        .dimmed()
    );

    Ok(())
}
