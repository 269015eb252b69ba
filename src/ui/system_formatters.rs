use std::fmt::Write;

use colored::*;

use crate::core::system_monitor::{AlertEvent, AlertSeverity, Snapshot};
use crate::ui::formatters::{format_mb, format_percent};

const INDENT: &str = "\n  ";

/// Plain-text report of a snapshot. Absent metrics print as "N/A".
pub fn render_snapshot(snapshot: &Snapshot) -> String {
    let mut out = String::new();

    let _ = writeln!(
        out,
        "=== System State @ {} ===",
        snapshot.timestamp.format("%Y-%m-%d %H:%M:%S")
    );
    let _ = writeln!(
        out,
        "CPU: {} | RAM: {} | Uptime: {}",
        format_percent(snapshot.cpu),
        format_percent(snapshot.ram),
        snapshot.uptime.as_deref().unwrap_or("N/A")
    );

    let network = match &snapshot.network {
        Some(n) => format!("Sent {} / Recv {}", format_mb(n.sent_mb), format_mb(n.recv_mb)),
        None => "N/A".to_string(),
    };
    let _ = writeln!(out, "Network: {}", network);

    let battery = match &snapshot.battery {
        Some(b) => format!("{:.0}% (plugged: {})", b.percent, b.plugged),
        None => "N/A".to_string(),
    };
    let _ = writeln!(out, "Battery: {}", battery);

    let disks = snapshot.disks.as_ref().map(|disks| {
        disks
            .values()
            .map(|d| format!("{}: {:.0}% used ({:.1} GB free)", d.mount, d.percent, d.free_gb))
            .collect()
    });
    section(&mut out, "Disks", disks);

    let gpus = match &snapshot.gpus {
        Some(gpus) if !gpus.is_empty() => gpus.join(", "),
        _ => "N/A".to_string(),
    };
    let _ = writeln!(out, "GPUs: {}", gpus);

    let temperatures = snapshot.temperatures.as_ref().map(|table| {
        table
            .iter()
            .map(|(sensor, readings)| {
                let list: Vec<_> = readings
                    .iter()
                    .map(|t| format!("{} {:.1}°C", t.label, t.current))
                    .collect();
                format!("{}: {}", sensor, list.join(", "))
            })
            .collect()
    });
    section(&mut out, "Temperatures", temperatures);

    let fans = snapshot.fans.as_ref().map(|table| {
        table
            .iter()
            .map(|(sensor, readings)| {
                let list: Vec<_> = readings
                    .iter()
                    .map(|f| format!("{} {:.0} RPM", f.label, f.current))
                    .collect();
                format!("{}: {}", sensor, list.join(", "))
            })
            .collect()
    });
    section(&mut out, "Fans", fans);

    let interfaces = snapshot.network_interfaces.as_ref().map(|table| {
        table
            .iter()
            .map(|(name, s)| {
                format!("{}: Sent {} / Recv {}", name, format_mb(s.sent_mb), format_mb(s.recv_mb))
            })
            .collect()
    });
    section(&mut out, "Network Interfaces", interfaces);

    let processes = snapshot.top_processes.as_ref().map(|procs| {
        procs
            .iter()
            .map(|p| {
                format!(
                    "{} (PID {}) CPU: {:.1}% | RAM: {:.1}%",
                    p.name, p.pid, p.cpu, p.memory
                )
            })
            .collect()
    });
    section(&mut out, "Top processes", processes);

    out
}

fn section(out: &mut String, title: &str, lines: Option<Vec<String>>) {
    let body = match lines {
        Some(lines) if !lines.is_empty() => lines.join(INDENT),
        _ => "N/A".to_string(),
    };
    let _ = writeln!(out, "{}:{}{}", title, INDENT, body);
}

/// Print a snapshot with highlighted section headers
pub fn print_snapshot(snapshot: &Snapshot) {
    for line in render_snapshot(snapshot).lines() {
        if line.starts_with("===") {
            println!("{}", line.bold().bright_cyan());
        } else if !line.starts_with(' ') && line.ends_with(':') {
            println!("{}", line.bold().green());
        } else {
            println!("{}", line);
        }
    }
}

/// One-line colored alert summary
pub fn format_alert(event: &AlertEvent) -> String {
    let tag = format!("[{}]", event.severity);
    let tag = match event.severity {
        AlertSeverity::Critical => tag.red().bold(),
        AlertSeverity::Warning => tag.yellow().bold(),
        AlertSeverity::Info => tag.blue(),
    };
    format!(
        "{} {} {}",
        event.timestamp.format("%H:%M:%S").to_string().dimmed(),
        tag,
        event.message
    )
}
