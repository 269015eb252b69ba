//! GPU discovery through the platform's own listing tools.

use std::process::Command;

use crate::core::system_monitor::{SourceError, SourceResult};

/// Names of the graphics adapters on this host.
pub fn detect_gpus() -> SourceResult<Vec<String>> {
    if cfg!(target_os = "linux") {
        probe("lspci", &[], parse_lspci)
    } else if cfg!(windows) {
        probe(
            "wmic",
            &["path", "win32_VideoController", "get", "name"],
            parse_wmic,
        )
    } else if cfg!(target_os = "macos") {
        probe("system_profiler", &["SPDisplaysDataType"], parse_system_profiler)
    } else {
        Err(SourceError::unavailable(
            "GPU detection not supported on this platform",
        ))
    }
}

fn probe(program: &str, args: &[&str], parse: fn(&str) -> Vec<String>) -> SourceResult<Vec<String>> {
    let output = Command::new(program)
        .args(args)
        .output()
        .map_err(|e| SourceError::unavailable(format!("{} not available: {}", program, e)))?;

    if !output.status.success() {
        return Err(SourceError::failed(format!(
            "{} exited with {}",
            program, output.status
        )));
    }

    let gpus = parse(&String::from_utf8_lossy(&output.stdout));
    if gpus.is_empty() {
        return Err(SourceError::unavailable("no GPU found"));
    }
    Ok(gpus)
}

fn parse_lspci(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .filter(|line| line.contains("VGA") || line.contains("3D controller"))
        .map(|line| {
            // "00:02.0 VGA compatible controller: Intel Corporation ..."
            line.splitn(3, ':')
                .nth(2)
                .map(str::trim)
                .unwrap_or(line)
                .to_string()
        })
        .collect()
}

fn parse_wmic(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && *line != "Name")
        .map(str::to_string)
        .collect()
}

fn parse_system_profiler(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .filter_map(|line| line.trim().strip_prefix("Chipset Model:"))
        .map(|name| name.trim().to_string())
        .collect()
}
