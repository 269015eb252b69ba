//! Fan speed sensors.

#[cfg(target_os = "linux")]
use std::fs;
#[cfg(target_os = "linux")]
use std::path::Path;

use crate::core::system_monitor::{FanReading, SensorTable, SourceError, SourceResult};

/// Fan readings grouped by hwmon chip name.
#[cfg(target_os = "linux")]
pub fn read_fans() -> SourceResult<SensorTable<FanReading>> {
    read_fans_from(Path::new("/sys/class/hwmon"))
}

#[cfg(not(target_os = "linux"))]
pub fn read_fans() -> SourceResult<SensorTable<FanReading>> {
    Err(SourceError::unavailable("fan sensors not supported on this platform"))
}

#[cfg(target_os = "linux")]
fn read_fans_from(root: &Path) -> SourceResult<SensorTable<FanReading>> {
    let entries = fs::read_dir(root)
        .map_err(|e| SourceError::unavailable(format!("cannot read {:?}: {}", root, e)))?;

    let mut table = SensorTable::new();
    for chip in entries.flatten() {
        let chip_path = chip.path();
        let chip_name = fs::read_to_string(chip_path.join("name"))
            .map(|s| s.trim().to_string())
            .unwrap_or_else(|_| chip.file_name().to_string_lossy().to_string());

        let Ok(files) = fs::read_dir(&chip_path) else {
            continue;
        };
        let mut readings: Vec<FanReading> = files
            .flatten()
            .filter_map(|file| {
                let name = file.file_name().to_string_lossy().to_string();
                let index = name.strip_prefix("fan")?.strip_suffix("_input")?.to_string();
                let rpm: f32 = fs::read_to_string(file.path()).ok()?.trim().parse().ok()?;
                let label = fs::read_to_string(chip_path.join(format!("fan{}_label", index)))
                    .map(|s| s.trim().to_string())
                    .unwrap_or_else(|_| format!("fan{}", index));
                Some(FanReading {
                    label,
                    current: rpm,
                })
            })
            .collect();

        if !readings.is_empty() {
            readings.sort_by(|a, b| a.label.cmp(&b.label));
            table.entry(chip_name).or_default().extend(readings);
        }
    }

    if table.is_empty() {
        return Err(SourceError::unavailable("no fan sensors found"));
    }
    Ok(table)
}
