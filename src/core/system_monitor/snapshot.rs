//! Immutable point-in-time view of every monitored metric.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::error::{MonitorError, Result};
use crate::ui::format_uptime;

use super::cache::TieredCache;
use super::metrics::*;

/// System state at assembly time.
///
/// Every field is always present in the serialized form; a metric that is
/// disabled or unavailable on this host serializes as `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub timestamp: DateTime<Local>,
    pub cpu: Option<f32>,
    pub ram: Option<f32>,
    pub disks: Option<BTreeMap<String, DiskInfo>>,
    pub gpus: Option<Vec<String>>,
    pub uptime: Option<String>,
    pub network: Option<NetworkTotals>,
    pub network_interfaces: Option<BTreeMap<String, InterfaceStats>>,
    pub battery: Option<BatteryInfo>,
    pub top_processes: Option<Vec<ProcessInfo>>,
    pub temperatures: Option<SensorTable<TemperatureReading>>,
    pub fans: Option<SensorTable<FanReading>>,
}

/// One numeric observation a threshold rule can be checked against.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    /// Mount point or sensor the value belongs to; empty for host-wide metrics.
    pub subject: String,
    pub value: f64,
}

impl Reading {
    fn host(value: f64) -> Self {
        Self {
            subject: String::new(),
            value,
        }
    }
}

impl Snapshot {
    /// Snapshot with every metric absent.
    pub fn empty(timestamp: DateTime<Local>) -> Self {
        Self {
            timestamp,
            cpu: None,
            ram: None,
            disks: None,
            gpus: None,
            uptime: None,
            network: None,
            network_interfaces: None,
            battery: None,
            top_processes: None,
            temperatures: None,
            fans: None,
        }
    }

    fn apply(&mut self, value: MetricValue) {
        match value {
            MetricValue::Cpu(v) => self.cpu = Some(v),
            MetricValue::Memory(v) => self.ram = Some(v),
            MetricValue::Disks(disks) => self.disks = Some(disks),
            MetricValue::Network(stats) => {
                self.network = Some(stats.totals);
                self.network_interfaces = Some(stats.interfaces);
            }
            MetricValue::Temperatures(temps) => self.temperatures = Some(temps),
            MetricValue::Fans(fans) => self.fans = Some(fans),
            MetricValue::Gpus(gpus) => self.gpus = Some(gpus),
            MetricValue::Processes(procs) => self.top_processes = Some(procs),
            MetricValue::Battery(battery) => self.battery = Some(battery),
            MetricValue::Uptime(uptime) => self.uptime = Some(format_uptime(uptime)),
        }
    }

    /// Numeric readings for `class`, or `None` when the metric is absent.
    pub fn readings(&self, class: MetricClass) -> Option<Vec<Reading>> {
        match class {
            MetricClass::Cpu => self.cpu.map(|v| vec![Reading::host(v as f64)]),
            MetricClass::Memory => self.ram.map(|v| vec![Reading::host(v as f64)]),
            MetricClass::Battery => self
                .battery
                .as_ref()
                .map(|b| vec![Reading::host(b.percent as f64)]),
            MetricClass::Disk => self.disks.as_ref().map(|disks| {
                disks
                    .values()
                    .map(|d| Reading {
                        subject: d.mount.clone(),
                        value: d.percent,
                    })
                    .collect()
            }),
            MetricClass::Temperature => self.temperatures.as_ref().map(|table| {
                sensor_readings(table, |t| (t.label.as_str(), t.current as f64))
            }),
            MetricClass::Fan => self.fans.as_ref().map(|table| {
                sensor_readings(table, |f| (f.label.as_str(), f.current as f64))
            }),
            _ => None,
        }
    }

    /// Plain key/value form of the snapshot.
    pub fn to_mapping(&self) -> Result<serde_json::Map<String, serde_json::Value>> {
        match serde_json::to_value(self)? {
            serde_json::Value::Object(map) => Ok(map),
            other => Err(MonitorError::config(format!(
                "snapshot serialized to a non-object: {}",
                other
            ))),
        }
    }

    pub fn to_json(&self, pretty: bool) -> Result<String> {
        let text = if pretty {
            serde_json::to_string_pretty(self)?
        } else {
            serde_json::to_string(self)?
        };
        Ok(text)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

fn sensor_readings<T>(
    table: &SensorTable<T>,
    extract: impl Fn(&T) -> (&str, f64),
) -> Vec<Reading> {
    let extract = &extract;
    table
        .iter()
        .flat_map(|(sensor, entries)| {
            entries.iter().map(move |entry| {
                let (label, value) = extract(entry);
                let subject = if label.is_empty() || label == sensor {
                    sensor.clone()
                } else {
                    format!("{}/{}", sensor, label)
                };
                Reading { subject, value }
            })
        })
        .collect()
}

impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&crate::ui::render_snapshot(self))
    }
}

/// Builds snapshots out of whatever the cache currently holds.
pub struct SnapshotAssembler {
    cache: Arc<TieredCache>,
}

impl SnapshotAssembler {
    pub fn new(cache: Arc<TieredCache>) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &Arc<TieredCache> {
        &self.cache
    }

    /// Pull every enabled class through the cache.
    ///
    /// Fails only when no class has ever produced an entry.
    pub fn compose(&self) -> Result<Snapshot> {
        self.compose_while(|| true)?
            .ok_or_else(|| MonitorError::scheduler_fault("snapshot assembly interrupted"))
    }

    /// Like [`compose`](Self::compose), but checks `keep_going` before each
    /// class and returns `Ok(None)` as soon as it says no. Classes after that
    /// point are not refreshed.
    pub fn compose_while(&self, keep_going: impl Fn() -> bool) -> Result<Option<Snapshot>> {
        let mut snapshot = Snapshot::empty(Local::now());
        let mut failures = Vec::new();

        for class in self.cache.classes() {
            if !keep_going() {
                log::debug!("Snapshot assembly interrupted before {}", class);
                return Ok(None);
            }
            match self.cache.get(class) {
                Ok(Some(value)) => snapshot.apply(value),
                Ok(None) => {}
                Err(e) => failures.push(e.to_string()),
            }
        }

        if !self.cache.is_populated() {
            let reason = if failures.is_empty() {
                "no metric classes enabled".to_string()
            } else {
                failures.join("; ")
            };
            return Err(MonitorError::initial_sample_failed(reason));
        }

        Ok(Some(snapshot))
    }
}
