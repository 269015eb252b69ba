use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// Every metric class the engine knows how to sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricClass {
    Cpu,
    Memory,
    Disk,
    Network,
    Temperature,
    Fan,
    Gpu,
    Processes,
    Battery,
    Uptime,
}

impl MetricClass {
    pub const ALL: [MetricClass; 10] = [
        MetricClass::Cpu,
        MetricClass::Memory,
        MetricClass::Disk,
        MetricClass::Network,
        MetricClass::Temperature,
        MetricClass::Fan,
        MetricClass::Gpu,
        MetricClass::Processes,
        MetricClass::Battery,
        MetricClass::Uptime,
    ];

    /// Freshness tier a class is refreshed at.
    pub fn tier(self) -> Tier {
        match self {
            MetricClass::Cpu | MetricClass::Memory | MetricClass::Processes => Tier::Fast,
            MetricClass::Network => Tier::Fast,
            MetricClass::Temperature | MetricClass::Fan | MetricClass::Battery => Tier::Medium,
            MetricClass::Uptime => Tier::Medium,
            MetricClass::Disk | MetricClass::Gpu => Tier::Slow,
        }
    }

    /// Whether threshold rules can be attached to this class.
    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            MetricClass::Cpu
                | MetricClass::Memory
                | MetricClass::Disk
                | MetricClass::Temperature
                | MetricClass::Fan
                | MetricClass::Battery
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MetricClass::Cpu => "cpu",
            MetricClass::Memory => "memory",
            MetricClass::Disk => "disk",
            MetricClass::Network => "network",
            MetricClass::Temperature => "temperature",
            MetricClass::Fan => "fan",
            MetricClass::Gpu => "gpu",
            MetricClass::Processes => "processes",
            MetricClass::Battery => "battery",
            MetricClass::Uptime => "uptime",
        }
    }
}

impl fmt::Display for MetricClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Fast,
    Medium,
    Slow,
}

/// Refresh durations per tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierDurations {
    pub fast: Duration,
    pub medium: Duration,
    pub slow: Duration,
}

impl TierDurations {
    pub fn of(&self, tier: Tier) -> Duration {
        match tier {
            Tier::Fast => self.fast,
            Tier::Medium => self.medium,
            Tier::Slow => self.slow,
        }
    }
}

impl Default for TierDurations {
    fn default() -> Self {
        Self {
            fast: Duration::from_secs(1),
            medium: Duration::from_secs(30),
            slow: Duration::from_secs(300),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiskInfo {
    pub mount: String,
    pub percent: f64,
    pub total_gb: f64,
    pub used_gb: f64,
    pub free_gb: f64,
}

impl DiskInfo {
    /// Build from raw byte counts, rounding like the text report does.
    pub fn from_bytes(mount: impl Into<String>, total: u64, available: u64) -> Self {
        const GB: f64 = 1024.0 * 1024.0 * 1024.0;
        let used = total.saturating_sub(available);
        let percent = if total > 0 {
            used as f64 / total as f64 * 100.0
        } else {
            0.0
        };

        Self {
            mount: mount.into(),
            percent: round_to(percent, 1),
            total_gb: round_to(total as f64 / GB, 2),
            used_gb: round_to(used as f64 / GB, 2),
            free_gb: round_to(available as f64 / GB, 2),
        }
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkTotals {
    pub sent_mb: f64,
    pub recv_mb: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InterfaceStats {
    pub sent_mb: f64,
    pub recv_mb: f64,
    pub packets_sent: u64,
    pub packets_recv: u64,
    pub errin: u64,
    pub errout: u64,
    pub dropin: u64,
    pub dropout: u64,
}

/// Network counters since boot: host totals plus the per-interface table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkStats {
    pub totals: NetworkTotals,
    pub interfaces: BTreeMap<String, InterfaceStats>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemperatureReading {
    pub label: String,
    pub current: f32,
    pub high: Option<f32>,
    pub critical: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FanReading {
    pub label: String,
    pub current: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatteryInfo {
    pub percent: f32,
    pub plugged: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessInfo {
    pub pid: u32,
    pub name: String,
    pub cpu: f32,
    pub memory: f32,
}

/// Sensor name -> readings of that sensor.
pub type SensorTable<T> = BTreeMap<String, Vec<T>>;

/// Payload of one metric class, as stored in the cache.
#[derive(Debug, Clone, PartialEq)]
pub enum MetricValue {
    Cpu(f32),
    Memory(f32),
    Disks(BTreeMap<String, DiskInfo>),
    Network(NetworkStats),
    Temperatures(SensorTable<TemperatureReading>),
    Fans(SensorTable<FanReading>),
    Gpus(Vec<String>),
    Processes(Vec<ProcessInfo>),
    Battery(BatteryInfo),
    Uptime(Duration),
}
