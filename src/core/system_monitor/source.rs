use std::collections::BTreeMap;
use std::time::Duration;

use thiserror::Error;

use super::metrics::*;

/// Failure reported by a metric source.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SourceError {
    /// The host cannot provide this metric at all (no GPU, no sensors, ...).
    #[error("unavailable: {0}")]
    Unavailable(String),

    /// Sampling failed this time; a later attempt may succeed.
    #[error("failed: {0}")]
    Failed(String),
}

impl SourceError {
    pub fn unavailable<S: Into<String>>(msg: S) -> Self {
        SourceError::Unavailable(msg.into())
    }

    pub fn failed<S: Into<String>>(msg: S) -> Self {
        SourceError::Failed(msg.into())
    }
}

pub type SourceResult<T> = std::result::Result<T, SourceError>;

/// Capability that reads raw host metrics.
///
/// Every call is a fresh query; caching is the job of [`TieredCache`].
/// Optional sensors default to [`SourceError::Unavailable`] so a source only
/// implements what its platform can provide.
///
/// [`TieredCache`]: super::TieredCache
pub trait MetricSource: Send + Sync {
    fn cpu_percent(&self) -> SourceResult<f32>;

    fn memory_percent(&self) -> SourceResult<f32>;

    fn disks(&self) -> SourceResult<BTreeMap<String, DiskInfo>>;

    fn network(&self) -> SourceResult<NetworkStats>;

    fn processes(&self) -> SourceResult<Vec<ProcessInfo>>;

    fn uptime(&self) -> SourceResult<Duration>;

    fn temperatures(&self) -> SourceResult<SensorTable<TemperatureReading>> {
        Err(SourceError::unavailable("temperature sensors not supported"))
    }

    fn fans(&self) -> SourceResult<SensorTable<FanReading>> {
        Err(SourceError::unavailable("fan sensors not supported"))
    }

    fn gpus(&self) -> SourceResult<Vec<String>> {
        Err(SourceError::unavailable("GPU detection not supported"))
    }

    fn battery(&self) -> SourceResult<BatteryInfo> {
        Err(SourceError::unavailable("no battery"))
    }
}

/// Query the source for one metric class.
pub fn sample(source: &dyn MetricSource, class: MetricClass) -> SourceResult<MetricValue> {
    let value = match class {
        MetricClass::Cpu => MetricValue::Cpu(source.cpu_percent()?),
        MetricClass::Memory => MetricValue::Memory(source.memory_percent()?),
        MetricClass::Disk => MetricValue::Disks(source.disks()?),
        MetricClass::Network => MetricValue::Network(source.network()?),
        MetricClass::Temperature => MetricValue::Temperatures(source.temperatures()?),
        MetricClass::Fan => MetricValue::Fans(source.fans()?),
        MetricClass::Gpu => MetricValue::Gpus(source.gpus()?),
        MetricClass::Processes => MetricValue::Processes(source.processes()?),
        MetricClass::Battery => MetricValue::Battery(source.battery()?),
        MetricClass::Uptime => MetricValue::Uptime(source.uptime()?),
    };
    Ok(value)
}
