//! Scripted metric source and recording handlers shared by the integration tests.

use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use hostwatch::core::system_monitor::{
    AlertEvent, AlertHandler, BatteryInfo, DiskInfo, FanReading, MetricSource, NetworkStats,
    ProcessInfo, SensorTable, SourceError, SourceResult, TemperatureReading,
};
use hostwatch::{MonitorError, Result};
use parking_lot::Mutex;

/// CPU follows a script (the last value repeats); everything else is fixed.
/// GPUs, sensors and battery are unavailable as on a headless VM.
#[derive(Default)]
pub struct ScriptedSource {
    cpu: Mutex<VecDeque<f32>>,
    last_cpu: Mutex<f32>,
    pub cpu_delay: Mutex<Option<Duration>>,
    pub fail_all: AtomicBool,
    pub panic_cpu: AtomicBool,
    pub cpu_calls: AtomicU64,
    /// Calls to every method other than `cpu_percent`.
    pub other_calls: AtomicU64,
    cpu_in_flight: AtomicU64,
    /// Most `cpu_percent` calls ever running at once.
    pub max_cpu_in_flight: AtomicU64,
}

impl ScriptedSource {
    pub fn new(cpu: &[f32]) -> Arc<Self> {
        Arc::new(Self {
            cpu: Mutex::new(cpu.iter().copied().collect()),
            ..Default::default()
        })
    }

    pub fn with_cpu_delay(cpu: &[f32], delay: Duration) -> Arc<Self> {
        let source = Self::new(cpu);
        *source.cpu_delay.lock() = Some(delay);
        source
    }

    fn check(&self) -> SourceResult<()> {
        self.other_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_all.load(Ordering::SeqCst) {
            return Err(SourceError::failed("scripted failure"));
        }
        Ok(())
    }
}

impl MetricSource for ScriptedSource {
    fn cpu_percent(&self) -> SourceResult<f32> {
        self.cpu_calls.fetch_add(1, Ordering::SeqCst);
        if self.panic_cpu.load(Ordering::SeqCst) {
            panic!("scripted source bug");
        }
        if self.fail_all.load(Ordering::SeqCst) {
            return Err(SourceError::failed("scripted failure"));
        }
        let delay = *self.cpu_delay.lock();
        if let Some(delay) = delay {
            let running = self.cpu_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_cpu_in_flight.fetch_max(running, Ordering::SeqCst);
            std::thread::sleep(delay);
            self.cpu_in_flight.fetch_sub(1, Ordering::SeqCst);
        }
        let mut last = self.last_cpu.lock();
        if let Some(next) = self.cpu.lock().pop_front() {
            *last = next;
        }
        Ok(*last)
    }

    fn memory_percent(&self) -> SourceResult<f32> {
        self.check()?;
        Ok(30.0)
    }

    fn disks(&self) -> SourceResult<BTreeMap<String, DiskInfo>> {
        self.check()?;
        let mut disks = BTreeMap::new();
        disks.insert("/".to_string(), DiskInfo::from_bytes("/", 100 << 30, 60 << 30));
        Ok(disks)
    }

    fn network(&self) -> SourceResult<NetworkStats> {
        self.check()?;
        Ok(NetworkStats::default())
    }

    fn processes(&self) -> SourceResult<Vec<ProcessInfo>> {
        self.check()?;
        Ok(vec![ProcessInfo {
            pid: 1,
            name: "init".to_string(),
            cpu: 0.5,
            memory: 0.1,
        }])
    }

    fn uptime(&self) -> SourceResult<Duration> {
        self.check()?;
        Ok(Duration::from_secs(90_061))
    }

    fn temperatures(&self) -> SourceResult<SensorTable<TemperatureReading>> {
        self.check()?;
        Err(SourceError::unavailable("no sensors"))
    }

    fn fans(&self) -> SourceResult<SensorTable<FanReading>> {
        self.check()?;
        Err(SourceError::unavailable("no fans"))
    }

    fn gpus(&self) -> SourceResult<Vec<String>> {
        self.check()?;
        Err(SourceError::unavailable("no GPU"))
    }

    fn battery(&self) -> SourceResult<BatteryInfo> {
        self.check()?;
        Err(SourceError::unavailable("no battery"))
    }
}

/// Remembers every message it receives.
pub struct Recorder {
    pub seen: Mutex<Vec<String>>,
}

impl Recorder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            seen: Mutex::new(Vec::new()),
        })
    }

    pub fn count(&self) -> usize {
        self.seen.lock().len()
    }
}

impl AlertHandler for Recorder {
    fn name(&self) -> &str {
        "recorder"
    }

    fn receive(&self, event: &AlertEvent) -> Result<()> {
        self.seen.lock().push(event.message.clone());
        Ok(())
    }
}

pub struct Failing;

impl AlertHandler for Failing {
    fn name(&self) -> &str {
        "failing"
    }

    fn receive(&self, _event: &AlertEvent) -> Result<()> {
        Err(MonitorError::handler("failing", "always down"))
    }
}

/// Blocks inside `receive` for a fixed time.
pub struct Slow {
    pub delay: Duration,
    pub entered: AtomicBool,
}

impl Slow {
    pub fn new(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay,
            entered: AtomicBool::new(false),
        })
    }
}

impl AlertHandler for Slow {
    fn name(&self) -> &str {
        "slow"
    }

    fn receive(&self, _event: &AlertEvent) -> Result<()> {
        self.entered.store(true, Ordering::SeqCst);
        std::thread::sleep(self.delay);
        Ok(())
    }
}

pub fn wait_until(what: impl Fn() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !what() {
        assert!(Instant::now() < deadline, "condition not reached in time");
        std::thread::sleep(Duration::from_millis(5));
    }
}
