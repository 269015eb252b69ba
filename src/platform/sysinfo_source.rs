//! [`MetricSource`] backed by `sysinfo` and the platform probes.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::time::Duration;

use parking_lot::Mutex;
use sysinfo::{Components, Disks, Networks, ProcessesToUpdate, System};

use crate::core::system_monitor::{
    BatteryInfo, DiskInfo, FanReading, InterfaceStats, MetricSource, NetworkStats,
    NetworkTotals, ProcessInfo, SensorTable, SourceError, SourceResult, TemperatureReading,
};

use super::{gpu_probe, power, sensors};

const MB: f64 = 1024.0 * 1024.0;

struct CpuState {
    system: System,
    primed: bool,
}

/// Reads the local host.
///
/// Each sysinfo handle sits behind its own lock so classes refreshed by
/// different callers don't wait on each other.
pub struct SysinfoSource {
    cpu: Mutex<CpuState>,
    system: Mutex<System>,
    disks: Mutex<Disks>,
    networks: Mutex<Networks>,
    components: Mutex<Components>,
    top_processes: usize,
}

impl SysinfoSource {
    pub fn new(top_processes: usize) -> Self {
        Self {
            cpu: Mutex::new(CpuState {
                system: System::new(),
                primed: false,
            }),
            system: Mutex::new(System::new()),
            disks: Mutex::new(Disks::new_with_refreshed_list()),
            networks: Mutex::new(Networks::new_with_refreshed_list()),
            components: Mutex::new(Components::new_with_refreshed_list()),
            top_processes,
        }
    }
}

impl Default for SysinfoSource {
    fn default() -> Self {
        Self::new(5)
    }
}

fn percent(part: u64, total: u64) -> f32 {
    if total > 0 {
        (part as f64 / total as f64 * 100.0) as f32
    } else {
        0.0
    }
}

/// Sort by CPU then memory, highest first, and keep `limit` entries.
pub(crate) fn rank_processes(mut processes: Vec<ProcessInfo>, limit: usize) -> Vec<ProcessInfo> {
    processes.sort_by(|a, b| {
        b.cpu
            .partial_cmp(&a.cpu)
            .unwrap_or(Ordering::Equal)
            .then(b.memory.partial_cmp(&a.memory).unwrap_or(Ordering::Equal))
    });
    processes.truncate(limit);
    processes
}

/// Group component labels like "coretemp Package id 0" under their chip.
fn sensor_name(label: &str) -> String {
    label
        .split_whitespace()
        .next()
        .unwrap_or("unknown")
        .to_string()
}

impl MetricSource for SysinfoSource {
    fn cpu_percent(&self) -> SourceResult<f32> {
        let mut cpu = self.cpu.lock();
        if !cpu.primed {
            // usage is a delta between two refreshes
            cpu.system.refresh_cpu_usage();
            std::thread::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL);
            cpu.primed = true;
        }
        cpu.system.refresh_cpu_usage();
        if cpu.system.cpus().is_empty() {
            return Err(SourceError::unavailable("no CPU information"));
        }
        Ok(cpu.system.global_cpu_usage())
    }

    fn memory_percent(&self) -> SourceResult<f32> {
        let mut system = self.system.lock();
        system.refresh_memory();
        let total = system.total_memory();
        if total == 0 {
            return Err(SourceError::failed("total memory reported as zero"));
        }
        Ok(percent(system.used_memory(), total))
    }

    fn disks(&self) -> SourceResult<BTreeMap<String, DiskInfo>> {
        let mut disks = self.disks.lock();
        disks.refresh(true);

        Ok(disks
            .iter()
            .filter(|disk| disk.total_space() > 0)
            .map(|disk| {
                let mount = disk.mount_point().to_string_lossy().to_string();
                let info = DiskInfo::from_bytes(
                    mount.clone(),
                    disk.total_space(),
                    disk.available_space(),
                );
                (mount, info)
            })
            .collect())
    }

    fn network(&self) -> SourceResult<NetworkStats> {
        let mut networks = self.networks.lock();
        networks.refresh(true);

        let mut stats = NetworkStats::default();
        for (name, data) in networks.iter() {
            let iface = InterfaceStats {
                sent_mb: data.total_transmitted() as f64 / MB,
                recv_mb: data.total_received() as f64 / MB,
                packets_sent: data.total_packets_transmitted(),
                packets_recv: data.total_packets_received(),
                errin: data.total_errors_on_received(),
                errout: data.total_errors_on_transmitted(),
                // sysinfo doesn't expose drops
                dropin: 0,
                dropout: 0,
            };
            stats.totals.sent_mb += iface.sent_mb;
            stats.totals.recv_mb += iface.recv_mb;
            stats.interfaces.insert(name.to_string(), iface);
        }

        stats.totals = NetworkTotals {
            sent_mb: (stats.totals.sent_mb * 100.0).round() / 100.0,
            recv_mb: (stats.totals.recv_mb * 100.0).round() / 100.0,
        };
        Ok(stats)
    }

    fn processes(&self) -> SourceResult<Vec<ProcessInfo>> {
        let mut system = self.system.lock();
        system.refresh_memory();
        system.refresh_processes(ProcessesToUpdate::All, true);
        let total_memory = system.total_memory();

        let processes = system
            .processes()
            .values()
            .map(|process| ProcessInfo {
                pid: process.pid().as_u32(),
                name: process.name().to_string_lossy().to_string(),
                cpu: process.cpu_usage(),
                memory: percent(process.memory(), total_memory),
            })
            .collect();

        Ok(rank_processes(processes, self.top_processes))
    }

    fn uptime(&self) -> SourceResult<Duration> {
        Ok(Duration::from_secs(System::uptime()))
    }

    fn temperatures(&self) -> SourceResult<SensorTable<TemperatureReading>> {
        let mut components = self.components.lock();
        components.refresh(true);

        let mut table = SensorTable::new();
        for component in components.iter() {
            let Some(current) = component.temperature() else {
                continue;
            };
            let label = component.label().to_string();
            table
                .entry(sensor_name(&label))
                .or_insert_with(Vec::new)
                .push(TemperatureReading {
                    label,
                    current,
                    high: component.max(),
                    critical: component.critical(),
                });
        }

        if table.is_empty() {
            return Err(SourceError::unavailable("no temperature sensors"));
        }
        Ok(table)
    }

    fn fans(&self) -> SourceResult<SensorTable<FanReading>> {
        sensors::read_fans()
    }

    fn gpus(&self) -> SourceResult<Vec<String>> {
        gpu_probe::detect_gpus()
    }

    fn battery(&self) -> SourceResult<BatteryInfo> {
        power::read_battery()
    }
}
