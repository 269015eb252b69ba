use std::collections::BTreeSet;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use hostwatch::core::config::MonitorConfig;
use hostwatch::core::system_monitor::{
    ManualClock, MetricClass, Monitor, Snapshot, SnapshotAssembler, TierDurations, TieredCache,
};
use hostwatch::MonitorError;

use super::support::{Recorder, ScriptedSource};

fn monitor_with(
    config: MonitorConfig,
    source: Arc<ScriptedSource>,
    clock: Arc<ManualClock>,
) -> Monitor {
    Monitor::builder(config)
        .source(source)
        .clock(clock)
        .handler(Recorder::new())
        .build()
        .unwrap()
}

#[test]
fn test_missing_gpu_is_null_not_an_error() {
    let monitor = monitor_with(
        MonitorConfig::default(),
        ScriptedSource::new(&[12.0]),
        Arc::new(ManualClock::new()),
    );

    let state = monitor.state().unwrap();
    assert_eq!(state.cpu, Some(12.0));
    assert_eq!(state.gpus, None);
    assert_eq!(state.battery, None);
    assert_eq!(state.uptime.as_deref(), Some("1d 1h 1m"));

    let mapping = state.to_mapping().unwrap();
    assert!(mapping["gpus"].is_null());
    assert!(mapping["temperatures"].is_null());
}

#[test]
fn test_state_is_served_from_cache_within_tier() {
    let source = ScriptedSource::new(&[10.0, 20.0, 30.0]);
    let clock = Arc::new(ManualClock::new());
    let monitor = monitor_with(MonitorConfig::default(), source.clone(), clock.clone());

    let first = monitor.state().unwrap();
    let second = monitor.state().unwrap();
    assert_eq!(first.cpu, second.cpu);
    assert_eq!(first.disks, second.disks);
    assert_eq!(source.cpu_calls.load(Ordering::SeqCst), 1);

    clock.advance(Duration::from_secs(1));
    let third = monitor.state().unwrap();
    assert_eq!(third.cpu, Some(20.0));
    assert_eq!(source.cpu_calls.load(Ordering::SeqCst), 2);

    // disks sit in the slow tier
    assert_eq!(monitor.cache().stats(MetricClass::Disk).source_calls, 1);
    assert_eq!(monitor.cache().stats(MetricClass::Gpu).unavailable, 1);
}

#[test]
fn test_failed_refresh_serves_last_value() {
    let source = ScriptedSource::new(&[33.0, 99.0]);
    let clock = Arc::new(ManualClock::new());
    let monitor = monitor_with(MonitorConfig::default(), source.clone(), clock.clone());

    assert_eq!(monitor.state().unwrap().cpu, Some(33.0));

    source.fail_all.store(true, Ordering::SeqCst);
    clock.advance(Duration::from_secs(1));
    let stale = monitor.state().unwrap();
    assert_eq!(stale.cpu, Some(33.0));
    assert_eq!(stale.ram, Some(30.0));
    assert_eq!(monitor.cache().stats(MetricClass::Cpu).refresh_failures, 1);
}

#[test]
fn test_nothing_sampled_is_initial_sample_failure() {
    let source = ScriptedSource::new(&[10.0]);
    source.fail_all.store(true, Ordering::SeqCst);
    let monitor = monitor_with(
        MonitorConfig::default(),
        source,
        Arc::new(ManualClock::new()),
    );

    match monitor.state() {
        Err(MonitorError::InitialSampleFailed(reason)) => assert!(reason.contains("cpu")),
        other => panic!("expected InitialSampleFailed, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_disabled_metrics_keep_their_keys() {
    let config = MonitorConfig {
        disabled_metrics: vec![MetricClass::Processes, MetricClass::Network],
        ..MonitorConfig::default()
    };
    let monitor = monitor_with(config, ScriptedSource::new(&[5.0]), Arc::new(ManualClock::new()));

    assert!(!monitor.cache().is_enabled(MetricClass::Processes));
    let state = monitor.state().unwrap();
    assert_eq!(state.top_processes, None);
    assert_eq!(state.network, None);
    assert_eq!(state.network_interfaces, None);
    assert!(state.to_mapping().unwrap().contains_key("top_processes"));
}

#[test]
fn test_mapping_survives_text_round_trip() {
    let monitor = monitor_with(
        MonitorConfig::default(),
        ScriptedSource::new(&[42.0]),
        Arc::new(ManualClock::new()),
    );
    let state = monitor.state().unwrap();

    let mapping = state.to_mapping().unwrap();
    let text = serde_json::to_string(&mapping).unwrap();
    let parsed: serde_json::Map<String, serde_json::Value> = serde_json::from_str(&text).unwrap();

    let before: BTreeSet<_> = mapping.keys().cloned().collect();
    let after: BTreeSet<_> = parsed.keys().cloned().collect();
    assert_eq!(before, after);
    assert!(parsed["gpus"].is_null());
    assert!(parsed["battery"].is_null());

    let restored = Snapshot::from_json(&text).unwrap();
    assert_eq!(restored, state);
}

#[test]
fn test_text_report() {
    let monitor = monitor_with(
        MonitorConfig::default(),
        ScriptedSource::new(&[42.0]),
        Arc::new(ManualClock::new()),
    );
    let text = monitor.state().unwrap().to_string();

    assert!(text.starts_with("=== System State @ "));
    assert!(text.contains("CPU: 42% | RAM: 30% | Uptime: 1d 1h 1m"));
    assert!(text.contains("/: 40% used (60.0 GB free)"));
    assert!(text.contains("init (PID 1) CPU: 0.5% | RAM: 0.1%"));
    assert!(text.contains("Battery: N/A"));
}

#[test]
fn test_interrupted_assembly_refreshes_nothing_further() {
    let source = ScriptedSource::new(&[42.0]);
    let assembler = SnapshotAssembler::new(Arc::new(TieredCache::new(
        source.clone(),
        TierDurations::default(),
    )));

    // allow CPU and memory, then ask it to stop
    let checks = std::sync::atomic::AtomicU64::new(0);
    let result = assembler
        .compose_while(|| checks.fetch_add(1, Ordering::SeqCst) < 2)
        .unwrap();

    assert!(result.is_none());
    assert_eq!(source.cpu_calls.load(Ordering::SeqCst), 1);
    assert_eq!(source.other_calls.load(Ordering::SeqCst), 1);

    let full = assembler.compose_while(|| true).unwrap().unwrap();
    assert_eq!(full.cpu, Some(42.0));
}
