use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};

use hostwatch::core::config::{MonitorConfig, TierConfig};
use hostwatch::core::system_monitor::{
    BackoffConfig, Lifecycle, Monitor, StartOutcome, StopOutcome,
};

use super::support::{wait_until, Failing, Recorder, ScriptedSource, Slow};

/// Fast ticks and tiers so the loop does real work within a test.
fn fast_config() -> MonitorConfig {
    MonitorConfig {
        tick_interval_ms: 20,
        tiers: TierConfig {
            fast_ms: 10,
            medium_ms: 10,
            slow_ms: 10,
        },
        backoff: Some(BackoffConfig {
            base_ms: 10,
            max_ms: 40,
            multiplier: 2.0,
            jitter: true,
        }),
        stop_timeout_ms: 2_000,
        ..MonitorConfig::default()
    }
}

#[test]
fn test_stop_before_start_is_noop() {
    let monitor = Monitor::builder(fast_config())
        .source(ScriptedSource::new(&[10.0]))
        .handler(Recorder::new())
        .build()
        .unwrap();

    assert_eq!(monitor.stop(), StopOutcome::NotRunning);
    assert_eq!(monitor.lifecycle(), Lifecycle::Idle);
    assert!(!monitor.is_running());
}

#[test]
fn test_start_twice_and_graceful_stop() {
    let monitor = Monitor::builder(fast_config())
        .source(ScriptedSource::new(&[10.0]))
        .handler(Recorder::new())
        .build()
        .unwrap();

    assert_eq!(monitor.start(), StartOutcome::Started);
    assert_eq!(monitor.start(), StartOutcome::AlreadyRunning);
    assert!(monitor.is_running());

    wait_until(|| monitor.scheduler_stats().ticks >= 3);

    let started = Instant::now();
    assert_eq!(monitor.stop(), StopOutcome::Graceful);
    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(monitor.lifecycle(), Lifecycle::Idle);
    assert_eq!(monitor.stop(), StopOutcome::NotRunning);

    // no further ticks once stopped
    let ticks = monitor.scheduler_stats().ticks;
    std::thread::sleep(Duration::from_millis(100));
    assert_eq!(monitor.scheduler_stats().ticks, ticks);
}

#[test]
fn test_restart_after_stop() {
    let monitor = Monitor::builder(fast_config())
        .source(ScriptedSource::new(&[10.0]))
        .handler(Recorder::new())
        .build()
        .unwrap();

    monitor.start();
    assert_eq!(monitor.stop(), StopOutcome::Graceful);
    assert_eq!(monitor.start(), StartOutcome::Started);
    assert!(monitor.is_running());
    assert_eq!(monitor.stop(), StopOutcome::Graceful);
}

#[test]
fn test_hung_tick_is_abandoned_within_timeout() {
    let config = MonitorConfig {
        stop_timeout_ms: 100,
        ..fast_config()
    };
    let source = ScriptedSource::with_cpu_delay(&[10.0], Duration::from_millis(800));
    let monitor = Monitor::builder(config)
        .source(source.clone())
        .handler(Recorder::new())
        .build()
        .unwrap();

    monitor.start();
    wait_until(|| source.cpu_calls.load(Ordering::SeqCst) >= 1);

    let started = Instant::now();
    assert_eq!(monitor.stop(), StopOutcome::Abandoned);
    assert!(started.elapsed() < Duration::from_millis(700));
    assert_eq!(monitor.lifecycle(), Lifecycle::Idle);

    // the detached tick finishes its CPU read, then samples nothing else
    let cpu_calls = source.cpu_calls.load(Ordering::SeqCst);
    let other_calls = source.other_calls.load(Ordering::SeqCst);
    std::thread::sleep(Duration::from_millis(1_200));
    assert_eq!(source.cpu_calls.load(Ordering::SeqCst), cpu_calls);
    assert_eq!(source.other_calls.load(Ordering::SeqCst), other_calls);
    assert_eq!(monitor.scheduler_stats().ticks, 0);
}

#[test]
fn test_restart_waits_for_abandoned_tick() {
    let config = MonitorConfig {
        stop_timeout_ms: 50,
        ..fast_config()
    };
    let source = ScriptedSource::with_cpu_delay(&[10.0], Duration::from_millis(400));
    let monitor = Monitor::builder(config)
        .source(source.clone())
        .handler(Recorder::new())
        .build()
        .unwrap();

    monitor.start();
    wait_until(|| source.cpu_calls.load(Ordering::SeqCst) >= 1);
    assert_eq!(monitor.stop(), StopOutcome::Abandoned);

    assert_eq!(monitor.start(), StartOutcome::Started);
    wait_until(|| source.cpu_calls.load(Ordering::SeqCst) >= 2);
    monitor.stop();

    assert_eq!(source.max_cpu_in_flight.load(Ordering::SeqCst), 1);
}

#[test]
fn test_stop_mid_tick_leaves_breach_reportable() {
    let source = ScriptedSource::with_cpu_delay(&[90.0], Duration::from_millis(300));
    let recorder = Recorder::new();
    let mut config = fast_config();
    config.thresholds.cpu = Some(50.0);
    let monitor = Monitor::builder(config)
        .source(source.clone())
        .handler(recorder.clone())
        .build()
        .unwrap();

    monitor.start();
    wait_until(|| source.cpu_calls.load(Ordering::SeqCst) >= 1);
    assert_eq!(monitor.stop(), StopOutcome::Graceful);
    assert_eq!(monitor.scheduler_stats().ticks, 0);

    let events = monitor.check().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].rule_id, "cpu");
    wait_until(|| recorder.count() == 1);
}

#[test]
fn test_stop_during_slow_delivery_returns_in_time() {
    let slow = Slow::new(Duration::from_secs(3));
    let monitor = Monitor::builder(MonitorConfig {
        stop_timeout_ms: 500,
        ..fast_config()
    })
    .source(ScriptedSource::new(&[95.0]))
    .handler(slow.clone())
    .build()
    .unwrap();

    monitor.start();
    wait_until(|| slow.entered.load(Ordering::SeqCst));

    let started = Instant::now();
    let outcome = monitor.stop();
    assert!(started.elapsed() < Duration::from_secs(1));
    assert_ne!(outcome, StopOutcome::NotRunning);
    assert_eq!(monitor.dispatch_stats().delivered, 0);
}

#[test]
fn test_failing_handler_does_not_stop_others_or_ticks() {
    let recorder = Recorder::new();
    // alternate in and out of breach so every other tick fires
    let script: Vec<f32> = (0..40).map(|i| if i % 2 == 0 { 90.0 } else { 10.0 }).collect();
    let monitor = Monitor::builder(fast_config())
        .source(ScriptedSource::new(&script))
        .handler(Arc::new(Failing))
        .handler(recorder.clone())
        .build()
        .unwrap();

    monitor.start();
    wait_until(|| recorder.count() >= 3);
    wait_until(|| monitor.dispatch_stats().failed >= 3);
    monitor.stop();

    assert!(recorder.seen.lock().iter().all(|m| m == "High CPU usage: 90%"));
    assert_eq!(monitor.scheduler_stats().faults, 0);
}

#[test]
fn test_faulted_ticks_back_off_and_recover() {
    let source = ScriptedSource::new(&[10.0]);
    source.fail_all.store(true, Ordering::SeqCst);
    let monitor = Monitor::builder(fast_config())
        .source(source.clone())
        .handler(Recorder::new())
        .build()
        .unwrap();

    monitor.start();
    wait_until(|| monitor.scheduler_stats().faults >= 3);
    assert!(monitor.is_running());
    let last_fault = monitor.scheduler_stats().last_fault.unwrap();
    assert!(last_fault.contains("Initial sample failed"), "{}", last_fault);

    source.fail_all.store(false, Ordering::SeqCst);
    wait_until(|| monitor.scheduler_stats().ticks >= 2);
    let faults = monitor.scheduler_stats().faults;
    std::thread::sleep(Duration::from_millis(100));
    assert_eq!(monitor.scheduler_stats().faults, faults);

    assert_eq!(monitor.stop(), StopOutcome::Graceful);
}

#[test]
fn test_panicking_source_is_a_recorded_fault() {
    let source = ScriptedSource::new(&[10.0]);
    source.panic_cpu.store(true, Ordering::SeqCst);
    let monitor = Monitor::builder(fast_config())
        .source(source.clone())
        .handler(Recorder::new())
        .build()
        .unwrap();

    monitor.start();
    wait_until(|| monitor.scheduler_stats().faults >= 2);
    assert!(monitor.is_running());

    source.panic_cpu.store(false, Ordering::SeqCst);
    wait_until(|| monitor.scheduler_stats().ticks >= 1);
    assert_eq!(monitor.stop(), StopOutcome::Graceful);
}
