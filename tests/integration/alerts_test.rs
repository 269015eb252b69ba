use std::sync::Arc;
use std::time::Duration;

use hostwatch::core::config::MonitorConfig;
use hostwatch::core::system_monitor::{
    AlertSeverity, ManualClock, MetricClass, Monitor, ThresholdRule,
};

use super::support::{wait_until, Recorder, ScriptedSource};

fn cpu_limit(limit: f32) -> MonitorConfig {
    let mut config = MonitorConfig::default();
    config.thresholds.cpu = Some(limit);
    config
}

#[test]
fn test_crossings_fire_once_per_episode() {
    let clock = Arc::new(ManualClock::new());
    let recorder = Recorder::new();
    let monitor = Monitor::builder(cpu_limit(50.0))
        .source(ScriptedSource::new(&[40.0, 60.0, 65.0, 45.0, 70.0]))
        .clock(clock.clone())
        .handler(recorder.clone())
        .build()
        .unwrap();

    let mut fired_at = Vec::new();
    for i in 0..5 {
        let events = monitor.check().unwrap();
        if !events.is_empty() {
            assert_eq!(events.len(), 1);
            assert_eq!(events[0].metric, MetricClass::Cpu);
            fired_at.push(i);
        }
        clock.advance(Duration::from_secs(1));
    }

    assert_eq!(fired_at, vec![1, 4]);
    wait_until(|| recorder.count() == 2);
    assert_eq!(
        *recorder.seen.lock(),
        vec!["High CPU usage: 60%", "High CPU usage: 70%"]
    );
}

#[test]
fn test_renotify_after_interval() {
    let clock = Arc::new(ManualClock::new());
    let config = MonitorConfig {
        renotify_after_secs: Some(5),
        ..cpu_limit(50.0)
    };
    let monitor = Monitor::builder(config)
        .source(ScriptedSource::new(&[90.0]))
        .clock(clock.clone())
        .handler(Recorder::new())
        .build()
        .unwrap();

    let mut fired = Vec::new();
    for second in 0..11 {
        if !monitor.check().unwrap().is_empty() {
            fired.push(second);
        }
        clock.advance(Duration::from_secs(1));
    }
    assert_eq!(fired, vec![0, 5, 10]);
}

#[test]
fn test_extra_rules_from_config() {
    let clock = Arc::new(ManualClock::new());
    let mut config = cpu_limit(95.0);
    config.thresholds.disk = Some(95.0);
    config.rules.push(
        ThresholdRule::above("disk-warning", MetricClass::Disk, 35.0)
            .with_severity(AlertSeverity::Critical),
    );
    let monitor = Monitor::builder(config)
        .source(ScriptedSource::new(&[10.0]))
        .clock(clock)
        .handler(Recorder::new())
        .build()
        .unwrap();

    let events = monitor.check().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].rule_id, "disk-warning");
    assert_eq!(events[0].subject, "/");
    assert_eq!(events[0].severity, AlertSeverity::Critical);
    assert_eq!(events[0].message, "Low disk space on /: 40% used");

    // still breached, nothing new
    assert!(monitor.check().unwrap().is_empty());
}
