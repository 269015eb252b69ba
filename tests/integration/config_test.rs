use std::fs;

use hostwatch::core::config::{HandlerConfig, MonitorConfig};
use hostwatch::core::system_monitor::{MetricClass, Monitor};
use hostwatch::MonitorError;
use tempfile::TempDir;

use super::support::ScriptedSource;

#[test]
fn test_load_partial_file_uses_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("hostwatch.json");
    fs::write(
        &path,
        r#"{
            "thresholds": {"cpu": 85, "temperature": 90},
            "tick_interval_ms": 500,
            "disabled_metrics": ["gpu", "fan"],
            "renotify_after_secs": 600,
            "handlers": [
                {"type": "log", "target": "alerts"},
                {"type": "webhook", "url": "http://127.0.0.1:9/hook"}
            ]
        }"#,
    )
    .unwrap();

    let config = MonitorConfig::load_from_file(&path).unwrap();
    assert_eq!(config.thresholds.cpu, Some(85.0));
    assert_eq!(config.thresholds.ram, Some(70.0));
    assert_eq!(config.thresholds.temperature, Some(90.0));
    assert_eq!(config.tick_interval_ms, 500);
    assert_eq!(config.tiers.slow_ms, 300_000);
    assert_eq!(config.backoff_config().max_ms, 2_500);
    assert!(!config.enabled_classes().contains(&MetricClass::Gpu));
    assert_eq!(
        config.handlers[0],
        HandlerConfig::Log {
            target: Some("alerts".to_string())
        }
    );
    assert_eq!(config.rules().len(), 4);
}

#[test]
fn test_load_rejects_bad_files() {
    let dir = TempDir::new().unwrap();

    let missing = dir.path().join("missing.json");
    assert!(matches!(
        MonitorConfig::load_from_file(&missing),
        Err(MonitorError::Config(_))
    ));

    let garbage = dir.path().join("garbage.json");
    fs::write(&garbage, "{ not json").unwrap();
    assert!(matches!(
        MonitorConfig::load_from_file(&garbage),
        Err(MonitorError::Config(_))
    ));

    let invalid = dir.path().join("invalid.json");
    fs::write(&invalid, r#"{"tiers": {"fast_ms": 0}}"#).unwrap();
    assert!(MonitorConfig::load_from_file(&invalid).is_err());
}

#[test]
fn test_monitor_rejects_invalid_config() {
    let mut config = MonitorConfig::default();
    config.thresholds.disk = Some(-5.0);
    let result = Monitor::builder(config)
        .source(ScriptedSource::new(&[1.0]))
        .build();
    assert!(matches!(result, Err(MonitorError::Config(_))));
}

#[test]
fn test_bad_email_handler_fails_at_build() {
    let config = MonitorConfig {
        handlers: vec![HandlerConfig::Email {
            smtp_server: "smtp.example.com".to_string(),
            smtp_port: 587,
            sender_email: "monitor@example.com".to_string(),
            sender_password: "secret".to_string(),
            recipient_emails: vec!["not an address".to_string()],
            subject: "System Alert".to_string(),
        }],
        ..MonitorConfig::default()
    };
    let result = Monitor::builder(config)
        .source(ScriptedSource::new(&[1.0]))
        .build();
    assert!(result.is_err());
}
