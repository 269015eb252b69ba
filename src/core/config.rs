use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::core::system_monitor::{
    validate_rules, AlertHandler, BackoffConfig, ChatWebhookHandler, ConsoleHandler,
    EmailHandler, LogHandler, MetricClass, SmtpSettings, ThresholdRule, TierDurations,
    WebhookHandler,
};
use crate::error::{MonitorError, Result};

/// Built-in limits, turned into threshold rules. `None` (or `null` in the
/// config file) turns a rule off.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdConfig {
    /// CPU usage percent.
    pub cpu: Option<f32>,
    /// RAM usage percent.
    pub ram: Option<f32>,
    /// Used space percent, checked per mount.
    pub disk: Option<f32>,
    /// Degrees Celsius, checked per sensor.
    pub temperature: Option<f32>,
    /// Battery charge percent; fires when it drops below.
    pub battery_low: Option<f32>,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            cpu: Some(70.0),
            ram: Some(70.0),
            disk: Some(80.0),
            temperature: None,
            battery_low: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TierConfig {
    pub fast_ms: u64,
    pub medium_ms: u64,
    pub slow_ms: u64,
}

impl Default for TierConfig {
    fn default() -> Self {
        Self {
            fast_ms: 1_000,
            medium_ms: 30_000,
            slow_ms: 300_000,
        }
    }
}

/// One alert sink, as written in the config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum HandlerConfig {
    Console,
    Log {
        #[serde(default)]
        target: Option<String>,
    },
    Webhook {
        url: String,
    },
    Email {
        smtp_server: String,
        #[serde(default = "default_smtp_port")]
        smtp_port: u16,
        sender_email: String,
        sender_password: String,
        recipient_emails: Vec<String>,
        #[serde(default = "default_subject")]
        subject: String,
    },
    Slack {
        webhook_url: String,
        #[serde(default)]
        channel: Option<String>,
        #[serde(default = "default_bot_name")]
        username: String,
    },
    Discord {
        webhook_url: String,
        #[serde(default = "default_bot_name")]
        username: String,
    },
}

fn default_smtp_port() -> u16 {
    587
}

fn default_subject() -> String {
    "System Alert".to_string()
}

fn default_bot_name() -> String {
    "SystemMonitor".to_string()
}

impl HandlerConfig {
    pub fn build(&self) -> Result<Arc<dyn AlertHandler>> {
        let handler: Arc<dyn AlertHandler> = match self {
            HandlerConfig::Console => Arc::new(ConsoleHandler::new()),
            HandlerConfig::Log { target } => match target {
                Some(target) => Arc::new(LogHandler::new(target.clone())),
                None => Arc::new(LogHandler::default()),
            },
            HandlerConfig::Webhook { url } => Arc::new(WebhookHandler::new(url.clone())),
            HandlerConfig::Email {
                smtp_server,
                smtp_port,
                sender_email,
                sender_password,
                recipient_emails,
                subject,
            } => Arc::new(EmailHandler::new(SmtpSettings {
                server: smtp_server.clone(),
                port: *smtp_port,
                sender: sender_email.clone(),
                password: sender_password.clone(),
                recipients: recipient_emails.clone(),
                subject: subject.clone(),
            })?),
            HandlerConfig::Slack {
                webhook_url,
                channel,
                username,
            } => Arc::new(ChatWebhookHandler::slack(
                webhook_url.clone(),
                channel.clone(),
                username.clone(),
            )),
            HandlerConfig::Discord {
                webhook_url,
                username,
            } => Arc::new(ChatWebhookHandler::discord(
                webhook_url.clone(),
                username.clone(),
            )),
        };
        Ok(handler)
    }
}

/// Everything a [`Monitor`](crate::core::system_monitor::Monitor) is built from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub thresholds: ThresholdConfig,
    /// Extra rules, evaluated after the built-in ones.
    pub rules: Vec<ThresholdRule>,
    pub tick_interval_ms: u64,
    pub tiers: TierConfig,
    /// Defaults to the tick interval doubling up to five times it.
    pub backoff: Option<BackoffConfig>,
    pub stop_timeout_ms: u64,
    pub delivery_timeout_ms: u64,
    pub handler_queue_capacity: usize,
    pub top_processes: usize,
    /// Re-alert on a still-breached rule after this long. Off when unset.
    pub renotify_after_secs: Option<u64>,
    pub disabled_metrics: Vec<MetricClass>,
    /// Sinks for alerts; an empty list means console output.
    pub handlers: Vec<HandlerConfig>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            thresholds: ThresholdConfig::default(),
            rules: Vec::new(),
            tick_interval_ms: 1_000,
            tiers: TierConfig::default(),
            backoff: None,
            stop_timeout_ms: 5_000,
            delivery_timeout_ms: 10_000,
            handler_queue_capacity: 64,
            top_processes: 5,
            renotify_after_secs: None,
            disabled_metrics: Vec::new(),
            handlers: Vec::new(),
        }
    }
}

impl MonitorConfig {
    /// Read a JSON config file. Missing keys take their defaults.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path).map_err(|e| {
            MonitorError::config(format!("failed to read config file {:?}: {}", path, e))
        })?;

        let config: MonitorConfig = serde_json::from_str(&data).map_err(|e| {
            MonitorError::config(format!("invalid config file {:?}: {}", path, e))
        })?;
        config.validate()?;

        log::debug!("Loaded config from {:?}", path);
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("tick_interval_ms", self.tick_interval_ms),
            ("tiers.fast_ms", self.tiers.fast_ms),
            ("tiers.medium_ms", self.tiers.medium_ms),
            ("tiers.slow_ms", self.tiers.slow_ms),
            ("stop_timeout_ms", self.stop_timeout_ms),
            ("delivery_timeout_ms", self.delivery_timeout_ms),
            ("handler_queue_capacity", self.handler_queue_capacity as u64),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(MonitorError::config(format!("{} must be greater than zero", name)));
            }
        }

        let t = &self.thresholds;
        let percents = [
            ("cpu", t.cpu),
            ("ram", t.ram),
            ("disk", t.disk),
            ("battery_low", t.battery_low),
        ];
        for (name, value) in percents {
            if let Some(value) = value {
                if !(0.0..=100.0).contains(&value) {
                    return Err(MonitorError::config(format!(
                        "{} threshold must be between 0 and 100, got {}",
                        name, value
                    )));
                }
            }
        }

        let tiers = &self.tiers;
        if tiers.fast_ms > tiers.medium_ms || tiers.medium_ms > tiers.slow_ms {
            return Err(MonitorError::config(format!(
                "tiers must satisfy fast_ms <= medium_ms <= slow_ms, got {} / {} / {}",
                tiers.fast_ms, tiers.medium_ms, tiers.slow_ms
            )));
        }

        if let Some(backoff) = &self.backoff {
            if backoff.base_ms == 0 || backoff.max_ms < backoff.base_ms {
                return Err(MonitorError::config(
                    "backoff needs base_ms > 0 and max_ms >= base_ms",
                ));
            }
            if backoff.multiplier.is_nan() || backoff.multiplier < 1.0 {
                return Err(MonitorError::config("backoff multiplier must be at least 1"));
            }
        }

        validate_rules(&self.rules())
    }

    /// Built-in threshold rules followed by the explicit ones.
    pub fn rules(&self) -> Vec<ThresholdRule> {
        let t = &self.thresholds;
        let above = [
            ("cpu", MetricClass::Cpu, t.cpu),
            ("ram", MetricClass::Memory, t.ram),
            ("disk", MetricClass::Disk, t.disk),
            ("temperature", MetricClass::Temperature, t.temperature),
        ];
        let mut rules: Vec<ThresholdRule> = above
            .into_iter()
            .filter_map(|(id, metric, limit)| {
                limit.map(|limit| ThresholdRule::above(id, metric, limit as f64))
            })
            .collect();
        if let Some(limit) = t.battery_low {
            rules.push(ThresholdRule::below(
                "battery",
                MetricClass::Battery,
                limit as f64,
            ));
        }
        rules.extend(self.rules.iter().cloned());
        rules
    }

    pub fn build_handlers(&self) -> Result<Vec<Arc<dyn AlertHandler>>> {
        self.handlers.iter().map(HandlerConfig::build).collect()
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn tier_durations(&self) -> TierDurations {
        TierDurations {
            fast: Duration::from_millis(self.tiers.fast_ms),
            medium: Duration::from_millis(self.tiers.medium_ms),
            slow: Duration::from_millis(self.tiers.slow_ms),
        }
    }

    /// Every metric class not listed in `disabled_metrics`.
    pub fn enabled_classes(&self) -> Vec<MetricClass> {
        MetricClass::ALL
            .into_iter()
            .filter(|class| !self.disabled_metrics.contains(class))
            .collect()
    }

    pub fn renotify_after(&self) -> Option<Duration> {
        self.renotify_after_secs.map(Duration::from_secs)
    }

    pub fn backoff_config(&self) -> BackoffConfig {
        self.backoff.clone().unwrap_or_else(|| BackoffConfig {
            base_ms: self.tick_interval_ms,
            max_ms: self.tick_interval_ms.saturating_mul(5),
            ..BackoffConfig::default()
        })
    }
}
