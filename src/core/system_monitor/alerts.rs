//! Threshold rules and edge-triggered breach detection.
//!
//! A rule fires when its metric crosses into breach, then stays silent until
//! the metric is observed back on the safe side of the limit. Disk, sensor and
//! fan rules track each mount or sensor as its own breach episode.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Local};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::{MonitorError, Result};

use super::cache::{Clock, SystemClock};
use super::metrics::MetricClass;
use super::snapshot::{Reading, Snapshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Comparator {
    #[serde(rename = ">")]
    Above,
    #[serde(rename = "<")]
    Below,
}

impl Comparator {
    pub fn breached(self, value: f64, limit: f64) -> bool {
        match self {
            Comparator::Above => value > limit,
            Comparator::Below => value < limit,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Comparator::Above => ">",
            Comparator::Below => "<",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Info,
    #[default]
    Warning,
    Critical,
}

impl fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AlertSeverity::Info => "INFO",
            AlertSeverity::Warning => "WARNING",
            AlertSeverity::Critical => "CRITICAL",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdRule {
    pub rule_id: String,
    pub metric: MetricClass,
    pub comparator: Comparator,
    pub limit: f64,
    #[serde(default)]
    pub severity: AlertSeverity,
}

impl ThresholdRule {
    /// Rule that fires when `metric` rises above `limit`.
    pub fn above(rule_id: impl Into<String>, metric: MetricClass, limit: f64) -> Self {
        Self {
            rule_id: rule_id.into(),
            metric,
            comparator: Comparator::Above,
            limit,
            severity: AlertSeverity::default(),
        }
    }

    /// Rule that fires when `metric` drops below `limit`.
    pub fn below(rule_id: impl Into<String>, metric: MetricClass, limit: f64) -> Self {
        Self {
            comparator: Comparator::Below,
            ..Self::above(rule_id, metric, limit)
        }
    }

    pub fn with_severity(mut self, severity: AlertSeverity) -> Self {
        self.severity = severity;
        self
    }

    fn render_message(&self, reading: &Reading) -> String {
        let v = reading.value;
        let on = &reading.subject;
        match (self.metric, self.comparator) {
            (MetricClass::Cpu, Comparator::Above) => format!("High CPU usage: {:.0}%", v),
            (MetricClass::Memory, Comparator::Above) => format!("High RAM usage: {:.0}%", v),
            (MetricClass::Disk, Comparator::Above) => {
                format!("Low disk space on {}: {:.0}% used", on, v)
            }
            (MetricClass::Temperature, Comparator::Above) => {
                format!("High temperature on {}: {:.0}°C", on, v)
            }
            (MetricClass::Battery, Comparator::Below) => format!("Low battery: {:.0}%", v),
            (MetricClass::Fan, Comparator::Below) => {
                format!("Low fan speed on {}: {:.0} RPM", on, v)
            }
            _ if on.is_empty() => format!(
                "{} at {:.1} (limit {} {:.1})",
                self.metric,
                v,
                self.comparator.symbol(),
                self.limit
            ),
            _ => format!(
                "{} {} at {:.1} (limit {} {:.1})",
                self.metric,
                on,
                v,
                self.comparator.symbol(),
                self.limit
            ),
        }
    }
}

/// Check a rule set before it is handed to an evaluator.
pub fn validate_rules(rules: &[ThresholdRule]) -> Result<()> {
    let mut seen = HashSet::new();
    for rule in rules {
        if !rule.metric.is_numeric() {
            return Err(MonitorError::config(format!(
                "rule '{}' targets non-numeric metric {}",
                rule.rule_id, rule.metric
            )));
        }
        if !rule.limit.is_finite() {
            return Err(MonitorError::config(format!(
                "rule '{}' has a non-finite limit",
                rule.rule_id
            )));
        }
        if !seen.insert(rule.rule_id.as_str()) {
            return Err(MonitorError::config(format!(
                "duplicate rule id '{}'",
                rule.rule_id
            )));
        }
    }
    Ok(())
}

/// A threshold crossing, ready for delivery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertEvent {
    pub rule_id: String,
    pub message: String,
    pub severity: AlertSeverity,
    pub metric: MetricClass,
    pub subject: String,
    pub value: f64,
    pub limit: f64,
    pub timestamp: DateTime<Local>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct RuleState {
    breached: bool,
    last_fired: Option<Instant>,
}

struct RuleSlot {
    rule: ThresholdRule,
    // subject -> state
    states: Mutex<HashMap<String, RuleState>>,
}

pub struct ThresholdEvaluator {
    rules: Vec<RuleSlot>,
    renotify_after: Option<Duration>,
    clock: Arc<dyn Clock>,
}

impl ThresholdEvaluator {
    pub fn new(rules: Vec<ThresholdRule>) -> Result<Self> {
        Self::with_clock(rules, None, Arc::new(SystemClock))
    }

    /// `renotify_after` lets a rule that stays breached fire again once that
    /// much time has passed since its last event.
    pub fn with_clock(
        rules: Vec<ThresholdRule>,
        renotify_after: Option<Duration>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        validate_rules(&rules)?;
        let rules = rules
            .into_iter()
            .map(|rule| RuleSlot {
                rule,
                states: Mutex::new(HashMap::new()),
            })
            .collect();

        Ok(Self {
            rules,
            renotify_after,
            clock,
        })
    }

    /// Events for every rule that crossed into breach, in rule order.
    pub fn evaluate(&self, snapshot: &Snapshot) -> Vec<AlertEvent> {
        let now = self.clock.now();
        let mut events = Vec::new();

        for slot in &self.rules {
            let rule = &slot.rule;
            let Some(readings) = snapshot.readings(rule.metric) else {
                log::trace!("Rule '{}' skipped: {} absent", rule.rule_id, rule.metric);
                continue;
            };

            let mut states = slot.states.lock();
            for reading in readings {
                let breached = rule.comparator.breached(reading.value, rule.limit);
                let state = states.entry(reading.subject.clone()).or_default();

                if !breached {
                    if state.breached {
                        log::debug!("Rule '{}' cleared {}", rule.rule_id, reading.subject);
                    }
                    state.breached = false;
                    continue;
                }

                let fire = if !state.breached {
                    true
                } else {
                    match (self.renotify_after, state.last_fired) {
                        (Some(every), Some(at)) => now.saturating_duration_since(at) >= every,
                        _ => false,
                    }
                };
                state.breached = true;

                if fire {
                    state.last_fired = Some(now);
                    events.push(AlertEvent {
                        rule_id: rule.rule_id.clone(),
                        message: rule.render_message(&reading),
                        severity: rule.severity,
                        metric: rule.metric,
                        subject: reading.subject,
                        value: reading.value,
                        limit: rule.limit,
                        timestamp: snapshot.timestamp,
                    });
                }
            }
        }

        events
    }

    /// Breach flag of one rule/subject pair, if it was ever evaluated.
    pub fn is_breached(&self, rule_id: &str, subject: &str) -> Option<bool> {
        self.rules
            .iter()
            .find(|slot| slot.rule.rule_id == rule_id)?
            .states
            .lock()
            .get(subject)
            .map(|state| state.breached)
    }
}
