use std::io;
use thiserror::Error;

use crate::core::system_monitor::MetricClass;

/// Custom error type for the hostwatch engine
#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Email error: {0}")]
    Email(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Metric {class} unavailable: {reason}")]
    MetricUnavailable { class: MetricClass, reason: String },

    #[error("Refresh of {class} failed: {reason}")]
    RefreshFailure { class: MetricClass, reason: String },

    #[error("Handler '{handler}' failed: {reason}")]
    HandlerFailure { handler: String, reason: String },

    #[error("Scheduler fault: {0}")]
    SchedulerFault(String),

    #[error("Initial sample failed: {0}")]
    InitialSampleFailed(String),
}

/// Result type alias for hostwatch
pub type Result<T> = std::result::Result<T, MonitorError>;

impl MonitorError {
    /// Create a config error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        MonitorError::Config(msg.into())
    }

    pub fn metric_unavailable<S: Into<String>>(class: MetricClass, reason: S) -> Self {
        MonitorError::MetricUnavailable {
            class,
            reason: reason.into(),
        }
    }

    pub fn refresh_failure<S: Into<String>>(class: MetricClass, reason: S) -> Self {
        MonitorError::RefreshFailure {
            class,
            reason: reason.into(),
        }
    }

    /// Create a handler failure for the named sink
    pub fn handler<H: Into<String>, S: Into<String>>(handler: H, reason: S) -> Self {
        MonitorError::HandlerFailure {
            handler: handler.into(),
            reason: reason.into(),
        }
    }

    pub fn scheduler_fault<S: Into<String>>(msg: S) -> Self {
        MonitorError::SchedulerFault(msg.into())
    }

    pub fn initial_sample_failed<S: Into<String>>(msg: S) -> Self {
        MonitorError::InitialSampleFailed(msg.into())
    }

    pub fn email<S: Into<String>>(msg: S) -> Self {
        MonitorError::Email(msg.into())
    }
}
