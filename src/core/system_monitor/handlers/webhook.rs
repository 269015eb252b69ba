use std::time::Duration;

use serde_json::json;

use crate::core::system_monitor::alerts::AlertEvent;
use crate::core::system_monitor::dispatcher::AlertHandler;
use crate::error::{MonitorError, Result};

/// POSTs each alert as JSON to a URL.
#[derive(Debug, Clone)]
pub struct WebhookHandler {
    url: String,
    timeout: Duration,
}

impl WebhookHandler {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout: Duration::from_secs(10),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn payload(event: &AlertEvent) -> serde_json::Value {
        json!({
            "alert": event.message,
            "severity": event.severity.to_string(),
            "metric": event.metric,
            "timestamp": event.timestamp.to_rfc3339(),
        })
    }
}

/// POST `payload` and turn any non-2xx answer into a handler failure.
pub(super) fn post_json(
    handler: &str,
    url: &str,
    timeout: Duration,
    payload: &serde_json::Value,
) -> Result<()> {
    let response = reqwest::blocking::Client::builder()
        .timeout(timeout)
        .build()?
        .post(url)
        .header("User-Agent", "hostwatch")
        .json(payload)
        .send()
        .map_err(|e| MonitorError::handler(handler, format!("request failed: {}", e)))?;

    if !response.status().is_success() {
        return Err(MonitorError::handler(
            handler,
            format!("endpoint returned status {}", response.status()),
        ));
    }

    Ok(())
}

impl AlertHandler for WebhookHandler {
    fn name(&self) -> &str {
        "webhook"
    }

    fn receive(&self, event: &AlertEvent) -> Result<()> {
        post_json(self.name(), &self.url, self.timeout, &Self::payload(event))
    }
}
