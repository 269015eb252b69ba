use std::time::Duration;

use serde_json::json;

use crate::core::system_monitor::alerts::AlertEvent;
use crate::core::system_monitor::dispatcher::AlertHandler;
use crate::error::Result;

use super::webhook::post_json;

/// Message layout expected by the chat service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatFlavor {
    Slack {
        channel: Option<String>,
        username: String,
    },
    Discord {
        username: String,
    },
}

/// Posts alerts to a Slack or Discord incoming webhook.
#[derive(Debug, Clone)]
pub struct ChatWebhookHandler {
    webhook_url: String,
    flavor: ChatFlavor,
    timeout: Duration,
}

impl ChatWebhookHandler {
    pub fn slack(
        webhook_url: impl Into<String>,
        channel: Option<String>,
        username: impl Into<String>,
    ) -> Self {
        Self::new(
            webhook_url,
            ChatFlavor::Slack {
                channel,
                username: username.into(),
            },
        )
    }

    pub fn discord(webhook_url: impl Into<String>, username: impl Into<String>) -> Self {
        Self::new(
            webhook_url,
            ChatFlavor::Discord {
                username: username.into(),
            },
        )
    }

    pub fn new(webhook_url: impl Into<String>, flavor: ChatFlavor) -> Self {
        Self {
            webhook_url: webhook_url.into(),
            flavor,
            timeout: Duration::from_secs(10),
        }
    }

    pub fn payload(&self, event: &AlertEvent) -> serde_json::Value {
        match &self.flavor {
            ChatFlavor::Slack { channel, username } => {
                let mut payload = json!({
                    "text": event.message,
                    "username": username,
                });
                if let Some(channel) = channel {
                    payload["channel"] = json!(channel);
                }
                payload
            }
            ChatFlavor::Discord { username } => json!({
                "content": event.message,
                "username": username,
            }),
        }
    }
}

impl AlertHandler for ChatWebhookHandler {
    fn name(&self) -> &str {
        match self.flavor {
            ChatFlavor::Slack { .. } => "slack",
            ChatFlavor::Discord { .. } => "discord",
        }
    }

    fn receive(&self, event: &AlertEvent) -> Result<()> {
        post_json(
            self.name(),
            &self.webhook_url,
            self.timeout,
            &self.payload(event),
        )
    }
}
