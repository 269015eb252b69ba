//! Built-in alert handlers.

mod chat;
mod email;
mod webhook;

pub use chat::{ChatFlavor, ChatWebhookHandler};
pub use email::{EmailHandler, SmtpSettings};
pub use webhook::WebhookHandler;

use crate::error::Result;

use super::alerts::AlertEvent;
use super::dispatcher::AlertHandler;

/// Prints each alert message to stdout.
#[derive(Debug, Default, Clone)]
pub struct ConsoleHandler;

impl ConsoleHandler {
    pub fn new() -> Self {
        Self
    }
}

impl AlertHandler for ConsoleHandler {
    fn name(&self) -> &str {
        "console"
    }

    fn receive(&self, event: &AlertEvent) -> Result<()> {
        println!("{}", event.message);
        Ok(())
    }
}

/// Writes alerts to the `log` facade at warn level.
#[derive(Debug, Clone)]
pub struct LogHandler {
    target: String,
}

impl LogHandler {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
        }
    }
}

impl Default for LogHandler {
    fn default() -> Self {
        Self::new("hostwatch::alert")
    }
}

impl AlertHandler for LogHandler {
    fn name(&self) -> &str {
        "log"
    }

    fn receive(&self, event: &AlertEvent) -> Result<()> {
        log::warn!(target: self.target.as_str(), "{}", ascii_only(&event.message));
        Ok(())
    }
}

/// Strip characters some log sinks can't encode (emoji, degree signs).
fn ascii_only(message: &str) -> String {
    message.chars().filter(char::is_ascii).collect()
}

/// Adapts a closure into a handler.
pub struct FnHandler<F> {
    name: String,
    f: F,
}

impl<F> FnHandler<F>
where
    F: Fn(&AlertEvent) -> Result<()> + Send + Sync,
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }
}

impl<F> AlertHandler for FnHandler<F>
where
    F: Fn(&AlertEvent) -> Result<()> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn receive(&self, event: &AlertEvent) -> Result<()> {
        (self.f)(event)
    }
}
