//! Alert delivery.
//!
//! Every handler gets its own bounded queue drained by a worker task on the
//! monitor runtime. The sampling loop only enqueues, so a slow, failing or
//! hung handler never delays a tick or starves the other handlers. Delivery
//! is best-effort: a full queue drops the event, and events still queued when
//! the monitor shuts down are lost.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, error::TrySendError};

use crate::error::Result;

use super::alerts::AlertEvent;

/// A notification sink.
///
/// Any type with a `receive` method qualifies; `receive` runs on a blocking
/// worker thread, never on the sampling loop.
pub trait AlertHandler: Send + Sync {
    /// Name used in logs and failure records.
    fn name(&self) -> &str;

    fn receive(&self, event: &AlertEvent) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Longest a single `receive` call is waited for.
    pub delivery_timeout: Duration,
    /// Events buffered per handler before new ones are dropped.
    pub queue_capacity: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            delivery_timeout: Duration::from_secs(10),
            queue_capacity: 64,
        }
    }
}

#[derive(Debug, Default)]
struct Counters {
    delivered: AtomicU64,
    failed: AtomicU64,
    timed_out: AtomicU64,
    dropped: AtomicU64,
}

/// Delivery outcomes summed over all handlers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    pub delivered: u64,
    pub failed: u64,
    pub timed_out: u64,
    pub dropped: u64,
}

struct Lane {
    name: String,
    tx: mpsc::Sender<AlertEvent>,
}

pub struct AlertDispatcher {
    lanes: Vec<Lane>,
    counters: Arc<Counters>,
}

impl AlertDispatcher {
    /// Spawn one delivery worker per handler on `runtime`.
    pub fn new(
        runtime: &Handle,
        handlers: Vec<Arc<dyn AlertHandler>>,
        config: DispatchConfig,
    ) -> Self {
        let counters = Arc::new(Counters::default());
        let capacity = config.queue_capacity.max(1);

        let lanes = handlers
            .into_iter()
            .map(|handler| {
                let (tx, rx) = mpsc::channel(capacity);
                let name = handler.name().to_string();
                runtime.spawn(delivery_worker(
                    handler,
                    rx,
                    config.delivery_timeout,
                    counters.clone(),
                ));
                Lane { name, tx }
            })
            .collect();

        Self { lanes, counters }
    }

    /// Queue `events` for every handler, in registration order. Never blocks.
    pub fn dispatch(&self, events: &[AlertEvent]) {
        for event in events {
            for lane in &self.lanes {
                match lane.tx.try_send(event.clone()) {
                    Ok(()) => {}
                    Err(TrySendError::Full(_)) => {
                        self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                        log::warn!("Alert queue for '{}' is full, dropping event", lane.name);
                    }
                    Err(TrySendError::Closed(_)) => {
                        self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                        log::warn!("Delivery worker for '{}' is gone, dropping event", lane.name);
                    }
                }
            }
        }
    }

    pub fn handler_count(&self) -> usize {
        self.lanes.len()
    }

    pub fn stats(&self) -> DispatchStats {
        DispatchStats {
            delivered: self.counters.delivered.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
            timed_out: self.counters.timed_out.load(Ordering::Relaxed),
            dropped: self.counters.dropped.load(Ordering::Relaxed),
        }
    }
}

async fn delivery_worker(
    handler: Arc<dyn AlertHandler>,
    mut rx: mpsc::Receiver<AlertEvent>,
    timeout: Duration,
    counters: Arc<Counters>,
) {
    while let Some(event) = rx.recv().await {
        let sink = handler.clone();
        let job = tokio::task::spawn_blocking(move || sink.receive(&event));

        match tokio::time::timeout(timeout, job).await {
            Ok(Ok(Ok(()))) => {
                counters.delivered.fetch_add(1, Ordering::Relaxed);
            }
            Ok(Ok(Err(e))) => {
                counters.failed.fetch_add(1, Ordering::Relaxed);
                log::warn!("Failed to deliver alert via '{}': {}", handler.name(), e);
            }
            Ok(Err(join_error)) => {
                counters.failed.fetch_add(1, Ordering::Relaxed);
                log::error!("Alert handler '{}' panicked: {}", handler.name(), join_error);
            }
            Err(_) => {
                // the blocking call keeps running detached
                counters.timed_out.fetch_add(1, Ordering::Relaxed);
                log::error!(
                    "Alert handler '{}' did not finish within {:?}",
                    handler.name(),
                    timeout
                );
            }
        }
    }

    log::debug!("Delivery worker for '{}' stopped", handler.name());
}
