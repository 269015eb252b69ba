//! Background scheduler and the `Monitor` facade.
//!
//! `Monitor` owns a small Tokio runtime. `start()` spawns a single loop task
//! that samples, evaluates and dispatches once per tick; `stop()` signals it
//! over a watch channel and waits a bounded time for it to finish.
//!
//! `Monitor` is a synchronous API: call `start`/`stop` and drop it from
//! ordinary threads, not from inside another async runtime.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc as std_mpsc;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Runtime;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::core::config::MonitorConfig;
use crate::error::{MonitorError, Result};
use crate::platform::SysinfoSource;

use super::alerts::{AlertEvent, ThresholdEvaluator};
use super::backoff::{Backoff, BackoffConfig};
use super::cache::{Clock, SystemClock, TieredCache};
use super::dispatcher::{AlertDispatcher, AlertHandler, DispatchConfig, DispatchStats};
use super::handlers::ConsoleHandler;
use super::snapshot::{Snapshot, SnapshotAssembler};
use super::source::MetricSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Idle,
    Running,
    Stopping,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    AlreadyRunning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// Nothing was running.
    NotRunning,
    /// The loop acknowledged the stop signal in time.
    Graceful,
    /// The loop did not finish within the stop timeout and was detached.
    Abandoned,
}

/// Loop counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    pub ticks: u64,
    pub faults: u64,
    pub last_fault: Option<String>,
}

#[derive(Debug, Clone)]
struct SchedulerSettings {
    tick_interval: Duration,
    stop_timeout: Duration,
    backoff: BackoffConfig,
}

/// Everything one tick needs, shared between the loop and on-demand callers.
struct Engine {
    // held for a whole tick; an abandoned tick still owns it until it returns
    tick_gate: Mutex<()>,
    assembler: SnapshotAssembler,
    evaluator: ThresholdEvaluator,
    dispatcher: AlertDispatcher,
    ticks: AtomicU64,
    faults: AtomicU64,
    last_fault: Mutex<Option<String>>,
}

impl Engine {
    /// refresh -> evaluate -> dispatch.
    ///
    /// Once stop is requested no further class is refreshed and rule state is
    /// left untouched. Events that were evaluated are always dispatched.
    fn tick(&self, shutdown: &watch::Receiver<bool>) -> Result<usize> {
        let _gate = self.tick_gate.lock();
        let stopping = || *shutdown.borrow();

        let Some(snapshot) = self.assembler.compose_while(|| !stopping())? else {
            return Ok(0);
        };
        if stopping() {
            log::debug!("Stop requested mid-tick, skipping evaluation");
            return Ok(0);
        }

        let events = self.evaluator.evaluate(&snapshot);
        self.dispatcher.dispatch(&events);
        self.ticks.fetch_add(1, Ordering::Relaxed);
        Ok(events.len())
    }

    fn record_fault(&self, fault: &MonitorError) {
        self.faults.fetch_add(1, Ordering::Relaxed);
        *self.last_fault.lock() = Some(fault.to_string());
    }
}

struct Worker {
    shutdown_tx: watch::Sender<bool>,
    done_rx: std_mpsc::Receiver<()>,
    handle: JoinHandle<()>,
}

/// Host monitor: on-demand snapshots plus an optional background loop.
pub struct Monitor {
    engine: Arc<Engine>,
    settings: SchedulerSettings,
    lifecycle: Mutex<Lifecycle>,
    // serializes start/stop
    worker: Mutex<Option<Worker>>,
    runtime: Option<Runtime>,
}

impl Monitor {
    /// Monitor of this host built from `config`.
    pub fn new(config: MonitorConfig) -> Result<Self> {
        MonitorBuilder::new(config).build()
    }

    pub fn builder(config: MonitorConfig) -> MonitorBuilder {
        MonitorBuilder::new(config)
    }

    /// Spawn the sampling loop. Calling it again while running does nothing.
    pub fn start(&self) -> StartOutcome {
        let mut worker = self.worker.lock();
        if worker.is_some() {
            log::debug!("Monitor already running");
            return StartOutcome::AlreadyRunning;
        }

        let Some(runtime) = self.runtime.as_ref() else {
            // only reachable while dropping
            return StartOutcome::AlreadyRunning;
        };

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (done_tx, done_rx) = std_mpsc::sync_channel(1);
        let handle = runtime.spawn(run_loop(
            self.engine.clone(),
            self.settings.clone(),
            shutdown_rx,
            done_tx,
        ));

        *worker = Some(Worker {
            shutdown_tx,
            done_rx,
            handle,
        });
        *self.lifecycle.lock() = Lifecycle::Running;
        log::info!(
            "Monitoring started in background (tick every {:?})",
            self.settings.tick_interval
        );
        StartOutcome::Started
    }

    /// Signal the loop to exit and wait up to the configured stop timeout.
    ///
    /// Alert deliveries already queued by the last tick may still be in
    /// flight when this returns; they are not waited for. An abandoned tick
    /// refreshes nothing further, and a later `start()` waits for it to
    /// return before ticking.
    pub fn stop(&self) -> StopOutcome {
        let mut worker = self.worker.lock();
        let Some(Worker {
            shutdown_tx,
            done_rx,
            handle,
        }) = worker.take()
        else {
            return StopOutcome::NotRunning;
        };

        *self.lifecycle.lock() = Lifecycle::Stopping;
        let _ = shutdown_tx.send(true);

        let outcome = match done_rx.recv_timeout(self.settings.stop_timeout) {
            Ok(()) | Err(std_mpsc::RecvTimeoutError::Disconnected) => StopOutcome::Graceful,
            Err(std_mpsc::RecvTimeoutError::Timeout) => {
                handle.abort();
                log::warn!(
                    "Monitoring loop did not stop within {:?}, abandoning it",
                    self.settings.stop_timeout
                );
                StopOutcome::Abandoned
            }
        };

        *self.lifecycle.lock() = Lifecycle::Idle;
        log::info!("Monitoring stopped.");
        outcome
    }

    pub fn lifecycle(&self) -> Lifecycle {
        *self.lifecycle.lock()
    }

    pub fn is_running(&self) -> bool {
        self.lifecycle() == Lifecycle::Running
    }

    /// Current system state, served through the cache.
    pub fn state(&self) -> Result<Snapshot> {
        self.engine.assembler.compose()
    }

    /// Evaluate the current state now and dispatch any new alerts.
    ///
    /// Shares breach state with the background loop, so an episode already
    /// reported by either one is not reported again.
    pub fn check(&self) -> Result<Vec<AlertEvent>> {
        let snapshot = self.engine.assembler.compose()?;
        let events = self.engine.evaluator.evaluate(&snapshot);
        self.engine.dispatcher.dispatch(&events);
        Ok(events)
    }

    pub fn cache(&self) -> &Arc<TieredCache> {
        self.engine.assembler.cache()
    }

    pub fn dispatch_stats(&self) -> DispatchStats {
        self.engine.dispatcher.stats()
    }

    pub fn scheduler_stats(&self) -> SchedulerStats {
        SchedulerStats {
            ticks: self.engine.ticks.load(Ordering::Relaxed),
            faults: self.engine.faults.load(Ordering::Relaxed),
            last_fault: self.engine.last_fault.lock().clone(),
        }
    }
}

impl Drop for Monitor {
    fn drop(&mut self) {
        self.stop();
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}

async fn run_loop(
    engine: Arc<Engine>,
    settings: SchedulerSettings,
    mut shutdown: watch::Receiver<bool>,
    done_tx: std_mpsc::SyncSender<()>,
) {
    let mut backoff = Backoff::new(settings.backoff.clone());

    loop {
        if *shutdown.borrow() {
            break;
        }

        let tick_engine = engine.clone();
        let tick_shutdown = shutdown.clone();
        let result = tokio::task::spawn_blocking(move || tick_engine.tick(&tick_shutdown))
            .await
            .unwrap_or_else(|join_error| {
                Err(MonitorError::scheduler_fault(format!("tick panicked: {}", join_error)))
            });

        let delay = match result {
            Ok(fired) => {
                if backoff.failures() > 0 {
                    log::info!("Monitoring loop recovered after {} fault(s)", backoff.failures());
                }
                backoff.reset();
                if fired > 0 {
                    log::debug!("Tick dispatched {} alert(s)", fired);
                }
                settings.tick_interval
            }
            Err(e) => {
                engine.record_fault(&e);
                let delay = backoff.next_delay();
                log::error!("Error in monitoring loop: {} (retrying in {:?})", e, delay);
                delay
            }
        };

        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            changed = shutdown.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
    }

    let _ = done_tx.try_send(());
    log::debug!("Monitoring loop exited");
}

/// Assembles a [`Monitor`] from a config plus optional injected parts.
pub struct MonitorBuilder {
    config: MonitorConfig,
    source: Option<Arc<dyn MetricSource>>,
    clock: Option<Arc<dyn Clock>>,
    handlers: Vec<Arc<dyn AlertHandler>>,
}

impl MonitorBuilder {
    pub fn new(config: MonitorConfig) -> Self {
        Self {
            config,
            source: None,
            clock: None,
            handlers: Vec::new(),
        }
    }

    /// Read metrics from `source` instead of the host.
    pub fn source(mut self, source: Arc<dyn MetricSource>) -> Self {
        self.source = Some(source);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Register a handler after the ones listed in the config.
    pub fn handler(mut self, handler: Arc<dyn AlertHandler>) -> Self {
        self.handlers.push(handler);
        self
    }

    pub fn build(self) -> Result<Monitor> {
        let config = self.config;
        config.validate()?;

        let mut handlers = config.build_handlers()?;
        handlers.extend(self.handlers);
        if handlers.is_empty() {
            handlers.push(Arc::new(ConsoleHandler::new()));
        }

        let source = match self.source {
            Some(source) => source,
            None => Arc::new(SysinfoSource::new(config.top_processes)),
        };
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_time()
            .thread_name("hostwatch-worker")
            .build()?;

        let cache = Arc::new(TieredCache::with_classes(
            source,
            config.tier_durations(),
            clock.clone(),
            &config.enabled_classes(),
        ));
        let evaluator =
            ThresholdEvaluator::with_clock(config.rules(), config.renotify_after(), clock)?;
        let dispatcher = AlertDispatcher::new(
            runtime.handle(),
            handlers,
            DispatchConfig {
                delivery_timeout: Duration::from_millis(config.delivery_timeout_ms),
                queue_capacity: config.handler_queue_capacity,
            },
        );

        let engine = Arc::new(Engine {
            tick_gate: Mutex::new(()),
            assembler: SnapshotAssembler::new(cache),
            evaluator,
            dispatcher,
            ticks: AtomicU64::new(0),
            faults: AtomicU64::new(0),
            last_fault: Mutex::new(None),
        });

        Ok(Monitor {
            engine,
            settings: SchedulerSettings {
                tick_interval: config.tick_interval(),
                stop_timeout: Duration::from_millis(config.stop_timeout_ms),
                backoff: config.backoff_config(),
            },
            lifecycle: Mutex::new(Lifecycle::Idle),
            worker: Mutex::new(None),
            runtime: Some(runtime),
        })
    }
}
