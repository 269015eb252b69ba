//! Host monitoring engine.
//!
//! Metrics are read through a [`MetricSource`], kept in a [`TieredCache`],
//! composed into [`Snapshot`]s, checked by a [`ThresholdEvaluator`] and handed
//! to an [`AlertDispatcher`]. [`Monitor`] ties the pieces together and runs
//! them on a background loop.

pub mod alerts;
pub mod backoff;
pub mod cache;
pub mod dispatcher;
pub mod handlers;
mod metrics;
mod runtime;
pub mod snapshot;
pub mod source;

pub use alerts::{
    validate_rules, AlertEvent, AlertSeverity, Comparator, ThresholdEvaluator, ThresholdRule,
};
pub use backoff::{Backoff, BackoffConfig};
pub use cache::{CacheEntry, CacheStats, Clock, ManualClock, SystemClock, TieredCache};
pub use dispatcher::{AlertDispatcher, AlertHandler, DispatchConfig, DispatchStats};
pub use handlers::{
    ChatFlavor, ChatWebhookHandler, ConsoleHandler, EmailHandler, FnHandler, LogHandler,
    SmtpSettings, WebhookHandler,
};
pub use metrics::{
    BatteryInfo, DiskInfo, FanReading, InterfaceStats, MetricClass, MetricValue, NetworkStats,
    NetworkTotals, ProcessInfo, SensorTable, TemperatureReading, Tier, TierDurations,
};
pub use runtime::{
    Lifecycle, Monitor, MonitorBuilder, SchedulerStats, StartOutcome, StopOutcome,
};
pub use snapshot::{Reading, Snapshot, SnapshotAssembler};
pub use source::{MetricSource, SourceError, SourceResult};
