//! Tiered metric cache.
//!
//! Each metric class owns one slot guarded by its own lock, so a slow refresh
//! of one class never blocks readers of another.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::error::{MonitorError, Result};

use super::metrics::{MetricClass, MetricValue, TierDurations};
use super::source::{sample, MetricSource, SourceError};

/// Source of "now" for freshness decisions.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Wall clock backed by [`Instant::now`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    base: Instant,
    offset: Mutex<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            base: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.offset.lock() += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.base + *self.offset.lock()
    }
}

/// Last sampled value of one class. `value == None` marks the metric absent.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub value: Option<MetricValue>,
    pub captured_at: Instant,
    pub tier: Duration,
}

#[derive(Debug, Default)]
struct Slot {
    entry: Option<CacheEntry>,
    last_attempt: Option<Instant>,
}

#[derive(Debug, Default)]
struct Counters {
    source_calls: AtomicU64,
    refresh_failures: AtomicU64,
    unavailable: AtomicU64,
}

/// Per-class refresh outcomes recorded by the cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub source_calls: u64,
    pub refresh_failures: u64,
    pub unavailable: u64,
}

pub struct TieredCache {
    source: Arc<dyn MetricSource>,
    clock: Arc<dyn Clock>,
    tiers: TierDurations,
    slots: HashMap<MetricClass, Mutex<Slot>>,
    counters: HashMap<MetricClass, Counters>,
}

impl TieredCache {
    /// Cache every metric class.
    pub fn new(source: Arc<dyn MetricSource>, tiers: TierDurations) -> Self {
        Self::with_classes(source, tiers, Arc::new(SystemClock), &MetricClass::ALL)
    }

    /// Cache only `classes`; the others are reported as disabled.
    pub fn with_classes(
        source: Arc<dyn MetricSource>,
        tiers: TierDurations,
        clock: Arc<dyn Clock>,
        classes: &[MetricClass],
    ) -> Self {
        let slots = classes
            .iter()
            .map(|&class| (class, Mutex::new(Slot::default())))
            .collect();
        let counters = classes
            .iter()
            .map(|&class| (class, Counters::default()))
            .collect();

        Self {
            source,
            clock,
            tiers,
            slots,
            counters,
        }
    }

    pub fn is_enabled(&self, class: MetricClass) -> bool {
        self.slots.contains_key(&class)
    }

    /// Enabled classes in declaration order.
    pub fn classes(&self) -> impl Iterator<Item = MetricClass> + '_ {
        MetricClass::ALL
            .into_iter()
            .filter(move |class| self.slots.contains_key(class))
    }

    /// Current value of `class`, refreshing it first when its tier has elapsed.
    ///
    /// Returns `Ok(None)` when the metric is absent on this host. A failed
    /// refresh keeps serving the previous value; it is an error only when
    /// nothing was ever captured for the class.
    pub fn get(&self, class: MetricClass) -> Result<Option<MetricValue>> {
        let slot = self
            .slots
            .get(&class)
            .ok_or_else(|| MonitorError::metric_unavailable(class, "disabled"))?;

        let mut slot = slot.lock();
        let now = self.clock.now();
        let tier = self.tiers.of(class.tier());

        if let Some(entry) = &slot.entry {
            let due = slot
                .last_attempt
                .map_or(true, |at| now.saturating_duration_since(at) >= tier);
            if !due {
                return Ok(entry.value.clone());
            }
        }

        slot.last_attempt = Some(now);
        let counters = &self.counters[&class];
        counters.source_calls.fetch_add(1, Ordering::Relaxed);

        match sample(self.source.as_ref(), class) {
            Ok(value) => {
                slot.entry = Some(CacheEntry {
                    value: Some(value.clone()),
                    captured_at: now,
                    tier,
                });
                log::trace!("Refreshed {}", class);
                Ok(Some(value))
            }
            Err(SourceError::Unavailable(reason)) => {
                counters.unavailable.fetch_add(1, Ordering::Relaxed);
                log::debug!("Metric {} unavailable: {}", class, reason);
                slot.entry = Some(CacheEntry {
                    value: None,
                    captured_at: now,
                    tier,
                });
                Ok(None)
            }
            Err(SourceError::Failed(reason)) => {
                counters.refresh_failures.fetch_add(1, Ordering::Relaxed);
                match &slot.entry {
                    Some(entry) => {
                        log::warn!("Refresh of {} failed, serving stale value: {}", class, reason);
                        Ok(entry.value.clone())
                    }
                    None => {
                        log::warn!("Initial sample of {} failed: {}", class, reason);
                        Err(MonitorError::refresh_failure(class, reason))
                    }
                }
            }
        }
    }

    /// Entry as currently stored, without refreshing.
    pub fn peek(&self, class: MetricClass) -> Option<CacheEntry> {
        self.slots.get(&class)?.lock().entry.clone()
    }

    /// True once any class holds an entry.
    pub fn is_populated(&self) -> bool {
        self.slots.values().any(|slot| slot.lock().entry.is_some())
    }

    pub fn stats(&self, class: MetricClass) -> CacheStats {
        self.counters
            .get(&class)
            .map(|c| CacheStats {
                source_calls: c.source_calls.load(Ordering::Relaxed),
                refresh_failures: c.refresh_failures.load(Ordering::Relaxed),
                unavailable: c.unavailable.load(Ordering::Relaxed),
            })
            .unwrap_or_default()
    }
}
