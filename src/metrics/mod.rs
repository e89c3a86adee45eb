//! Queue Metrics Module
//!
//! Lightweight counters describing how a queue is being used: how much went
//! in and out, how often consumers found it empty, how often they had to
//! block and for how long. All counters are relaxed atomics, updated outside
//! the storage lock.

use core::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

/// Point-in-time snapshot of a queue's counters
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct QueueMetrics {
    /// Elements accepted by `push`, `emplace` and `push_batch`
    pub pushes: u64,
    /// Elements handed out by any pop variant or `drain`
    pub pops: u64,
    /// `try_pop` calls that returned nothing
    pub empty_pops: u64,
    /// Timed pops whose deadline passed without an element
    pub timeouts: u64,
    /// Pops that had to block before finishing
    pub blocked_pops: u64,
    /// Total time spent blocked, in nanoseconds
    pub total_wait_ns: u64,
    /// Longest single block, in nanoseconds
    pub max_wait_ns: u64,
}

impl QueueMetrics {
    /// Average time a blocked pop spent waiting
    pub fn avg_wait(&self) -> Duration {
        if self.blocked_pops == 0 {
            Duration::ZERO
        } else {
            Duration::from_nanos(self.total_wait_ns / self.blocked_pops)
        }
    }

    /// Longest time a single pop spent waiting
    pub fn max_wait(&self) -> Duration {
        Duration::from_nanos(self.max_wait_ns)
    }

    /// Timed-out pops as a percentage of all pop attempts
    pub fn timeout_rate(&self) -> f64 {
        let attempts = self.pops + self.empty_pops + self.timeouts;
        if attempts == 0 {
            0.0
        } else {
            (self.timeouts as f64 / attempts as f64) * 100.0
        }
    }
}

/// Internal atomic metrics collection
#[derive(Debug)]
pub struct AtomicMetrics {
    enabled: AtomicBool,
    pushes: AtomicU64,
    pops: AtomicU64,
    empty_pops: AtomicU64,
    timeouts: AtomicU64,
    blocked_pops: AtomicU64,
    total_wait_ns: AtomicU64,
    max_wait_ns: AtomicU64,
}

impl Default for AtomicMetrics {
    fn default() -> Self {
        Self {
            enabled: AtomicBool::new(true),
            pushes: AtomicU64::new(0),
            pops: AtomicU64::new(0),
            empty_pops: AtomicU64::new(0),
            timeouts: AtomicU64::new(0),
            blocked_pops: AtomicU64::new(0),
            total_wait_ns: AtomicU64::new(0),
            max_wait_ns: AtomicU64::new(0),
        }
    }
}

impl AtomicMetrics {
    /// Whether recording is switched on
    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    /// Switch recording on or off
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    /// Record `count` accepted elements
    #[inline]
    pub fn record_push(&self, count: u64) {
        if count > 0 && self.is_enabled() {
            self.pushes.fetch_add(count, Ordering::Relaxed);
        }
    }

    /// Record `count` delivered elements
    #[inline]
    pub fn record_pop(&self, count: u64) {
        if count > 0 && self.is_enabled() {
            self.pops.fetch_add(count, Ordering::Relaxed);
        }
    }

    /// Record a `try_pop` that found nothing
    #[inline]
    pub fn record_empty_pop(&self) {
        if self.is_enabled() {
            self.empty_pops.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record a timed pop that ran out of time
    #[inline]
    pub fn record_timeout(&self) {
        if self.is_enabled() {
            self.timeouts.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record a pop that blocked for `waited`
    pub fn record_wait(&self, waited: Duration) {
        if !self.is_enabled() {
            return;
        }
        let waited_ns = u64::try_from(waited.as_nanos()).unwrap_or(u64::MAX);

        self.blocked_pops.fetch_add(1, Ordering::Relaxed);
        self.total_wait_ns.fetch_add(waited_ns, Ordering::Relaxed);

        let mut current_max = self.max_wait_ns.load(Ordering::Relaxed);
        while waited_ns > current_max {
            match self.max_wait_ns.compare_exchange_weak(
                current_max,
                waited_ns,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(x) => current_max = x,
            }
        }
    }

    /// Get current metrics snapshot
    pub fn snapshot(&self) -> QueueMetrics {
        QueueMetrics {
            pushes: self.pushes.load(Ordering::Relaxed),
            pops: self.pops.load(Ordering::Relaxed),
            empty_pops: self.empty_pops.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
            blocked_pops: self.blocked_pops.load(Ordering::Relaxed),
            total_wait_ns: self.total_wait_ns.load(Ordering::Relaxed),
            max_wait_ns: self.max_wait_ns.load(Ordering::Relaxed),
        }
    }

    /// Reset all counters. The enabled switch is left alone.
    pub fn reset(&self) {
        self.pushes.store(0, Ordering::Relaxed);
        self.pops.store(0, Ordering::Relaxed);
        self.empty_pops.store(0, Ordering::Relaxed);
        self.timeouts.store(0, Ordering::Relaxed);
        self.blocked_pops.store(0, Ordering::Relaxed);
        self.total_wait_ns.store(0, Ordering::Relaxed);
        self.max_wait_ns.store(0, Ordering::Relaxed);
    }
}

/// Trait for data structures that support performance metrics
pub trait MetricsCollector {
    /// Get current metrics
    fn metrics(&self) -> QueueMetrics;

    /// Reset all metrics
    fn reset_metrics(&self);

    /// Enable or disable metrics collection
    fn set_metrics_enabled(&self, enabled: bool);

    /// Check if metrics collection is enabled
    fn is_metrics_enabled(&self) -> bool;
}
