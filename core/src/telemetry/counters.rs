//! telemetry/counters.rs
//! Live counters updated by the request dispatcher from any thread.
//!
//! Converted into an immutable `DispatchSnapshot` on demand.

use std::sync::atomic::{AtomicU64, Ordering};

use super::snapshot::DispatchSnapshot;

#[derive(Debug, Default)]
pub struct DispatchCounters {
    submitted: AtomicU64,
    delivered: AtomicU64,
    discarded: AtomicU64,
    skipped: AtomicU64,
    transport_failures: AtomicU64,
}

impl DispatchCounters {
    pub fn record_submitted(&self) {
        self.submitted.fetch_add(1, Ordering::Relaxed);
    }

    /// A response reached the native completion entry point.
    pub fn record_delivered(&self) {
        self.delivered.fetch_add(1, Ordering::Relaxed);
    }

    /// The network call ran but the request had been canceled meanwhile.
    pub fn record_discarded(&self) {
        self.discarded.fetch_add(1, Ordering::Relaxed);
    }

    /// Canceled before a worker picked it up; no network call made.
    pub fn record_skipped(&self) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_transport_failure(&self) {
        self.transport_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> DispatchSnapshot {
        DispatchSnapshot {
            submitted: self.submitted.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            discarded: self.discarded.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            transport_failures: self.transport_failures.load(Ordering::Relaxed),
        }
    }
}
