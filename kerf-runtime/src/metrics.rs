//! Observability counters.
//!
//! Process-wide atomic counters maintained by the worker loop and the
//! backpressure protocol, exposed as a consolidated snapshot. All counters
//! use relaxed ordering; they are monotonic tallies, not synchronisation.

use std::sync::atomic::{AtomicU64, Ordering};

pub(crate) static WORKERS_STARTED: AtomicU64 = AtomicU64::new(0);
pub(crate) static WORKERS_ACTIVE: AtomicU64 = AtomicU64::new(0);
pub(crate) static MESSAGES_PROCESSED: AtomicU64 = AtomicU64::new(0);
pub(crate) static BACKPRESSURE_PAUSES: AtomicU64 = AtomicU64::new(0);

/// Consolidated runtime counters.
///
/// All fields are captured at approximately the same instant.
#[derive(Debug, Clone, Copy)]
pub struct Metrics {
    /// Total drain periods started since startup or last reset.
    pub workers_started: u64,
    /// Workers currently draining an inbox.
    pub workers_active: u64,
    /// Total user payloads executed since startup or last reset.
    pub messages_processed: u64,
    /// Total sender pauses taken by the backpressure protocol.
    pub backpressure_pauses: u64,
}

/// Captures a snapshot of the runtime counters.
#[must_use]
pub fn metrics() -> Metrics {
    Metrics {
        workers_started: WORKERS_STARTED.load(Ordering::Relaxed),
        workers_active: WORKERS_ACTIVE.load(Ordering::Relaxed),
        messages_processed: MESSAGES_PROCESSED.load(Ordering::Relaxed),
        backpressure_pauses: BACKPRESSURE_PAUSES.load(Ordering::Relaxed),
    }
}

/// Resets all runtime counters to zero.
pub fn reset_metrics() {
    WORKERS_STARTED.store(0, Ordering::Relaxed);
    WORKERS_ACTIVE.store(0, Ordering::Relaxed);
    MESSAGES_PROCESSED.store(0, Ordering::Relaxed);
    BACKPRESSURE_PAUSES.store(0, Ordering::Relaxed);
}
