//! In-band backpressure: the stop-token election.
//!
//! When a sender observes its recipient busy, it enqueues a *signal* on the
//! recipient and a *wait* on itself, both sharing one token. In-order
//! delivery guarantees the signal runs strictly after the payload that
//! triggered it; the wait runs when the sender's own worker reaches it.
//! Whichever side runs second is elected to resume the sender — and if the
//! signal runs first, the wait falls through and the sender never pauses.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::actor::Addr;
use crate::inbox::Drain;
use crate::metrics::BACKPRESSURE_PAUSES;
use crate::worker;

/// Outcome of the wait half of the election.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Wait {
    /// The signal already ran; the sender keeps draining.
    Continue,
    /// The sender's worker terminates without draining; the signal will
    /// resume the inbox later.
    Pause,
}

/// One-shot rendezvous between a flooded sender and its recipient.
///
/// A token belongs to exactly one transaction and is never reused.
pub(crate) struct StopToken {
    /// Set by whichever of signal/wait runs first.
    fired: AtomicBool,
    /// The sender to resume.
    sender: Addr,
}

impl std::fmt::Debug for StopToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StopToken")
            .field("fired", &self.fired.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl StopToken {
    pub(crate) fn new(sender: Addr) -> Self {
        Self {
            fired: AtomicBool::new(false),
            sender,
        }
    }

    /// Recipient half, run by the recipient's worker.
    ///
    /// If the wait already ran, the sender is paused at its wait node:
    /// advance past it and start a fresh worker when messages remain.
    pub(crate) fn signal(&self) {
        // AcqRel: pairs with the swap in `wait` so the paused worker's last
        // inbox accesses are visible to the resumer.
        if self.fired.swap(true, Ordering::AcqRel) {
            tracing::debug!("recipient drained, resuming paused sender");
            // SAFETY: the sender's worker terminated at the wait node, and
            // the election elects exactly one resumer — this thread is now
            // the sender inbox's sole logical consumer.
            if unsafe { self.sender.inbox().advance() } == Drain::More {
                // No caller to hand this error to: a failed restart would
                // strand the sender's queued messages.
                worker::start(self.sender.clone())
                    .expect("failed to restart a paused sender's worker");
            }
        }
    }

    /// Sender half, run by the sender's own worker.
    pub(crate) fn wait(&self) -> Wait {
        if self.fired.swap(true, Ordering::AcqRel) {
            Wait::Continue
        } else {
            BACKPRESSURE_PAUSES.fetch_add(1, Ordering::Relaxed);
            tracing::debug!("recipient congested, pausing sender worker");
            Wait::Pause
        }
    }
}
