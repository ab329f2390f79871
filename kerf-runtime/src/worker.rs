//! The transient worker: drains one inbox until it is empty.
//!
//! A worker is created in exactly one place — the empty→non-empty inbox
//! transition inside an enqueue — and in its logical continuation, the
//! backpressure restart. It sets the inbox's busy flag, executes messages
//! in order, and exits once the inbox is observed empty. At most one worker
//! exists per inbox at any instant.
//!
//! A panicking user payload terminates only that message: the unwind is
//! caught, logged, and the worker continues with the next message.

use std::cell::Cell;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::Ordering;

use crate::actor::Addr;
use crate::backpressure::Wait;
use crate::error::Result;
use crate::executor;
use crate::inbox::Drain;
use crate::message::Message;
use crate::metrics::{MESSAGES_PROCESSED, WORKERS_ACTIVE, WORKERS_STARTED};

thread_local! {
    /// Whether the current thread is inside a drain loop. Consulted by the
    /// blocking bridge to reject calls that would deadlock an actor.
    static IN_WORKER: Cell<bool> = const { Cell::new(false) };
}

/// Returns `true` when called from inside a worker's drain loop.
pub(crate) fn on_worker_thread() -> bool {
    IN_WORKER.with(Cell::get)
}

/// Launches a worker for `actor` on the installed executor.
pub(crate) fn start(actor: Addr) -> Result<()> {
    executor::global().execute(Box::new(move || run(&actor)))
}

/// The drain loop. Runs until the inbox is empty or a backpressure wait
/// pauses the actor.
fn run(actor: &Addr) {
    WORKERS_STARTED.fetch_add(1, Ordering::Relaxed);
    WORKERS_ACTIVE.fetch_add(1, Ordering::Relaxed);
    let was_in_worker = IN_WORKER.with(|flag| flag.replace(true));
    tracing::trace!("worker started");

    let inbox = actor.inbox();
    inbox.mark_busy();

    loop {
        // SAFETY: this worker is the inbox's sole consumer — workers start
        // only on the empty→non-empty transition, which the tail swap
        // linearises exactly once per empty period.
        let message = unsafe { inbox.take_action() };
        match message {
            Message::Act(thunk) => {
                if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(thunk)) {
                    let reason = payload
                        .downcast_ref::<&str>()
                        .copied()
                        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
                        .unwrap_or("non-string panic payload");
                    tracing::error!(cause = reason, "payload panicked, continuing with next message");
                }
                MESSAGES_PROCESSED.fetch_add(1, Ordering::Relaxed);
            }
            Message::Signal(token) => token.signal(),
            Message::Wait(token) => {
                if token.wait() == Wait::Pause {
                    // Terminate without draining. The head still points at
                    // the wait node; the signal side will advance past it
                    // and restart this inbox. Busy stays set — the inbox
                    // really is congested.
                    break;
                }
            }
        }

        // SAFETY: sole consumer, as above.
        match unsafe { inbox.advance() } {
            Drain::More => {}
            Drain::Done => break,
        }
    }

    tracing::trace!("worker exiting");
    IN_WORKER.with(|flag| flag.set(was_in_worker));
    WORKERS_ACTIVE.fetch_sub(1, Ordering::Relaxed);
}
