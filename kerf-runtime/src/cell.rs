//! Typed state actors: an inbox paired with actor-owned state.
//!
//! The embedding idiom — a struct whose other fields are touched only by
//! its own messages — needs a safe carrier for `&mut` access. An
//! [`ActorCell`] owns its state in an [`UnsafeCell`]; because an inbox has
//! at most one worker and messages execute strictly serially, handing the
//! closure a `&mut S` from inside a message cannot alias.

use std::cell::UnsafeCell;
use std::fmt;
use std::sync::{Arc, Mutex};

use crate::actor::{Actor, Addr};
use crate::error::Result;
use crate::inbox::Inbox;

/// An inbox plus actor-owned state `S`.
///
/// State is reachable only from inside this actor's own messages
/// ([`with`](ActorCell::with) and friends), which the single worker runs
/// one at a time. The cell is used through an `Arc`, mirroring the
/// reference-counted actor graph:
///
/// - `ActorCell::with(&cell, f)` — enqueue a state mutation.
/// - `ActorCell::with_from(&cell, &sender, f)` — same, with backpressure.
/// - `ActorCell::inspect(&cell, f)` — blocking read from non-actor code.
pub struct ActorCell<S> {
    inbox: Inbox,
    state: UnsafeCell<S>,
}

// SAFETY: `state` is accessed only from inside the cell's own messages,
// which the inbox's single worker executes strictly serially — no two
// accesses can overlap.
unsafe impl<S: Send> Sync for ActorCell<S> {}

impl<S> fmt::Debug for ActorCell<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActorCell")
            .field("inbox", &self.inbox)
            .finish_non_exhaustive()
    }
}

impl<S: Send + 'static> ActorCell<S> {
    /// Creates a cell owning `state`.
    #[must_use]
    pub fn new(state: S) -> Self {
        Self {
            inbox: Inbox::new(),
            state: UnsafeCell::new(state),
        }
    }

    /// The cell's address.
    #[must_use]
    pub fn addr(this: &Arc<Self>) -> Addr {
        Addr::embed(Arc::clone(this))
    }

    /// Enqueues a state mutation, without a sender identity.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WorkerSpawn`](crate::Error::WorkerSpawn) when no
    /// worker could be started.
    pub fn with<F>(this: &Arc<Self>, f: F) -> Result<()>
    where
        F: FnOnce(&mut S) + Send + 'static,
    {
        let cell = Arc::clone(this);
        Self::addr(this).send(move || {
            // SAFETY: executed by the cell's sole worker; no other access
            // to `state` can be live (see the `Sync` impl).
            f(unsafe { &mut *cell.state.get() });
        })
    }

    /// Enqueues a state mutation, identifying `sender` for backpressure.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WorkerSpawn`](crate::Error::WorkerSpawn) when no
    /// worker could be started.
    pub fn with_from<F>(this: &Arc<Self>, sender: &Addr, f: F) -> Result<()>
    where
        F: FnOnce(&mut S) + Send + 'static,
    {
        let cell = Arc::clone(this);
        Self::addr(this).send_from(sender, move || {
            // SAFETY: as in `with` — the sole worker is running us.
            f(unsafe { &mut *cell.state.get() });
        })
    }

    /// Blocking read: runs `f` against the state on the actor's worker and
    /// returns its result to the calling thread.
    ///
    /// A bridge for external threads only, with the same restrictions as
    /// [`Addr::block`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::WorkerSpawn`](crate::Error::WorkerSpawn) when no
    /// worker could be started.
    ///
    /// # Panics
    ///
    /// Panics when called from a worker thread (see [`Addr::block`]).
    pub fn inspect<F, R>(this: &Arc<Self>, f: F) -> Result<R>
    where
        F: FnOnce(&S) -> R + Send + 'static,
        R: Send + 'static,
    {
        let slot = Arc::new(Mutex::new(None));
        let out = Arc::clone(&slot);
        let cell = Arc::clone(this);
        Self::addr(this).block(move || {
            // SAFETY: executed by the cell's sole worker.
            let value = f(unsafe { &*cell.state.get() });
            let mut guard = match out.lock() {
                Ok(g) => g,
                Err(e) => e.into_inner(),
            };
            *guard = Some(value);
        })?;

        let mut guard = match slot.lock() {
            Ok(g) => g,
            Err(e) => e.into_inner(),
        };
        Ok(guard.take().expect("inspect payload ran without a result"))
    }
}

impl<S: Send + 'static> Actor for ActorCell<S> {
    fn inbox(&self) -> &Inbox {
        &self.inbox
    }
}
