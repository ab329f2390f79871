//! Actors, addresses, and the send entry points.
//!
//! An actor is anything that exposes an [`Inbox`]: embed one in your struct
//! and implement [`Actor`], or use a bare `Inbox` directly. Actors are
//! referenced through [`Addr`] handles — cheap clones of an `Arc` — so actor
//! graphs, cycles included, are reclaimed by ordinary reference counting
//! once externally unreferenced; an idle actor holds no worker.
//!
//! Messages are zero-argument closures executed one at a time in enqueue
//! order. They must not block: a blocking payload stalls its actor (and, on
//! a pooled executor, occupies a pool thread).

use std::fmt;
use std::sync::Arc;

use crate::backpressure::StopToken;
use crate::error::Result;
use crate::inbox::Inbox;
use crate::message::Message;
use crate::rendezvous::Rendezvous;
use crate::worker;

/// A unit of state that owns an inbox and processes messages serially.
///
/// Implementors only route to their embedded inbox; everything else —
/// enqueueing, worker lifecycle, backpressure — is driven through [`Addr`].
pub trait Actor: Send + Sync + 'static {
    /// The actor's inbox.
    fn inbox(&self) -> &Inbox;
}

/// A bare inbox is itself an actor.
impl Actor for Inbox {
    fn inbox(&self) -> &Inbox {
        self
    }
}

/// A cheap, cloneable handle to an actor.
///
/// Holding an `Addr` keeps the actor alive; a running worker holds one for
/// the duration of its drain period.
#[derive(Clone)]
pub struct Addr {
    actor: Arc<dyn Actor>,
}

impl fmt::Debug for Addr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Addr")
            .field("inbox", &std::ptr::from_ref(self.inbox()))
            .finish()
    }
}

impl Default for Addr {
    fn default() -> Self {
        Self::new()
    }
}

impl Addr {
    /// A fresh standalone actor: a plain inbox with no surrounding state.
    #[must_use]
    pub fn new() -> Self {
        Self::embed(Arc::new(Inbox::new()))
    }

    /// Wraps an actor that embeds an inbox.
    #[must_use]
    pub fn embed<A: Actor>(actor: Arc<A>) -> Self {
        Self { actor }
    }

    /// The embedded inbox.
    pub(crate) fn inbox(&self) -> &Inbox {
        self.actor.inbox()
    }

    /// Two addresses denote the same actor when they share an inbox.
    #[must_use]
    pub fn same_actor(&self, other: &Addr) -> bool {
        std::ptr::eq(self.inbox(), other.inbox())
    }

    /// Asynchronously sends `f` to this actor, without a sender identity.
    ///
    /// The payload runs after every message enqueued before it, exactly
    /// once, on this actor's worker. Without a sender there is no
    /// backpressure; prefer [`send_from`](Addr::send_from) when sending
    /// from inside another actor's message.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WorkerSpawn`](crate::Error::WorkerSpawn) when the
    /// enqueue made the inbox non-empty but no worker could be started.
    pub fn send<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.post(Message::Act(Box::new(f)))
    }

    /// Asynchronously sends `f`, identifying `sender` to enable
    /// backpressure.
    ///
    /// When the recipient's worker is observed busy, a stop-token pair is
    /// enqueued — a signal behind the payload here, a wait on `sender` —
    /// and the sender's worker pauses at the wait until the recipient has
    /// caught up. Self-sends (`sender` is this actor) never apply
    /// backpressure: the protocol would deadlock an actor against itself.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WorkerSpawn`](crate::Error::WorkerSpawn) when a
    /// required worker could not be started.
    pub fn send_from<F>(&self, sender: &Addr, f: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.post(Message::Act(Box::new(f)))?;

        if self.same_actor(sender) {
            return Ok(());
        }
        if self.inbox().is_busy() {
            tracing::debug!("recipient busy, arming stop token");
            let token = Arc::new(StopToken::new(sender.clone()));
            self.post(Message::Signal(Arc::clone(&token)))?;
            sender.post(Message::Wait(token))?;
        }
        Ok(())
    }

    /// Synchronously sends `f`: returns only after the payload has run.
    ///
    /// This is a bridge for external threads — a way for non-actor code to
    /// hand work to an actor and observe its completion. It appends the
    /// payload, then a message that fires a one-shot rendezvous, and parks
    /// the calling thread on that rendezvous.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WorkerSpawn`](crate::Error::WorkerSpawn) when no
    /// worker could be started.
    ///
    /// # Panics
    ///
    /// Panics when called from a worker thread: blocking inside a message
    /// deadlocks the calling actor whenever the recipient is, directly or
    /// transitively, the caller itself or an actor waiting on it.
    pub fn block<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        assert!(
            !worker::on_worker_thread(),
            "Addr::block called from inside a message; actors must send instead of blocking"
        );

        let done = Arc::new(Rendezvous::new());
        self.send(f)?;
        let signal = Arc::clone(&done);
        self.send(move || signal.notify())?;
        done.wait();
        Ok(())
    }

    /// Enqueue, starting a worker on the empty→non-empty transition.
    fn post(&self, message: Message) -> Result<()> {
        if self.inbox().enqueue(message) {
            worker::start(self.clone())?;
        }
        Ok(())
    }
}
