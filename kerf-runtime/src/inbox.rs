//! Per-actor MPSC inbox queue.
//!
//! An intrusive linked queue with a wait-free enqueue: producers swap a new
//! node into the atomic `tail` and then link it behind the previous one. A
//! single consumer (the worker) walks `head`. The tail doubles as the
//! worker-lifecycle signal: a null tail means the inbox is empty and no
//! worker is running, and the producer whose swap observes null owns the
//! empty→non-empty transition and must start a worker.
//!
//! The consumer may observe a node at `tail` whose predecessor's `next` link
//! has not been published yet; [`Inbox::advance`] resolves this by clearing
//! `busy`, attempting to CAS the tail back to null, and on failure spinning
//! on the unpublished link (yielding to the OS scheduler between reads).
//!
//! # Memory ordering
//!
//! - **enqueue**: `AcqRel` on the tail swap (release publishes the node,
//!   acquire orders against the previous producer), `Release` on linking
//!   `prev.next`.
//! - **advance**: `Acquire` on loading `next`; `Release` on clearing `busy`
//!   before the shutdown CAS; `AcqRel` on the tail CAS; `Relaxed` when
//!   re-setting `busy` after a lost race — producers that already observed
//!   it cleared may skip backpressure for that window, which is acceptable.

use std::cell::UnsafeCell;
use std::ptr;
use std::sync::atomic::{AtomicBool, AtomicPtr, Ordering};
use std::thread;

use crate::message::Message;

/// A queued message node.
///
/// Owned by the inbox from enqueue until the consumer advances past it.
/// Nodes are never pooled or recycled; each enqueue allocates.
pub(crate) struct Node {
    /// Link to the successor, published after the tail swap.
    next: AtomicPtr<Node>,
    /// The action to execute; taken by the worker before running it.
    action: Option<Message>,
}

/// Outcome of a consumer drain step.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Drain {
    /// A successor was adopted as the new head.
    More,
    /// The inbox is empty; the worker must exit.
    Done,
}

/// A per-actor message queue plus the flags governing worker lifecycle and
/// backpressure.
///
/// Embed an `Inbox` in your own struct and implement
/// [`Actor`](crate::Actor) to make it addressable, or use a bare inbox
/// directly — a plain `Inbox` is itself an actor.
pub struct Inbox {
    /// Front node. Touched only by the active worker, plus a single write
    /// by the producer that wins the empty→non-empty transition (no worker
    /// exists at that instant).
    head: UnsafeCell<*mut Node>,
    /// Back node; null when the inbox is empty. Producers swap, the
    /// consumer CASes it back to null on drain.
    tail: AtomicPtr<Node>,
    /// Set while a worker is processing; producers read it to decide
    /// whether backpressure is warranted.
    busy: AtomicBool,
}

// SAFETY: `tail` and `busy` are atomics; `head` is confined to the single
// consumer (and to the one producer that owns the empty→non-empty
// transition, when no consumer exists). The queue's lifecycle rules make
// those accesses exclusive.
unsafe impl Send for Inbox {}
// SAFETY: See above — all shared mutation goes through atomics, and `head`
// is never accessed by two threads at once.
unsafe impl Sync for Inbox {}

impl std::fmt::Debug for Inbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Inbox")
            .field("empty", &self.is_empty())
            .field("busy", &self.busy.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl Default for Inbox {
    fn default() -> Self {
        Self::new()
    }
}

impl Inbox {
    /// Creates a fresh empty inbox.
    #[must_use]
    pub fn new() -> Self {
        Self {
            head: UnsafeCell::new(ptr::null_mut()),
            tail: AtomicPtr::new(ptr::null_mut()),
            busy: AtomicBool::new(false),
        }
    }

    /// Returns `true` if the inbox appears empty.
    ///
    /// This is approximate — a concurrent enqueue may cause a stale answer.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tail.load(Ordering::Acquire).is_null()
    }

    /// Appends a message, returning `true` on the empty→non-empty
    /// transition — the caller must then start a worker.
    ///
    /// Wait-free: a single swap plus a single store, no CAS loop.
    pub(crate) fn enqueue(&self, message: Message) -> bool {
        let node = Box::into_raw(Box::new(Node {
            next: AtomicPtr::new(ptr::null_mut()),
            action: Some(message),
        }));

        // AcqRel: release publishes the node's payload to whoever observes
        // it through `tail`; acquire pairs with the previous producer's
        // release so the chain stays consistent.
        let prev = self.tail.swap(node, Ordering::AcqRel);

        if prev.is_null() {
            // Empty→non-empty. The swap linearises this transition exactly
            // once per empty period: no worker exists and no other producer
            // observed null, so this thread briefly owns `head`.
            // SAFETY: exclusive access per the swap linearisation; the
            // worker started by the caller reads `head` only after the
            // task handoff synchronises with this write.
            unsafe { *self.head.get() = node };
            return true;
        }

        // Link behind the previous tail. The consumer frees a node only
        // after adopting its successor, and it cannot adopt one before this
        // store publishes it, so `prev` is still live.
        // SAFETY: `prev` was the queue's tail an instant ago and cannot be
        // reclaimed until its `next` is published and followed.
        unsafe { (*prev).next.store(node, Ordering::Release) };
        false
    }

    /// Reads the busy flag (producer side).
    pub(crate) fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Sets the busy flag (worker side, at the start of a drain period).
    pub(crate) fn mark_busy(&self) {
        self.busy.store(true, Ordering::Release);
    }

    /// Takes the action out of the current head node.
    ///
    /// # Safety
    ///
    /// The caller must be the inbox's sole consumer, and the inbox must be
    /// non-empty with an action not yet taken from the head node.
    pub(crate) unsafe fn take_action(&self) -> Message {
        // SAFETY: the sole consumer owns `head`, and the head node is not
        // freed until the consumer advances past it.
        let head = unsafe { *self.head.get() };
        // SAFETY: as above; `take` is called at most once per node.
        unsafe { (*head).action.take() }.expect("head action taken twice")
    }

    /// Drain step: advance past the current head after executing it.
    ///
    /// Returns [`Drain::More`] with a new head adopted, or [`Drain::Done`]
    /// after restoring the empty state. On `Done` the caller's worker must
    /// exit; the next enqueue starts a fresh one.
    ///
    /// # Safety
    ///
    /// The caller must be the inbox's sole consumer.
    pub(crate) unsafe fn advance(&self) -> Drain {
        // SAFETY: sole-consumer contract.
        let head = unsafe { *self.head.get() };
        // SAFETY: the head node is live until this step frees it.
        let next = unsafe { (*head).next.load(Ordering::Acquire) };

        if !next.is_null() {
            // Common case: adopt the successor, free the old head.
            // SAFETY: sole consumer; `head` was allocated by `enqueue` and
            // nothing else references it once the successor is adopted.
            unsafe {
                *self.head.get() = next;
                drop(Box::from_raw(head));
            }
            return Drain::More;
        }

        // The head appears to be the last node. Publish "not busy" before
        // attempting shutdown so producers racing the CAS read a consistent
        // flag, then try to restore the empty state.
        self.busy.store(false, Ordering::Release);
        if self
            .tail
            .compare_exchange(head, ptr::null_mut(), Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            // SAFETY: the CAS succeeded, so no producer swapped after this
            // node; it is exclusively ours to free.
            unsafe { drop(Box::from_raw(head)) };
            return Drain::Done;
        }

        // Lost the race: a producer swapped in a successor but may not have
        // linked it yet. Re-set busy (relaxed — see module doc) and spin on
        // the unpublished link, yielding between reads.
        self.busy.store(true, Ordering::Relaxed);
        loop {
            // SAFETY: `head` stays live — the producer that won the race
            // links through it, and only this consumer frees it.
            let next = unsafe { (*head).next.load(Ordering::Acquire) };
            if !next.is_null() {
                // SAFETY: as in the common case above.
                unsafe {
                    *self.head.get() = next;
                    drop(Box::from_raw(head));
                }
                return Drain::More;
            }
            thread::yield_now();
        }
    }
}

impl Drop for Inbox {
    fn drop(&mut self) {
        // Exclusive access: free whatever chain remains. This only happens
        // when messages were enqueued but a worker could never run them
        // (worker spawn failure, or teardown of a paused sender).
        if self.tail.load(Ordering::Acquire).is_null() {
            return;
        }
        let mut cursor = *self.head.get_mut();
        while !cursor.is_null() {
            // SAFETY: every node in the chain was allocated by `enqueue`
            // via `Box::into_raw` and is reachable exactly once.
            let node = unsafe { Box::from_raw(cursor) };
            cursor = node.next.load(Ordering::Relaxed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::{Arc, Mutex};

    fn act(f: impl FnOnce() + Send + 'static) -> Message {
        Message::Act(Box::new(f))
    }

    /// Drain the whole inbox on the current thread, executing payloads.
    fn drain_all(inbox: &Inbox) {
        loop {
            // SAFETY: tests are the sole consumer of their own inboxes.
            let message = unsafe { inbox.take_action() };
            if let Message::Act(thunk) = message {
                thunk();
            }
            // SAFETY: as above.
            if unsafe { inbox.advance() } == Drain::Done {
                break;
            }
        }
    }

    #[test]
    fn new_inbox_is_empty() {
        let inbox = Inbox::new();
        assert!(inbox.is_empty());
        assert!(!inbox.is_busy());
    }

    #[test]
    fn enqueue_reports_the_empty_transition_once() {
        let inbox = Inbox::new();
        assert!(inbox.enqueue(act(|| {})));
        assert!(!inbox.enqueue(act(|| {})));
        assert!(!inbox.enqueue(act(|| {})));
        drain_all(&inbox);
        assert!(inbox.is_empty());
        // A fresh enqueue after the drain reports the transition again.
        assert!(inbox.enqueue(act(|| {})));
        drain_all(&inbox);
    }

    #[test]
    fn fifo_ordering() {
        let inbox = Inbox::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        for i in 0..10 {
            let seen = Arc::clone(&seen);
            inbox.enqueue(act(move || seen.lock().unwrap().push(i)));
        }
        drain_all(&inbox);
        assert_eq!(*seen.lock().unwrap(), (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn interleaved_enqueue_and_drain() {
        let inbox = Inbox::new();
        let count = Arc::new(AtomicUsize::new(0));

        let bump = |count: &Arc<AtomicUsize>| {
            let count = Arc::clone(count);
            act(move || {
                count.fetch_add(1, Ordering::Relaxed);
            })
        };

        assert!(inbox.enqueue(bump(&count)));
        inbox.enqueue(bump(&count));
        drain_all(&inbox);
        assert!(inbox.enqueue(bump(&count)));
        drain_all(&inbox);
        assert_eq!(count.load(Ordering::Relaxed), 3);
        assert!(inbox.is_empty());
    }

    #[test]
    fn advance_clears_busy_on_done() {
        let inbox = Inbox::new();
        inbox.enqueue(act(|| {}));
        inbox.mark_busy();
        assert!(inbox.is_busy());
        // SAFETY: single-threaded test, we are the consumer.
        unsafe { inbox.take_action() };
        // SAFETY: as above.
        assert_eq!(unsafe { inbox.advance() }, Drain::Done);
        assert!(!inbox.is_busy());
    }

    #[test]
    fn concurrent_producers_lose_nothing() {
        const PRODUCERS: usize = 8;
        const PER_PRODUCER: usize = 5_000;

        let inbox = Arc::new(Inbox::new());
        let count = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..PRODUCERS)
            .map(|_| {
                let inbox = Arc::clone(&inbox);
                let count = Arc::clone(&count);
                std::thread::spawn(move || {
                    for _ in 0..PER_PRODUCER {
                        let count = Arc::clone(&count);
                        inbox.enqueue(act(move || {
                            count.fetch_add(1, Ordering::Relaxed);
                        }));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("producer thread panicked");
        }

        // Consume from this thread after all producers joined.
        drain_all(&inbox);
        assert_eq!(count.load(Ordering::Relaxed), PRODUCERS * PER_PRODUCER);
        assert!(inbox.is_empty());
    }

    #[test]
    fn dropping_a_non_empty_inbox_frees_pending_messages() {
        let marker = Arc::new(());
        {
            let inbox = Inbox::new();
            for _ in 0..4 {
                let marker = Arc::clone(&marker);
                inbox.enqueue(act(move || drop(marker)));
            }
        }
        // Every undelivered closure (and its captures) was dropped.
        assert_eq!(Arc::strong_count(&marker), 1);
    }
}
