//! One-shot rendezvous between threads.
//!
//! A [`Rendezvous`] is the synchronisation primitive behind the blocking
//! bridge: one side calls [`notify`](Rendezvous::notify) exactly once, the
//! other blocks in [`wait`](Rendezvous::wait) (or
//! [`wait_timeout`](Rendezvous::wait_timeout)) until it has fired. The fast
//! path is a single atomic load; the slow path parks on a condvar.
//!
//! It is also handy as a user-supplied gate in tests and shutdown
//! choreography, so it is part of the public surface.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

/// One-shot notification flag.
///
/// Any thread may notify (the first call wins, later calls are no-ops) and
/// any number of threads may wait; all waiters are released once the flag
/// fires. A fired rendezvous stays fired.
#[derive(Debug, Default)]
pub struct Rendezvous {
    /// Set once the rendezvous has fired.
    ready: AtomicBool,
    /// Mutex protecting the condvar wait.
    lock: Mutex<()>,
    /// Condvar signalled by [`notify`](Rendezvous::notify).
    cond: Condvar,
}

impl Rendezvous {
    /// Creates a rendezvous that has not yet fired.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fires the rendezvous, waking every current and future waiter.
    pub fn notify(&self) {
        // Release pairs with the Acquire load in wait/is_set.
        self.ready.store(true, Ordering::Release);

        // Taking the lock before notifying closes the window where a waiter
        // has checked `ready` but not yet parked.
        let _guard = match self.lock.lock() {
            Ok(g) => g,
            Err(e) => e.into_inner(),
        };
        self.cond.notify_all();
    }

    /// Returns `true` if the rendezvous has fired.
    #[must_use]
    pub fn is_set(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// Blocks until the rendezvous fires.
    pub fn wait(&self) {
        // Fast path: check the flag without locking.
        if self.ready.load(Ordering::Acquire) {
            return;
        }

        let mut guard = match self.lock.lock() {
            Ok(g) => g,
            Err(e) => e.into_inner(),
        };
        while !self.ready.load(Ordering::Acquire) {
            guard = match self.cond.wait(guard) {
                Ok(g) => g,
                Err(e) => e.into_inner(),
            };
        }
    }

    /// Blocks until the rendezvous fires or `timeout` elapses.
    ///
    /// Returns `true` if the rendezvous fired, `false` on timeout.
    #[must_use]
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        if self.ready.load(Ordering::Acquire) {
            return true;
        }

        let deadline = Instant::now() + timeout;
        let mut guard = match self.lock.lock() {
            Ok(g) => g,
            Err(e) => e.into_inner(),
        };
        while !self.ready.load(Ordering::Acquire) {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return false;
            }
            guard = match self.cond.wait_timeout(guard, remaining) {
                Ok((g, _)) => g,
                Err(e) => e.into_inner().0,
            };
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn notify_then_wait_returns_immediately() {
        let rv = Rendezvous::new();
        assert!(!rv.is_set());
        rv.notify();
        assert!(rv.is_set());
        rv.wait();
    }

    #[test]
    fn wait_timeout_expires_when_never_notified() {
        let rv = Rendezvous::new();
        assert!(!rv.wait_timeout(Duration::from_millis(10)));
    }

    #[test]
    fn waiter_is_released_by_another_thread() {
        let rv = Arc::new(Rendezvous::new());
        let notifier = {
            let rv = Arc::clone(&rv);
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(20));
                rv.notify();
            })
        };
        assert!(rv.wait_timeout(Duration::from_secs(5)));
        notifier.join().expect("notifier thread panicked");
    }

    #[test]
    fn notify_is_idempotent() {
        let rv = Rendezvous::new();
        rv.notify();
        rv.notify();
        rv.wait();
        assert!(rv.is_set());
    }
}
