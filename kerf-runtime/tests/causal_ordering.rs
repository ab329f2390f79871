//! End-to-end messaging semantics: FIFO per inbox, self-sends, causal
//! delivery across actors, the payload panic policy, and misuse of the
//! blocking bridge.

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use kerf_runtime::{ActorCell, Addr, Rendezvous};

/// Poll `cond` until it holds or the deadline passes.
fn wait_until(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(1));
    }
    cond()
}

#[test]
fn messages_execute_in_send_order() {
    let cell = Arc::new(ActorCell::<Vec<usize>>::new(Vec::new()));
    for i in 0..16 {
        ActorCell::with(&cell, move |list| list.push(i)).expect("send failed");
    }

    let done = Arc::new(Rendezvous::new());
    {
        let done = Arc::clone(&done);
        ActorCell::with(&cell, move |_list| done.notify()).expect("send failed");
    }
    assert!(done.wait_timeout(Duration::from_secs(5)));

    let list = ActorCell::inspect(&cell, Clone::clone).expect("inspect failed");
    assert_eq!(list, (0..16).collect::<Vec<_>>());
}

#[test]
fn self_addressed_sends_complete_without_backpressure() {
    let cell = Arc::new(ActorCell::<Vec<usize>>::new(Vec::new()));
    let addr = ActorCell::addr(&cell);

    // Every send names the recipient as its own sender; the backpressure
    // short-circuit must keep this from deadlocking the actor against
    // itself.
    for i in 0..16 {
        ActorCell::with_from(&cell, &addr, move |list| list.push(i)).expect("send failed");
    }

    let done = Arc::new(Rendezvous::new());
    {
        let done = Arc::clone(&done);
        ActorCell::with_from(&cell, &addr, move |_list| done.notify()).expect("send failed");
    }
    assert!(done.wait_timeout(Duration::from_secs(5)), "self-sends hung");

    let list = ActorCell::inspect(&cell, Clone::clone).expect("inspect failed");
    assert_eq!(list, (0..16).collect::<Vec<_>>());
}

#[test]
fn causal_order_across_actors() {
    let c = Arc::new(ActorCell::<Vec<&'static str>>::new(Vec::new()));
    let a = Addr::new();
    let b = Addr::new();

    let a_ident = a.clone();
    let b_ident = b.clone();
    let b_target = b.clone();
    let c_m1 = Arc::clone(&c);
    let c_m3 = Arc::clone(&c);

    // In A's context: M1 to C, then a message to B whose handler relays M3
    // to C. M1 must precede M3 on C regardless of timing.
    a.send(move || {
        ActorCell::with_from(&c_m1, &a_ident, |log| log.push("m1")).expect("send M1 failed");
        b_target
            .send_from(&a_ident, move || {
                ActorCell::with_from(&c_m3, &b_ident, |log| log.push("m3"))
                    .expect("send M3 failed");
            })
            .expect("relay to B failed");
    })
    .expect("send to A failed");

    assert!(
        wait_until(Duration::from_secs(5), || {
            ActorCell::inspect(&c, Vec::len).expect("inspect failed") >= 2
        }),
        "C never observed both messages"
    );
    let log = ActorCell::inspect(&c, Clone::clone).expect("inspect failed");
    assert_eq!(&log[..2], &["m1", "m3"][..]);
}

#[test]
fn payload_panic_does_not_stop_the_actor() {
    let cell = Arc::new(ActorCell::new(0u32));
    let addr = ActorCell::addr(&cell);

    // The panic is contained to its own message; the increment behind it
    // still runs.
    addr.send(|| panic!("deliberate test panic")).expect("send failed");
    ActorCell::with(&cell, |n| *n += 1).expect("send failed");

    let value = ActorCell::inspect(&cell, |n| *n).expect("inspect failed");
    assert_eq!(value, 1);
}

#[test]
fn block_from_inside_a_message_panics() {
    let a = Addr::new();
    let b = Addr::new();
    let verdict = Arc::new(Mutex::new(None));
    let done = Arc::new(Rendezvous::new());

    {
        let verdict = Arc::clone(&verdict);
        let done = Arc::clone(&done);
        a.send(move || {
            let caught = panic::catch_unwind(AssertUnwindSafe(|| b.block(|| {})));
            *verdict.lock().unwrap() = Some(caught.is_err());
            done.notify();
        })
        .expect("send failed");
    }

    assert!(done.wait_timeout(Duration::from_secs(5)));
    assert_eq!(
        *verdict.lock().unwrap(),
        Some(true),
        "block inside a worker must panic"
    );
}
