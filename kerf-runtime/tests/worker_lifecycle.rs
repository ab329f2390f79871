//! Worker lifecycle: the blocking bridge observes every message, and an
//! idle actor holds no worker.
//!
//! Kept to a single test so the process-wide worker counters are not
//! perturbed by unrelated concurrent tests.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use kerf_runtime::{metrics, Addr};

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
fn blocking_observer_drains_and_workers_exit() {
    let a = Addr::new();
    let list = Arc::new(Mutex::new(Vec::new()));

    for i in 0..1024u32 {
        let list = Arc::clone(&list);
        a.block(move || list.lock().unwrap().push(i))
            .expect("block failed");
    }

    // Every blocking call returned only after its payload ran, in order.
    assert_eq!(*list.lock().unwrap(), (0..1024).collect::<Vec<_>>());

    // Empty ⇔ idle: once drained, the actor holds no worker.
    assert!(
        wait_until(Duration::from_secs(2), || metrics().workers_active == 0),
        "idle actor still holds a worker"
    );
    let snapshot = metrics();
    assert!(snapshot.workers_started >= 1);
    // Each blocking call contributed a payload and a rendezvous message.
    assert!(snapshot.messages_processed >= 2048);
}
