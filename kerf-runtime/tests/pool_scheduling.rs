//! Messaging semantics under the pooled executor: routing drain periods
//! through a fixed thread pool must be observable only in throughput.
//!
//! Kept to a single test because the executor is installed process-wide.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use kerf_runtime::{install_executor, ActorCell, Addr, PoolExecutor, Rendezvous};

#[test]
fn pool_executor_preserves_ordering_and_blocking() {
    install_executor(PoolExecutor::with_workers(4)).expect("executor already installed");

    // FIFO ordering through the pool.
    let cell = Arc::new(ActorCell::<Vec<usize>>::new(Vec::new()));
    for i in 0..256 {
        ActorCell::with(&cell, move |list| list.push(i)).expect("send failed");
    }
    let done = Arc::new(Rendezvous::new());
    {
        let done = Arc::clone(&done);
        ActorCell::with(&cell, move |_list| done.notify()).expect("send failed");
    }
    assert!(done.wait_timeout(Duration::from_secs(10)));
    let list = ActorCell::inspect(&cell, Clone::clone).expect("inspect failed");
    assert_eq!(list, (0..256).collect::<Vec<_>>());

    // The blocking bridge drains through pool threads.
    let a = Addr::new();
    let log = Arc::new(Mutex::new(Vec::new()));
    for i in 0..64u32 {
        let log = Arc::clone(&log);
        a.block(move || log.lock().unwrap().push(i))
            .expect("block failed");
    }
    assert_eq!(*log.lock().unwrap(), (0..64).collect::<Vec<_>>());
}
