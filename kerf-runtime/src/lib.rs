//! In-process actor runtime with causal messaging.
//!
//! Each actor owns an [`Inbox`] of zero-argument messages (closures) and
//! processes them one at a time. Delivery is asynchronous and *causal*: if
//! an actor sends `M1` to `C` and later sends to `B` a message whose handler
//! sends `M3` to `C`, then `M1` runs before `M3` on `C` in every execution.
//! Inboxes are unbounded; instead of admission control, a lightweight
//! backpressure protocol pauses an actor that floods a congested recipient,
//! using only ordinary in-band messages.
//!
//! Messages should be non-blocking. Deadlock freedom holds for code written
//! in the actor style: actors communicate only by sending, and the one
//! blocking operation ([`Addr::block`]) is reserved for external threads.
//!
//! # Architecture
//!
//! ```text
//! Layer 0: error, rendezvous, metrics   (no internal deps)
//! Layer 1: inbox, message               (atomic queue core)
//! Layer 2: executor, worker             (worker launch, drain loop)
//! Layer 3: actor, backpressure          (send surface, stop token)
//! Layer 4: cell                         (typed state convenience)
//! ```
//!
//! # Using it
//!
//! Wrap a fresh inbox in an address and send closures at it, or embed an
//! [`Inbox`] in your own struct, implement [`Actor`], and hand out
//! [`Addr`]s via [`Addr::embed`]. For actor-owned mutable state, reach for
//! [`ActorCell`], which makes the serial-execution guarantee available as
//! `&mut` access from inside a message. Sends from within another actor's
//! message should carry the sender ([`Addr::send_from`]) so backpressure
//! can pace a flooding producer.

mod backpressure;
mod message;
mod worker;

pub mod actor;
pub mod cell;
pub mod error;
pub mod executor;
pub mod inbox;
pub mod metrics;
pub mod rendezvous;

pub use actor::{Actor, Addr};
pub use cell::ActorCell;
pub use error::{Error, Result};
pub use executor::{install_executor, Executor, PoolExecutor, Task, ThreadExecutor};
pub use inbox::Inbox;
pub use metrics::{metrics, reset_metrics, Metrics};
pub use rendezvous::Rendezvous;
