//! Message representation.
//!
//! An inbox carries opaque zero-argument actions. Alongside user payloads
//! the queue transports the two halves of a backpressure transaction, so a
//! message is a small tagged variant rather than a bare closure.

use std::fmt;
use std::sync::Arc;

use crate::backpressure::StopToken;

/// A boxed zero-argument user action.
pub(crate) type Thunk = Box<dyn FnOnce() + Send + 'static>;

/// A single queued action.
pub(crate) enum Message {
    /// A user payload, executed in inbox order.
    Act(Thunk),
    /// The recipient half of a backpressure transaction. Runs on the
    /// congested recipient, strictly after the payload that triggered it.
    Signal(Arc<StopToken>),
    /// The sender half of a backpressure transaction. Runs on the flooding
    /// sender and may terminate its worker without draining.
    Wait(Arc<StopToken>),
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Act(_) => f.write_str("Message::Act"),
            Self::Signal(_) => f.write_str("Message::Signal"),
            Self::Wait(_) => f.write_str("Message::Wait"),
        }
    }
}
