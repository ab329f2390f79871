//! Error types for the runtime's public operations.
//!
//! The runtime surfaces no errors of its own during steady-state message
//! processing; the inbox cannot fail in-band. The only fallible operations
//! are the ones that touch host resources: starting a worker and installing
//! the process-global executor.

use std::io;

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by send operations and executor installation.
#[derive(Debug, Error)]
pub enum Error {
    /// The host refused to start a worker for a freshly non-empty inbox.
    ///
    /// Surfaced by the send operations when the enqueue that made the inbox
    /// non-empty cannot hand the drain off to an execution context.
    #[error("failed to start a worker: {0}")]
    WorkerSpawn(#[from] io::Error),

    /// [`install_executor`](crate::install_executor) was called after an
    /// executor had already been installed (or lazily defaulted).
    #[error("an executor is already installed for this process")]
    ExecutorInstalled,
}
