//! Canonical error and result types for the crate.
//!
//! Frame-level problems never surface here: malformed and stale frames are
//! dropped inside the pipeline. Only failures of the surrounding runtime
//! reach callers.

use std::io;

use thiserror::Error;
use tokio::task::JoinError;

/// Top-level error type exposed by `byteblaster`.
#[derive(Debug, Error)]
pub enum ByteBlasterError {
    /// Reading a capture or setting up I/O failed.
    #[error("transport error: {0}")]
    Io(#[from] io::Error),
    /// A pipeline task panicked or was aborted.
    #[error("pipeline task failed: {0}")]
    Task(#[from] JoinError),
}

/// Canonical result alias used by `byteblaster` public APIs.
pub type Result<T> = std::result::Result<T, ByteBlasterError>;
