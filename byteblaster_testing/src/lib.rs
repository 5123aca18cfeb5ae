//! Utilities for exercising a `byteblaster` receiver in tests.
//!
//! Besides re-exporting the frame builders from
//! [`byteblaster::test_helpers`], this crate provides a local TCP broadcast
//! server, a scratch output directory, a log capture fixture, and helpers for
//! reading metrics from a debugging recorder.
//!
//! ```rust,no_run
//! use byteblaster_testing::{BroadcastServer, frame_bytes, payload_of, stream_of, to_wire};
//!
//! # async fn example() -> std::io::Result<()> {
//! let frame = frame_bytes("A.TXT", "v1", 1, 1, &payload_of(7));
//! let server = BroadcastServer::start([to_wire(&stream_of([&frame]))]).await?;
//! println!("dial {}", server.addr());
//! # Ok(())
//! # }
//! ```

pub mod broadcast;
pub mod fs;
pub mod logging;
pub mod metrics;

pub use broadcast::BroadcastServer;
pub use byteblaster::test_helpers::*;
pub use fs::{ScratchDir, scratch_dir};
pub use logging::{LoggerHandle, logger};
pub use metrics::{CounterSnapshot, debugging_recorder_setup};

/// Result type for tests that propagate setup failures with `?`.
pub type TestResult<T = ()> = Result<T, Box<dyn std::error::Error + Send + Sync>>;
