//! Metric helpers for `byteblaster`.
//!
//! This module defines metric names and thin helpers wrapping the
//! [`metrics`](https://docs.rs/metrics) crate. Without the `metrics` feature
//! the helpers compile to no-ops.

#[cfg(feature = "metrics")]
use metrics::{counter, gauge};

/// Counter of frames processed, labelled by `outcome`.
pub const FRAMES_TOTAL: &str = "byteblaster_frames_total";
/// Counter of files handed to the sink successfully.
pub const FILES_DELIVERED: &str = "byteblaster_files_delivered_total";
/// Counter of sink failures.
pub const WRITE_ERRORS: &str = "byteblaster_write_errors_total";
/// Counter of transport reconnect attempts.
pub const RECONNECTS: &str = "byteblaster_reconnects_total";
/// Gauge of files currently being assembled.
pub const IN_FLIGHT_FILES: &str = "byteblaster_in_flight_files";

/// What happened to an extracted frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Stored in an in-flight file.
    Accepted,
    /// Dropped by parsing or checksum validation.
    Rejected(&'static str),
    /// Dropped because its version was already delivered.
    Stale,
}

impl FrameOutcome {
    fn as_str(self) -> &'static str {
        match self {
            Self::Accepted => "accepted",
            Self::Rejected(reason) => reason,
            Self::Stale => "stale",
        }
    }
}

/// Record the fate of one frame.
pub fn inc_frames(outcome: FrameOutcome) {
    #[cfg(feature = "metrics")]
    counter!(FRAMES_TOTAL, "outcome" => outcome.as_str()).increment(1);
    #[cfg(not(feature = "metrics"))]
    let _ = outcome.as_str();
}

/// Record a delivered file.
pub fn inc_delivered() {
    #[cfg(feature = "metrics")]
    counter!(FILES_DELIVERED).increment(1);
}

/// Record a sink failure.
pub fn inc_write_errors() {
    #[cfg(feature = "metrics")]
    counter!(WRITE_ERRORS).increment(1);
}

/// Record a reconnect attempt.
pub fn inc_reconnects() {
    #[cfg(feature = "metrics")]
    counter!(RECONNECTS).increment(1);
}

/// Publish the number of in-flight files.
#[cfg_attr(not(feature = "metrics"), allow(unused_variables))]
pub fn set_in_flight(count: usize) {
    #[cfg(feature = "metrics")]
    #[expect(clippy::cast_precision_loss, reason = "gauge values are f64")]
    gauge!(IN_FLIGHT_FILES).set(count as f64);
}
