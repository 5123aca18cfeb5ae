//! Receiver configuration.
//!
//! [`ReceiverConfig`] gathers the knobs of a running receiver: which servers
//! to dial, how the queue between producer and consumer is sized, how
//! reassembly treats filler and concurrent files, and where completed files
//! land. Derived settings are clamped so a misconfiguration cannot stall the
//! pipeline.

use std::{path::PathBuf, time::Duration};

use crate::{
    assembler::AssemblyConfig,
    backoff::BackoffConfig,
    codec::{DEFAULT_MAX_BUFFER_LEN, FRAME_LEN},
    producer::{DEFAULT_READ_TIMEOUT, ProducerOptions},
    transport::{DEFAULT_CONNECT_TIMEOUT, DEFAULT_SERVER},
};

/// Default number of chunks buffered between producer and consumer.
pub const DEFAULT_QUEUE_CAPACITY: usize = 20;

/// Default directory for completed files.
pub const DEFAULT_OUTPUT_DIR: &str = "emwin";

/// Settings for a receiver instance.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use byteblaster::ReceiverConfig;
///
/// let config = ReceiverConfig {
///     servers: vec!["emwin.example.net:1000".into()],
///     queue_capacity: 0,
///     read_timeout: Duration::from_secs(30),
///     ..ReceiverConfig::default()
/// };
/// assert_eq!(config.channel_capacity(), 1);
/// assert_eq!(config.producer_options().read_timeout, Duration::from_secs(30));
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReceiverConfig {
    /// Servers dialled in turn, as `host:port`.
    pub servers: Vec<String>,
    /// Directory completed files are written to.
    pub output_dir: PathBuf,
    /// Chunks the producer may queue ahead of the consumer.
    pub queue_capacity: usize,
    /// Longest a connection attempt may take.
    pub connect_timeout: Duration,
    /// Longest a read may stall before reconnecting.
    pub read_timeout: Duration,
    /// Size of each transport read.
    pub chunk_size: usize,
    /// Bound on an unterminated frame in the accumulation buffer.
    pub max_buffer_len: usize,
    /// Reconnect back-off timing.
    pub backoff: BackoffConfig,
    /// Reassembly behaviour.
    pub assembly: AssemblyConfig,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            servers: vec![DEFAULT_SERVER.to_owned()],
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            read_timeout: DEFAULT_READ_TIMEOUT,
            chunk_size: FRAME_LEN,
            max_buffer_len: DEFAULT_MAX_BUFFER_LEN,
            backoff: BackoffConfig::default(),
            assembly: AssemblyConfig::default(),
        }
    }
}

impl ReceiverConfig {
    /// Capacity of the chunk queue, at least one.
    #[must_use]
    pub fn channel_capacity(&self) -> usize { self.queue_capacity.max(1) }

    /// Producer settings derived from this configuration.
    #[must_use]
    pub fn producer_options(&self) -> ProducerOptions {
        ProducerOptions {
            backoff: self.backoff.normalized(),
            read_timeout: self.read_timeout.max(Duration::from_millis(1)),
            chunk_size: self.chunk_size.max(1),
        }
    }
}
