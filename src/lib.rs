#![doc(html_root_url = "https://docs.rs/byteblaster/latest")]
//! Public API for the `byteblaster` library.
//!
//! This crate receives the EMWIN ByteBlaster broadcast: it connects to a
//! broadcast server, unmasks the byte stream, slices it into sentinel-delimited
//! frames, validates each frame's checksum, and reassembles multi-part files
//! before handing them to a [`FileSink`].
//!
//! ```no_run
//! use byteblaster::{ReceiverConfig, run_receiver};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> byteblaster::Result<()> {
//! let shutdown = CancellationToken::new();
//! let pipeline = run_receiver(&ReceiverConfig::default(), shutdown).await?;
//! println!("{:?}", pipeline.stats());
//! # Ok(())
//! # }
//! ```

pub mod assembler;
pub mod backoff;
pub mod codec;
pub mod config;
pub mod error;
pub mod frame;
pub mod mask;
pub mod metrics;
pub mod pipeline;
pub mod producer;
pub mod runtime;
pub mod sink;
pub mod test_helpers;
pub mod transport;

pub use assembler::{
    AcceptOutcome,
    AssemblyConfig,
    AssemblyScope,
    CompletedFile,
    DEFAULT_FILLER,
    FileAssembler,
};
pub use backoff::BackoffConfig;
pub use codec::{FRAME_LEN, FrameExtractor, SENTINEL, SentinelDecoder};
pub use config::ReceiverConfig;
pub use error::{ByteBlasterError, Result};
pub use frame::{Frame, FrameError, FrameHeader, checksum};
pub use mask::{MASK, MaskedReader, normalize};
pub use pipeline::{Pipeline, PipelineStats, run_consumer};
pub use producer::{ProducerOptions, run_producer};
pub use runtime::{run, run_receiver};
pub use sink::{DirectorySink, FileSink};
pub use transport::{DEFAULT_SERVER, TcpTransport, Transport};
