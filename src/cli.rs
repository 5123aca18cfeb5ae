//! Command line interface for the `byteblaster` receiver.
//!
//! Also compiled by `build.rs` to render the manual page, so it may only
//! depend on `clap`.

use std::{net::SocketAddr, path::PathBuf};

use clap::Parser;

/// Command line arguments for the `byteblaster` binary.
#[derive(Debug, Parser)]
#[command(
    name = "byteblaster",
    version,
    about = "Receive EMWIN files from a ByteBlaster broadcast"
)]
pub struct Cli {
    /// Broadcast server as `host:port`. Repeat to rotate between servers.
    #[arg(short, long = "server", value_name = "HOST:PORT")]
    pub servers: Vec<String>,

    /// Directory completed files are written to.
    #[arg(short, long, default_value = "emwin")]
    pub output_dir: PathBuf,

    /// Chunks buffered between the network reader and the decoder.
    #[arg(long, default_value_t = 20)]
    pub queue_capacity: usize,

    /// Seconds a connection attempt may take before the next server is tried.
    #[arg(long, default_value_t = 10)]
    pub connect_timeout_secs: u64,

    /// Seconds a read may stall before reconnecting.
    #[arg(long, default_value_t = 120)]
    pub read_timeout_secs: u64,

    /// Filename treated as filler and never written. Repeatable.
    #[arg(long = "filler", value_name = "NAME")]
    pub fillers: Vec<String>,

    /// Keep only one file in assembly at a time.
    #[arg(long)]
    pub single_file_assembly: bool,

    /// Address for the Prometheus exporter.
    #[arg(long, value_name = "ADDR")]
    pub metrics_addr: Option<SocketAddr>,

    /// Decode a raw masked capture instead of connecting.
    #[arg(long, value_name = "PATH")]
    pub replay: Option<PathBuf>,
}
