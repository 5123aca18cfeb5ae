//! `byteblaster` receiver binary.
//!
//! Connects to the broadcast (or replays a capture), writes completed files
//! to the output directory and runs until interrupted.

mod cli;

use std::{error::Error, time::Duration};

use byteblaster::{
    AssemblyConfig,
    AssemblyScope,
    DirectorySink,
    FileAssembler,
    FrameExtractor,
    Pipeline,
    ReceiverConfig,
    run_receiver,
};
use clap::Parser;
use tokio::fs::File;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

fn receiver_config(cli: &cli::Cli) -> ReceiverConfig {
    let mut config = ReceiverConfig {
        output_dir: cli.output_dir.clone(),
        queue_capacity: cli.queue_capacity,
        connect_timeout: Duration::from_secs(cli.connect_timeout_secs),
        read_timeout: Duration::from_secs(cli.read_timeout_secs),
        ..ReceiverConfig::default()
    };
    if !cli.servers.is_empty() {
        config.servers.clone_from(&cli.servers);
    }
    let mut assembly = AssemblyConfig::default();
    if !cli.fillers.is_empty() {
        assembly = assembly.filler_names(cli.fillers.iter().cloned());
    }
    if cli.single_file_assembly {
        assembly = assembly.scope(AssemblyScope::SingleFile);
    }
    config.assembly = assembly;
    config
}

#[cfg(feature = "metrics")]
fn install_exporter(cli: &cli::Cli) -> Result<(), Box<dyn Error>> {
    if let Some(addr) = cli.metrics_addr {
        metrics_exporter_prometheus::PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()?;
        tracing::info!("metrics exporter listening: addr={addr}");
    }
    Ok(())
}

#[cfg(not(feature = "metrics"))]
fn install_exporter(cli: &cli::Cli) -> Result<(), Box<dyn Error>> {
    if cli.metrics_addr.is_some() {
        tracing::warn!("metrics support not compiled in; ignoring --metrics-addr");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = cli::Cli::parse();
    let config = receiver_config(&cli);
    install_exporter(&cli)?;

    if let Some(path) = &cli.replay {
        let mut pipeline = Pipeline::new(
            FrameExtractor::new(config.max_buffer_len),
            FileAssembler::new(config.assembly.clone()),
            DirectorySink::new(&config.output_dir),
        );
        pipeline.replay(File::open(path).await?).await?;
        tracing::info!("replay finished: stats={:?}", pipeline.stats());
        return Ok(());
    }

    let shutdown = CancellationToken::new();
    let signal = shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("failed to listen for ctrl-c: error={e}");
            return;
        }
        tracing::info!("shutdown requested");
        signal.cancel();
    });

    let pipeline = run_receiver(&config, shutdown).await?;
    tracing::info!("receiver stopped: stats={:?}", pipeline.stats());
    Ok(())
}
