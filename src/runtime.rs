//! Wiring of producer and consumer tasks.
//!
//! [`run`] spawns one producer reading from the transport and one consumer
//! driving the [`Pipeline`], joined by a bounded queue. The producer waits
//! when the queue is full and the consumer waits when it is empty. Both stop
//! when `shutdown` is cancelled.

use log::info;
use tokio::sync::mpsc;
use tokio_util::{sync::CancellationToken, task::TaskTracker};

use crate::{
    assembler::FileAssembler,
    codec::FrameExtractor,
    config::ReceiverConfig,
    error::Result,
    pipeline::{Pipeline, run_consumer},
    producer::run_producer,
    sink::{DirectorySink, FileSink},
    transport::{TcpTransport, Transport},
};

/// Run a receiver until `shutdown` is cancelled.
///
/// Returns the consumer's pipeline so callers can inspect final statistics
/// and reassembly state.
///
/// # Errors
///
/// Returns [`ByteBlasterError::Task`](crate::ByteBlasterError::Task) if either
/// task panics.
pub async fn run<T, S>(
    config: &ReceiverConfig,
    transport: T,
    sink: S,
    shutdown: CancellationToken,
) -> Result<Pipeline<S>>
where
    T: Transport + 'static,
    T::Stream: 'static,
    S: FileSink + 'static,
{
    let (tx, rx) = mpsc::channel(config.channel_capacity());
    let pipeline = Pipeline::new(
        FrameExtractor::new(config.max_buffer_len),
        FileAssembler::new(config.assembly.clone()),
        sink,
    );

    let tracker = TaskTracker::new();
    let producer = tracker.spawn(run_producer(
        transport,
        tx,
        config.producer_options(),
        shutdown.clone(),
    ));
    let consumer = tracker.spawn(run_consumer(rx, pipeline, shutdown.clone()));
    tracker.close();

    let pipeline = consumer.await;
    // The consumer only stops on shutdown or a closed queue; make sure the
    // producer follows in either case.
    shutdown.cancel();
    producer.await?;
    tracker.wait().await;
    Ok(pipeline?)
}

/// Run a TCP receiver writing completed files to the configured directory.
///
/// # Errors
///
/// See [`run`].
pub async fn run_receiver(
    config: &ReceiverConfig,
    shutdown: CancellationToken,
) -> Result<Pipeline<DirectorySink>> {
    info!(
        "starting receiver: servers={:?}, output_dir={}",
        config.servers,
        config.output_dir.display()
    );
    run(
        config,
        TcpTransport::new(config.servers.iter().cloned())
            .with_connect_timeout(config.connect_timeout),
        DirectorySink::new(&config.output_dir),
        shutdown,
    )
    .await
}
