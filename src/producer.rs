//! Transport-side task: read, unmask, enqueue.
//!
//! [`run_producer`] owns the connection. It reads raw chunks, removes the
//! broadcast mask and pushes the clear bytes onto a bounded queue, waiting
//! whenever the queue is full. Read errors, read timeouts and end of stream
//! all lead to a reconnect after an exponential back-off; none of them ends
//! the task. Only shutdown or a dropped consumer stop it.

use std::{io, time::Duration};

use bytes::{Bytes, BytesMut};
use log::{debug, info, warn};
use tokio::{
    io::{AsyncRead, AsyncReadExt},
    select,
    sync::mpsc,
    time::{sleep, timeout},
};
use tokio_util::sync::CancellationToken;

use crate::{
    backoff::BackoffConfig,
    codec::FRAME_LEN,
    mask::normalize_in_place,
    metrics,
    transport::Transport,
};

/// Default time a read may stall before the connection is recycled.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(120);

/// Tuning for [`run_producer`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProducerOptions {
    /// Reconnect timing.
    pub backoff: BackoffConfig,
    /// Longest wait for a single read.
    pub read_timeout: Duration,
    /// Read buffer size in bytes.
    pub chunk_size: usize,
}

impl Default for ProducerOptions {
    fn default() -> Self {
        Self {
            backoff: BackoffConfig::default(),
            read_timeout: DEFAULT_READ_TIMEOUT,
            chunk_size: FRAME_LEN,
        }
    }
}

#[derive(Debug)]
enum StreamEnd {
    Shutdown,
    ConsumerGone,
    Disconnected {
        error: io::Error,
        forwarded: bool,
    },
}

/// Feed unmasked chunks from `transport` into `tx` until shutdown.
///
/// Connection state is not reported to the consumer; a reconnect simply
/// continues the byte stream.
pub async fn run_producer<T: Transport>(
    mut transport: T,
    tx: mpsc::Sender<Bytes>,
    options: ProducerOptions,
    shutdown: CancellationToken,
) {
    let backoff = options.backoff.normalized();
    let mut delay = backoff.initial_delay;
    loop {
        let connected = select! {
            biased;

            () = shutdown.cancelled() => return,
            res = transport.connect() => res,
        };
        match connected {
            Ok(stream) => match pump(stream, &tx, &options, &shutdown).await {
                StreamEnd::Shutdown => return,
                StreamEnd::ConsumerGone => {
                    info!("frame consumer stopped; closing transport");
                    return;
                }
                StreamEnd::Disconnected { error, forwarded } => {
                    // Only a connection that carried data resets the delay.
                    if forwarded {
                        delay = backoff.initial_delay;
                    }
                    warn!("connection lost: error={error}, retry_in={delay:?}");
                }
            },
            Err(e) => warn!("connect failed: error={e}, retry_in={delay:?}"),
        }
        metrics::inc_reconnects();
        select! {
            biased;

            () = shutdown.cancelled() => return,
            () = sleep(delay) => {}
        }
        delay = backoff.next_delay(delay);
    }
}

async fn pump<S: AsyncRead + Unpin>(
    mut stream: S,
    tx: &mpsc::Sender<Bytes>,
    options: &ProducerOptions,
    shutdown: &CancellationToken,
) -> StreamEnd {
    let chunk_size = options.chunk_size.max(1);
    let mut buf = BytesMut::with_capacity(chunk_size);
    let mut forwarded = false;
    loop {
        buf.reserve(chunk_size);
        let read = select! {
            biased;

            () = shutdown.cancelled() => return StreamEnd::Shutdown,
            res = timeout(options.read_timeout, stream.read_buf(&mut buf)) => res,
        };
        match read {
            Err(_) => {
                return StreamEnd::Disconnected {
                    error: io::Error::new(io::ErrorKind::TimedOut, "read timed out"),
                    forwarded,
                };
            }
            Ok(Err(error)) => return StreamEnd::Disconnected { error, forwarded },
            Ok(Ok(0)) => {
                return StreamEnd::Disconnected {
                    error: io::Error::new(io::ErrorKind::UnexpectedEof, "server closed connection"),
                    forwarded,
                };
            }
            Ok(Ok(n)) => debug!("read chunk: len={n}"),
        }

        let mut chunk = buf.split();
        normalize_in_place(&mut chunk);
        select! {
            biased;

            () = shutdown.cancelled() => return StreamEnd::Shutdown,
            sent = tx.send(chunk.freeze()) => {
                if sent.is_err() {
                    return StreamEnd::ConsumerGone;
                }
                forwarded = true;
            }
        }
    }
}
