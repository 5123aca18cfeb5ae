//! Local stand-in for a broadcast server.
//!
//! Each accepted connection receives the next scripted session verbatim and is
//! then closed. Once the script runs out, further connections are accepted and
//! left idle so a receiver neither reconnects nor sees data.

use std::{
    collections::VecDeque,
    io,
    net::{Ipv4Addr, SocketAddr},
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use tokio::{
    io::AsyncWriteExt,
    net::{TcpListener, TcpStream},
    task::JoinHandle,
};

/// Handle to a running local broadcast server.
///
/// The accept loop is aborted when the handle is dropped.
#[derive(Debug)]
pub struct BroadcastServer {
    addr: SocketAddr,
    connections: Arc<AtomicUsize>,
    task: JoinHandle<()>,
}

impl BroadcastServer {
    /// Bind an ephemeral localhost port and start serving `sessions`.
    ///
    /// Session bytes are sent as given, so callers apply the broadcast mask
    /// themselves.
    ///
    /// # Errors
    ///
    /// Returns any error raised while binding the listener.
    pub async fn start(sessions: impl IntoIterator<Item = Vec<u8>>) -> io::Result<Self> {
        let listener = TcpListener::bind(SocketAddr::from((Ipv4Addr::LOCALHOST, 0))).await?;
        let addr = listener.local_addr()?;
        let connections = Arc::new(AtomicUsize::new(0));
        let task = tokio::spawn(serve(
            listener,
            sessions.into_iter().collect(),
            Arc::clone(&connections),
        ));
        Ok(Self {
            addr,
            connections,
            task,
        })
    }

    /// Address receivers should dial.
    #[must_use]
    pub fn addr(&self) -> SocketAddr { self.addr }

    /// Address formatted as `host:port`.
    #[must_use]
    pub fn server_string(&self) -> String { self.addr.to_string() }

    /// Number of connections accepted so far.
    #[must_use]
    pub fn connections(&self) -> usize { self.connections.load(Ordering::SeqCst) }
}

impl Drop for BroadcastServer {
    fn drop(&mut self) { self.task.abort(); }
}

async fn serve(
    listener: TcpListener,
    mut sessions: VecDeque<Vec<u8>>,
    connections: Arc<AtomicUsize>,
) {
    let mut idle: Vec<TcpStream> = Vec::new();
    while let Ok((mut stream, _)) = listener.accept().await {
        connections.fetch_add(1, Ordering::SeqCst);
        match sessions.pop_front() {
            Some(bytes) => {
                // A failed write only means the receiver went away early.
                let _ = stream.write_all(&bytes).await;
                let _ = stream.shutdown().await;
            }
            None => idle.push(stream),
        }
    }
}
