//! Connections to the broadcast service.
//!
//! A [`Transport`] yields a fresh byte stream each time it is asked to
//! connect. The producer calls it again after every read failure, so an
//! implementation only needs to dial; retry timing lives in the producer.

use std::{io, time::Duration};

use async_trait::async_trait;
use log::info;
use tokio::{io::AsyncRead, net::TcpStream, time::timeout};

/// Default public broadcast endpoint.
pub const DEFAULT_SERVER: &str = "2.pool.iemwin.net:2211";

/// Default limit on a single connection attempt.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Source of raw masked byte streams.
#[async_trait]
pub trait Transport: Send {
    /// Stream type produced by a successful connection.
    type Stream: AsyncRead + Unpin + Send;

    /// Open a new connection.
    async fn connect(&mut self) -> io::Result<Self::Stream>;
}

/// TCP transport rotating through a list of servers.
///
/// Each call to [`Transport::connect`] dials the next address in turn, so a
/// failing server is skipped on the following attempt. An attempt that does
/// not complete within the connect timeout fails with
/// [`io::ErrorKind::TimedOut`].
#[derive(Clone, Debug)]
pub struct TcpTransport {
    servers: Vec<String>,
    next: usize,
    connect_timeout: Duration,
}

impl TcpTransport {
    /// Create a transport for `servers`, given as `host:port`.
    ///
    /// An empty list falls back to [`DEFAULT_SERVER`].
    #[must_use]
    pub fn new<I, S>(servers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut servers: Vec<String> = servers.into_iter().map(Into::into).collect();
        if servers.is_empty() {
            servers.push(DEFAULT_SERVER.to_owned());
        }
        Self {
            servers,
            next: 0,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    /// Configured server addresses.
    #[must_use]
    pub fn servers(&self) -> &[String] { &self.servers }

    /// Limit each connection attempt to `limit`, at least one millisecond.
    #[must_use]
    pub fn with_connect_timeout(mut self, limit: Duration) -> Self {
        self.connect_timeout = limit.max(Duration::from_millis(1));
        self
    }

    /// Limit applied to each connection attempt.
    #[must_use]
    pub fn connect_timeout(&self) -> Duration { self.connect_timeout }

    fn advance(&mut self) -> &str {
        let index = self.next % self.servers.len();
        self.next = index + 1;
        &self.servers[index]
    }
}

impl Default for TcpTransport {
    fn default() -> Self { Self::new([DEFAULT_SERVER]) }
}

#[async_trait]
impl Transport for TcpTransport {
    type Stream = TcpStream;

    async fn connect(&mut self) -> io::Result<Self::Stream> {
        let server = self.advance().to_owned();
        info!("connecting to broadcast server: addr={server}");
        let stream = timeout(self.connect_timeout, TcpStream::connect(server.as_str()))
            .await
            .map_err(|_| {
                io::Error::new(
                    io::ErrorKind::TimedOut,
                    format!("connect to {server} timed out"),
                )
            })??;
        stream.set_nodelay(true)?;
        Ok(stream)
    }
}

#[cfg(test)]
mod tests {
    use tokio::{io::AsyncWriteExt, net::TcpListener};

    use super::*;

    #[test]
    fn empty_server_list_uses_default() {
        let transport = TcpTransport::new(Vec::<String>::new());
        assert_eq!(transport.servers(), [DEFAULT_SERVER.to_owned()]);
    }

    #[test]
    fn rotates_through_servers() {
        let mut transport = TcpTransport::new(["a:1", "b:2"]);
        let order: Vec<_> = (0..3).map(|_| transport.advance().to_owned()).collect();
        assert_eq!(order, ["a:1", "b:2", "a:1"]);
    }

    #[tokio::test]
    async fn connects_to_listener() {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind listener");
        let addr = listener.local_addr().expect("local addr");
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.expect("accept");
            socket.write_all(b"hi").await.expect("write");
        });

        let mut transport = TcpTransport::new([addr.to_string()]);
        let mut stream = transport.connect().await.expect("connect");
        let mut buf = Vec::new();
        tokio::io::AsyncReadExt::read_to_end(&mut stream, &mut buf)
            .await
            .expect("read");
        assert_eq!(buf, b"hi");
        server.await.expect("server task");
    }

    #[tokio::test(start_paused = true)]
    async fn unresponsive_server_gives_up_at_connect_timeout() {
        // Non-routable address: the handshake is never answered.
        let limit = Duration::from_millis(200);
        let mut transport = TcpTransport::new(["10.255.255.1:2211"]).with_connect_timeout(limit);
        let started = tokio::time::Instant::now();

        let err = transport.connect().await.expect_err("blackholed server");

        assert!(started.elapsed() <= limit);
        assert!(
            matches!(
                err.kind(),
                io::ErrorKind::TimedOut
                    | io::ErrorKind::NetworkUnreachable
                    | io::ErrorKind::HostUnreachable
            ),
            "unexpected error: {err:?}"
        );
    }

    #[test]
    fn connect_timeout_is_clamped() {
        let transport = TcpTransport::default().with_connect_timeout(Duration::ZERO);
        assert_eq!(transport.connect_timeout(), Duration::from_millis(1));
        assert_eq!(TcpTransport::default().connect_timeout(), DEFAULT_CONNECT_TIMEOUT);
    }
}
