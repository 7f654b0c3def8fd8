//! Connection management: the byte transport under the SMTP dialog.
//!
//! A [`Transport`] is a connected duplex stream that can be upgraded to TLS
//! without reconnecting. A [`Connector`] opens one. The session only talks to
//! these traits, so tests can substitute a scripted server.

mod stream;

use std::future::Future;
use std::sync::Arc;

use bytes::BytesMut;
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;

pub use stream::{SmtpStream, StreamTransport, create_tls_connector};

use crate::error::Result;

/// A connected byte stream that supports an in-place STARTTLS upgrade.
pub trait Transport: Send {
    /// Writes and flushes `data`.
    fn write_all(&mut self, data: &[u8]) -> impl Future<Output = Result<()>> + Send;

    /// Appends received bytes to `buf`; `Ok(0)` means the peer closed.
    fn read_chunk(&mut self, buf: &mut BytesMut) -> impl Future<Output = Result<usize>> + Send;

    /// Runs a TLS client handshake over the already-open connection.
    fn upgrade_to_tls(&mut self, server_name: &str) -> impl Future<Output = Result<()>> + Send;

    /// Closes the write side.
    fn shutdown(&mut self) -> impl Future<Output = Result<()>> + Send;

    /// Returns true once the connection is encrypted.
    fn is_tls(&self) -> bool;
}

/// Opens plaintext connections.
pub trait Connector: Send + Sync + 'static {
    /// Transport produced by this connector.
    type Transport: Transport + 'static;

    /// Connects to `host:port` in plaintext.
    fn connect(
        &self,
        host: &str,
        port: u16,
    ) -> impl Future<Output = Result<Self::Transport>> + Send;
}

/// Production connector: TCP plus rustls for the upgrade.
#[derive(Clone)]
pub struct TcpConnector {
    tls: TlsConnector,
}

impl TcpConnector {
    /// Creates a connector that trusts the webpki root certificates.
    #[must_use]
    pub fn new() -> Self {
        Self {
            tls: create_tls_connector(),
        }
    }

    /// Creates a connector with a caller-supplied TLS configuration.
    #[must_use]
    pub fn with_tls_config(config: Arc<rustls::ClientConfig>) -> Self {
        Self {
            tls: TlsConnector::from(config),
        }
    }
}

impl Default for TcpConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TcpConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TcpConnector").finish_non_exhaustive()
    }
}

impl Connector for TcpConnector {
    type Transport = StreamTransport<TcpStream>;

    async fn connect(&self, host: &str, port: u16) -> Result<Self::Transport> {
        let stream = TcpStream::connect((host, port)).await?;
        stream.set_nodelay(true)?;
        Ok(StreamTransport::new(stream, self.tls.clone()))
    }
}
