//! Low-level SMTP stream handling.

use std::io;
use std::sync::Arc;

use bytes::BytesMut;
use rustls::pki_types::ServerName;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tokio_rustls::client::TlsStream;
use tokio_rustls::rustls::{ClientConfig, RootCertStore};

use super::Transport;
use crate::error::{Error, Result};

/// SMTP stream that starts in plaintext and can be upgraded in place.
///
/// The upgrade wraps the very same underlying connection, so after STARTTLS
/// the TLS session runs over the socket the dialog started on.
#[derive(Debug)]
pub enum SmtpStream<S = TcpStream> {
    /// Plaintext connection.
    Plain(S),
    /// TLS-encrypted connection (boxed to reduce enum size).
    Tls(Box<TlsStream<S>>),
    /// Connection lost mid-upgrade or shut down.
    Closed,
}

impl<S> SmtpStream<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Returns true if the stream is TLS-encrypted.
    #[must_use]
    pub const fn is_tls(&self) -> bool {
        matches!(self, Self::Tls(_))
    }

    /// Reads whatever is available into `buf`, returning the byte count.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails or the stream is closed.
    pub async fn read_chunk(&mut self, buf: &mut BytesMut) -> Result<usize> {
        let n = match self {
            Self::Plain(stream) => stream.read_buf(buf).await?,
            Self::Tls(stream) => stream.read_buf(buf).await?,
            Self::Closed => return Err(Error::InvalidState("stream is closed".into())),
        };
        Ok(n)
    }

    /// Writes data to the stream.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails or the stream is closed.
    pub async fn write_all(&mut self, data: &[u8]) -> Result<()> {
        match self {
            Self::Plain(stream) => {
                stream.write_all(data).await?;
                stream.flush().await?;
            }
            Self::Tls(stream) => {
                stream.write_all(data).await?;
                stream.flush().await?;
            }
            Self::Closed => return Err(Error::InvalidState("stream is closed".into())),
        }
        Ok(())
    }

    /// Upgrades the plaintext connection to TLS using `connector`.
    ///
    /// # Errors
    ///
    /// Returns an error if the stream is not plaintext, the hostname is not a
    /// valid server name, or the TLS handshake fails. A failed handshake
    /// leaves the stream closed.
    pub async fn upgrade_with(&mut self, connector: &TlsConnector, hostname: &str) -> Result<()> {
        let server_name = ServerName::try_from(hostname.to_string())
            .map_err(|_| Error::InvalidServerName(hostname.to_string()))?;

        let plain = match std::mem::replace(self, Self::Closed) {
            Self::Plain(stream) => stream,
            other => {
                *self = other;
                return Err(Error::InvalidState("stream is not plaintext".into()));
            }
        };

        let tls = connector
            .connect(server_name, plain)
            .await
            .map_err(handshake_error)?;
        *self = Self::Tls(Box::new(tls));
        Ok(())
    }

    /// Shuts down the write side of the stream.
    ///
    /// # Errors
    ///
    /// Returns an error if the shutdown fails.
    pub async fn shutdown(&mut self) -> Result<()> {
        match self {
            Self::Plain(stream) => stream.shutdown().await?,
            Self::Tls(stream) => stream.shutdown().await?,
            Self::Closed => {}
        }
        Ok(())
    }
}

/// Transport over an [`SmtpStream`], carrying its own TLS connector.
pub struct StreamTransport<S = TcpStream> {
    stream: SmtpStream<S>,
    tls: TlsConnector,
}

impl<S> StreamTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wraps a connected plaintext stream.
    #[must_use]
    pub const fn new(stream: S, tls: TlsConnector) -> Self {
        Self {
            stream: SmtpStream::Plain(stream),
            tls,
        }
    }

    /// Returns the underlying stream.
    #[must_use]
    pub const fn stream(&self) -> &SmtpStream<S> {
        &self.stream
    }
}

impl<S> std::fmt::Debug for StreamTransport<S>
where
    S: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamTransport")
            .field("stream", &self.stream)
            .finish_non_exhaustive()
    }
}

impl<S> Transport for StreamTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn write_all(&mut self, data: &[u8]) -> Result<()> {
        self.stream.write_all(data).await
    }

    async fn read_chunk(&mut self, buf: &mut BytesMut) -> Result<usize> {
        self.stream.read_chunk(buf).await
    }

    async fn upgrade_to_tls(&mut self, server_name: &str) -> Result<()> {
        self.stream.upgrade_with(&self.tls, server_name).await
    }

    async fn shutdown(&mut self) -> Result<()> {
        self.stream.shutdown().await
    }

    fn is_tls(&self) -> bool {
        self.stream.is_tls()
    }
}

/// Surfaces the rustls error wrapped inside a failed handshake.
fn handshake_error(err: io::Error) -> Error {
    match err.get_ref().and_then(|inner| inner.downcast_ref::<rustls::Error>()) {
        Some(tls) => Error::Tls(tls.clone()),
        None => Error::Io(err),
    }
}

/// Creates a TLS connector with the webpki root certificates.
#[must_use]
pub fn create_tls_connector() -> TlsConnector {
    let root_store = RootCertStore {
        roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
    };

    let config = ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth();

    TlsConnector::from(Arc::new(config))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tokio_test::io::Builder;

    #[tokio::test]
    async fn test_plain_read_chunk() {
        let mock = Builder::new().read(b"220 smtp.example.com ESMTP\r\n").build();
        let mut stream = SmtpStream::Plain(mock);

        let mut buf = BytesMut::new();
        let n = stream.read_chunk(&mut buf).await.unwrap();
        assert_eq!(n, 28);
        assert_eq!(&buf[..], b"220 smtp.example.com ESMTP\r\n");
    }

    #[tokio::test]
    async fn test_plain_write_all() {
        let mock = Builder::new().write(b"EHLO localhost\r\n").build();
        let mut stream = SmtpStream::Plain(mock);

        stream.write_all(b"EHLO localhost\r\n").await.unwrap();
        assert!(!stream.is_tls());
    }

    #[tokio::test]
    async fn test_closed_stream_rejects_io() {
        let mut stream: SmtpStream<tokio_test::io::Mock> = SmtpStream::Closed;
        let mut buf = BytesMut::new();
        assert!(stream.read_chunk(&mut buf).await.is_err());
        assert!(stream.write_all(b"QUIT\r\n").await.is_err());
        assert!(stream.shutdown().await.is_ok());
    }

    #[tokio::test]
    async fn test_upgrade_rejects_invalid_server_name() {
        let mock = Builder::new().build();
        let mut stream = SmtpStream::Plain(mock);

        let err = stream
            .upgrade_with(&create_tls_connector(), "not a host name")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidServerName(_)));
        assert!(!stream.is_tls());
        assert!(matches!(stream, SmtpStream::Plain(_)));
    }

    #[test]
    fn test_handshake_error_keeps_tls_cause() {
        let err = io::Error::new(
            io::ErrorKind::InvalidData,
            rustls::Error::InvalidCertificate(rustls::CertificateError::UnknownIssuer),
        );
        let err = handshake_error(err);
        assert!(matches!(err, Error::Tls(_)));
        assert!(err.to_string().starts_with("TLS error: "));

        let err = handshake_error(io::Error::new(io::ErrorKind::ConnectionReset, "reset"));
        assert!(matches!(err, Error::Io(_)));
    }

    #[tokio::test]
    async fn test_upgrade_twice_is_rejected() {
        let mut stream: SmtpStream<tokio_test::io::Mock> = SmtpStream::Closed;
        let err = stream
            .upgrade_with(&create_tls_connector(), "smtp.example.com")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidState(_)));
    }
}
