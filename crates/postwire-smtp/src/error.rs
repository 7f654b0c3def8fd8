//! Error types for SMTP operations.

use std::io;

/// Result type alias for SMTP operations.
pub type Result<T> = std::result::Result<T, Error>;

/// SMTP error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// TLS error.
    #[error("TLS error: {0}")]
    Tls(#[from] rustls::Error),

    /// The host name cannot be used for TLS server verification.
    #[error("Invalid server name: {0}")]
    InvalidServerName(String),

    /// Protocol error (malformed or oversized input).
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// A send request is missing or carries unusable fields.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A send is already in flight on this session.
    #[error("A send is already in progress")]
    Busy,

    /// Invalid state for operation.
    #[error("Invalid state for operation: {0}")]
    InvalidState(String),
}

impl Error {
    /// Creates a configuration error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Returns true if the error comes from the network or the TLS layer.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Io(_) | Self::Tls(_) | Self::InvalidServerName(_))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_classification() {
        let io = Error::from(io::Error::new(io::ErrorKind::ConnectionRefused, "refused"));
        assert!(io.is_transport());
        assert!(Error::InvalidServerName("bad host".into()).is_transport());
        assert!(!Error::Busy.is_transport());
        assert!(!Error::configuration("no secret").is_transport());
    }

    #[test]
    fn test_display() {
        assert_eq!(
            Error::configuration("secret is empty").to_string(),
            "Configuration error: secret is empty"
        );
        assert_eq!(Error::Busy.to_string(), "A send is already in progress");
    }
}
