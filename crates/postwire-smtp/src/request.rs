//! Send request types.

use std::fmt;

use crate::error::{Error, Result};
use crate::types::Address;

/// Everything needed for one submission: server, credentials, envelope, content.
///
/// Built with [`SendRequest::builder`], which rejects unusable values before
/// any connection is attempted. The session never mutates a request.
#[derive(Clone, PartialEq, Eq)]
pub struct SendRequest {
    host: String,
    port: u16,
    use_tls: bool,
    username: String,
    secret: String,
    from: Address,
    to: Address,
    subject: String,
    body: String,
}

impl SendRequest {
    /// Creates a request builder for the given server.
    #[must_use]
    pub fn builder(host: impl Into<String>, port: u16) -> SendRequestBuilder {
        SendRequestBuilder::new(host, port)
    }

    /// Server hostname.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Server port.
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Whether STARTTLS is negotiated before authenticating.
    #[must_use]
    pub const fn use_tls(&self) -> bool {
        self.use_tls
    }

    /// AUTH LOGIN username.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// AUTH LOGIN secret.
    #[must_use]
    pub fn secret(&self) -> &str {
        &self.secret
    }

    /// Envelope sender.
    #[must_use]
    pub const fn from(&self) -> &Address {
        &self.from
    }

    /// Envelope recipient.
    #[must_use]
    pub const fn to(&self) -> &Address {
        &self.to
    }

    /// Subject line.
    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Plain-text body.
    #[must_use]
    pub fn body(&self) -> &str {
        &self.body
    }
}

impl fmt::Debug for SendRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SendRequest")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("use_tls", &self.use_tls)
            .field("username", &self.username)
            .field("secret", &"<redacted>")
            .field("from", &self.from)
            .field("to", &self.to)
            .field("subject", &self.subject)
            .field("body_len", &self.body.len())
            .finish()
    }
}

/// Builder for [`SendRequest`].
#[derive(Clone, Default)]
pub struct SendRequestBuilder {
    host: String,
    port: u16,
    use_tls: bool,
    username: String,
    secret: String,
    from: Option<String>,
    to: Option<String>,
    subject: String,
    body: String,
}

impl SendRequestBuilder {
    /// Creates a new builder. STARTTLS is on by default.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            use_tls: true,
            ..Self::default()
        }
    }

    /// Enables or disables the STARTTLS upgrade.
    #[must_use]
    pub const fn use_tls(mut self, use_tls: bool) -> Self {
        self.use_tls = use_tls;
        self
    }

    /// Sets the AUTH LOGIN username and secret.
    #[must_use]
    pub fn credentials(mut self, username: impl Into<String>, secret: impl Into<String>) -> Self {
        self.username = username.into();
        self.secret = secret.into();
        self
    }

    /// Sets the envelope sender.
    #[must_use]
    pub fn from(mut self, from: impl Into<String>) -> Self {
        self.from = Some(from.into());
        self
    }

    /// Sets the envelope recipient.
    #[must_use]
    pub fn to(mut self, to: impl Into<String>) -> Self {
        self.to = Some(to.into());
        self
    }

    /// Sets the subject line.
    #[must_use]
    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    /// Sets the body text.
    #[must_use]
    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// Validates the fields and builds the request.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the host, port, username, secret,
    /// sender, or recipient is missing or malformed, or if a value would break
    /// out of its command or header line.
    pub fn build(self) -> Result<SendRequest> {
        if self.host.trim().is_empty() {
            return Err(Error::configuration("host is empty"));
        }
        if self.port == 0 {
            return Err(Error::configuration("port must be non-zero"));
        }
        if self.username.is_empty() {
            return Err(Error::configuration("username is empty"));
        }
        if self.secret.is_empty() {
            return Err(Error::configuration("secret is empty"));
        }
        reject_line_breaks("host", &self.host)?;
        reject_line_breaks("username", &self.username)?;
        reject_line_breaks("secret", &self.secret)?;
        reject_line_breaks("subject", &self.subject)?;

        let from = envelope_address("sender", self.from)?;
        let to = envelope_address("recipient", self.to)?;

        Ok(SendRequest {
            host: self.host,
            port: self.port,
            use_tls: self.use_tls,
            username: self.username,
            secret: self.secret,
            from,
            to,
            subject: self.subject,
            body: self.body,
        })
    }
}

impl fmt::Debug for SendRequestBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SendRequestBuilder")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("use_tls", &self.use_tls)
            .field("username", &self.username)
            .field("from", &self.from)
            .field("to", &self.to)
            .finish_non_exhaustive()
    }
}

fn reject_line_breaks(field: &str, value: &str) -> Result<()> {
    if value.contains(['\r', '\n']) {
        return Err(Error::configuration(format!(
            "{field} must not contain line breaks"
        )));
    }
    Ok(())
}

fn envelope_address(role: &str, value: Option<String>) -> Result<Address> {
    let value = value.ok_or_else(|| Error::configuration(format!("{role} address is missing")))?;
    Address::new(value).map_err(|e| Error::configuration(format!("{role}: {e}")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn base() -> SendRequestBuilder {
        SendRequest::builder("smtp.example.com", 587)
            .credentials("user@example.com", "app-password")
            .from("user@example.com")
            .to("friend@example.org")
            .subject("Hi")
            .body("Hello")
    }

    #[test]
    fn test_build_valid_request() {
        let request = base().build().unwrap();
        assert_eq!(request.host(), "smtp.example.com");
        assert_eq!(request.port(), 587);
        assert!(request.use_tls());
        assert_eq!(request.username(), "user@example.com");
        assert_eq!(request.secret(), "app-password");
        assert_eq!(request.from().as_str(), "user@example.com");
        assert_eq!(request.to().as_str(), "friend@example.org");
        assert_eq!(request.subject(), "Hi");
        assert_eq!(request.body(), "Hello");
    }

    #[test]
    fn test_plaintext_request() {
        let request = base().use_tls(false).build().unwrap();
        assert!(!request.use_tls());
    }

    #[test]
    fn test_missing_secret_rejected() {
        let err = base().credentials("user@example.com", "").build().unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
        assert!(err.to_string().contains("secret is empty"));
    }

    #[test]
    fn test_missing_fields_rejected() {
        assert!(SendRequest::builder("", 587).build().is_err());
        assert!(SendRequest::builder("smtp.example.com", 0).build().is_err());
        assert!(
            SendRequest::builder("smtp.example.com", 587)
                .credentials("u", "s")
                .to("friend@example.org")
                .build()
                .is_err()
        );
    }

    #[test]
    fn test_bad_recipient_rejected() {
        let err = base().to("not-an-address").build().unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
        assert!(err.to_string().contains("recipient"));
    }

    #[test]
    fn test_header_injection_rejected() {
        let err = base().subject("Hi\r\nBcc: evil@example.com").build().unwrap_err();
        assert!(err.to_string().contains("subject"));
    }

    #[test]
    fn test_debug_hides_secret() {
        let rendered = format!("{:?}", base().build().unwrap());
        assert!(!rendered.contains("app-password"));
        assert!(rendered.contains("<redacted>"));
    }
}
