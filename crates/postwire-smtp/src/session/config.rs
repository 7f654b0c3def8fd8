//! Session configuration types.

use std::time::Duration;

/// Default name announced in EHLO.
pub const DEFAULT_LOCAL_NAME: &str = "localhost";

/// Default bound on establishing the TCP connection.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default bound on each state's wait for a reply or handshake.
pub const DEFAULT_REPLY_TIMEOUT: Duration = Duration::from_secs(60);

/// SMTP session configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Name announced in EHLO.
    pub local_name: String,
    /// Connection timeout.
    pub connect_timeout: Duration,
    /// Deadline for each state, restarted on every transition.
    pub reply_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            local_name: DEFAULT_LOCAL_NAME.to_string(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            reply_timeout: DEFAULT_REPLY_TIMEOUT,
        }
    }
}

impl SessionConfig {
    /// Creates a configuration builder.
    #[must_use]
    pub fn builder() -> SessionConfigBuilder {
        SessionConfigBuilder::default()
    }
}

/// Builder for session configuration.
#[derive(Debug, Clone, Default)]
pub struct SessionConfigBuilder {
    config: SessionConfig,
}

impl SessionConfigBuilder {
    /// Sets the name announced in EHLO.
    #[must_use]
    pub fn local_name(mut self, name: impl Into<String>) -> Self {
        self.config.local_name = name.into();
        self
    }

    /// Sets the connection timeout.
    #[must_use]
    pub const fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    /// Sets the per-state reply timeout.
    #[must_use]
    pub const fn reply_timeout(mut self, timeout: Duration) -> Self {
        self.config.reply_timeout = timeout;
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(self) -> SessionConfig {
        self.config
    }
}
