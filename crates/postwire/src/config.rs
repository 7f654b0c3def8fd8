//! Configuration file and secret loading.
//!
//! The configuration is a JSON object; only `host` and `username` are
//! required. The secret never lives in the configuration itself: it comes
//! from the `POSTWIRE_SECRET` environment variable or, failing that, from the
//! first line of `secret_file`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, bail};
use serde::Deserialize;

use postwire_smtp::SessionConfig;

/// Environment variable that overrides `secret_file`.
pub const SECRET_ENV: &str = "POSTWIRE_SECRET";

const fn default_port() -> u16 {
    587
}

const fn default_use_tls() -> bool {
    true
}

/// Server, account and session settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_use_tls")]
    pub use_tls: bool,
    pub username: String,
    /// Envelope sender; the username when absent.
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub secret_file: Option<PathBuf>,
    #[serde(default)]
    pub local_name: Option<String>,
    #[serde(default)]
    pub connect_timeout_secs: Option<u64>,
    #[serde(default)]
    pub reply_timeout_secs: Option<u64>,
}

impl Config {
    /// Default location: `<config dir>/postwire/config.json`.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("postwire")
            .join("config.json")
    }

    /// Reads and parses the configuration file.
    pub async fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config: Self = serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse config {}", path.display()))?;

        tracing::debug!(path = %path.display(), host = %config.host, "Loaded configuration");
        Ok(config)
    }

    pub fn sender(&self) -> &str {
        self.from.as_deref().unwrap_or(&self.username)
    }

    /// Session settings, with library defaults for anything unset.
    pub fn session_config(&self) -> SessionConfig {
        let mut builder = SessionConfig::builder();
        if let Some(name) = &self.local_name {
            builder = builder.local_name(name.clone());
        }
        if let Some(secs) = self.connect_timeout_secs {
            builder = builder.connect_timeout(Duration::from_secs(secs));
        }
        if let Some(secs) = self.reply_timeout_secs {
            builder = builder.reply_timeout(Duration::from_secs(secs));
        }
        builder.build()
    }

    /// Resolves the secret: `from_env` wins, then `secret_file`.
    pub async fn resolve_secret(&self, from_env: Option<String>) -> anyhow::Result<String> {
        if let Some(secret) = from_env.filter(|s| !s.is_empty()) {
            return Ok(secret);
        }
        match &self.secret_file {
            Some(path) => read_secret_file(path).await,
            None => bail!("no secret: set {SECRET_ENV} or secret_file in the configuration"),
        }
    }
}

/// Returns the first line of `path`, trimmed.
pub async fn read_secret_file(path: &Path) -> anyhow::Result<String> {
    let contents = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read secret file {}", path.display()))?;
    let secret = contents.lines().next().unwrap_or_default().trim();
    if secret.is_empty() {
        bail!("secret file {} is empty", path.display());
    }
    Ok(secret.to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Config {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_minimal_config_defaults() {
        let config = parse(r#"{"host": "smtp.example.com", "username": "robot@example.com"}"#);
        assert_eq!(config.port, 587);
        assert!(config.use_tls);
        assert_eq!(config.sender(), "robot@example.com");
        assert_eq!(config.session_config(), SessionConfig::default());
    }

    #[test]
    fn test_full_config() {
        let config = parse(
            r#"{
                "host": "smtp.example.com",
                "port": 2525,
                "use_tls": false,
                "username": "robot",
                "from": "robot@example.com",
                "secret_file": "/run/secrets/smtp",
                "local_name": "relay.example.com",
                "connect_timeout_secs": 5,
                "reply_timeout_secs": 20
            }"#,
        );
        assert_eq!(config.port, 2525);
        assert!(!config.use_tls);
        assert_eq!(config.sender(), "robot@example.com");

        let session = config.session_config();
        assert_eq!(session.local_name, "relay.example.com");
        assert_eq!(session.connect_timeout, Duration::from_secs(5));
        assert_eq!(session.reply_timeout, Duration::from_secs(20));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let result: Result<Config, _> = serde_json::from_str(
            r#"{"host": "smtp.example.com", "username": "u", "password": "x"}"#,
        );
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"host": "smtp.example.com", "username": "u@example.com"}"#)
            .unwrap();

        let config = Config::load(&path).await.unwrap();
        assert_eq!(config.host, "smtp.example.com");
    }

    #[tokio::test]
    async fn test_load_missing_file_names_path() {
        let err = Config::load(Path::new("/nonexistent/postwire.json"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("/nonexistent/postwire.json"));
    }

    #[tokio::test]
    async fn test_secret_file_first_line_trimmed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("secret.txt");
        std::fs::write(&path, "  app pass word  \nsecond line\n").unwrap();

        assert_eq!(read_secret_file(&path).await.unwrap(), "app pass word");
    }

    #[tokio::test]
    async fn test_empty_secret_file_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("secret.txt");
        std::fs::write(&path, "\n").unwrap();

        assert!(read_secret_file(&path).await.is_err());
    }

    #[tokio::test]
    async fn test_env_secret_overrides_file() {
        let config = parse(
            r#"{"host": "h", "username": "u", "secret_file": "/nonexistent/secret"}"#,
        );
        let secret = config
            .resolve_secret(Some("from-env".to_string()))
            .await
            .unwrap();
        assert_eq!(secret, "from-env");
    }

    #[tokio::test]
    async fn test_missing_secret_source() {
        let config = parse(r#"{"host": "h", "username": "u"}"#);
        let err = config.resolve_secret(None).await.unwrap_err();
        assert!(err.to_string().contains(SECRET_ENV));
    }
}
