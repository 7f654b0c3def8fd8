//! `postwire` - send one email over SMTP and print the dialog.
//!
//! Reads server and account settings from a JSON file, the body from a file
//! or standard input, and streams the SMTP transcript to stdout. Logs go to
//! stderr.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod cli;
mod config;

use std::path::Path;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tokio::io::AsyncReadExt;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use postwire_smtp::{SendRequest, SessionEvent, SmtpSession};

use cli::Cli;
use config::{Config, SECRET_ENV};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("postwire={0},postwire_smtp={0}", cli.log_level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);
    let config = Config::load(&config_path).await?;
    let secret = config
        .resolve_secret(std::env::var(SECRET_ENV).ok())
        .await?;
    let body = read_body(cli.body_file.as_deref()).await?;

    let request = SendRequest::builder(&config.host, config.port)
        .use_tls(config.use_tls)
        .credentials(&config.username, secret)
        .from(config.sender())
        .to(&cli.to)
        .subject(&cli.subject)
        .body(body)
        .build()
        .context("invalid send request")?;

    let (session, mut events) = SmtpSession::new(config.session_config());
    session.send(request)?;

    while let Some(event) = events.recv().await {
        match event {
            SessionEvent::Transcript(line) => println!("{line}"),
            SessionEvent::Completed(result) => {
                println!("SMTP finished: {result}");
                return Ok(if result.ok {
                    ExitCode::SUCCESS
                } else {
                    ExitCode::FAILURE
                });
            }
        }
    }

    anyhow::bail!("SMTP session ended without a result")
}

/// Reads the message body from `path`, or standard input when absent.
async fn read_body(path: Option<&Path>) -> anyhow::Result<String> {
    match path {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read body {}", path.display())),
        None => {
            let mut body = String::new();
            tokio::io::stdin()
                .read_to_string(&mut body)
                .await
                .context("failed to read body from stdin")?;
            Ok(body)
        }
    }
}
