//! # postwire-smtp
//!
//! An event-driven SMTP submission client: one message, one recipient, one
//! connection.
//!
//! ## Features
//!
//! - **Sans-I/O dialog**: the whole conversation is a pure state machine in
//!   [`protocol`], driven by connection events
//! - **STARTTLS**: the plaintext connection is upgraded in place
//! - **AUTH LOGIN**: base64 username and secret, secret never transcribed
//! - **Transcript**: every line sent and received is published in order,
//!   followed by exactly one [`CompletionResult`]
//!
//! ## Quick Start
//!
//! ```ignore
//! use postwire_smtp::{SendRequest, SessionConfig, SessionEvent, SmtpSession};
//!
//! #[tokio::main]
//! async fn main() -> postwire_smtp::Result<()> {
//!     let (session, mut events) = SmtpSession::new(SessionConfig::default());
//!
//!     let request = SendRequest::builder("smtp.example.com", 587)
//!         .credentials("robot@example.com", "app-password")
//!         .from("robot@example.com")
//!         .to("owner@example.org")
//!         .subject("Report")
//!         .body("All good.")
//!         .build()?;
//!     session.send(request)?;
//!
//!     while let Some(event) = events.recv().await {
//!         match event {
//!             SessionEvent::Transcript(line) => println!("{line}"),
//!             SessionEvent::Completed(result) => {
//!                 println!("SMTP finished: {result}");
//!                 break;
//!             }
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Dialog
//!
//! ```text
//! WaitBanner ─220→ Ehlo1 ─250→ StartTls ─220→ WaitTls ─TLS→ Ehlo2 ─250→ AuthLogin
//!                    └──────── 250, TLS off ─────────────────────────────→ AuthLogin
//! AuthLogin ─334→ AuthUser ─334→ AuthPass ─235→ MailFrom ─250→ RcptTo ─250→ Data
//! Data ─354→ SendBody ─250→ Quit ─written→ Done
//! ```
//!
//! ## Modules
//!
//! - [`command`]: SMTP command lines
//! - [`connection`]: Transport and in-place TLS upgrade
//! - [`framer`]: CRLF line framing of received bytes
//! - [`message`]: RFC 5322 message rendering with dot-stuffing
//! - [`parser`]: Reply line recognition
//! - [`protocol`]: The session state machine
//! - [`request`]: Validated send requests
//! - [`session`]: Async driver and public session API
//! - [`types`]: Addresses and reply codes

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod command;
pub mod connection;
mod error;
pub mod framer;
pub mod message;
pub mod parser;
pub mod protocol;
pub mod request;
pub mod session;
pub mod types;

pub use connection::{Connector, TcpConnector, Transport};
pub use error::{Error, Result};
pub use framer::LineFramer;
pub use protocol::{CompletionResult, Direction, SessionState, TranscriptEvent};
pub use request::{SendRequest, SendRequestBuilder};
pub use session::{SessionConfig, SessionEvent, SmtpSession};
pub use types::{Address, ReplyCode};
