//! Event-driven SMTP session.
//!
//! [`SmtpSession::send`] claims the session, spawns one driver task and
//! returns at once; a [`SendRequest`] is already validated by its builder.
//! The driver connects, feeds every connection event to the [`Protocol`]
//! state machine and carries out the resulting actions. Callers
//! observe the dialog through [`SessionEvent`]s: transcript lines in order,
//! then exactly one completion.
//!
//! ## Example
//!
//! ```ignore
//! use postwire_smtp::{SendRequest, SessionConfig, SessionEvent, SmtpSession};
//!
//! let (session, mut events) = SmtpSession::new(SessionConfig::default());
//! let request = SendRequest::builder("smtp.example.com", 587)
//!     .credentials("robot@example.com", app_password)
//!     .from("robot@example.com")
//!     .to("owner@example.org")
//!     .subject("Report")
//!     .body("All good.")
//!     .build()?;
//!
//! session.send(request)?;
//! while let Some(event) = events.recv().await {
//!     match event {
//!         SessionEvent::Transcript(line) => println!("{line}"),
//!         SessionEvent::Completed(result) => {
//!             println!("{result}");
//!             break;
//!         }
//!     }
//! }
//! ```

mod config;

pub use config::{
    DEFAULT_CONNECT_TIMEOUT, DEFAULT_LOCAL_NAME, DEFAULT_REPLY_TIMEOUT, SessionConfig,
    SessionConfigBuilder,
};

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use bytes::BytesMut;
use tokio::sync::mpsc;
use tokio::time::{Instant, timeout, timeout_at};

use crate::connection::{Connector, TcpConnector, Transport};
use crate::error::{Error, Result};
use crate::protocol::{Action, CompletionResult, Event, Protocol, SessionState, TranscriptEvent};
use crate::request::SendRequest;

/// Read buffer reservation per receive.
const READ_BUFFER_SIZE: usize = 4096;

/// Notification published by a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A line sent, received, or a local milestone.
    Transcript(TranscriptEvent),
    /// Terminal result; always the last event of a send.
    Completed(CompletionResult),
}

/// SMTP client session that runs one send at a time.
pub struct SmtpSession<C: Connector = TcpConnector> {
    connector: Arc<C>,
    config: SessionConfig,
    busy: Arc<AtomicBool>,
    events: mpsc::UnboundedSender<SessionEvent>,
}

impl SmtpSession<TcpConnector> {
    /// Creates a session that connects over TCP and trusts the webpki roots.
    #[must_use]
    pub fn new(config: SessionConfig) -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        Self::with_connector(TcpConnector::new(), config)
    }
}

impl<C: Connector> SmtpSession<C> {
    /// Creates a session on top of a custom connector.
    #[must_use]
    pub fn with_connector(
        connector: C,
        config: SessionConfig,
    ) -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        let session = Self {
            connector: Arc::new(connector),
            config,
            busy: Arc::new(AtomicBool::new(false)),
            events,
        };
        (session, receiver)
    }

    /// Returns the session configuration.
    #[must_use]
    pub const fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Returns true while a send is in flight.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Starts sending `request` and returns immediately.
    ///
    /// Progress and the outcome are published on the event receiver returned
    /// by the constructor.
    ///
    /// The session becomes idle just before the completion is queued, so a
    /// caller reacting to [`SessionEvent::Completed`] can send again at once.
    /// A caller that instead polls [`is_busy`](Self::is_busy) from another
    /// thread may start the next send inside that window; its first
    /// transcript line can then arrive ahead of the previous completion.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Busy`] if the previous send has not completed yet, or
    /// [`Error::InvalidState`] when called outside a tokio runtime. A rejected
    /// request publishes no events.
    pub fn send(&self, request: SendRequest) -> Result<()> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(Error::Busy);
        }
        let in_flight = InFlight(Arc::clone(&self.busy));

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            return Err(Error::InvalidState("no tokio runtime".into()));
        };

        tracing::debug!(
            host = request.host(),
            port = request.port(),
            use_tls = request.use_tls(),
            "Starting SMTP send"
        );

        let driver = Driver {
            connector: Arc::clone(&self.connector),
            config: self.config.clone(),
            events: self.events.clone(),
            in_flight,
        };
        runtime.spawn(driver.run(request));
        Ok(())
    }
}

impl<C: Connector> std::fmt::Debug for SmtpSession<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpSession")
            .field("config", &self.config)
            .field("busy", &self.is_busy())
            .finish_non_exhaustive()
    }
}

/// Clears the busy flag when the send ends, even if the driver unwinds.
struct InFlight(Arc<AtomicBool>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Runs one request on its own task.
struct Driver<C: Connector> {
    connector: Arc<C>,
    config: SessionConfig,
    events: mpsc::UnboundedSender<SessionEvent>,
    in_flight: InFlight,
}

/// What executing a batch of actions led to.
#[derive(Default)]
struct Outcome {
    wrote: bool,
    upgrade: bool,
    failure: Option<Event>,
    completion: Option<CompletionResult>,
}

impl<C: Connector> Driver<C> {
    async fn run(self, request: SendRequest) {
        let host = request.host().to_string();
        let port = request.port();
        let mut protocol = Protocol::new(request, self.config.local_name.clone());

        let mut pending = protocol.start();
        let connected = timeout(
            self.config.connect_timeout,
            self.connector.connect(&host, port),
        )
        .await;

        let mut transport = match connected {
            Ok(Ok(transport)) => Some(transport),
            Ok(Err(e)) => {
                pending.extend(protocol.handle_event(Event::TransportError(e.to_string())));
                None
            }
            Err(_) => {
                pending.extend(protocol.handle_event(Event::Timeout));
                None
            }
        };
        if transport.is_some() {
            pending.extend(protocol.handle_event(Event::Connected));
        }

        let mut buf = BytesMut::with_capacity(READ_BUFFER_SIZE);
        let mut deadline = Deadline::new(protocol.state(), self.config.reply_timeout);

        loop {
            let outcome = self.execute(transport.as_mut(), pending).await;

            if let Some(result) = outcome.completion {
                self.finish(result);
                return;
            }

            let event = if let Some(failure) = outcome.failure {
                failure
            } else if outcome.wrote && protocol.state() == SessionState::Quit {
                Event::Drained
            } else if let Some(transport) = transport.as_mut() {
                let expires = deadline.refresh(protocol.state());
                if outcome.upgrade {
                    match timeout_at(expires, transport.upgrade_to_tls(&host)).await {
                        Ok(Ok(())) => Event::Encrypted,
                        Ok(Err(e)) => Event::TransportError(e.to_string()),
                        Err(_) => Event::Timeout,
                    }
                } else {
                    buf.reserve(READ_BUFFER_SIZE);
                    match timeout_at(expires, transport.read_chunk(&mut buf)).await {
                        Ok(Ok(0)) => Event::TransportError("connection closed by server".into()),
                        Ok(Ok(_)) => {
                            let chunk = buf.split();
                            pending = protocol.handle_input(&chunk);
                            continue;
                        }
                        Ok(Err(e)) => Event::TransportError(e.to_string()),
                        Err(_) => Event::Timeout,
                    }
                }
            } else {
                Event::TransportError("not connected".into())
            };

            pending = protocol.handle_event(event);
        }
    }

    /// Carries out one batch of actions in order.
    async fn execute(&self, mut transport: Option<&mut C::Transport>, actions: Vec<Action>) -> Outcome {
        let mut outcome = Outcome::default();

        for action in actions {
            match action {
                Action::Record(line) => self.record(line),
                Action::Transmit { data, transcript } => {
                    if outcome.failure.is_some() {
                        continue;
                    }
                    tracing::trace!(line = %transcript, "C");
                    self.record(TranscriptEvent::sent(transcript));
                    let written = match transport.as_deref_mut() {
                        Some(transport) => transport.write_all(&data).await,
                        None => Err(Error::InvalidState("not connected".into())),
                    };
                    match written {
                        Ok(()) => outcome.wrote = true,
                        Err(e) => outcome.failure = Some(Event::TransportError(e.to_string())),
                    }
                }
                Action::UpgradeTls => outcome.upgrade = true,
                Action::Complete(result) => outcome.completion = Some(result),
                Action::Close => {
                    if let Some(transport) = transport.as_deref_mut() {
                        let closing = timeout(self.config.reply_timeout, transport.shutdown()).await;
                        if let Ok(Err(e)) = closing {
                            tracing::debug!(error = %e, "SMTP shutdown failed");
                        }
                    }
                }
            }
        }

        outcome
    }

    fn record(&self, line: TranscriptEvent) {
        let _ = self.events.send(SessionEvent::Transcript(line));
    }

    fn finish(self, result: CompletionResult) {
        if result.ok {
            tracing::info!(message = %result.message, "SMTP send completed");
        } else {
            tracing::warn!(message = %result.message, "SMTP send failed");
        }

        let Self {
            events, in_flight, ..
        } = self;
        drop(in_flight);
        let _ = events.send(SessionEvent::Completed(result));
    }
}

/// Deadline that restarts whenever the dialog changes state.
struct Deadline {
    state: SessionState,
    expires: Instant,
    period: Duration,
}

impl Deadline {
    fn new(state: SessionState, period: Duration) -> Self {
        Self {
            state,
            expires: Instant::now() + period,
            period,
        }
    }

    fn refresh(&mut self, state: SessionState) -> Instant {
        if state != self.state {
            self.state = state;
            self.expires = Instant::now() + self.period;
        }
        self.expires
    }
}
