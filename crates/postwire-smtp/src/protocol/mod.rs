//! Sans-I/O SMTP submission dialog.
//!
//! [`Protocol`] owns the current [`SessionState`], the [`LineFramer`], and
//! the request being sent. It never touches a socket: the driver feeds it
//! events and received bytes, and carries out the [`Action`]s it returns.
//!
//! ```ignore
//! let mut protocol = Protocol::new(request, "localhost");
//! let mut actions = protocol.start();
//! actions.extend(protocol.handle_event(Event::Connected));
//! actions.extend(protocol.handle_input(b"220 smtp.example.com ESMTP\r\n"));
//! for action in actions {
//!     match action {
//!         Action::Transmit { data, .. } => { /* write */ }
//!         Action::UpgradeTls => { /* handshake, then Event::Encrypted */ }
//!         _ => {}
//!     }
//! }
//! ```

mod event;
mod state;

pub use event::{Action, CompletionResult, Direction, Event, TranscriptEvent, Transition};
pub use state::{Dialog, SECRET_PLACEHOLDER, SUCCESS_MESSAGE, SessionState};

use crate::framer::LineFramer;
use crate::request::SendRequest;

/// State machine for a single send request.
#[derive(Debug)]
pub struct Protocol {
    state: SessionState,
    framer: LineFramer,
    request: SendRequest,
    local_name: String,
}

impl Protocol {
    /// Creates an idle protocol for `request`, announcing `local_name` in EHLO.
    #[must_use]
    pub fn new(request: SendRequest, local_name: impl Into<String>) -> Self {
        Self {
            state: SessionState::Idle,
            framer: LineFramer::new(),
            request,
            local_name: local_name.into(),
        }
    }

    /// Returns the current state.
    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Returns true once the dialog has finished.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.state == SessionState::Done
    }

    /// Leaves `Idle` and starts waiting for the banner.
    pub fn start(&mut self) -> Vec<Action> {
        if self.state != SessionState::Idle {
            return Vec::new();
        }

        self.state = SessionState::WaitBanner;
        let note = format!(
            "connecting {}:{} (TLS={})",
            self.request.host(),
            self.request.port(),
            if self.request.use_tls() { "ON" } else { "OFF" }
        );
        vec![Action::Record(TranscriptEvent::note(note))]
    }

    /// Applies one event to the current state.
    pub fn handle_event(&mut self, event: Event) -> Vec<Action> {
        let dialog = Dialog {
            request: &self.request,
            local_name: &self.local_name,
        };
        let transition = self.state.transition(&event, &dialog);

        if transition.state != self.state {
            tracing::debug!(from = %self.state, to = %transition.state, "SMTP state change");
        }
        let entering_tls =
            transition.state == SessionState::WaitTls && self.state != SessionState::WaitTls;
        self.state = transition.state;
        // Nothing received in plaintext may reach the encrypted dialog
        if entering_tls || self.state == SessionState::Done {
            self.framer.clear();
        }

        transition.actions
    }

    /// Feeds received bytes and applies every complete line.
    ///
    /// Each line is recorded in the transcript before it is applied. Once the
    /// dialog is done, or the TLS upgrade has started, the rest of the input
    /// is discarded.
    pub fn handle_input(&mut self, data: &[u8]) -> Vec<Action> {
        if self.accepts_no_input() {
            return Vec::new();
        }

        let lines: Vec<String> = self.framer.feed(data).collect();
        let mut actions = Vec::new();

        for line in lines {
            if self.accepts_no_input() {
                break;
            }
            tracing::trace!(line = %line, "S");
            actions.push(Action::Record(TranscriptEvent::received(line.clone())));
            actions.extend(self.handle_event(Event::Line(line)));
        }

        if !self.accepts_no_input()
            && let Err(e) = self.framer.check_overflow()
        {
            actions.extend(self.handle_event(Event::TransportError(e.to_string())));
        }

        actions
    }

    fn accepts_no_input(&self) -> bool {
        self.state.is_terminal() || self.state == SessionState::WaitTls
    }
}
