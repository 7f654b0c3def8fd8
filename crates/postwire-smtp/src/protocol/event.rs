//! Inputs and outputs of the session state machine.

// Allow missing_const_for_fn since String fields make most constructors non-const.
#![allow(clippy::missing_const_for_fn)]

use std::fmt;

use super::SessionState;

/// Something that happened on the connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// The plaintext connection is open.
    Connected,
    /// A complete line arrived from the server.
    Line(String),
    /// The in-place TLS handshake finished.
    Encrypted,
    /// Everything queued for transmission has been written.
    Drained,
    /// The transport failed or the server closed the connection.
    TransportError(String),
    /// The deadline for the current state expired.
    Timeout,
}

/// Side effect requested by a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Publish a transcript line.
    Record(TranscriptEvent),
    /// Write bytes to the server.
    Transmit {
        /// Raw bytes, CRLF included.
        data: Vec<u8>,
        /// How the write appears in the transcript.
        transcript: String,
    },
    /// Start the TLS handshake on the open connection.
    UpgradeTls,
    /// Publish the terminal result.
    Complete(CompletionResult),
    /// Close the connection.
    Close,
}

/// Outcome of feeding one event to a state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    /// State after the event.
    pub state: SessionState,
    /// Side effects, in order.
    pub actions: Vec<Action>,
}

impl Transition {
    /// Moves to `state` with no side effects.
    #[must_use]
    pub fn to(state: SessionState) -> Self {
        Self {
            state,
            actions: Vec::new(),
        }
    }

    /// Appends a side effect.
    #[must_use]
    pub fn with(mut self, action: Action) -> Self {
        self.actions.push(action);
        self
    }
}

/// Which way a transcript line travelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Client to server.
    Sent,
    /// Server to client.
    Received,
    /// Local milestone, not on the wire.
    Note,
}

/// One line of the session transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptEvent {
    /// Direction of the line.
    pub direction: Direction,
    /// Line text without CRLF.
    pub text: String,
}

impl TranscriptEvent {
    /// A line written to the server.
    #[must_use]
    pub fn sent(text: impl Into<String>) -> Self {
        Self {
            direction: Direction::Sent,
            text: text.into(),
        }
    }

    /// A line read from the server.
    #[must_use]
    pub fn received(text: impl Into<String>) -> Self {
        Self {
            direction: Direction::Received,
            text: text.into(),
        }
    }

    /// A local milestone.
    #[must_use]
    pub fn note(text: impl Into<String>) -> Self {
        Self {
            direction: Direction::Note,
            text: text.into(),
        }
    }
}

impl fmt::Display for TranscriptEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.direction {
            Direction::Sent => write!(f, "C: {}", self.text),
            Direction::Received => write!(f, "S: {}", self.text),
            Direction::Note => write!(f, "{}", self.text),
        }
    }
}

/// Terminal result of a send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionResult {
    /// Whether the message was accepted and QUIT was sent.
    pub ok: bool,
    /// Human-readable summary.
    pub message: String,
}

impl CompletionResult {
    /// A successful result.
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            ok: true,
            message: message.into(),
        }
    }

    /// A failed result.
    #[must_use]
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            message: message.into(),
        }
    }
}

impl fmt::Display for CompletionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = if self.ok { "OK" } else { "FAIL" };
        write!(f, "{status} | {}", self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transcript_display() {
        assert_eq!(TranscriptEvent::sent("EHLO localhost").to_string(), "C: EHLO localhost");
        assert_eq!(TranscriptEvent::received("250 ok").to_string(), "S: 250 ok");
        assert_eq!(TranscriptEvent::note("starting TLS").to_string(), "starting TLS");
    }

    #[test]
    fn test_completion_display() {
        assert_eq!(CompletionResult::success("email sent").to_string(), "OK | email sent");
        assert_eq!(
            CompletionResult::failure("DATA failed: 554 no").to_string(),
            "FAIL | DATA failed: 554 no"
        );
    }

    #[test]
    fn test_transition_builder() {
        let transition = Transition::to(SessionState::Ehlo1).with(Action::Close);
        assert_eq!(transition.state, SessionState::Ehlo1);
        assert_eq!(transition.actions, vec![Action::Close]);
    }
}
