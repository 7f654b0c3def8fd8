//! Session states and the transition table.
//!
//! Every state waits for exactly one thing: a reply code, the TLS handshake,
//! or the QUIT write. [`SessionState::transition`] is a pure function of the
//! current state, the incoming event, and the request being sent, so each
//! row of the dialog can be exercised without a socket.

use std::fmt;

use super::event::{Action, CompletionResult, Event, Transition, TranscriptEvent};
use crate::command::Command;
use crate::message::build_message;
use crate::parser::parse_reply_line;
use crate::request::SendRequest;
use crate::types::ReplyCode;

/// Transcript text used in place of the encoded secret.
pub const SECRET_PLACEHOLDER: &str = "[secret hidden]";

/// Message reported when the dialog finishes successfully.
pub const SUCCESS_MESSAGE: &str = "email sent";

/// Where the submission dialog stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SessionState {
    /// No request started.
    #[default]
    Idle,
    /// Connected or connecting, waiting for the 220 banner.
    WaitBanner,
    /// First EHLO sent.
    Ehlo1,
    /// STARTTLS sent.
    StartTls,
    /// TLS handshake running.
    WaitTls,
    /// EHLO re-sent over TLS.
    Ehlo2,
    /// AUTH LOGIN sent.
    AuthLogin,
    /// Encoded username sent.
    AuthUser,
    /// Encoded secret sent.
    AuthPass,
    /// MAIL FROM sent.
    MailFrom,
    /// RCPT TO sent.
    RcptTo,
    /// DATA sent.
    Data,
    /// Message and terminator sent.
    SendBody,
    /// QUIT queued.
    Quit,
    /// Finished, successfully or not.
    Done,
}

/// Request-specific inputs to the transition function.
#[derive(Debug, Clone, Copy)]
pub struct Dialog<'a> {
    /// The request being sent.
    pub request: &'a SendRequest,
    /// Name announced in EHLO.
    pub local_name: &'a str,
}

impl SessionState {
    /// Reply code this state waits for, if it waits for a reply at all.
    #[must_use]
    pub const fn expected_code(self) -> Option<ReplyCode> {
        match self {
            Self::WaitBanner | Self::StartTls => Some(ReplyCode::SERVICE_READY),
            Self::Ehlo1 | Self::Ehlo2 | Self::MailFrom | Self::RcptTo | Self::SendBody => {
                Some(ReplyCode::OK)
            }
            Self::AuthLogin | Self::AuthUser => Some(ReplyCode::AUTH_CONTINUE),
            Self::AuthPass => Some(ReplyCode::AUTH_SUCCESS),
            Self::Data => Some(ReplyCode::START_DATA),
            Self::Idle | Self::WaitTls | Self::Quit | Self::Done => None,
        }
    }

    /// Description used as the prefix of a failure message.
    #[must_use]
    pub const fn failure_description(self) -> &'static str {
        match self {
            Self::Idle => "not started",
            Self::WaitBanner => "expected 220",
            Self::Ehlo1 => "EHLO failed",
            Self::StartTls => "STARTTLS failed",
            Self::WaitTls => "TLS handshake failed",
            Self::Ehlo2 => "EHLO after TLS failed",
            Self::AuthLogin => "AUTH LOGIN failed",
            Self::AuthUser => "AUTH USER rejected",
            Self::AuthPass => "AUTH PASS rejected",
            Self::MailFrom => "MAIL FROM failed",
            Self::RcptTo => "RCPT TO failed",
            Self::Data => "DATA failed",
            Self::SendBody => "sending body failed",
            Self::Quit => "QUIT failed",
            Self::Done => "already finished",
        }
    }

    /// Returns true once no further events are processed.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Idle | Self::Done)
    }

    /// Computes the next state and its side effects.
    #[must_use]
    pub fn transition(self, event: &Event, dialog: &Dialog<'_>) -> Transition {
        if self.is_terminal() {
            return Transition::to(self);
        }

        match event {
            Event::Connected => Transition::to(self).with(Action::Record(TranscriptEvent::note(
                "connected, waiting for 220",
            ))),
            Event::Line(line) => self.on_line(line, dialog),
            Event::Encrypted => match self {
                Self::WaitTls => send(
                    Transition::to(Self::Ehlo2)
                        .with(Action::Record(TranscriptEvent::note("TLS established"))),
                    &ehlo(dialog),
                ),
                _ => fail(format!("unexpected TLS handshake in {self}")),
            },
            Event::Drained => match self {
                Self::Quit => Transition::to(Self::Done)
                    .with(Action::Complete(CompletionResult::success(SUCCESS_MESSAGE)))
                    .with(Action::Close),
                _ => Transition::to(self),
            },
            Event::TransportError(reason) => match self {
                Self::WaitTls => fail(format!("{}: {reason}", self.failure_description())),
                _ => fail(format!("transport error in {self}: {reason}")),
            },
            Event::Timeout => match self.expected_code() {
                Some(code) => fail(format!("timed out in {self} waiting for {code}")),
                None => fail(format!("timed out in {self}")),
            },
        }
    }

    fn on_line(self, line: &str, dialog: &Dialog<'_>) -> Transition {
        let Some(expected) = self.expected_code() else {
            return Transition::to(self);
        };

        // Continuation lines and non-reply chatter never drive the dialog
        let Some(reply) = parse_reply_line(line).filter(|reply| reply.last) else {
            return Transition::to(self);
        };

        if reply.code != expected {
            return fail(format!("{}: {line}", self.failure_description()));
        }

        let request = dialog.request;
        match self {
            Self::WaitBanner => send(Transition::to(Self::Ehlo1), &ehlo(dialog)),
            Self::Ehlo1 if request.use_tls() => {
                send(Transition::to(Self::StartTls), &Command::StartTls)
            }
            Self::Ehlo1 | Self::Ehlo2 => send(Transition::to(Self::AuthLogin), &Command::AuthLogin),
            Self::StartTls => Transition::to(Self::WaitTls)
                .with(Action::Record(TranscriptEvent::note("starting TLS")))
                .with(Action::UpgradeTls),
            Self::AuthLogin => send(
                Transition::to(Self::AuthUser),
                &Command::auth_response(request.username()),
            ),
            Self::AuthUser => {
                let command = Command::auth_response(request.secret());
                Transition::to(Self::AuthPass).with(Action::Transmit {
                    data: command.serialize(),
                    transcript: SECRET_PLACEHOLDER.to_string(),
                })
            }
            Self::AuthPass => send(
                Transition::to(Self::MailFrom),
                &Command::MailFrom {
                    from: request.from().clone(),
                },
            ),
            Self::MailFrom => send(
                Transition::to(Self::RcptTo),
                &Command::RcptTo {
                    to: request.to().clone(),
                },
            ),
            Self::RcptTo => send(Transition::to(Self::Data), &Command::Data),
            Self::Data => {
                let data = build_message(request);
                let transcript = format!("[message body, {} bytes]", data.len());
                Transition::to(Self::SendBody).with(Action::Transmit { data, transcript })
            }
            Self::SendBody => send(Transition::to(Self::Quit), &Command::Quit),
            Self::Idle | Self::WaitTls | Self::Quit | Self::Done => Transition::to(self),
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

fn ehlo(dialog: &Dialog<'_>) -> Command {
    Command::Ehlo {
        hostname: dialog.local_name.to_string(),
    }
}

fn send(transition: Transition, command: &Command) -> Transition {
    transition.with(Action::Transmit {
        data: command.serialize(),
        transcript: command.line(),
    })
}

fn fail(message: String) -> Transition {
    Transition::to(SessionState::Done)
        .with(Action::Complete(CompletionResult::failure(message)))
        .with(Action::Close)
}
