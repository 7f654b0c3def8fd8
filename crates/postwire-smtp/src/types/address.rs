//! Envelope addresses.

use std::fmt;

use crate::error::{Error, Result};

/// A mailbox usable inside `MAIL FROM:<..>` and `RCPT TO:<..>`.
///
/// Only the shape matters here: one `@` with something on both sides, and
/// nothing that could close the angle brackets or start a new command line.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Address(String);

impl Address {
    /// Validates `addr` and wraps it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidAddress`] describing the first problem found.
    pub fn new(addr: impl Into<String>) -> Result<Self> {
        let addr = addr.into();
        check_mailbox(&addr).map_err(Error::InvalidAddress)?;
        Ok(Self(addr))
    }

    /// The address text, without angle brackets.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn check_mailbox(addr: &str) -> std::result::Result<(), String> {
    if addr.is_empty() {
        return Err("empty address".into());
    }
    if let Some(c) = addr.chars().find(|&c| matches!(c, '<' | '>') || c.is_whitespace()) {
        return Err(format!("{addr:?} contains {c:?}"));
    }

    match addr.split_once('@') {
        None => Err(format!("{addr:?} has no @")),
        Some((_, domain)) if domain.contains('@') => Err(format!("{addr:?} has more than one @")),
        Some(("", _)) => Err(format!("{addr:?} has an empty local part")),
        Some((_, "")) => Err(format!("{addr:?} has an empty domain")),
        Some(_) => Ok(()),
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
