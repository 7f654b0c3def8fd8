//! SMTP reply line parser.
//!
//! The session reacts to individual lines, so the parser only recognises
//! the three-digit code prefix and the continuation marker:
//! - Final line: `250 OK` or a bare `250`
//! - Continuation: `250-PIPELINING`

use crate::types::{ReplyCode, ReplyLine};

/// Parses one server line into a reply line.
///
/// Returns `None` if the line does not start with a three-digit code followed
/// by a space, a dash, or the end of the line.
#[must_use]
pub fn parse_reply_line(line: &str) -> Option<ReplyLine> {
    let bytes = line.as_bytes();
    if bytes.len() < 3 || !bytes[..3].iter().all(u8::is_ascii_digit) {
        return None;
    }

    let code = line[..3].parse::<u16>().ok()?;
    let last = match bytes.get(3) {
        None | Some(b' ') => true,
        Some(b'-') => false,
        Some(_) => return None,
    };

    let text = line.get(4..).unwrap_or_default().to_string();

    Some(ReplyLine {
        code: ReplyCode::new(code),
        last,
        text,
    })
}
