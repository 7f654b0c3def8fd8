//! Message construction for the DATA phase.
//!
//! Produces the bytes written after the server's 354: a minimal plain-text
//! header block, the body with CRLF line endings and dot-stuffing, and the
//! `.` terminator line.

use base64::Engine;

use crate::request::SendRequest;

/// End-of-data marker sent after the body.
pub const END_OF_DATA: &[u8] = b".\r\n";

/// Builds the complete DATA payload for a request, terminator included.
#[must_use]
pub fn build_message(request: &SendRequest) -> Vec<u8> {
    let mut message = Vec::with_capacity(request.body().len() + 256);

    push_header(&mut message, "From", &format!("<{}>", request.from()));
    push_header(&mut message, "To", &format!("<{}>", request.to()));
    push_header(&mut message, "Subject", &encode_header_value(request.subject()));
    push_header(&mut message, "MIME-Version", "1.0");
    push_header(&mut message, "Content-Type", "text/plain; charset=UTF-8");
    push_header(&mut message, "Content-Transfer-Encoding", "8bit");

    // Empty line between headers and body
    message.extend_from_slice(b"\r\n");

    stuff_body(request.body().as_bytes(), &mut message);
    message.extend_from_slice(END_OF_DATA);
    message
}

fn push_header(buf: &mut Vec<u8>, name: &str, value: &str) {
    buf.extend_from_slice(name.as_bytes());
    buf.extend_from_slice(b": ");
    buf.extend_from_slice(value.as_bytes());
    buf.extend_from_slice(b"\r\n");
}

/// Longest encoded word RFC 2047 allows.
const MAX_ENCODED_WORD: usize = 75;

/// Raw bytes per encoded word: `=?UTF-8?B?` and `?=` take 12 characters,
/// and base64 turns every 3 bytes into 4.
const MAX_WORD_BYTES: usize = (MAX_ENCODED_WORD - 12) / 4 * 3;

/// Encodes a header value as RFC 2047 words when it is not plain ASCII.
///
/// Long values are split on character boundaries into several encoded words
/// joined by folding whitespace.
#[must_use]
pub fn encode_header_value(text: &str) -> String {
    if text.chars().all(|c| c.is_ascii() && !c.is_ascii_control()) && !text.contains("=?") {
        return text.to_string();
    }

    let mut words = Vec::new();
    let mut start = 0;
    for (i, c) in text.char_indices() {
        if i + c.len_utf8() - start > MAX_WORD_BYTES {
            words.push(encoded_word(&text[start..i]));
            start = i;
        }
    }
    words.push(encoded_word(&text[start..]));
    words.join("\r\n ")
}

fn encoded_word(chunk: &str) -> String {
    let encoded = base64::engine::general_purpose::STANDARD.encode(chunk.as_bytes());
    format!("=?UTF-8?B?{encoded}?=")
}

/// Appends `body` to `out` with CRLF line endings and leading dots doubled.
///
/// A trailing line break in the body does not produce an extra empty line.
pub fn stuff_body(body: &[u8], out: &mut Vec<u8>) {
    if body.is_empty() {
        return;
    }

    let body = body.strip_suffix(b"\n").unwrap_or(body);
    for line in body.split(|&b| b == b'\n') {
        let line = line.strip_suffix(b"\r").unwrap_or(line);

        // Byte-stuff lines starting with '.'
        if line.first() == Some(&b'.') {
            out.push(b'.');
        }

        out.extend_from_slice(line);
        out.extend_from_slice(b"\r\n");
    }
}
