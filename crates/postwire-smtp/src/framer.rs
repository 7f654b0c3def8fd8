//! CRLF line framing for server input.
//!
//! Bytes arrive in arbitrary chunks. [`LineFramer`] keeps whatever has not
//! yet been terminated by CRLF and hands out complete lines as they appear,
//! so the session never has to care how the network split the stream.

use bytes::{Buf, BytesMut};

use crate::error::{Error, Result};

/// Default receive buffer capacity.
const DEFAULT_BUFFER_SIZE: usize = 4096;

/// Maximum partial line length to prevent memory exhaustion.
pub const MAX_LINE_LENGTH: usize = 1024 * 1024; // 1 MB

/// Accumulates received bytes and yields complete CRLF-terminated lines.
#[derive(Debug)]
pub struct LineFramer {
    buffer: BytesMut,
}

impl Default for LineFramer {
    fn default() -> Self {
        Self::new()
    }
}

impl LineFramer {
    /// Creates an empty framer.
    #[must_use]
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(DEFAULT_BUFFER_SIZE),
        }
    }

    /// Appends `data` and returns the complete lines now available.
    ///
    /// Lines are yielded without their CRLF; blank lines are skipped. Lines
    /// left unread when the iterator is dropped stay buffered and come out
    /// of the next call.
    pub fn feed(&mut self, data: &[u8]) -> Lines<'_> {
        self.buffer.extend_from_slice(data);
        Lines { framer: self }
    }

    /// Returns the number of bytes held back as an incomplete line.
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Fails if the unterminated tail has grown past [`MAX_LINE_LENGTH`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] when the limit is exceeded.
    pub fn check_overflow(&self) -> Result<()> {
        if self.buffer.len() > MAX_LINE_LENGTH {
            return Err(Error::Protocol("line too long".to_string()));
        }
        Ok(())
    }

    /// Drops any buffered bytes.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    fn next_line(&mut self) -> Option<String> {
        loop {
            let pos = find_crlf(&self.buffer)?;
            let line = self.buffer.split_to(pos);
            self.buffer.advance(2);

            if !line.is_empty() {
                return Some(String::from_utf8_lossy(&line).into_owned());
            }
        }
    }
}

/// Lazy iterator over the complete lines of a [`LineFramer`].
#[derive(Debug)]
pub struct Lines<'a> {
    framer: &'a mut LineFramer,
}

impl Iterator for Lines<'_> {
    type Item = String;

    fn next(&mut self) -> Option<Self::Item> {
        self.framer.next_line()
    }
}

/// Finds the position of CRLF in a buffer.
fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == b"\r\n")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn collect_all(framer: &mut LineFramer, data: &[u8]) -> Vec<String> {
        framer.feed(data).collect()
    }

    #[test]
    fn test_find_crlf() {
        assert_eq!(find_crlf(b"hello\r\n"), Some(5));
        assert_eq!(find_crlf(b"\r\n"), Some(0));
        assert_eq!(find_crlf(b"no newline"), None);
        assert_eq!(find_crlf(b"just\n"), None);
        assert_eq!(find_crlf(b"just\r"), None);
    }

    #[test]
    fn test_single_feed_multiple_lines() {
        let mut framer = LineFramer::new();
        let lines = collect_all(&mut framer, b"250-smtp.example.com\r\n250 OK\r\n");
        assert_eq!(lines, vec!["250-smtp.example.com", "250 OK"]);
        assert_eq!(framer.buffered(), 0);
    }

    #[test]
    fn test_partial_line_is_retained() {
        let mut framer = LineFramer::new();
        assert!(collect_all(&mut framer, b"220 smtp.exa").is_empty());
        assert_eq!(framer.buffered(), 12);

        let lines = collect_all(&mut framer, b"mple.com ESMTP\r\n250 ");
        assert_eq!(lines, vec!["220 smtp.example.com ESMTP"]);
        assert_eq!(framer.buffered(), 4);
    }

    #[test]
    fn test_crlf_split_across_feeds() {
        let mut framer = LineFramer::new();
        assert!(collect_all(&mut framer, b"235 ok\r").is_empty());
        assert_eq!(collect_all(&mut framer, b"\n"), vec!["235 ok"]);
    }

    #[test]
    fn test_blank_lines_dropped() {
        let mut framer = LineFramer::new();
        let lines = collect_all(&mut framer, b"\r\n\r\n250 OK\r\n\r\n");
        assert_eq!(lines, vec!["250 OK"]);
    }

    #[test]
    fn test_bare_lf_is_not_a_terminator() {
        let mut framer = LineFramer::new();
        assert!(collect_all(&mut framer, b"250 OK\n").is_empty());
        assert_eq!(framer.buffered(), 7);
    }

    #[test]
    fn test_unread_lines_survive_dropped_iterator() {
        let mut framer = LineFramer::new();
        let first = framer.feed(b"220 a\r\n250 b\r\n").next();
        assert_eq!(first.as_deref(), Some("220 a"));
        assert_eq!(collect_all(&mut framer, b""), vec!["250 b"]);
    }

    #[test]
    fn test_invalid_utf8_is_lossy() {
        let mut framer = LineFramer::new();
        let lines = collect_all(&mut framer, b"250 \xff\r\n");
        assert_eq!(lines, vec!["250 \u{fffd}"]);
    }

    #[test]
    fn test_overflow_detection() {
        let mut framer = LineFramer::new();
        let long = vec![b'A'; MAX_LINE_LENGTH + 1];
        assert!(collect_all(&mut framer, &long).is_empty());
        let err = framer.check_overflow().unwrap_err();
        assert!(err.to_string().contains("line too long"));

        framer.clear();
        assert!(framer.check_overflow().is_ok());
    }

    proptest! {
        #[test]
        fn prop_chunk_invariance(
            lines in proptest::collection::vec("[ -~]{0,20}", 0..12),
            tail in "[ -~]{0,8}",
            cuts in proptest::collection::vec(any::<prop::sample::Index>(), 0..8),
        ) {
            let mut stream = Vec::new();
            for line in &lines {
                stream.extend_from_slice(line.as_bytes());
                stream.extend_from_slice(b"\r\n");
            }
            stream.extend_from_slice(tail.as_bytes());

            let mut whole = LineFramer::new();
            let expected: Vec<String> = whole.feed(&stream).collect();

            let mut offsets: Vec<usize> = cuts.iter().map(|i| i.index(stream.len() + 1)).collect();
            offsets.sort_unstable();

            let mut chunked = LineFramer::new();
            let mut actual = Vec::new();
            let mut start = 0;
            for offset in offsets.into_iter().chain(std::iter::once(stream.len())) {
                actual.extend(chunked.feed(&stream[start..offset]));
                start = offset;
            }

            prop_assert_eq!(&actual, &expected);
            prop_assert_eq!(chunked.buffered(), whole.buffered());
            let non_blank: Vec<&String> = lines.iter().filter(|l| !l.is_empty()).collect();
            prop_assert_eq!(expected.iter().collect::<Vec<_>>(), non_blank);
        }
    }
}
