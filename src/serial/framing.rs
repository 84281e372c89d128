//! # Line Framing
//!
//! Accumulates raw bytes from the serial link and cuts them into text lines.

use bytes::BytesMut;

/// Longest line delivered in one piece; longer runs are cut into chunks
pub const MAX_LINE_LEN: usize = 4096;

/// Spare capacity reserved before each read into the framer
const READ_RESERVE: usize = 256;

/// Splits an unreliable byte stream into newline-terminated chunks
///
/// Lines keep their terminator. Bytes that are not valid UTF-8 are replaced
/// with U+FFFD rather than rejected.
///
/// # Examples
///
/// ```
/// use smartroom_link::serial::framing::LineFramer;
///
/// let mut framer = LineFramer::new();
/// framer.push(b"BOOT OK\nDATA,t=2");
/// assert_eq!(framer.next_line().as_deref(), Some("BOOT OK\n"));
/// assert_eq!(framer.next_line(), None);
/// assert_eq!(framer.take_partial().as_deref(), Some("DATA,t=2"));
/// ```
#[derive(Debug, Default)]
pub struct LineFramer {
    buf: BytesMut,
}

impl LineFramer {
    /// Create an empty framer
    pub fn new() -> Self {
        Self { buf: BytesMut::with_capacity(READ_RESERVE) }
    }

    /// Buffer to read into, with spare capacity reserved
    pub fn buffer_mut(&mut self) -> &mut BytesMut {
        self.buf.reserve(READ_RESERVE);
        &mut self.buf
    }

    /// Append bytes received from the link
    pub fn push(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Number of buffered bytes not yet delivered
    pub fn pending(&self) -> usize {
        self.buf.len()
    }

    /// Next complete line, or an over-long chunk cut at [`MAX_LINE_LEN`]
    pub fn next_line(&mut self) -> Option<String> {
        if let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let line = self.buf.split_to(pos + 1);
            return Some(String::from_utf8_lossy(&line).into_owned());
        }

        if self.buf.len() >= MAX_LINE_LEN {
            let chunk = self.buf.split_to(MAX_LINE_LEN);
            return Some(String::from_utf8_lossy(&chunk).into_owned());
        }

        None
    }

    /// Drain whatever is buffered as a truncated chunk
    pub fn take_partial(&mut self) -> Option<String> {
        if self.buf.is_empty() {
            return None;
        }
        let chunk = self.buf.split();
        Some(String::from_utf8_lossy(&chunk).into_owned())
    }
}
