//! Request Framing and Decoding
//!
//! This module turns the bytes accumulated from a connection into a
//! [`Request`].
//!
//! ## Framing
//!
//! A request is complete once the terminator `\r\n\r\n` shows up anywhere
//! in the accumulated bytes. [`find_terminator`] can resume from where the
//! previous search stopped, so a large upload arriving in many small reads
//! is scanned once rather than once per read.
//!
//! ## Decoding
//!
//! The framed bytes (terminator stripped) are split on the first `\r\n`:
//!
//! 1. **Header**: tokenized with POSIX shell quoting, so `GET "my file.txt"`
//!    yields one argument. The first token is the command, case-folded.
//!    There are no comments: `#` is an ordinary character.
//! 2. **Body**: everything after the header line, trimmed. Only `UPLOAD`
//!    carries one (the base64 file content).

use crate::protocol::types::{Request, CRLF, TERMINATOR};
use bytes::Bytes;
use thiserror::Error;

/// Errors that can occur while decoding a request.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Nothing but whitespace before the terminator
    #[error("empty request")]
    EmptyRequest,

    /// The header line is not valid UTF-8
    #[error("header is not valid UTF-8: {0}")]
    InvalidUtf8(String),

    /// Unbalanced quotes or a dangling escape in the header
    #[error("header cannot be tokenized: {0:?}")]
    BadQuoting(String),

    /// The first header token is empty
    #[error("empty command")]
    EmptyCommand,
}

/// Result type for decoding operations.
pub type ParseResult<T> = Result<T, ParseError>;

/// Finds the first terminator in `buf`, starting the scan at `from`.
///
/// Returns the offset of the terminator's first byte.
pub fn find_terminator(buf: &[u8], from: usize) -> Option<usize> {
    let start = from.min(buf.len());
    buf[start..]
        .windows(TERMINATOR.len())
        .position(|w| w == TERMINATOR)
        .map(|pos| start + pos)
}

/// Returns where the next terminator search should begin after `len` bytes
/// have been scanned without a match.
///
/// A terminator may straddle two reads, so the last three bytes are
/// scanned again.
pub fn resume_offset(len: usize) -> usize {
    len.saturating_sub(TERMINATOR.len() - 1)
}

/// Decodes a framed request (terminator already stripped).
///
/// # Example
///
/// ```
/// use filedock::protocol::decode;
///
/// let request = decode(b"GET \"my file.txt\"").unwrap();
/// assert_eq!(request.command, "get");
/// assert_eq!(request.arguments, vec!["my file.txt".to_string()]);
/// ```
pub fn decode(frame: &[u8]) -> ParseResult<Request> {
    let frame = frame.trim_ascii();
    if frame.is_empty() {
        return Err(ParseError::EmptyRequest);
    }

    let (header, body) = match find_crlf(frame) {
        Some(pos) => (&frame[..pos], &frame[pos + CRLF.len()..]),
        None => (frame, &[][..]),
    };

    let header =
        std::str::from_utf8(header).map_err(|e| ParseError::InvalidUtf8(e.to_string()))?;

    let mut tokens = split_header(header)?.into_iter();

    let command = match tokens.next() {
        Some(token) => token.trim().to_lowercase(),
        None => return Err(ParseError::EmptyCommand),
    };
    if command.is_empty() {
        return Err(ParseError::EmptyCommand);
    }

    Ok(Request {
        command,
        arguments: tokens.collect(),
        body: Bytes::copy_from_slice(body.trim_ascii()),
    })
}

/// Stands in for `#` while tokenizing.
///
/// shlex drops everything from a word starting with `#` as a comment;
/// headers have no comments, so `#` must tokenize like any other byte.
const HASH_STANDIN: char = '\u{E000}';

/// Splits a header into words using POSIX shell quoting, without comments.
fn split_header(header: &str) -> ParseResult<Vec<String>> {
    if header.contains(HASH_STANDIN) {
        return Err(ParseError::BadQuoting(header.to_string()));
    }

    let masked: String = header
        .chars()
        .map(|c| if c == '#' { HASH_STANDIN } else { c })
        .collect();
    let words = shlex::split(&masked).ok_or_else(|| ParseError::BadQuoting(header.to_string()))?;

    Ok(words
        .into_iter()
        .map(|word| word.replace(HASH_STANDIN, "#"))
        .collect())
}

/// Finds the position of the first CRLF in the buffer.
#[inline]
fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(CRLF.len()).position(|w| w == CRLF)
}
