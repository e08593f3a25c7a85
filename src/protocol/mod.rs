//! Wire Protocol Implementation
//!
//! This module implements the filedock wire protocol: a text header line,
//! an optional base64 body, and a `\r\n\r\n` terminator on the way in; a
//! JSON object and the same terminator on the way out.
//!
//! ## Modules
//!
//! - `types`: `Request`, `Response` and the framing constants
//! - `parser`: framing search and request decoding
//! - `payload`: base64 handling for file contents
//!
//! ## Example
//!
//! ```
//! use filedock::protocol::{decode, find_terminator, Response};
//!
//! let data = b"GET f.bin\r\n\r\n";
//! let end = find_terminator(data, 0).unwrap();
//! let request = decode(&data[..end]).unwrap();
//! assert_eq!(request.command, "get");
//!
//! let bytes = Response::file("f.bin", "QUI=").encode().unwrap();
//! assert!(bytes.ends_with(b"\r\n\r\n"));
//! ```

pub mod parser;
pub mod payload;
pub mod types;

// Re-export commonly used types for convenience
pub use parser::{decode, find_terminator, resume_offset, ParseError, ParseResult};
pub use payload::{decode_payload, encode_chunked, encode_payload};
pub use types::{Payload, Request, Response, Status, CRLF, TERMINATOR};
