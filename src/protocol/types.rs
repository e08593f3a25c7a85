//! Wire Data Types
//!
//! This module defines the values exchanged over a filedock connection.
//!
//! ## Protocol Format
//!
//! A request is a header line, an optional body and a terminator:
//!
//! ```text
//! <COMMAND> <arg1> <arg2> ...\r\n<body>\r\n\r\n
//! ```
//!
//! A response is a single JSON object followed by the same terminator:
//!
//! ```text
//! {"status":"OK","data":["a.txt","b.bin"]}\r\n\r\n
//! {"status":"OK","data_namafile":"f.bin","data_file":"QUI="}\r\n\r\n
//! {"status":"OK","data":"f.bin uploaded successfully"}\r\n\r\n
//! {"status":"ERROR","data":"request tidak dikenali"}\r\n\r\n
//! ```
//!
//! The terminator can never occur inside a response: JSON escapes every
//! control character inside strings, and file contents travel as base64.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The CRLF sequence separating the header line from the body
pub const CRLF: &[u8] = b"\r\n";

/// The sequence that ends every request and response frame
pub const TERMINATOR: &[u8] = b"\r\n\r\n";

/// A decoded request.
///
/// Built once per connection from the framed buffer and never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// Command name, already case-folded to lowercase
    pub command: String,
    /// Header tokens after the command
    pub arguments: Vec<String>,
    /// Everything after the header line, trimmed of surrounding whitespace
    pub body: Bytes,
}

impl Request {
    /// Returns the number of header arguments.
    pub fn arity(&self) -> usize {
        self.arguments.len()
    }
}

/// Outcome marker carried in every response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    Ok,
    Error,
}

/// Operation-specific response fields.
///
/// Untagged: the variant is recognised by its field names and the JSON type
/// of `data`, so the wire shape stays flat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Payload {
    /// `get`: the file name and its base64 content
    File {
        data_namafile: String,
        data_file: String,
    },
    /// `list`: the file names in the store
    Listing { data: Vec<String> },
    /// `upload`, `delete` and every error: a human-readable message
    Message { data: String },
}

/// A response, serialized as one flat JSON object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub status: Status,
    #[serde(flatten)]
    pub payload: Payload,
}

impl Response {
    /// Creates a successful listing response.
    ///
    /// # Example
    /// ```
    /// use filedock::protocol::Response;
    /// let resp = Response::listing(vec!["a.txt".to_string()]);
    /// assert!(resp.is_ok());
    /// ```
    pub fn listing(names: Vec<String>) -> Self {
        Response {
            status: Status::Ok,
            payload: Payload::Listing { data: names },
        }
    }

    /// Creates a successful download response from already-encoded content.
    pub fn file(name: impl Into<String>, encoded: impl Into<String>) -> Self {
        Response {
            status: Status::Ok,
            payload: Payload::File {
                data_namafile: name.into(),
                data_file: encoded.into(),
            },
        }
    }

    /// Creates a successful response carrying a message.
    pub fn message(msg: impl Into<String>) -> Self {
        Response {
            status: Status::Ok,
            payload: Payload::Message { data: msg.into() },
        }
    }

    /// Creates an error response.
    ///
    /// # Example
    /// ```
    /// use filedock::protocol::Response;
    /// let err = Response::error("request tidak dikenali");
    /// assert!(err.is_error());
    /// ```
    pub fn error(msg: impl Into<String>) -> Self {
        Response {
            status: Status::Error,
            payload: Payload::Message { data: msg.into() },
        }
    }

    /// Returns true if the status is `OK`.
    pub fn is_ok(&self) -> bool {
        self.status == Status::Ok
    }

    /// Returns true if the status is `ERROR`.
    pub fn is_error(&self) -> bool {
        self.status == Status::Error
    }

    /// Returns the message of a message-carrying response.
    pub fn message_text(&self) -> Option<&str> {
        match &self.payload {
            Payload::Message { data } => Some(data),
            _ => None,
        }
    }

    /// Serializes the response to its wire form, terminator included.
    pub fn encode(&self) -> Result<Vec<u8>, serde_json::Error> {
        let mut buf = Vec::new();
        self.encode_into(&mut buf)?;
        Ok(buf)
    }

    /// Serializes the response into an existing buffer.
    pub fn encode_into(&self, buf: &mut Vec<u8>) -> Result<(), serde_json::Error> {
        serde_json::to_writer(&mut *buf, self)?;
        buf.extend_from_slice(TERMINATOR);
        Ok(())
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = match self.status {
            Status::Ok => "OK",
            Status::Error => "ERROR",
        };
        match &self.payload {
            Payload::File {
                data_namafile,
                data_file,
            } => write!(
                f,
                "{} {} ({} base64 chars)",
                status,
                data_namafile,
                data_file.len()
            ),
            Payload::Listing { data } => write!(f, "{} [{} files]", status, data.len()),
            Payload::Message { data } => write!(f, "{} {}", status, data),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_listing_encode() {
        let resp = Response::listing(vec![]);
        assert_eq!(resp.encode().unwrap(), b"{\"status\":\"OK\",\"data\":[]}\r\n\r\n");
    }

    #[test]
    fn test_message_encode() {
        let resp = Response::message("f.bin uploaded successfully");
        assert_eq!(
            resp.encode().unwrap(),
            b"{\"status\":\"OK\",\"data\":\"f.bin uploaded successfully\"}\r\n\r\n"
        );
    }

    #[test]
    fn test_file_encode() {
        let resp = Response::file("f.bin", "QUI=");
        assert_eq!(
            resp.encode().unwrap(),
            b"{\"status\":\"OK\",\"data_namafile\":\"f.bin\",\"data_file\":\"QUI=\"}\r\n\r\n"
        );
    }

    #[test]
    fn test_error_encode() {
        let resp = Response::error("request tidak dikenali");
        assert_eq!(
            resp.encode().unwrap(),
            b"{\"status\":\"ERROR\",\"data\":\"request tidak dikenali\"}\r\n\r\n"
        );
    }

    #[test]
    fn test_encoded_body_never_contains_terminator() {
        let resp = Response::error("line one\r\n\r\nline two");
        let encoded = resp.encode().unwrap();
        let body = &encoded[..encoded.len() - TERMINATOR.len()];
        assert!(!body.windows(TERMINATOR.len()).any(|w| w == TERMINATOR));
    }

    #[test]
    fn test_decode_each_shape() {
        let listing: Response = serde_json::from_str(r#"{"status":"OK","data":["a.txt"]}"#).unwrap();
        assert_eq!(listing, Response::listing(vec!["a.txt".to_string()]));

        let file: Response =
            serde_json::from_str(r#"{"status":"OK","data_namafile":"f.bin","data_file":"QUI="}"#)
                .unwrap();
        assert_eq!(file, Response::file("f.bin", "QUI="));

        let error: Response = serde_json::from_str(r#"{"status":"ERROR","data":"nope"}"#).unwrap();
        assert!(error.is_error());
        assert_eq!(error.message_text(), Some("nope"));
    }

    #[test]
    fn test_display() {
        assert_eq!(Response::message("done").to_string(), "OK done");
        assert_eq!(Response::listing(vec![]).to_string(), "OK [0 files]");
    }
}
