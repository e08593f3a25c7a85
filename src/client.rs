//! Client for the filedock protocol.
//!
//! Each call opens a fresh connection, sends one framed request, reads
//! until the terminator (or until the server closes) and parses the JSON
//! response.
//!
//! Uploads are base64-encoded in fixed-size chunks written back to back,
//! so a large file never needs a second full-size encoding buffer on the
//! sending side. The server decodes the concatenation as one payload.

use crate::connection::READ_CHUNK_SIZE;
use crate::protocol::{
    decode_payload, encode_chunked, find_terminator, resume_offset, Payload, Response, Status,
    CRLF, TERMINATOR,
};
use bytes::BytesMut;
use std::borrow::Cow;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::trace;

/// Raw bytes encoded per upload chunk (10 MiB)
pub const DEFAULT_CHUNK_SIZE: usize = 10 * 1024 * 1024;

/// Errors returned by [`FileClient`].
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid file content in response: {0}")]
    Payload(#[from] base64::DecodeError),

    /// The server answered with status ERROR
    #[error("server error: {0}")]
    Server(String),

    /// The server answered OK with a payload that does not fit the request
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    /// The file name cannot be sent in a request header
    #[error("file name cannot be quoted: {0:?}")]
    InvalidName(String),
}

/// A client for one filedock server.
///
/// # Example
///
/// ```ignore
/// use filedock::client::FileClient;
///
/// let client = FileClient::new("127.0.0.1:7777");
/// client.upload("notes.txt", b"hello").await?;
/// assert_eq!(client.get("notes.txt").await?, b"hello");
/// ```
#[derive(Debug, Clone)]
pub struct FileClient {
    addr: String,
    chunk_size: usize,
}

impl FileClient {
    /// Creates a client for the server at `addr` (`host:port`).
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// Sets how many raw bytes are encoded per upload chunk.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Returns the server address.
    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Sends a raw, already-framed request and parses the response.
    pub async fn send(&self, request: &[u8]) -> Result<Response, ClientError> {
        let mut stream = TcpStream::connect(self.addr.as_str()).await?;
        stream.write_all(request).await?;
        stream.flush().await?;

        let mut buffer = BytesMut::with_capacity(READ_CHUNK_SIZE);
        let mut scanned = 0;
        let end = loop {
            if let Some(pos) = find_terminator(&buffer, scanned) {
                break pos;
            }
            scanned = resume_offset(buffer.len());

            let n = stream.read_buf(&mut buffer).await?;
            if n == 0 {
                // Server closed without a terminator; parse what arrived
                break buffer.len();
            }
        };

        trace!(server = %self.addr, bytes = end, "Received response");
        Ok(serde_json::from_slice(&buffer[..end])?)
    }

    /// Lists the files stored on the server.
    pub async fn list(&self) -> Result<Vec<String>, ClientError> {
        let response = self.send(&frame("LIST", None, None)?).await?;
        match expect_ok(response)? {
            Payload::Listing { data } => Ok(data),
            other => Err(unexpected(other)),
        }
    }

    /// Downloads `name`.
    pub async fn get(&self, name: &str) -> Result<Vec<u8>, ClientError> {
        let response = self.send(&frame("GET", Some(name), None)?).await?;
        match expect_ok(response)? {
            Payload::File { data_file, .. } => Ok(decode_payload(&data_file)?),
            other => Err(unexpected(other)),
        }
    }

    /// Uploads `data` as `name` and returns the server's message.
    pub async fn upload(&self, name: &str, data: &[u8]) -> Result<String, ClientError> {
        let body = encode_chunked(data, self.chunk_size);
        let response = self.send(&frame("UPLOAD", Some(name), Some(&body))?).await?;
        expect_message(response)
    }

    /// Deletes `name` and returns the server's message.
    pub async fn delete(&self, name: &str) -> Result<String, ClientError> {
        let response = self.send(&frame("DELETE", Some(name), None)?).await?;
        expect_message(response)
    }
}

/// Builds a framed request, shell-quoting the file name.
fn frame(command: &str, name: Option<&str>, body: Option<&str>) -> Result<Vec<u8>, ClientError> {
    let mut out = Vec::with_capacity(command.len() + body.map_or(0, str::len) + 32);
    out.extend_from_slice(command.as_bytes());

    if let Some(name) = name {
        let quoted: Cow<'_, str> =
            shlex::try_quote(name).map_err(|_| ClientError::InvalidName(name.to_string()))?;
        out.push(b' ');
        out.extend_from_slice(quoted.as_bytes());
    }

    if let Some(body) = body {
        out.extend_from_slice(CRLF);
        out.extend_from_slice(body.as_bytes());
    }
    out.extend_from_slice(TERMINATOR);
    Ok(out)
}

fn expect_ok(response: Response) -> Result<Payload, ClientError> {
    match response.status {
        Status::Ok => Ok(response.payload),
        Status::Error => Err(ClientError::Server(
            response.message_text().unwrap_or_default().to_string(),
        )),
    }
}

fn expect_message(response: Response) -> Result<String, ClientError> {
    match expect_ok(response)? {
        Payload::Message { data } => Ok(data),
        other => Err(unexpected(other)),
    }
}

fn unexpected(payload: Payload) -> ClientError {
    ClientError::UnexpectedResponse(format!("{:?}", payload))
}
