//! Request Dispatcher
//!
//! This module turns a framed request into a response: it decodes the
//! frame, validates it against the command table, calls the storage
//! backend and shapes the result.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     CommandHandler                          │
//! │                                                             │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐     │
//! │  │  decode()   │───>│  validate   │───>│  dispatch() │     │
//! │  └─────────────┘    └─────────────┘    └─────────────┘     │
//! │                                               │             │
//! │                                               ▼             │
//! │                                      StorageBackend         │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Error Policy
//!
//! Every failure becomes an `ERROR` response. Requests that cannot be
//! decoded or validated all get the same generic message; backend failures
//! carry the backend's short message, which names the file but never a
//! filesystem path.

use crate::commands::command::{Command, CommandMismatch};
use crate::protocol::{decode, encode_payload, ParseError, Response};
use crate::storage::{StorageBackend, StorageError};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

/// Message returned for any request that is not understood.
pub const UNRECOGNIZED_REQUEST: &str = "request tidak dikenali";

/// Everything that can go wrong between a framed request and a response.
#[derive(Debug, Error)]
pub enum RequestError {
    /// The frame could not be decoded
    #[error("malformed request: {0}")]
    Malformed(#[from] ParseError),

    /// The command is not in the table
    #[error("unknown command '{0}'")]
    UnknownCommand(String),

    /// The command exists but its arguments do not fit
    #[error("wrong arguments for '{command}': expected {expected}, got {got}")]
    ArgumentMismatch {
        command: &'static str,
        expected: &'static str,
        got: usize,
    },

    /// The storage backend failed
    #[error(transparent)]
    Backend(#[from] StorageError),
}

impl From<CommandMismatch> for RequestError {
    fn from(mismatch: CommandMismatch) -> Self {
        match mismatch {
            CommandMismatch::Unknown(name) => RequestError::UnknownCommand(name),
            CommandMismatch::Arity {
                command,
                expected,
                got,
            } => RequestError::ArgumentMismatch {
                command,
                expected,
                got,
            },
        }
    }
}

impl RequestError {
    /// The message sent to the client for this error.
    pub fn client_message(&self) -> String {
        match self {
            RequestError::Backend(e) => e.to_string(),
            _ => UNRECOGNIZED_REQUEST.to_string(),
        }
    }

    /// Converts the error into the `ERROR` response sent to the client.
    pub fn into_response(self) -> Response {
        Response::error(self.client_message())
    }
}

/// Dispatches requests to a storage backend.
///
/// Cloning is cheap: clones share the same backend.
pub struct CommandHandler<B> {
    backend: Arc<B>,
}

impl<B> Clone for CommandHandler<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
        }
    }
}

impl<B: StorageBackend> CommandHandler<B> {
    /// Creates a new command handler over the given backend.
    pub fn new(backend: Arc<B>) -> Self {
        Self { backend }
    }

    /// Returns the backend this handler dispatches to.
    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    /// Executes a framed request (terminator stripped) and returns the
    /// response to send back.
    ///
    /// Never fails: every error is folded into an `ERROR` response.
    pub fn execute(&self, frame: &[u8]) -> Response {
        match self.try_execute(frame) {
            Ok(response) => response,
            Err(e) => {
                match &e {
                    RequestError::Backend(inner) => debug!(error = %inner, "Backend failure"),
                    other => warn!(error = %other, "Rejected request"),
                }
                e.into_response()
            }
        }
    }

    /// Decodes, validates and dispatches a framed request.
    pub fn try_execute(&self, frame: &[u8]) -> Result<Response, RequestError> {
        let request = decode(frame)?;
        debug!(command = %request.command, args = request.arity(), "Processing request");
        let command = Command::from_request(request)?;
        Ok(self.dispatch(command)?)
    }

    /// Runs a validated command against the backend.
    pub fn dispatch(&self, command: Command) -> Result<Response, StorageError> {
        match command {
            Command::List => Ok(Response::listing(self.backend.list()?)),
            Command::Get { filename } => {
                let data = self.backend.download(&filename)?;
                Ok(Response::file(filename, encode_payload(&data)))
            }
            Command::Upload { filename, content } => {
                self.backend.upload(&filename, &content)?;
                Ok(Response::message(format!("{} uploaded successfully", filename)))
            }
            Command::Delete { filename } => {
                self.backend.delete(&filename)?;
                Ok(Response::message(format!("{} deleted successfully", filename)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{decode_payload, Payload};
    use crate::storage::FileStore;
    use tempfile::TempDir;

    fn create_handler() -> (TempDir, CommandHandler<FileStore>) {
        let dir = TempDir::new().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        (dir, CommandHandler::new(Arc::new(store)))
    }

    #[test]
    fn test_list_empty() {
        let (_dir, handler) = create_handler();
        assert_eq!(handler.execute(b"LIST"), Response::listing(vec![]));
    }

    #[test]
    fn test_upload_then_get() {
        let (_dir, handler) = create_handler();

        let response = handler.execute(b"UPLOAD f.bin\r\nQUI=");
        assert_eq!(response, Response::message("f.bin uploaded successfully"));

        let response = handler.execute(b"GET f.bin");
        assert_eq!(response, Response::file("f.bin", "QUI="));
    }

    #[test]
    fn test_upload_round_trip_preserves_bytes() {
        let (_dir, handler) = create_handler();
        let original: Vec<u8> = (0..4096u32).map(|i| (i * 31 % 256) as u8).collect();

        let mut frame = b"UPLOAD data.bin\r\n".to_vec();
        frame.extend_from_slice(crate::protocol::encode_chunked(&original, 1000).as_bytes());
        assert!(handler.execute(&frame).is_ok());

        match handler.execute(b"GET data.bin").payload {
            Payload::File { data_file, .. } => {
                assert_eq!(decode_payload(&data_file).unwrap(), original)
            }
            other => panic!("unexpected payload: {:?}", other),
        }
    }

    #[test]
    fn test_list_and_delete() {
        let (_dir, handler) = create_handler();
        handler.execute(b"UPLOAD a.txt\r\nQQ==");

        assert_eq!(
            handler.execute(b"list"),
            Response::listing(vec!["a.txt".to_string()])
        );

        assert_eq!(
            handler.execute(b"DELETE a.txt"),
            Response::message("a.txt deleted successfully")
        );
        assert_eq!(handler.execute(b"LIST"), Response::listing(vec![]));
    }

    #[test]
    fn test_unknown_command() {
        let (_dir, handler) = create_handler();
        assert_eq!(
            handler.execute(b"RENAME a.txt b.txt"),
            Response::error(UNRECOGNIZED_REQUEST)
        );
    }

    #[test]
    fn test_malformed_requests_get_generic_error() {
        let (_dir, handler) = create_handler();
        for frame in [&b""[..], b"GET \"open", b"\"\"", b"GET", b"DELETE a b", b"UPLOAD f.bin"] {
            assert_eq!(
                handler.execute(frame),
                Response::error(UNRECOGNIZED_REQUEST),
                "frame {:?}",
                String::from_utf8_lossy(frame)
            );
        }
    }

    #[test]
    fn test_hash_words_count_as_arguments() {
        let (_dir, handler) = create_handler();
        handler.execute(b"UPLOAD a\r\nQQ==");
        handler.execute(b"UPLOAD #notes.txt\r\nQUI=");

        assert_eq!(
            handler.execute(b"DELETE a #b"),
            Response::error(UNRECOGNIZED_REQUEST)
        );
        assert_eq!(
            handler.execute(b"GET #notes.txt"),
            Response::file("#notes.txt", "QUI=")
        );
        assert_eq!(
            handler.execute(b"LIST"),
            Response::listing(vec!["#notes.txt".to_string(), "a".to_string()])
        );
    }

    #[test]
    fn test_bad_base64_is_an_error_not_a_crash() {
        let (_dir, handler) = create_handler();
        let response = handler.execute(b"UPLOAD f.bin\r\n!!not-base64!!");
        assert!(response.is_error());
        assert!(response.message_text().unwrap().contains("f.bin"));
    }

    #[test]
    fn test_get_missing_file() {
        let (_dir, handler) = create_handler();
        let response = handler.execute(b"GET missing.txt");
        assert_eq!(response, Response::error("file not found: missing.txt"));
    }

    #[test]
    fn test_try_execute_classifies_errors() {
        let (_dir, handler) = create_handler();
        assert!(matches!(
            handler.try_execute(b""),
            Err(RequestError::Malformed(ParseError::EmptyRequest))
        ));
        assert!(matches!(
            handler.try_execute(b"PING"),
            Err(RequestError::UnknownCommand(name)) if name == "ping"
        ));
        assert!(matches!(
            handler.try_execute(b"GET"),
            Err(RequestError::ArgumentMismatch { command: "get", .. })
        ));
        assert!(matches!(
            handler.try_execute(b"DELETE nope.txt"),
            Err(RequestError::Backend(StorageError::NotFound(_)))
        ));
    }

    #[test]
    fn test_clones_share_backend() {
        let (_dir, handler) = create_handler();
        let other = handler.clone();
        handler.execute(b"UPLOAD shared.txt\r\nQQ==");
        assert_eq!(
            other.execute(b"LIST"),
            Response::listing(vec!["shared.txt".to_string()])
        );
        assert!(Arc::ptr_eq(handler.backend(), other.backend()));
    }
}
