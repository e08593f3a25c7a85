//! Command Handler Module
//!
//! This module implements the request dispatch layer for filedock.
//! It receives framed requests, validates them against the command table,
//! executes them against the storage backend, and returns the response.
//!
//! ## Architecture
//!
//! ```text
//! Framed request
//!       │
//!       ▼
//! ┌─────────────────┐
//! │  decode()       │  (protocol module)
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │ CommandHandler  │  (this module)
//! │                 │
//! │  - Validate     │
//! │  - Dispatch     │
//! │  - Shape reply  │
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │ StorageBackend  │  (storage module)
//! └─────────────────┘
//! ```
//!
//! ## Supported Commands
//!
//! - `LIST` - names of the stored files
//! - `GET <filename>` - file content, base64-encoded
//! - `UPLOAD <filename>` + base64 body - store a file
//! - `DELETE <filename>` - remove a file

pub mod command;
pub mod handler;

// Re-export the main command handler
pub use command::{Command, CommandMismatch};
pub use handler::{CommandHandler, RequestError, UNRECOGNIZED_REQUEST};
