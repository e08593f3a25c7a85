//! Connection Handler Module
//!
//! This module manages individual client connections to filedock.
//! Each accepted connection is driven by one worker from the server's
//! pool, from the first byte read until the socket is closed.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Server (accept loop)                    │
//! └──────────────────────┬──────────────────────────────────────┘
//!                        │
//!                        │ accept() + worker slot
//!                        ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 ConnectionHandler                           │
//! │                                                             │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐     │
//! │  │ Accumulate  │───>│  Dispatch   │───>│  Respond    │     │
//! │  └─────────────┘    └─────────────┘    └─────────────┘     │
//! │                                               │             │
//! │                                               ▼             │
//! │                                      ┌─────────────┐        │
//! │                                      │   Close     │        │
//! │                                      └─────────────┘        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Features
//!
//! - **One exchange per connection**: no pipelining; extra bytes after the
//!   terminator are ignored
//! - **Buffer Management**: a BytesMut accumulator, scanned incrementally
//! - **Limits**: optional idle read timeout and a request size cap
//! - **Statistics**: Tracks connection and request metrics
//!
//! ## Example
//!
//! ```ignore
//! use filedock::connection::{handle_connection, ConnectionSettings, ConnectionStats};
//! use filedock::commands::CommandHandler;
//! use filedock::storage::FileStore;
//! use std::sync::Arc;
//!
//! let store = Arc::new(FileStore::open("files")?);
//! let stats = Arc::new(ConnectionStats::new());
//! let commands = CommandHandler::new(store);
//!
//! let (stream, addr) = listener.accept().await?;
//! tokio::spawn(handle_connection(stream, addr, commands, stats, ConnectionSettings::default()));
//! ```

pub mod handler;

// Re-export commonly used types
pub use handler::{
    handle_connection, ConnectionError, ConnectionHandler, ConnectionSettings, ConnectionStats,
    DEFAULT_MAX_REQUEST_BYTES, READ_CHUNK_SIZE,
};
