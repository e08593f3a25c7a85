//! # filedock - A Remote File-Storage Server
//!
//! filedock serves a single directory over TCP. Clients list, download,
//! upload and delete whole files with a small text protocol: a command
//! line, an optional base64 body, and a blank line to end the request.
//! Every response is one JSON object followed by the same terminator.
//!
//! ## Features
//!
//! - **Simple framing**: requests and responses both end with `\r\n\r\n`
//! - **Bounded concurrency**: at most `max_workers` requests are served at
//!   once; other clients wait in the listen backlog
//! - **Two pool policies**: shared tokio tasks or isolated worker threads
//! - **Contained failures**: a bad request or a backend error becomes an
//!   `ERROR` response, never a server crash
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                              filedock                               │
//! │                                                                     │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐              │
//! │  │   Server    │───>│ Connection  │───>│  Command    │              │
//! │  │ accept loop │    │  Handler    │    │  Handler    │              │
//! │  └──────┬──────┘    └──────┬──────┘    └──────┬──────┘              │
//! │         │                  │                  │                     │
//! │         ▼                  ▼                  ▼                     │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐              │
//! │  │ WorkerPool  │    │  protocol   │    │  FileStore  │              │
//! │  │shared/isol. │    │ frame+JSON  │    │  root dir   │              │
//! │  └─────────────┘    └─────────────┘    └─────────────┘              │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```ignore
//! use filedock::config::Config;
//! use filedock::server::Server;
//! use filedock::storage::FileStore;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::default();
//!     let store = FileStore::open(&config.storage_root)?;
//!     Server::bind(&config, store).await?.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Supported Commands
//!
//! - `LIST` - names of the stored files
//! - `GET <filename>` - file content, base64-encoded
//! - `UPLOAD <filename>` followed by a base64 body
//! - `DELETE <filename>`
//!
//! Command names are case-insensitive. File names may be quoted the way a
//! POSIX shell quotes words.
//!
//! ## Module Overview
//!
//! - [`protocol`]: framing, request decoding, JSON responses, base64 payloads
//! - [`storage`]: the storage backend trait and the directory-backed store
//! - [`commands`]: request validation and dispatch
//! - [`connection`]: one request/response exchange per connection
//! - [`server`]: listening socket, accept loop and worker pools
//! - [`config`]: CLI and TOML configuration
//! - [`client`]: an async client for the protocol

pub mod client;
pub mod commands;
pub mod config;
pub mod connection;
pub mod protocol;
pub mod server;
pub mod storage;

// Re-export commonly used types for convenience
pub use client::{ClientError, FileClient};
pub use commands::CommandHandler;
pub use config::Config;
pub use connection::{handle_connection, ConnectionStats};
pub use protocol::{ParseError, Request, Response};
pub use server::{PoolPolicy, Server, ServerError};
pub use storage::{FileStore, StorageBackend, StorageError};

/// The default port filedock listens on
pub const DEFAULT_PORT: u16 = 7777;

/// The default host filedock binds to
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Version of filedock
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
