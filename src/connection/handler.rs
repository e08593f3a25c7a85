//! Connection Handler Module
//!
//! This module handles individual client connections to filedock.
//! Each connection carries exactly one request and one response.
//!
//! ## Connection Lifecycle
//!
//! ```text
//! 1. Accumulating ── read 8 KiB chunks until "\r\n\r\n" shows up
//!        │                 │
//!        │                 └── peer closes first ──┐
//!        ▼                                         │
//! 2. Framed ──────── strip the terminator,         │
//!        │           decode + dispatch (blocking   │
//!        │           pool, handler waits)          │
//!        ▼                                         │
//! 3. Responding ──── write the encoded response    │
//!        │           until every byte is flushed   │
//!        ▼                                         ▼
//! 4. Closed ──────── socket shut down, whatever happened
//! ```
//!
//! ## Buffer Management
//!
//! We use a BytesMut buffer to accumulate incoming data. TCP is a stream
//! protocol, so a request may arrive in any number of pieces and the
//! terminator may straddle two reads. The whole request is held in memory
//! before it is decoded; `max_request_bytes` caps how large that gets.

use crate::commands::{CommandHandler, UNRECOGNIZED_REQUEST};
use crate::protocol::{find_terminator, resume_offset, Response, TERMINATOR};
use crate::storage::StorageBackend;
use bytes::{BufMut, Bytes, BytesMut};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, error, info, trace, warn};

/// Bytes requested from the socket per read
pub const READ_CHUNK_SIZE: usize = 8 * 1024;

/// Default cap on a buffered request (512 MiB)
pub const DEFAULT_MAX_REQUEST_BYTES: usize = 512 * 1024 * 1024;

/// Per-connection limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionSettings {
    /// Give up on a peer that sends nothing for this long (None = wait forever)
    pub read_timeout: Option<Duration>,
    /// Close the connection once this many bytes are buffered without a terminator
    pub max_request_bytes: usize,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            read_timeout: None,
            max_request_bytes: DEFAULT_MAX_REQUEST_BYTES,
        }
    }
}

/// Statistics for connection handling
#[derive(Debug, Default)]
pub struct ConnectionStats {
    /// Total number of connections accepted
    pub connections_accepted: AtomicU64,
    /// Currently active connections
    pub active_connections: AtomicU64,
    /// Total requests answered
    pub requests_processed: AtomicU64,
    /// Requests answered with an ERROR status
    pub error_responses: AtomicU64,
    /// Total bytes read
    pub bytes_read: AtomicU64,
    /// Total bytes written
    pub bytes_written: AtomicU64,
}

impl ConnectionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connection_opened(&self) {
        self.connections_accepted.fetch_add(1, Ordering::Relaxed);
        self.active_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connection_closed(&self) {
        self.active_connections.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn request_processed(&self, response: &Response) {
        self.requests_processed.fetch_add(1, Ordering::Relaxed);
        if response.is_error() {
            self.error_responses.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn bytes_read(&self, count: usize) {
        self.bytes_read.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn bytes_written(&self, count: usize) {
        self.bytes_written
            .fetch_add(count as u64, Ordering::Relaxed);
    }
}

/// Handles a single client connection.
///
/// This struct owns the socket, the peer address and the accumulation
/// buffer for one request/response exchange.
pub struct ConnectionHandler<S, B> {
    /// The client stream
    stream: S,

    /// Client's address (for logging)
    addr: SocketAddr,

    /// Buffer for incoming data
    buffer: BytesMut,

    /// Offset where the next terminator search starts
    scanned: usize,

    /// The request dispatcher
    commands: CommandHandler<B>,

    /// Timeout and size limits
    settings: ConnectionSettings,

    /// Connection statistics (shared)
    stats: Arc<ConnectionStats>,
}

impl<S, B> ConnectionHandler<S, B>
where
    S: AsyncRead + AsyncWrite + Unpin,
    B: StorageBackend,
{
    /// Creates a new connection handler.
    ///
    /// # Arguments
    ///
    /// * `stream` - The client stream
    /// * `addr` - The client's socket address
    /// * `commands` - The dispatcher for the framed request
    /// * `stats` - Shared connection statistics
    /// * `settings` - Timeout and size limits
    pub fn new(
        stream: S,
        addr: SocketAddr,
        commands: CommandHandler<B>,
        stats: Arc<ConnectionStats>,
        settings: ConnectionSettings,
    ) -> Self {
        stats.connection_opened();

        Self {
            stream,
            addr,
            buffer: BytesMut::with_capacity(READ_CHUNK_SIZE),
            scanned: 0,
            commands,
            settings,
            stats,
        }
    }

    /// Runs the exchange to completion and closes the connection.
    ///
    /// The stream is shut down on every path, including errors and early
    /// disconnects.
    pub async fn run(mut self) -> Result<(), ConnectionError> {
        debug!(client = %self.addr, "Client connected");

        let result = self.exchange().await;

        if let Err(e) = self.stream.shutdown().await {
            trace!(client = %self.addr, error = %e, "Shutdown failed");
        }

        match &result {
            Ok(()) => debug!(client = %self.addr, "Exchange complete"),
            Err(e) => match e {
                ConnectionError::ClientDisconnected => {
                    debug!(client = %self.addr, "Client disconnected before sending a request")
                }
                ConnectionError::IoError(io_err)
                    if io_err.kind() == std::io::ErrorKind::ConnectionReset
                        || io_err.kind() == std::io::ErrorKind::BrokenPipe =>
                {
                    debug!(client = %self.addr, "Connection reset by client")
                }
                _ => warn!(client = %self.addr, error = %e, "Connection error"),
            },
        }

        self.stats.connection_closed();
        result
    }

    /// Accumulate, frame, dispatch, respond.
    async fn exchange(&mut self) -> Result<(), ConnectionError> {
        let frame = self.read_frame().await?;
        let response = self.process(frame).await;
        self.send_response(&response).await
    }

    /// Reads until a full request is buffered and returns it without the
    /// terminator.
    async fn read_frame(&mut self) -> Result<Bytes, ConnectionError> {
        loop {
            if let Some(pos) = find_terminator(&self.buffer, self.scanned) {
                let mut frame = self.buffer.split_to(pos + TERMINATOR.len()).freeze();
                frame.truncate(pos);

                if !self.buffer.is_empty() {
                    debug!(
                        client = %self.addr,
                        trailing = self.buffer.len(),
                        "Ignoring bytes after the request"
                    );
                }

                trace!(client = %self.addr, bytes = frame.len(), "Framed request");
                return Ok(frame);
            }

            self.scanned = resume_offset(self.buffer.len());

            if self.buffer.len() >= self.settings.max_request_bytes {
                return Err(ConnectionError::RequestTooLarge {
                    size: self.buffer.len(),
                    max: self.settings.max_request_bytes,
                });
            }

            self.read_more_data().await?;
        }
    }

    /// Reads one chunk from the socket into the buffer.
    async fn read_more_data(&mut self) -> Result<(), ConnectionError> {
        self.buffer.reserve(READ_CHUNK_SIZE);

        let mut chunk = (&mut self.buffer).limit(READ_CHUNK_SIZE);
        let read = self.stream.read_buf(&mut chunk);
        let n = match self.settings.read_timeout {
            Some(limit) => tokio::time::timeout(limit, read)
                .await
                .map_err(|_| ConnectionError::Timeout(limit))??,
            None => read.await?,
        };

        if n == 0 {
            // Connection closed by client
            if self.buffer.is_empty() {
                return Err(ConnectionError::ClientDisconnected);
            } else {
                // Partial request in buffer
                return Err(ConnectionError::UnexpectedEof);
            }
        }

        self.stats.bytes_read(n);
        trace!(
            client = %self.addr,
            bytes = n,
            buffered = self.buffer.len(),
            "Read data"
        );

        Ok(())
    }

    /// Runs the request on the blocking pool and waits for the response.
    async fn process(&self, frame: Bytes) -> Response {
        let commands = self.commands.clone();
        let response = match tokio::task::spawn_blocking(move || commands.execute(&frame)).await {
            Ok(response) => response,
            Err(e) => {
                error!(client = %self.addr, error = %e, "Request handler failed");
                Response::error(UNRECOGNIZED_REQUEST)
            }
        };

        self.stats.request_processed(&response);
        debug!(client = %self.addr, response = %response, "Request processed");
        response
    }

    /// Sends a response to the client.
    async fn send_response(&mut self, response: &Response) -> Result<(), ConnectionError> {
        let bytes = response.encode()?;
        self.stream.write_all(&bytes).await?;
        self.stream.flush().await?;
        self.stats.bytes_written(bytes.len());
        trace!(
            client = %self.addr,
            bytes = bytes.len(),
            "Sent response"
        );
        Ok(())
    }
}

/// Errors that can occur while handling a connection.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// I/O error (network issue)
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// The response could not be serialized
    #[error("Encode error: {0}")]
    Encode(#[from] serde_json::Error),

    /// Client disconnected without sending anything
    #[error("Client disconnected")]
    ClientDisconnected,

    /// Unexpected end of stream (partial request)
    #[error("Unexpected end of stream")]
    UnexpectedEof,

    /// Request size limit exceeded
    #[error("Request too large: {size} bytes buffered (max: {max})")]
    RequestTooLarge { size: usize, max: usize },

    /// The peer went silent
    #[error("No data received for {0:?}")]
    Timeout(Duration),
}

/// Handles a client connection.
///
/// This is a convenience function that creates a ConnectionHandler
/// and runs it to completion. Errors are logged, never propagated.
pub async fn handle_connection<S, B>(
    stream: S,
    addr: SocketAddr,
    commands: CommandHandler<B>,
    stats: Arc<ConnectionStats>,
    settings: ConnectionSettings,
) where
    S: AsyncRead + AsyncWrite + Unpin,
    B: StorageBackend,
{
    let handler = ConnectionHandler::new(stream, addr, commands, stats, settings);
    if let Err(e) = handler.run().await {
        trace!(client = %addr, error = %e, "Connection ended with error");
    }
    info!(client = %addr, "Connection closed");
}
