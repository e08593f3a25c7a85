//! Server Module
//!
//! Owns the listening socket and the worker pool. The accept loop takes a
//! worker slot *before* accepting, so at most `max_workers` requests are
//! served at once and further clients wait in the kernel's listen backlog.
//!
//! ## Architecture
//!
//! ```text
//!            ┌────────────────────────────┐
//!  clients ─>│ listen backlog (kernel)    │
//!            └─────────────┬──────────────┘
//!                          │ slot acquired, then accept()
//!                          ▼
//!            ┌────────────────────────────┐
//!            │ Server::run (accept loop)  │
//!            └─────────────┬──────────────┘
//!                          │ dispatch(Accepted)
//!              ┌───────────┴────────────┐
//!              ▼                        ▼
//!      ┌───────────────┐       ┌─────────────────┐
//!      │  SharedPool   │       │  IsolatedPool   │
//!      │ tokio tasks,  │       │ OS threads, one │
//!      │ one backend   │       │ backend each    │
//!      └───────────────┘       └─────────────────┘
//! ```
//!
//! The slot travels with the connection and is released when the worker
//! finishes with it, whether the exchange succeeded or not.

pub mod isolated;
pub mod shared;

pub use isolated::IsolatedPool;
pub use shared::SharedPool;

use crate::config::{Config, ConfigError};
use crate::connection::ConnectionStats;
use crate::storage::StorageBackend;
use serde::Deserialize;
use std::fmt;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::{TcpListener, TcpSocket, TcpStream};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{error, info, warn};

/// How workers are isolated from each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PoolPolicy {
    /// Lightweight tasks in one runtime, all sharing one backend
    #[default]
    #[serde(alias = "thread")]
    #[value(alias = "thread")]
    Shared,
    /// Dedicated OS threads, each with its own runtime and backend handle
    #[serde(alias = "process")]
    #[value(alias = "process")]
    Isolated,
}

impl fmt::Display for PoolPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PoolPolicy::Shared => write!(f, "shared"),
            PoolPolicy::Isolated => write!(f, "isolated"),
        }
    }
}

/// An accepted connection together with the worker slot it occupies.
#[derive(Debug)]
pub struct Accepted {
    pub stream: TcpStream,
    pub addr: SocketAddr,
    /// Released when the worker is done with the connection
    pub slot: OwnedSemaphorePermit,
}

/// A pool of workers that serve accepted connections.
pub trait WorkerPool: Send + Sync {
    /// The isolation model of this pool
    fn policy(&self) -> PoolPolicy;

    /// Hands a connection to a worker without waiting for it to be served.
    fn dispatch(&self, conn: Accepted) -> Result<(), ServerError>;
}

/// Server errors
#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    /// Every worker has exited
    #[error("Worker pool has shut down")]
    PoolClosed,
}

/// The file server: a listening socket plus a worker pool.
pub struct Server {
    listener: TcpListener,
    pool: Box<dyn WorkerPool>,
    slots: Arc<Semaphore>,
    max_workers: usize,
    stats: Arc<ConnectionStats>,
}

impl Server {
    /// Binds the listening socket and starts the pool chosen by `config.policy`.
    pub async fn bind<B>(config: &Config, backend: B) -> Result<Self, ServerError>
    where
        B: StorageBackend + Clone,
    {
        config.validate()?;

        let listener = bind_listener(&config.host, config.port, config.backlog)
            .await
            .map_err(|source| ServerError::Bind {
                addr: config.bind_address(),
                source,
            })?;

        let stats = Arc::new(ConnectionStats::new());
        let settings = config.connection_settings();

        let pool: Box<dyn WorkerPool> = match config.policy {
            PoolPolicy::Shared => Box::new(SharedPool::new(
                Arc::new(backend),
                Arc::clone(&stats),
                settings,
            )),
            PoolPolicy::Isolated => Box::new(IsolatedPool::spawn(
                backend,
                config.max_workers,
                Arc::clone(&stats),
                settings,
            )?),
        };

        Ok(Self {
            listener,
            pool,
            slots: Arc::new(Semaphore::new(config.max_workers)),
            max_workers: config.max_workers,
            stats,
        })
    }

    /// The address actually bound (useful with port 0).
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn stats(&self) -> Arc<ConnectionStats> {
        Arc::clone(&self.stats)
    }

    pub fn policy(&self) -> PoolPolicy {
        self.pool.policy()
    }

    /// Runs the accept loop until the pool shuts down.
    ///
    /// Accept failures are logged and the loop continues.
    pub async fn run(self) -> Result<(), ServerError> {
        info!(
            address = %self.local_addr()?,
            policy = %self.pool.policy(),
            max_workers = self.max_workers,
            "Server listening"
        );

        loop {
            let slot = Arc::clone(&self.slots)
                .acquire_owned()
                .await
                .map_err(|_| ServerError::PoolClosed)?;

            let (stream, addr) = match self.listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    error!(error = %e, "Failed to accept connection");
                    continue;
                }
            };

            info!(client = %addr, "Connection from");
            match self.pool.dispatch(Accepted { stream, addr, slot }) {
                Ok(()) => {}
                Err(ServerError::PoolClosed) => return Err(ServerError::PoolClosed),
                Err(e) => warn!(client = %addr, error = %e, "Failed to dispatch connection"),
            }
        }
    }
}

/// Resolves `host` and listens on the first address that binds.
async fn bind_listener(host: &str, port: u16, backlog: u32) -> io::Result<TcpListener> {
    let mut last_err = None;

    for addr in tokio::net::lookup_host((host, port)).await? {
        match listen_on(addr, backlog) {
            Ok(listener) => return Ok(listener),
            Err(e) => last_err = Some(e),
        }
    }

    Err(last_err.unwrap_or_else(|| {
        io::Error::new(
            io::ErrorKind::AddrNotAvailable,
            format!("no address found for {}", host),
        )
    }))
}

fn listen_on(addr: SocketAddr, backlog: u32) -> io::Result<TcpListener> {
    let socket = if addr.is_ipv4() {
        TcpSocket::new_v4()?
    } else {
        TcpSocket::new_v6()?
    };
    socket.set_reuseaddr(true)?;
    socket.bind(addr)?;
    socket.listen(backlog)
}
