//! Task-per-connection pool.
//!
//! Every connection becomes a tokio task in the server's runtime and all
//! tasks share one backend. The server's semaphore bounds how many run at
//! once; the pool itself never queues.

use super::{Accepted, PoolPolicy, ServerError, WorkerPool};
use crate::commands::CommandHandler;
use crate::connection::{handle_connection, ConnectionSettings, ConnectionStats};
use crate::storage::StorageBackend;
use std::sync::Arc;

/// Lightweight workers over one shared backend.
pub struct SharedPool<B> {
    commands: CommandHandler<B>,
    stats: Arc<ConnectionStats>,
    settings: ConnectionSettings,
}

impl<B: StorageBackend> SharedPool<B> {
    pub fn new(backend: Arc<B>, stats: Arc<ConnectionStats>, settings: ConnectionSettings) -> Self {
        Self {
            commands: CommandHandler::new(backend),
            stats,
            settings,
        }
    }
}

impl<B: StorageBackend> WorkerPool for SharedPool<B> {
    fn policy(&self) -> PoolPolicy {
        PoolPolicy::Shared
    }

    fn dispatch(&self, conn: Accepted) -> Result<(), ServerError> {
        let Accepted { stream, addr, slot } = conn;
        let commands = self.commands.clone();
        let stats = Arc::clone(&self.stats);
        let settings = self.settings;

        // A panicking task drops its future, and the slot with it
        tokio::spawn(async move {
            handle_connection(stream, addr, commands, stats, settings).await;
            drop(slot);
        });

        Ok(())
    }
}
