//! Thread-per-worker pool.
//!
//! Each worker is a dedicated OS thread running its own single-threaded
//! runtime with its own clone of the backend. Connections are handed over
//! through a channel as std sockets and re-registered in the worker's
//! runtime. A panic while serving one connection is contained to that
//! connection; the worker logs it and takes the next job.
//!
//! Workers still share the process's memory. They are isolated only in
//! that each owns its runtime and its backend clone; nothing is shared
//! between them except the job queue and the statistics counters.

use super::{Accepted, PoolPolicy, ServerError, WorkerPool};
use crate::commands::CommandHandler;
use crate::connection::{handle_connection, ConnectionSettings, ConnectionStats};
use crate::storage::StorageBackend;
use std::io;
use std::net::SocketAddr;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use tokio::net::TcpStream;
use tokio::runtime::Runtime;
use tokio::sync::OwnedSemaphorePermit;
use tracing::{debug, error, warn};

/// A connection waiting for a worker.
struct Job {
    stream: std::net::TcpStream,
    addr: SocketAddr,
    slot: OwnedSemaphorePermit,
}

/// Fixed set of worker threads fed from one queue.
///
/// Dropping the pool closes the queue; idle workers then exit.
pub struct IsolatedPool {
    queue: Sender<Job>,
    workers: usize,
}

impl IsolatedPool {
    /// Starts `workers` threads, each with its own runtime and backend clone.
    pub fn spawn<B>(
        backend: B,
        workers: usize,
        stats: Arc<ConnectionStats>,
        settings: ConnectionSettings,
    ) -> io::Result<Self>
    where
        B: StorageBackend + Clone,
    {
        let (queue, jobs) = mpsc::channel::<Job>();
        let jobs = Arc::new(Mutex::new(jobs));

        for id in 0..workers {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()?;

            let worker = Worker {
                id,
                runtime,
                commands: CommandHandler::new(Arc::new(backend.clone())),
                stats: Arc::clone(&stats),
                settings,
            };
            let jobs = Arc::clone(&jobs);

            thread::Builder::new()
                .name(format!("isolated-worker-{}", id))
                .spawn(move || worker.run(jobs))?;
        }

        debug!(workers, "Isolated worker pool started");
        Ok(Self { queue, workers })
    }

    pub fn workers(&self) -> usize {
        self.workers
    }
}

impl WorkerPool for IsolatedPool {
    fn policy(&self) -> PoolPolicy {
        PoolPolicy::Isolated
    }

    fn dispatch(&self, conn: Accepted) -> Result<(), ServerError> {
        let Accepted { stream, addr, slot } = conn;
        // Stays non-blocking, as TcpStream::from_std requires
        let stream = stream.into_std()?;

        self.queue
            .send(Job { stream, addr, slot })
            .map_err(|_| ServerError::PoolClosed)
    }
}

struct Worker<B> {
    id: usize,
    runtime: Runtime,
    commands: CommandHandler<B>,
    stats: Arc<ConnectionStats>,
    settings: ConnectionSettings,
}

impl<B: StorageBackend> Worker<B> {
    fn run(self, jobs: Arc<Mutex<Receiver<Job>>>) {
        debug!(worker = self.id, "Worker started");

        loop {
            let next = {
                let jobs = jobs.lock().unwrap_or_else(PoisonError::into_inner);
                jobs.recv()
            };
            let Ok(job) = next else { break };

            let addr = job.addr;
            let outcome =
                panic::catch_unwind(AssertUnwindSafe(|| self.runtime.block_on(self.serve(job))));
            if outcome.is_err() {
                error!(worker = self.id, client = %addr, "Worker panicked while serving connection");
            }
        }

        debug!(worker = self.id, "Worker stopped");
    }

    async fn serve(&self, job: Job) {
        let Job { stream, addr, slot } = job;
        let _slot = slot;

        let stream = match TcpStream::from_std(stream) {
            Ok(stream) => stream,
            Err(e) => {
                warn!(worker = self.id, client = %addr, error = %e, "Failed to register connection");
                return;
            }
        };

        handle_connection(
            stream,
            addr,
            self.commands.clone(),
            Arc::clone(&self.stats),
            self.settings,
        )
        .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::FileStore;
    use tempfile::TempDir;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::Semaphore;

    #[tokio::test]
    async fn test_dispatch_serves_on_worker_thread() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        let stats = Arc::new(ConnectionStats::new());
        let pool =
            IsolatedPool::spawn(store, 2, Arc::clone(&stats), ConnectionSettings::default())
                .unwrap();
        assert_eq!(pool.workers(), 2);
        assert_eq!(pool.policy(), PoolPolicy::Isolated);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let slots = Arc::new(Semaphore::new(1));

        let mut client = TcpStream::connect(addr).await.unwrap();
        let (stream, peer) = listener.accept().await.unwrap();
        let slot = Arc::clone(&slots).acquire_owned().await.unwrap();
        pool.dispatch(Accepted {
            stream,
            addr: peer,
            slot,
        })
        .unwrap();

        client.write_all(b"LIST\r\n\r\n").await.unwrap();
        let mut response = Vec::new();
        client.read_to_end(&mut response).await.unwrap();
        assert_eq!(response, b"{\"status\":\"OK\",\"data\":[]}\r\n\r\n");

        // The slot comes back once the worker is done
        let _again = slots.acquire().await.unwrap();
    }

    #[test]
    fn test_dropping_pool_stops_workers() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        let pool = IsolatedPool::spawn(
            store,
            3,
            Arc::new(ConnectionStats::new()),
            ConnectionSettings::default(),
        )
        .unwrap();
        drop(pool);
    }
}
