//! Root-Scoped File Store
//!
//! This module implements the storage backend behind the request
//! dispatcher: four operations against one fixed root directory.
//!
//! ## Design Decisions
//!
//! 1. **Absolute paths, never `chdir`**: every operation joins the root with
//!    the requested name at call time. No process-wide state is touched, so
//!    any number of workers can share one store.
//! 2. **Stateless**: the root is an immutable field. Cloning a store is
//!    cheap and yields an independent, equivalent instance.
//! 3. **Single-component names**: a name that could leave the root (`..`,
//!    separators, absolute paths) is rejected before any I/O.
//!
//! ## Concurrency Model
//!
//! ```text
//! ┌──────────┐ ┌──────────┐ ┌──────────┐
//! │ worker 0 │ │ worker 1 │ │ worker N │
//! └────┬─────┘ └────┬─────┘ └────┬─────┘
//!      │ root/a.txt │ root/b.bin │ root/a.txt
//!      ▼            ▼            ▼
//! ┌──────────────────────────────────────┐
//! │          filesystem (root)           │
//! └──────────────────────────────────────┘
//! ```
//!
//! There is no locking beyond what the filesystem gives a single write or
//! remove call: two uploads of the same name race, and the last write wins.

use crate::protocol::decode_payload;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Errors returned by storage operations.
///
/// Messages name the requested file only, never the absolute path, since
/// they are sent back to clients verbatim.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The name is empty or would resolve outside the root
    #[error("invalid file name: {0:?}")]
    InvalidName(String),

    /// No such file under the root
    #[error("file not found: {0}")]
    NotFound(String),

    /// The upload body is not valid base64
    #[error("invalid base64 content for {name}: {source}")]
    InvalidEncoding {
        name: String,
        #[source]
        source: base64::DecodeError,
    },

    /// The root directory could not be read
    #[error("cannot list files: {0}")]
    Listing(#[source] io::Error),

    /// Any other I/O failure on a single file
    #[error("{name}: {source}")]
    Io {
        name: String,
        #[source]
        source: io::Error,
    },
}

impl StorageError {
    fn from_io(name: &str, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::NotFound {
            StorageError::NotFound(name.to_string())
        } else {
            StorageError::Io {
                name: name.to_string(),
                source,
            }
        }
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// The capabilities the request dispatcher needs from a storage backend.
///
/// Every operation is scoped to the root the backend was built with.
/// Implementations are shared across concurrently running requests, so
/// they must not rely on hidden mutable context.
pub trait StorageBackend: Send + Sync + 'static {
    /// Returns the names of the stored files.
    fn list(&self) -> StorageResult<Vec<String>>;

    /// Returns the content of `name`.
    fn download(&self, name: &str) -> StorageResult<Vec<u8>>;

    /// Stores the base64-encoded `encoded` content under `name`, replacing
    /// any existing file.
    fn upload(&self, name: &str, encoded: &str) -> StorageResult<()>;

    /// Removes `name`.
    fn delete(&self, name: &str) -> StorageResult<()>;
}

/// A storage backend keeping each file as a plain file under a root
/// directory.
///
/// # Example
///
/// ```no_run
/// use filedock::storage::{FileStore, StorageBackend};
///
/// let store = FileStore::open("files").unwrap();
/// store.upload("hello.txt", "aGVsbG8=").unwrap();
/// assert_eq!(store.download("hello.txt").unwrap(), b"hello");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Opens a store at `root`, creating the directory if needed.
    pub fn open(root: impl Into<PathBuf>) -> StorageResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| StorageError::Io {
            name: root.display().to_string(),
            source: e,
        })?;

        let root = fs::canonicalize(&root).map_err(|e| StorageError::Io {
            name: root.display().to_string(),
            source: e,
        })?;

        info!(root = %root.display(), "File storage initialized");
        Ok(Self { root })
    }

    /// Returns the root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves `name` to an absolute path under the root.
    fn resolve(&self, name: &str) -> StorageResult<PathBuf> {
        if name.contains('\0') || name.contains('\\') {
            return Err(StorageError::InvalidName(name.to_string()));
        }

        let mut components = Path::new(name).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(part)), None) => Ok(self.root.join(part)),
            _ => Err(StorageError::InvalidName(name.to_string())),
        }
    }
}

impl StorageBackend for FileStore {
    fn list(&self) -> StorageResult<Vec<String>> {
        let mut names = Vec::new();

        for entry in fs::read_dir(&self.root).map_err(StorageError::Listing)? {
            let entry = entry.map_err(StorageError::Listing)?;
            let is_file = entry
                .file_type()
                .map(|t| t.is_file())
                .map_err(StorageError::Listing)?;
            if !is_file {
                continue;
            }

            // Hidden files and names that are not UTF-8 stay unlisted
            if let Ok(name) = entry.file_name().into_string() {
                if !name.starts_with('.') {
                    names.push(name);
                }
            }
        }

        names.sort();
        Ok(names)
    }

    fn download(&self, name: &str) -> StorageResult<Vec<u8>> {
        let path = self.resolve(name)?;
        let data = fs::read(&path).map_err(|e| StorageError::from_io(name, e))?;
        debug!(file = name, bytes = data.len(), "Read file");
        Ok(data)
    }

    fn upload(&self, name: &str, encoded: &str) -> StorageResult<()> {
        let path = self.resolve(name)?;
        let data = decode_payload(encoded).map_err(|e| StorageError::InvalidEncoding {
            name: name.to_string(),
            source: e,
        })?;
        fs::write(&path, &data).map_err(|e| StorageError::from_io(name, e))?;
        debug!(file = name, bytes = data.len(), "Wrote file");
        Ok(())
    }

    fn delete(&self, name: &str) -> StorageResult<()> {
        let path = self.resolve(name)?;
        fs::remove_file(&path).map_err(|e| StorageError::from_io(name, e))?;
        debug!(file = name, "Removed file");
        Ok(())
    }
}
