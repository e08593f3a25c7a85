//! Storage Backend Module
//!
//! This module provides the storage collaborator behind the request
//! dispatcher: a capability trait ([`StorageBackend`]) and its filesystem
//! implementation ([`FileStore`]), scoped to one root directory.
//!
//! ## Example
//!
//! ```
//! use filedock::storage::{FileStore, StorageBackend};
//!
//! let dir = tempfile::tempdir().unwrap();
//! let store = FileStore::open(dir.path()).unwrap();
//!
//! store.upload("f.bin", "QUI=").unwrap();
//! assert_eq!(store.list().unwrap(), vec!["f.bin".to_string()]);
//! assert_eq!(store.download("f.bin").unwrap(), b"AB");
//!
//! store.delete("f.bin").unwrap();
//! assert!(store.list().unwrap().is_empty());
//! ```

pub mod engine;

// Re-export commonly used types
pub use engine::{FileStore, StorageBackend, StorageError, StorageResult};
