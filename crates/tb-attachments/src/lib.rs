//! # tb-attachments
//!
//! File storage for task attachments.
//!
//! - [`Storage`] abstraction with local filesystem and in-memory backends
//! - [`AllowedFileTypes`] upload policy (size limit, blocked executables)
//! - [`storage_key_for`] unique, sanitized storage keys

pub mod policy;
pub mod storage;

pub use policy::{normalize_filename, AllowedFileTypes, MAX_FILENAME_LENGTH};
pub use storage::{
    sanitize_filename, storage_key_for, LocalStorage, MemoryStorage, Storage, StorageError,
    StorageResult, StoredFile,
};
