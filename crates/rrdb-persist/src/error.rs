//! Errors from the persistence layer.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("io error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("bad magic in {path}: expected {expected:?}, found {found:?}")]
    MagicMismatch {
        path: String,
        expected: &'static str,
        found: String,
    },

    #[error("checksum mismatch in {path}: header says {expected:08x}, computed {computed:08x}")]
    ChecksumMismatch { path: String, expected: u32, computed: u32 },

    /// The file is shorter than its own header claims, or shorter than the
    /// buffer a `sync()` is about to write into it.
    #[error("{path} is too short for the header/value layout it claims to hold")]
    SizeMismatch { path: String },

    #[error("failed to map {path} into memory: {source}")]
    MapFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("serialization error: {0}")]
    Encoding(#[from] bincode::Error),
}
