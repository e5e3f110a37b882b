use std::io;
use std::path::PathBuf;

/// Result alias used throughout the store.
pub type Result<T> = std::result::Result<T, StoreError>;

/// The cause of a [`StoreError::Read`].
#[derive(thiserror::Error, Debug)]
pub enum ReadCause {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("codec error: {0}")]
    Codec(String),
    #[error("stored key does not match queried key")]
    KeyMismatch,
    #[error("callback error: {0}")]
    Callback(String),
}

/// The cause of a [`StoreError::Write`].
#[derive(thiserror::Error, Debug)]
pub enum WriteCause {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("codec error: {0}")]
    Codec(String),
}

/// Error taxonomy for the store, surfaced as a value through every public
/// operation rather than unwinding the task that produced it.
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    /// The constructor's writability probe failed. The sole fatal,
    /// synchronous-at-construction error kind.
    #[error("store directory {path:?} is not writable: {source}")]
    NotWritable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Open/read/decode failure for a given key.
    #[error("failed reading key {key}: {source}")]
    Read {
        key: String,
        #[source]
        source: ReadCause,
    },

    /// Encode/write/rename/fsync failure for a given key.
    #[error("failed writing key {key}: {source}")]
    Write {
        key: String,
        #[source]
        source: WriteCause,
    },
}

impl StoreError {
    pub(crate) fn read(key: impl Into<String>, source: impl Into<ReadCause>) -> Self {
        StoreError::Read {
            key: key.into(),
            source: source.into(),
        }
    }

    pub(crate) fn write(key: impl Into<String>, source: impl Into<WriteCause>) -> Self {
        StoreError::Write {
            key: key.into(),
            source: source.into(),
        }
    }
}
