//! A durable, crash-consistent, file-backed key-value store.
//!
//! Supports two value flavors — structured (serialized value graphs) and
//! binary blobs — under a single keyspace, with per-key mutual exclusion
//! and asynchronous read/write operations. Clients hand in arbitrary key
//! values and either replace a value, transform it via a caller-supplied
//! update function, read a sub-path of the stored value, delete, or stream
//! binary content in/out.
//!
//! Serializer implementation, key-hashing algorithm choice beyond "stable
//! 128-bit identifier", higher-level convenience wrappers, metrics, and any
//! in-memory caching layer are left to callers; this crate only implements
//! the durable core.

pub mod atomic;
pub mod codec;
pub mod config;
pub mod error;
pub mod fingerprint;
pub mod locks;
pub mod os;
mod store;
pub mod value;

pub use codec::{Codec, StoredRecord};
pub use config::{Config, StoreOptions};
pub use error::{ReadCause, Result, StoreError, WriteCause};
pub use fingerprint::Fingerprint;
pub use store::{BlobHandle, Store};
pub use value::{get_path, update_path, PathSegment, StoreValue};

#[cfg(feature = "json")]
pub use codec::JsonCodec;

#[cfg(feature = "binc")]
pub use codec::BincodeCodec;
