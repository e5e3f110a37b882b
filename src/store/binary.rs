//! Binary blob engine: stream-in (`bassoc`), stream-out (`bget` with a
//! locked callback).

use std::future::Future;

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::instrument;

use crate::atomic;
use crate::error::{ReadCause, Result, StoreError};
use crate::fingerprint::Fingerprint;
use crate::value::StoreValue;

use super::Store;

/// Handle passed to a [`Store::bget`] callback while the per-key lock is
/// held, so the underlying binary file cannot be rewritten underneath the
/// callback.
pub struct BlobHandle {
    bytes: Bytes,
}

impl BlobHandle {
    /// Total length of the blob, in bytes.
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// A fresh `AsyncRead` over the blob's bytes, safe to consume fully
    /// within the callback.
    pub fn reader(&self) -> impl AsyncRead + Unpin {
        std::io::Cursor::new(self.bytes.clone())
    }

    /// Direct access to the in-memory bytes, for callers that don't need a
    /// stream.
    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }
}

impl Store {
    /// Under the per-key lock, route `input` through the atomic write
    /// protocol into `folder/B_<fingerprint>`. No codec involvement — the
    /// payload is opaque bytes.
    #[instrument(skip(self, key, input))]
    pub async fn bassoc(&self, key: &StoreValue, mut input: impl AsyncRead + Unpin + Send) -> Result<()> {
        let fp = Fingerprint::of(key, self.codec())?;
        let _guard = self.locks().acquire(fp).await;

        let mut buf = Vec::new();
        input
            .read_to_end(&mut buf)
            .await
            .map_err(|err| StoreError::write(fp.to_string(), crate::error::WriteCause::Io(err)))?;

        atomic::write_file(
            self.folder(),
            &fp.binary_file_name(),
            self.config().fsync,
            &buf,
            &fp.to_string(),
        )
        .await
    }

    /// If the blob doesn't exist, yields `Ok(None)`. Otherwise reads the
    /// full file into memory and invokes `callback` while still holding the
    /// per-key lock. An error returned by the callback surfaces as a
    /// read-error.
    #[instrument(skip(self, key, callback))]
    pub async fn bget<F, Fut, E>(&self, key: &StoreValue, callback: F) -> Result<Option<()>>
    where
        F: FnOnce(BlobHandle) -> Fut + Send,
        Fut: Future<Output = std::result::Result<(), E>> + Send,
        E: std::fmt::Display,
    {
        let fp = Fingerprint::of(key, self.codec())?;
        let _guard = self.locks().acquire(fp).await;

        let path = self.folder().join(fp.binary_file_name());
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(StoreError::read(fp.to_string(), ReadCause::Io(err))),
        };

        let handle = BlobHandle {
            bytes: Bytes::from(bytes),
        };
        callback(handle)
            .await
            .map_err(|err| StoreError::read(fp.to_string(), ReadCause::Callback(err.to_string())))?;
        Ok(Some(()))
    }
}
