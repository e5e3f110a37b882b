//! Store lifecycle: construct (ensure folder, writability probe), destroy
//! (delete files + folder). The `Store` handle bundles the folder path,
//! codec, lock table, and config.

mod binary;
mod enumerate;
mod structured;

pub use binary::BlobHandle;

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::codec::Codec;
use crate::config::{Config, StoreOptions};
use crate::error::{Result, StoreError};
use crate::locks::LockTable;
use crate::os;

#[cfg(feature = "json")]
use crate::codec::JsonCodec;

/// A durable, crash-consistent, file-backed key-value store.
///
/// Cloning is cheap: `Store` is a thin handle over `Arc`-shared state, so
/// the same store can be used concurrently from many tasks.
#[derive(Clone)]
pub struct Store {
    inner: Arc<Inner>,
}

struct Inner {
    folder: PathBuf,
    codec: Box<dyn Codec>,
    locks: LockTable,
    config: Config,
}

impl Store {
    /// Ensure `folder` exists (creating it if not), probe it for
    /// writability by writing and deleting a randomly-named file, and
    /// return a ready store. The writability probe is the sole error kind
    /// surfaced synchronously at construction.
    pub async fn open(folder: impl AsRef<Path>, opts: StoreOptions) -> Result<Self> {
        Self::open_with_codec(folder, opts, default_codec()).await
    }

    /// Same as [`Store::open`] but with an explicit codec, for callers that
    /// want `binc` or a custom implementation instead of the default JSON
    /// codec.
    pub async fn open_with_codec(
        folder: impl AsRef<Path>,
        opts: StoreOptions,
        codec: Box<dyn Codec>,
    ) -> Result<Self> {
        let folder = folder.as_ref().to_owned();
        tokio::fs::create_dir_all(&folder)
            .await
            .map_err(|source| StoreError::NotWritable {
                path: folder.clone(),
                source,
            })?;

        probe_writable(&folder).await?;

        Ok(Self {
            inner: Arc::new(Inner {
                folder,
                codec,
                locks: LockTable::new(),
                config: opts.config,
            }),
        })
    }

    /// Unlink every regular file in `folder`, unlink the folder itself, and
    /// best-effort fsync the parent directory. Takes a bare path, not a
    /// handle, since the store need not still be open.
    pub async fn delete_store(folder: impl AsRef<Path>) -> Result<()> {
        let folder = folder.as_ref();
        let mut entries = match tokio::fs::read_dir(folder).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(err) => {
                return Err(StoreError::Write {
                    key: folder.display().to_string(),
                    source: crate::error::WriteCause::Io(err),
                })
            }
        };

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|err| StoreError::Write {
                key: folder.display().to_string(),
                source: crate::error::WriteCause::Io(err),
            })?
        {
            let path = entry.path();
            if let Ok(file_type) = entry.file_type().await {
                if file_type.is_file() {
                    if let Err(err) = tokio::fs::remove_file(&path).await {
                        tracing::warn!(?path, %err, "delete_store: failed to remove file");
                    }
                }
            }
        }

        if let Err(err) = tokio::fs::remove_dir(folder).await {
            tracing::warn!(?folder, %err, "delete_store: failed to remove folder");
        }

        if let Some(parent) = folder.parent() {
            os::fsync_dir_best_effort(parent).await;
        }

        Ok(())
    }

    pub(crate) fn folder(&self) -> &Path {
        &self.inner.folder
    }

    pub(crate) fn codec(&self) -> &dyn Codec {
        self.inner.codec.as_ref()
    }

    pub(crate) fn locks(&self) -> &LockTable {
        &self.inner.locks
    }

    pub(crate) fn config(&self) -> Config {
        self.inner.config
    }
}

#[cfg(feature = "json")]
fn default_codec() -> Box<dyn Codec> {
    Box::new(JsonCodec)
}

async fn probe_writable(folder: &Path) -> Result<()> {
    let probe_name = format!(".kvault-probe-{}", uuid::Uuid::new_v4());
    let probe_path = folder.join(&probe_name);

    tokio::fs::write(&probe_path, b"probe")
        .await
        .map_err(|source| StoreError::NotWritable {
            path: folder.to_owned(),
            source,
        })?;

    tokio::fs::remove_file(&probe_path)
        .await
        .map_err(|source| StoreError::NotWritable {
            path: folder.to_owned(),
            source,
        })?;

    Ok(())
}
