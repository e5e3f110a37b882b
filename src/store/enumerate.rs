//! Enumeration: non-blocking, eventually-consistent listing of structured
//! keys.

use std::collections::HashSet;

use tracing::instrument;

use crate::error::{Result, StoreError};
use crate::fingerprint::{Fingerprint, FINGERPRINT_RE};
use crate::value::StoreValue;

use super::Store;

impl Store {
    /// List the folder, filter names matching the canonical fingerprint
    /// shape (excluding `B_`-prefixed binary files), and for each such file
    /// open it under the per-key lock, decode, and yield `stored_key`.
    ///
    /// Non-blocking with respect to concurrent mutations: the directory
    /// listing is a snapshot taken at call time, then each file is locked
    /// in turn — entries may vanish between listing and opening (silently
    /// skipped) and entries born after the listing are not reported.
    #[instrument(skip(self))]
    pub async fn list_keys(&self) -> Result<HashSet<StoreValue>> {
        let mut read_dir = tokio::fs::read_dir(self.folder())
            .await
            .map_err(|err| StoreError::read(self.folder().display().to_string(), crate::error::ReadCause::Io(err)))?;

        let mut names = Vec::new();
        while let Some(entry) = read_dir
            .next_entry()
            .await
            .map_err(|err| StoreError::read(self.folder().display().to_string(), crate::error::ReadCause::Io(err)))?
        {
            if let Some(name) = entry.file_name().to_str() {
                if FINGERPRINT_RE.is_match(name) {
                    names.push(name.to_owned());
                }
            }
        }

        tracing::trace!(candidates = names.len(), "list_keys: directory snapshot taken");

        let mut keys = HashSet::new();
        for name in names {
            let fp = match Fingerprint::parse(&name) {
                Some(fp) => fp,
                None => continue,
            };
            let _guard = self.locks().acquire(fp).await;

            let path = self.folder().join(&name);
            let bytes = match tokio::fs::read(&path).await {
                Ok(bytes) => bytes,
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => continue,
                Err(err) => return Err(StoreError::read(name, crate::error::ReadCause::Io(err))),
            };

            let record = match self.codec().decode(&bytes) {
                Ok(record) => record,
                Err(err) => return Err(StoreError::read(name, crate::error::ReadCause::Codec(err.to_string()))),
            };

            keys.insert(record.key);
        }

        Ok(keys)
    }
}
