//! Structured KV engine: read, path-read, update-in with a user function,
//! assoc, dissoc, existence check.

use tracing::instrument;

use crate::atomic;
use crate::codec::StoredRecord;
use crate::error::{Result, StoreError, ReadCause};
use crate::fingerprint::Fingerprint;
use crate::value::{get_path, update_path, PathSegment, StoreValue};

use super::Store;

impl Store {
    /// True iff either the structured or binary file for `key` exists.
    /// Non-locking — racy with concurrent writers by design, used as a
    /// hint only.
    #[instrument(skip(self, key))]
    pub async fn exists(&self, key: &StoreValue) -> Result<bool> {
        let fp = Fingerprint::of(key, self.codec())?;
        let structured = self.folder().join(fp.structured_file_name());
        let binary = self.folder().join(fp.binary_file_name());
        Ok(tokio::fs::metadata(structured).await.is_ok()
            || tokio::fs::metadata(binary).await.is_ok())
    }

    /// Read the sub-value at `path` within the record stored under `key`.
    /// Only `key` participates in fingerprinting; a missing record yields
    /// `Ok(None)`, not an error.
    #[instrument(skip(self, path, key))]
    pub async fn get_in(&self, path: &[PathSegment], key: &StoreValue) -> Result<Option<StoreValue>> {
        let fp = Fingerprint::of(key, self.codec())?;
        let record = match self.read_record(fp, key).await? {
            Some(record) => record,
            None => return Ok(None),
        };
        Ok(get_path(&record.value, path).cloned())
    }

    /// `update-in(key-path, f)`: under the per-key lock, read the old
    /// record (if any), apply `f` to the sub-value at `path`, write the new
    /// record, and yield `(old-sub-value, new-sub-value)`.
    #[instrument(skip(self, path, key, f))]
    pub async fn update_in(
        &self,
        path: &[PathSegment],
        key: &StoreValue,
        f: impl FnOnce(Option<StoreValue>) -> StoreValue + Send,
    ) -> Result<(Option<StoreValue>, StoreValue)> {
        let fp = Fingerprint::of(key, self.codec())?;
        let _guard = self.locks().acquire(fp).await;
        tracing::trace!(%fp, "update_in: lock acquired");

        let old_value = match self.read_record(fp, key).await? {
            Some(record) => record.value,
            None => StoreValue::Null,
        };
        let old_sub = get_path(&old_value, path).cloned();

        let new_value = update_path(old_value, path, f);
        let new_sub = get_path(&new_value, path).cloned().unwrap_or(StoreValue::Null);

        let record = StoredRecord {
            key: key.clone(),
            value: new_value,
        };
        self.write_record(fp, key, &record).await?;

        Ok((old_sub, new_sub))
    }

    /// `assoc-in(key-path, v)`: shorthand for `update_in(path, key, |_| v)`.
    pub async fn assoc_in(
        &self,
        path: &[PathSegment],
        key: &StoreValue,
        value: StoreValue,
    ) -> Result<(Option<StoreValue>, StoreValue)> {
        self.update_in(path, key, move |_| value).await
    }

    /// `dissoc(key)`: under the per-key lock, delete the structured file if
    /// it exists. No error if the key was never set.
    #[instrument(skip(self, key))]
    pub async fn dissoc(&self, key: &StoreValue) -> Result<()> {
        let fp = Fingerprint::of(key, self.codec())?;
        let _guard = self.locks().acquire(fp).await;
        atomic::remove_file(self.folder(), &fp.structured_file_name(), self.config().fsync).await?;
        Ok(())
    }

    /// Read and decode the structured record for `fp`, if present.
    /// Compares `stored_key` against `key` and surfaces a `KeyMismatch`
    /// read-error on divergence — the collision-detection-on-read the
    /// design recommends over the silent original behavior (§9).
    pub(super) async fn read_record(
        &self,
        fp: Fingerprint,
        key: &StoreValue,
    ) -> Result<Option<StoredRecord>> {
        let path = self.folder().join(fp.structured_file_name());
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(StoreError::read(fp.to_string(), ReadCause::Io(err))),
        };

        let record = self
            .codec()
            .decode(&bytes)
            .map_err(|err| StoreError::read(fp.to_string(), ReadCause::Codec(err.to_string())))?;

        if &record.key != key {
            return Err(StoreError::read(fp.to_string(), ReadCause::KeyMismatch));
        }

        Ok(Some(record))
    }

    pub(super) async fn write_record(
        &self,
        fp: Fingerprint,
        key: &StoreValue,
        record: &StoredRecord,
    ) -> Result<()> {
        let bytes = self
            .codec()
            .encode(record)
            .map_err(|err| StoreError::write(key_label(key), crate::error::WriteCause::Codec(err.to_string())))?;

        atomic::write_file(
            self.folder(),
            &fp.structured_file_name(),
            self.config().fsync,
            &bytes,
            &key_label(key),
        )
        .await
    }
}

fn key_label(key: &StoreValue) -> String {
    key.as_str()
        .map(str::to_owned)
        .unwrap_or_else(|| format!("{key:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreOptions;
    use tempfile::TempDir;

    async fn store() -> (TempDir, Store) {
        let dir = TempDir::new().unwrap();
        let store = Store::open(dir.path(), StoreOptions::default()).await.unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn round_trip_assoc_and_get() {
        let (_dir, store) = store().await;
        let key = StoreValue::from("bar");
        store.assoc_in(&[], &key, StoreValue::from(42i64)).await.unwrap();
        let got = store.get_in(&[], &key).await.unwrap();
        assert_eq!(got, Some(StoreValue::from(42i64)));
    }

    #[tokio::test]
    async fn get_in_missing_key_is_none() {
        let (_dir, store) = store().await;
        let key = StoreValue::from("missing");
        let got = store.get_in(&[], &key).await.unwrap();
        assert_eq!(got, None);
    }

    #[tokio::test]
    async fn update_in_increments() {
        let (_dir, store) = store().await;
        let key = StoreValue::from("bar");
        store.assoc_in(&[], &key, StoreValue::from(42i64)).await.unwrap();
        store
            .update_in(&[], &key, |v| {
                StoreValue::from(v.and_then(|v| v.as_i64()).unwrap_or(0) + 1)
            })
            .await
            .unwrap();
        let got = store.get_in(&[], &key).await.unwrap();
        assert_eq!(got, Some(StoreValue::from(43i64)));
    }

    #[tokio::test]
    async fn nested_update_scenario() {
        let (_dir, store) = store().await;
        let key = StoreValue::from("foo");
        let mut inner = std::collections::BTreeMap::new();
        inner.insert("foo".to_string(), StoreValue::from("baz"));
        let mut outer = std::collections::BTreeMap::new();
        outer.insert("bar".to_string(), StoreValue::Object(inner));
        store.assoc_in(&[], &key, StoreValue::Object(outer)).await.unwrap();

        let path = vec![PathSegment::from("bar"), PathSegment::from("foo")];
        store
            .update_in(&path, &key, |v| {
                let s = v.and_then(|v| v.as_str().map(str::to_owned)).unwrap_or_default();
                StoreValue::from(format!("{s}foo"))
            })
            .await
            .unwrap();

        let got = store.get_in(&path, &key).await.unwrap();
        assert_eq!(got, Some(StoreValue::from("bazfoo")));
    }

    #[tokio::test]
    async fn dissoc_then_exists_false_and_get_empty() {
        let (_dir, store) = store().await;
        let key = StoreValue::from("bar");
        store.assoc_in(&[], &key, StoreValue::from(1i64)).await.unwrap();
        store.dissoc(&key).await.unwrap();
        assert!(!store.exists(&key).await.unwrap());
        assert_eq!(store.get_in(&[], &key).await.unwrap(), None);
    }

    #[tokio::test]
    async fn dissoc_unset_key_is_ok() {
        let (_dir, store) = store().await;
        let key = StoreValue::from("never-set");
        store.dissoc(&key).await.unwrap();
    }

    #[tokio::test]
    async fn isolation_across_keys() {
        let (_dir, store) = store().await;
        let mut handles = Vec::new();
        for i in 0..50 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                let key = StoreValue::from(i as i64);
                store.assoc_in(&[], &key, StoreValue::from(i as i64)).await.unwrap();
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        for i in 0..50 {
            let key = StoreValue::from(i as i64);
            let got = store.get_in(&[], &key).await.unwrap();
            assert_eq!(got, Some(StoreValue::from(i as i64)));
        }
    }

    #[tokio::test]
    async fn parallel_update_in_serializes_per_key() {
        let (_dir, store) = store().await;
        let key = StoreValue::from("counter");
        store.assoc_in(&[], &key, StoreValue::from(0i64)).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..200 {
            let store = store.clone();
            let key = key.clone();
            handles.push(tokio::spawn(async move {
                store
                    .update_in(&[], &key, |v| {
                        StoreValue::from(v.and_then(|v| v.as_i64()).unwrap_or(0) + 1)
                    })
                    .await
                    .unwrap();
            }));
        }
        for h in handles {
            h.await.unwrap();
        }

        let got = store.get_in(&[], &key).await.unwrap();
        assert_eq!(got, Some(StoreValue::from(200i64)));
    }
}
