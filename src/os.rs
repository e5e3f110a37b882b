//! Path & OS adapter: resolves paths, detects OS family, and opens/closes/
//! syncs directories the way the atomic write protocol needs.

use std::io;
use std::path::Path;

/// True on platforms where directory fsync is neither permitted nor needed
/// for rename atomicity.
pub fn is_windows_family() -> bool {
    cfg!(target_os = "windows")
}

/// Force the contents of a directory to stable storage.
///
/// A no-op on the Windows family (see [`is_windows_family`]); best-effort
/// everywhere else, since not every filesystem honors directory fsync.
pub async fn fsync_dir(dir: &Path) -> io::Result<()> {
    if is_windows_family() {
        return Ok(());
    }
    let dir = dir.to_owned();
    tokio::task::spawn_blocking(move || {
        let file = std::fs::File::open(&dir)?;
        file.sync_all()
    })
    .await
    .unwrap_or_else(|join_err| {
        Err(io::Error::new(io::ErrorKind::Other, join_err.to_string()))
    })
}

/// Best-effort directory fsync that swallows errors, used on cleanup paths
/// where a missed fsync only risks a slower-than-ideal recovery, not
/// correctness.
pub async fn fsync_dir_best_effort(dir: &Path) {
    if let Err(err) = fsync_dir(dir).await {
        tracing::debug!(?dir, %err, "best-effort directory fsync failed");
    }
}
