//! JSON snapshot files backing the in-memory stores.
//!
//! A snapshot is rewritten in full after every successful mutation: the new
//! contents go to a sibling `.tmp` file which is then renamed over the old
//! one, so a crash mid-write leaves the previous snapshot intact.

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;

/// Errors reading or writing a snapshot file.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    /// The file could not be read, written, or renamed.
    #[error("snapshot I/O failed for {path}: {source}")]
    Io {
        /// File that was being accessed.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The file exists but does not hold valid JSON for the expected type.
    #[error("snapshot {path} is corrupt: {source}")]
    Decode {
        /// File that was being read.
        path: PathBuf,
        /// Underlying parse error.
        source: serde_json::Error,
    },

    /// The in-memory state could not be serialized.
    #[error("failed to encode snapshot: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Reads a snapshot, returning `None` if the file does not exist yet.
///
/// # Errors
///
/// Returns [`SnapshotError::Io`] for read failures other than "not found",
/// and [`SnapshotError::Decode`] if the contents do not parse.
pub async fn load<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, SnapshotError> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(SnapshotError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|source| SnapshotError::Decode {
            path: path.to_path_buf(),
            source,
        })
}

/// Atomically replaces the snapshot at `path` with `value`.
///
/// # Errors
///
/// Returns [`SnapshotError`] if encoding, writing, or renaming fails.
pub async fn save<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), SnapshotError> {
    let bytes = serde_json::to_vec_pretty(value)?;
    let tmp = path.with_extension("json.tmp");
    let io_err = |source| SnapshotError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
    }
    tokio::fs::write(&tmp, &bytes).await.map_err(io_err)?;
    tokio::fs::rename(&tmp, path).await.map_err(io_err)
}
