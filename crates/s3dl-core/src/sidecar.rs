//! Resume-safety sidecar: records the object size and segment count a set of
//! scratch files was planned against.
//!
//! Scratch files are keyed only by basename, so a stale `.partN` left behind
//! from a previous object sharing that basename could otherwise be silently
//! (and incorrectly) resumed against a different object. The sidecar makes
//! that check explicit: segments are only eligible for resume if the sidecar
//! on disk agrees with the current head result.

use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sidecar {
    pub total_size: u64,
    pub segment_count: usize,
}

fn sidecar_path(download_dir: &Path, basename: &str) -> std::path::PathBuf {
    download_dir.join(format!("{}.s3part.json", basename))
}

/// Reads the sidecar for `basename`, if any.
pub async fn read(download_dir: &Path, basename: &str) -> Option<Sidecar> {
    let path = sidecar_path(download_dir, basename);
    let data = tokio::fs::read(&path).await.ok()?;
    serde_json::from_slice(&data).ok()
}

/// Writes (or overwrites) the sidecar for `basename`.
pub async fn write(download_dir: &Path, basename: &str, sidecar: Sidecar) -> anyhow::Result<()> {
    let path = sidecar_path(download_dir, basename);
    let data = serde_json::to_vec_pretty(&sidecar)?;
    tokio::fs::write(&path, data).await?;
    Ok(())
}

/// Deletes the sidecar for `basename`, if present. Not fatal if it's already gone.
pub async fn remove(download_dir: &Path, basename: &str) {
    let path = sidecar_path(download_dir, basename);
    if let Err(e) = tokio::fs::remove_file(&path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!(path = %path.display(), error = %e, "failed to delete sidecar file");
        }
    }
}

/// Returns `true` if existing scratch files for `basename` may be resumed
/// against `(total_size, segment_count)`: either there's no sidecar yet (a
/// fresh basename) or the sidecar matches exactly.
pub async fn resume_is_safe(
    download_dir: &Path,
    basename: &str,
    total_size: u64,
    segment_count: usize,
) -> bool {
    match read(download_dir, basename).await {
        None => true,
        Some(existing) => existing.total_size == total_size && existing.segment_count == segment_count,
    }
}
