//! Assembler: re-verifies every scratch file, concatenates them in order
//! into the final file, re-verifies the result, and cleans up.

use std::path::Path;

use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::error::EngineError;
use crate::segmenter::Segment;
use crate::worker::scratch_path;

const COPY_BUF_SIZE: usize = 256 * 1024;

/// Concatenates the scratch files for `segments` into `final_path`, verifying
/// lengths before and after. On success, deletes every scratch file (a
/// deletion failure is logged as a warning, not propagated).
pub async fn assemble(
    download_dir: &Path,
    basename: &str,
    segments: &[Segment],
    final_path: &Path,
) -> Result<(), EngineError> {
    for (i, segment) in segments.iter().enumerate() {
        let path = scratch_path(download_dir, basename, i);
        let len = tokio::fs::metadata(&path)
            .await
            .map(|m| m.len())
            .unwrap_or(0);
        if len != segment.len() {
            return Err(EngineError::SegmentVerificationFailed {
                segment_index: i,
                expected: segment.len(),
                actual: len,
            });
        }
    }

    let total_size: u64 = segments.iter().map(|s| s.len()).sum();

    {
        let mut out = tokio::fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(final_path)
            .await
            .map_err(EngineError::AssemblyIoError)?;

        for (i, segment) in segments.iter().enumerate() {
            if segment.len() == 0 {
                continue;
            }
            let path = scratch_path(download_dir, basename, i);
            let mut src = tokio::fs::File::open(&path)
                .await
                .map_err(EngineError::AssemblyIoError)?;
            let mut buf = vec![0u8; COPY_BUF_SIZE];
            loop {
                let n = src.read(&mut buf).await.map_err(EngineError::AssemblyIoError)?;
                if n == 0 {
                    break;
                }
                out.write_all(&buf[..n])
                    .await
                    .map_err(EngineError::AssemblyIoError)?;
            }
        }
        out.flush().await.map_err(EngineError::AssemblyIoError)?;
    }

    let final_len = tokio::fs::metadata(final_path)
        .await
        .map(|m| m.len())
        .unwrap_or(0);
    if final_len != total_size {
        return Err(EngineError::FinalLengthMismatch {
            expected: total_size,
            actual: final_len,
        });
    }

    for i in 0..segments.len() {
        let path = scratch_path(download_dir, basename, i);
        if let Err(e) = tokio::fs::remove_file(&path).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(path = %path.display(), error = %e, "failed to delete scratch file after assembly");
            }
        }
    }

    Ok(())
}
