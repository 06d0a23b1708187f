//! Segment Worker: drives one segment's scratch file to completion via an
//! unbounded retry loop with a fixed one-second backoff between attempts.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::io::{AsyncSeekExt, AsyncWriteExt};

use crate::cancellation::CancellationToken;
use crate::progress::{ProgressTracker, SegmentStatus};
use crate::resume::{self, ResumeClassification};
use crate::retry::{self, SegmentError};
use crate::segmenter::Segment;
use crate::transport::Transport;

/// Outcome of running a segment to completion.
pub enum WorkerOutcome {
    Completed(PathBuf),
    Cancelled,
}

pub fn scratch_path(download_dir: &Path, basename: &str, index: usize) -> PathBuf {
    download_dir.join(format!("{}.part{}", basename, index))
}

fn resume_pct(resume_bytes: u64, expected_len: u64) -> u8 {
    if expected_len == 0 {
        100
    } else {
        ((resume_bytes as f64 / expected_len as f64) * 100.0).clamp(0.0, 100.0) as u8
    }
}

/// Runs segment `index` to completion. Never returns a fatal error: transport
/// and storage failures are logged and retried forever, until the segment
/// completes or `cancel` fires.
pub async fn run(
    index: usize,
    segment: Segment,
    transport: Arc<dyn Transport>,
    bucket: &str,
    key: &str,
    download_dir: &Path,
    basename: &str,
    tracker: Arc<ProgressTracker>,
    cancel: CancellationToken,
) -> WorkerOutcome {
    let expected_len = segment.len();
    let path = scratch_path(download_dir, basename, index);

    loop {
        if cancel.is_cancelled() {
            return WorkerOutcome::Cancelled;
        }

        let attempt = tracker.increment_retries(index).await;
        tracing::debug!(segment = index, attempt, "starting segment attempt");

        let classification = resume::inspect(&path, expected_len).await;
        if let ResumeClassification::Complete = classification {
            tracker.update_progress(index, expected_len, None).await;
            tracker.set_status(index, SegmentStatus::CompletedAlreadyExists).await;
            return WorkerOutcome::Completed(path);
        }

        let resume_bytes = classification.resume_bytes();
        if resume_bytes >= expected_len {
            tracker.update_progress(index, expected_len, None).await;
            tracker.set_status(index, SegmentStatus::CompletedResumed).await;
            return WorkerOutcome::Completed(path);
        }

        tracker
            .set_status(
                index,
                SegmentStatus::Downloading {
                    attempt,
                    resume_pct: resume_pct(resume_bytes, expected_len),
                },
            )
            .await;

        match attempt_segment(
            &transport,
            bucket,
            key,
            &segment,
            &path,
            resume_bytes,
            expected_len,
            index,
            &tracker,
            &cancel,
        )
        .await
        {
            Ok(()) => {
                tracker.update_progress(index, expected_len, None).await;
                tracker.set_status(index, SegmentStatus::Completed).await;
                tracing::info!(segment = index, bytes = expected_len, "segment completed");
                return WorkerOutcome::Completed(path);
            }
            Err(e) => {
                tracing::error!(segment = index, attempt, error = %e, kind = ?retry::classify(&e), "segment attempt failed, retrying");
                tracker
                    .set_status(
                        index,
                        SegmentStatus::Retrying {
                            attempt,
                            resume_pct: resume_pct(resume_bytes, expected_len),
                        },
                    )
                    .await;
                if cancel.is_cancelled() {
                    return WorkerOutcome::Cancelled;
                }
                tokio::time::sleep(retry::RETRY_DELAY).await;
            }
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn attempt_segment(
    transport: &Arc<dyn Transport>,
    bucket: &str,
    key: &str,
    segment: &Segment,
    path: &Path,
    resume_bytes: u64,
    expected_len: u64,
    index: usize,
    tracker: &ProgressTracker,
    cancel: &CancellationToken,
) -> Result<(), SegmentError> {
    let range_start = segment.start + resume_bytes;
    let range_end_inclusive = segment.end.saturating_sub(1);

    let mut stream = transport
        .get_range(bucket, key, range_start, range_end_inclusive)
        .await
        .map_err(SegmentError::Transport)?;

    let mut file = if resume_bytes > 0 {
        let mut f = tokio::fs::OpenOptions::new()
            .write(true)
            .open(path)
            .await
            .map_err(SegmentError::Storage)?;
        f.seek(std::io::SeekFrom::Start(resume_bytes))
            .await
            .map_err(SegmentError::Storage)?;
        f
    } else {
        tokio::fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .await
            .map_err(SegmentError::Storage)?
    };

    let mut session_bytes = 0u64;
    let mut last_sample_at = std::time::Instant::now();

    loop {
        if cancel.is_cancelled() {
            file.flush().await.map_err(SegmentError::Storage)?;
            return Err(SegmentError::PartialTransfer {
                expected: expected_len,
                received: resume_bytes + session_bytes,
            });
        }

        match stream.chunks.recv().await {
            Some(Ok(chunk)) => {
                file.write_all(&chunk).await.map_err(SegmentError::Storage)?;
                session_bytes += chunk.len() as u64;

                if last_sample_at.elapsed() >= std::time::Duration::from_secs(1) {
                    tracker
                        .update_progress(index, resume_bytes + session_bytes, None)
                        .await;
                    tracing::debug!(
                        segment = index,
                        downloaded = resume_bytes + session_bytes,
                        expected = expected_len,
                        "progress sample"
                    );
                    last_sample_at = std::time::Instant::now();
                }
            }
            Some(Err(e)) => return Err(SegmentError::Transport(e)),
            None => break,
        }
    }

    file.flush().await.map_err(SegmentError::Storage)?;
    drop(file);

    let final_len = tokio::fs::metadata(path).await.map_err(SegmentError::Storage)?.len();
    if final_len != expected_len {
        return Err(SegmentError::PartialTransfer {
            expected: expected_len,
            received: final_len,
        });
    }

    Ok(())
}
