//! Supervisor: orchestrates one object download end to end.
//!
//! Head request, segment plan, sidecar safety check, resume priming, worker
//! fan-out, progress display, assembly. This is the one entry point the CLI
//! (or any other host) calls.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::assembler;
use crate::cancellation::CancellationToken;
use crate::config::Config;
use crate::object_key::basename_for_key;
use crate::progress::{spawn_display_task, ProgressTracker, SegmentStatus};
use crate::resume::{self, ResumeClassification};
use crate::segmenter::{plan_segments, Segment};
use crate::sidecar::{self, Sidecar};
use crate::transport::Transport;
use crate::worker::{self, WorkerOutcome};

/// Stagger between spawning successive Segment Workers, so a burst of
/// `concurrency` simultaneous connections doesn't open all at once.
const WORKER_SPAWN_STAGGER: Duration = Duration::from_millis(100);

/// Final report for a download that ran to completion.
#[derive(Debug)]
pub struct DownloadReport {
    pub final_path: PathBuf,
    pub total_size: u64,
    pub segment_count: usize,
    pub total_retries: u32,
    pub max_retries: u32,
    pub elapsed: Duration,
    pub avg_speed: f64,
}

/// Progress preserved when a run is cancelled before assembly. Scratch files
/// and the resume-safety sidecar are left on disk so a later run can resume.
#[derive(Debug)]
pub struct CancelledReport {
    pub total_downloaded: u64,
    pub total_size: u64,
    pub segment_count: usize,
    pub total_retries: u32,
    pub max_retries: u32,
    pub elapsed: Duration,
}

/// Outcome of a supervised run. Cancellation is not an error: it's a normal
/// exit path that preserves whatever progress was made.
#[derive(Debug)]
pub enum DownloadOutcome {
    Completed(DownloadReport),
    Cancelled(CancelledReport),
}

/// Runs a complete download for `config` against `transport`, returning once
/// the object is fully assembled, cancelled, or fails fatally.
pub async fn run(
    config: &Config,
    transport: Arc<dyn Transport>,
    cancel: CancellationToken,
) -> anyhow::Result<DownloadOutcome> {
    tokio::fs::create_dir_all(&config.download_dir).await?;

    let head = transport
        .head(&config.bucket, &config.object_key)
        .await
        .map_err(crate::error::EngineError::HeadFailed)?;
    let total_size = head.content_length;
    tracing::info!(
        bucket = %config.bucket,
        key = %config.object_key,
        total_size,
        "head received"
    );

    let segments = plan_segments(total_size, config.concurrency);
    let basename = basename_for_key(&config.object_key);

    if !sidecar::resume_is_safe(&config.download_dir, &basename, total_size, segments.len()).await
    {
        tracing::warn!(
            basename = %basename,
            "existing scratch files were planned against a different object; discarding them"
        );
        for i in 0..segments.len() {
            let path = worker::scratch_path(&config.download_dir, &basename, i);
            let _ = tokio::fs::remove_file(&path).await;
        }
    }
    sidecar::write(
        &config.download_dir,
        &basename,
        Sidecar {
            total_size,
            segment_count: segments.len(),
        },
    )
    .await?;

    let segment_lens: Vec<u64> = segments.iter().map(Segment::len).collect();
    let tracker = Arc::new(ProgressTracker::new(total_size, &segment_lens));

    for (i, segment) in segments.iter().enumerate() {
        let path = worker::scratch_path(&config.download_dir, &basename, i);
        let classification = resume::inspect(&path, segment.len()).await;
        let resume_bytes = match classification {
            ResumeClassification::Complete => segment.len(),
            c => c.resume_bytes(),
        };
        tracker.prime(i, resume_bytes, SegmentStatus::Pending).await;
    }

    let display_handle = spawn_display_task(tracker.clone(), cancel.clone());

    let mut worker_handles = Vec::with_capacity(segments.len());
    for (i, segment) in segments.iter().copied().enumerate() {
        if i > 0 {
            tokio::time::sleep(WORKER_SPAWN_STAGGER).await;
        }
        let transport = transport.clone();
        let download_dir = config.download_dir.clone();
        let basename = basename.clone();
        let bucket = config.bucket.clone();
        let object_key = config.object_key.clone();
        let tracker = tracker.clone();
        let cancel = cancel.clone();

        worker_handles.push(tokio::spawn(async move {
            worker::run(
                i,
                segment,
                transport,
                &bucket,
                &object_key,
                &download_dir,
                &basename,
                tracker,
                cancel,
            )
            .await
        }));
    }

    let mut any_cancelled = false;
    for handle in worker_handles {
        match handle.await {
            Ok(WorkerOutcome::Completed(_)) => {}
            Ok(WorkerOutcome::Cancelled) => any_cancelled = true,
            Err(e) => return Err(anyhow::anyhow!("segment worker task panicked: {}", e)),
        }
    }

    let _ = display_handle.await;
    let snap = tracker.snapshot().await;

    if any_cancelled || cancel.is_cancelled() {
        tracing::info!(
            total_downloaded = snap.total_downloaded,
            total_size,
            "download cancelled, progress preserved for resume"
        );
        return Ok(DownloadOutcome::Cancelled(CancelledReport {
            total_downloaded: snap.total_downloaded,
            total_size,
            segment_count: segments.len(),
            total_retries: snap.total_retries,
            max_retries: snap.max_retries,
            elapsed: snap.elapsed,
        }));
    }

    let final_path = config.download_dir.join(&basename);
    assembler::assemble(&config.download_dir, &basename, &segments, &final_path).await?;
    sidecar::remove(&config.download_dir, &basename).await;

    let avg_speed = if snap.elapsed.as_secs_f64() > 0.0 {
        total_size as f64 / snap.elapsed.as_secs_f64()
    } else {
        0.0
    };

    tracing::info!(
        path = %final_path.display(),
        total_size,
        segments = segments.len(),
        "download complete"
    );

    Ok(DownloadOutcome::Completed(DownloadReport {
        final_path,
        total_size,
        segment_count: segments.len(),
        total_retries: snap.total_retries,
        max_retries: snap.max_retries,
        elapsed: snap.elapsed,
        avg_speed,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::MockTransport;

    fn test_config(dir: &std::path::Path) -> Config {
        Config {
            bucket: "bucket".to_string(),
            region: "us-east-1".to_string(),
            endpoint: None,
            credentials: Default::default(),
            concurrency: 3,
            download_dir: dir.to_path_buf(),
            object_key: "path/to/object.bin".to_string(),
            log_file_name: None,
        }
    }

    #[tokio::test]
    async fn downloads_and_assembles_full_object() {
        let dir = tempfile::tempdir().unwrap();
        let body: Vec<u8> = (0u32..2000).map(|i| (i % 256) as u8).collect();
        let transport: Arc<dyn Transport> = Arc::new(MockTransport::new(body.clone()));
        let config = test_config(dir.path());

        let outcome = run(&config, transport, CancellationToken::new()).await.unwrap();
        let report = match outcome {
            DownloadOutcome::Completed(r) => r,
            DownloadOutcome::Cancelled(_) => panic!("expected completion"),
        };

        assert_eq!(report.total_size, 2000);
        assert_eq!(report.segment_count, 3);
        let data = tokio::fs::read(&report.final_path).await.unwrap();
        assert_eq!(data, body);
        assert!(!dir.path().join("object.bin.s3part.json").exists());
    }

    #[tokio::test]
    async fn discards_scratch_files_planned_against_a_different_object() {
        let dir = tempfile::tempdir().unwrap();
        let body: Vec<u8> = (0u32..900).map(|i| (i % 256) as u8).collect();
        let transport: Arc<dyn Transport> = Arc::new(MockTransport::new(body.clone()));
        let config = test_config(dir.path());

        sidecar::write(
            dir.path(),
            "object.bin",
            Sidecar {
                total_size: 12345,
                segment_count: 7,
            },
        )
        .await
        .unwrap();
        tokio::fs::write(
            worker::scratch_path(dir.path(), "object.bin", 0),
            vec![0xffu8; 5000],
        )
        .await
        .unwrap();

        let outcome = run(&config, transport, CancellationToken::new()).await.unwrap();
        let report = match outcome {
            DownloadOutcome::Completed(r) => r,
            DownloadOutcome::Cancelled(_) => panic!("expected completion"),
        };
        let data = tokio::fs::read(&report.final_path).await.unwrap();
        assert_eq!(data, body);
    }

    #[tokio::test]
    async fn cancellation_exits_without_error_and_preserves_progress() {
        let dir = tempfile::tempdir().unwrap();
        let body: Vec<u8> = (0u32..2000).map(|i| (i % 256) as u8).collect();
        let transport: Arc<dyn Transport> = Arc::new(MockTransport::new(body));
        let config = test_config(dir.path());

        let cancel = CancellationToken::new();
        cancel.cancel();

        let outcome = run(&config, transport, cancel).await.unwrap();
        match outcome {
            DownloadOutcome::Cancelled(report) => {
                assert_eq!(report.total_size, 2000);
                assert_eq!(report.segment_count, 3);
            }
            DownloadOutcome::Completed(_) => panic!("expected cancellation"),
        }
        assert!(!dir.path().join("object.bin").exists());
    }
}
