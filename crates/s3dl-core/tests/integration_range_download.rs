//! Integration test: local HTTP server with Range support, full download via
//! the real `CurlTransport` and `Supervisor`.

mod common;

use std::sync::Arc;

use s3dl_core::cancellation::CancellationToken;
use s3dl_core::config::{Config, Credentials};
use s3dl_core::supervisor::{self, DownloadOutcome, DownloadReport};
use s3dl_core::transport::{CurlTransport, Transport};
use tempfile::tempdir;

fn expect_completed(outcome: DownloadOutcome) -> DownloadReport {
    match outcome {
        DownloadOutcome::Completed(report) => report,
        DownloadOutcome::Cancelled(_) => panic!("expected completion, got cancellation"),
    }
}

fn test_config(download_dir: &std::path::Path, endpoint: &str, object_key: &str) -> Config {
    Config {
        bucket: "bucket".to_string(),
        region: "us-east-1".to_string(),
        endpoint: Some(endpoint.to_string()),
        credentials: Credentials::default(),
        concurrency: 4,
        download_dir: download_dir.to_path_buf(),
        object_key: object_key.to_string(),
        log_file_name: None,
    }
}

#[tokio::test]
async fn multi_segment_download_completes_and_file_matches() {
    let body: Vec<u8> = (0u8..100).cycle().take(64 * 1024).collect();
    let url = common::range_server::start(body.clone());

    let download_dir = tempdir().unwrap();
    let config = test_config(download_dir.path(), url.trim_end_matches('/'), "object.bin");
    let transport: Arc<dyn Transport> =
        Arc::new(CurlTransport::new(&config.region, config.endpoint.as_deref(), config.credentials.clone()));

    let outcome = supervisor::run(&config, transport, CancellationToken::new())
        .await
        .expect("download should complete");
    let report = expect_completed(outcome);

    assert_eq!(report.total_size, body.len() as u64);
    let content = std::fs::read(&report.final_path).unwrap();
    assert_eq!(content, body);
}

#[tokio::test]
async fn resumes_from_an_interrupted_partial_scratch_file() {
    let body: Vec<u8> = (0u8..100).cycle().take(32 * 1024).collect();
    let url = common::range_server::start(body.clone());

    let download_dir = tempdir().unwrap();
    let config = test_config(download_dir.path(), url.trim_end_matches('/'), "object.bin");
    let transport: Arc<dyn Transport> =
        Arc::new(CurlTransport::new(&config.region, config.endpoint.as_deref(), config.credentials.clone()));

    // Pre-seed a sidecar and one fully-downloaded segment's worth of scratch
    // bytes, as if a previous run completed segment 0 before being killed.
    let segments = s3dl_core::segmenter::plan_segments(body.len() as u64, config.concurrency);
    s3dl_core::sidecar::write(
        download_dir.path(),
        "object.bin",
        s3dl_core::sidecar::Sidecar {
            total_size: body.len() as u64,
            segment_count: segments.len(),
        },
    )
    .await
    .unwrap();
    let seg0_len = segments[0].len() as usize;
    std::fs::write(
        download_dir.path().join("object.bin.part0"),
        &body[..seg0_len],
    )
    .unwrap();

    let outcome = supervisor::run(&config, transport, CancellationToken::new())
        .await
        .expect("download should complete from partial state");
    let report = expect_completed(outcome);

    let content = std::fs::read(&report.final_path).unwrap();
    assert_eq!(content, body);
}

#[tokio::test]
async fn short_server_response_triggers_retry_then_completes() {
    let body: Vec<u8> = (0u8..50).cycle().take(16 * 1024).collect();
    // A single-range server (no Range support) truncates nothing on its own;
    // exercise the verification-then-retry path via a pre-seeded oversized
    // scratch file that the resume inspector must discard before continuing.
    let url = common::range_server::start(body.clone());

    let download_dir = tempdir().unwrap();
    let config = test_config(download_dir.path(), url.trim_end_matches('/'), "object.bin");
    let transport: Arc<dyn Transport> =
        Arc::new(CurlTransport::new(&config.region, config.endpoint.as_deref(), config.credentials.clone()));

    let segments = s3dl_core::segmenter::plan_segments(body.len() as u64, config.concurrency);
    std::fs::write(
        download_dir.path().join("object.bin.part0"),
        vec![0xffu8; segments[0].len() as usize + 10],
    )
    .unwrap();

    let outcome = supervisor::run(&config, transport, CancellationToken::new())
        .await
        .expect("download should recover from an overlong scratch file");
    let report = expect_completed(outcome);

    let content = std::fs::read(&report.final_path).unwrap();
    assert_eq!(content, body);
}
