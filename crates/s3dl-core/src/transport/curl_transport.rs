//! Production `Transport` backed by libcurl.
//!
//! `curl::easy::Easy` is a blocking API, so every call runs on a
//! `spawn_blocking` thread. For `get_range`, the blocking write callback
//! forwards each chunk over a bounded `mpsc` channel with `blocking_send`,
//! which lets the async Segment Worker consume the body one chunk at a time
//! without ever buffering the full response.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::{HeadInfo, RangeStream, Transport};
use crate::config::Credentials;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
const LOW_SPEED_LIMIT_BYTES_PER_SEC: u32 = 1024;
const LOW_SPEED_TIME: Duration = Duration::from_secs(60);
const TRANSFER_TIMEOUT: Duration = Duration::from_secs(3600);
const CHUNK_CHANNEL_CAPACITY: usize = 16;

/// Builds request URLs and issues HEAD/ranged-GET requests against an
/// S3-compatible endpoint via libcurl.
#[derive(Clone)]
pub struct CurlTransport {
    endpoint_base: String,
    #[allow(dead_code)]
    credentials: Credentials,
}

impl CurlTransport {
    /// `endpoint` overrides the default `https://s3.<region>.amazonaws.com`
    /// virtual-hosted-minus-bucket base.
    pub fn new(region: &str, endpoint: Option<&str>, credentials: Credentials) -> Self {
        let endpoint_base = endpoint
            .map(|e| e.trim_end_matches('/').to_string())
            .unwrap_or_else(|| format!("https://s3.{}.amazonaws.com", region));
        Self {
            endpoint_base,
            credentials,
        }
    }

    fn object_url(&self, bucket: &str, key: &str) -> anyhow::Result<String> {
        let mut url = url::Url::parse(&self.endpoint_base)?;
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| anyhow::anyhow!("endpoint cannot be a base URL"))?;
            segments.push(bucket);
            segments.extend(key.split('/'));
        }
        Ok(url.to_string())
    }
}

#[async_trait]
impl Transport for CurlTransport {
    async fn head(&self, bucket: &str, key: &str) -> anyhow::Result<HeadInfo> {
        let url = self.object_url(bucket, key)?;
        tokio::task::spawn_blocking(move || head_blocking(&url)).await?
    }

    async fn get_range(
        &self,
        bucket: &str,
        key: &str,
        start: u64,
        end_inclusive: u64,
    ) -> anyhow::Result<RangeStream> {
        let url = self.object_url(bucket, key)?;
        let (content_length_tx, content_length_rx) = tokio::sync::oneshot::channel();
        let (chunk_tx, chunk_rx) = mpsc::channel(CHUNK_CHANNEL_CAPACITY);

        tokio::task::spawn_blocking(move || {
            get_range_blocking(&url, start, end_inclusive, content_length_tx, chunk_tx)
        });

        let content_length = content_length_rx.await.ok().flatten();
        Ok(RangeStream {
            content_length,
            chunks: chunk_rx,
        })
    }
}

fn head_blocking(url: &str) -> anyhow::Result<HeadInfo> {
    let mut easy = curl::easy::Easy::new();
    easy.url(url)?;
    easy.nobody(true)?;
    easy.follow_location(true)?;
    easy.connect_timeout(CONNECT_TIMEOUT)?;
    easy.timeout(Duration::from_secs(30))?;
    easy.perform()?;

    let code = easy.response_code()?;
    if !(200..300).contains(&code) {
        anyhow::bail!("HEAD {} returned HTTP {}", url, code);
    }
    let content_length = easy
        .content_length_download()?
        .max(0.0) as u64;
    Ok(HeadInfo { content_length })
}

fn get_range_blocking(
    url: &str,
    start: u64,
    end_inclusive: u64,
    content_length_tx: tokio::sync::oneshot::Sender<Option<u64>>,
    chunk_tx: mpsc::Sender<Result<Vec<u8>, anyhow::Error>>,
) {
    let result = (|| -> anyhow::Result<()> {
        let mut easy = curl::easy::Easy::new();
        easy.url(url)?;
        easy.follow_location(true)?;
        easy.connect_timeout(CONNECT_TIMEOUT)?;
        easy.low_speed_limit(LOW_SPEED_LIMIT_BYTES_PER_SEC)?;
        easy.low_speed_time(LOW_SPEED_TIME)?;
        easy.timeout(TRANSFER_TIMEOUT)?;
        easy.range(&format!("{}-{}", start, end_inclusive))?;

        // Headers arrive before any body bytes, so Content-Length is known
        // and forwarded to the caller before streaming starts.
        let mut content_length_tx = Some(content_length_tx);
        let mut status_ok = true;
        {
            let mut transfer = easy.transfer();
            transfer.header_function(|data| {
                if let Ok(line) = std::str::from_utf8(data) {
                    let line = line.trim();
                    if let Some(status) = line.strip_prefix("HTTP/") {
                        let code: u32 = status
                            .split_whitespace()
                            .nth(1)
                            .and_then(|s| s.parse().ok())
                            .unwrap_or(0);
                        status_ok = code == 200 || code == 206;
                    } else if let Some((name, value)) = line.split_once(':') {
                        if name.eq_ignore_ascii_case("content-length") {
                            if let Ok(len) = value.trim().parse::<u64>() {
                                if let Some(tx) = content_length_tx.take() {
                                    let _ = tx.send(Some(len));
                                }
                            }
                        }
                    }
                }
                true
            })?;
            transfer.write_function(|data| {
                if !status_ok {
                    return Ok(0);
                }
                match chunk_tx.blocking_send(Ok(data.to_vec())) {
                    Ok(()) => Ok(data.len()),
                    Err(_) => Ok(0),
                }
            })?;
            transfer.perform()?;
        }

        if let Some(tx) = content_length_tx.take() {
            let _ = tx.send(None);
        }

        let code = easy.response_code()?;
        if code != 200 && code != 206 {
            let _ = chunk_tx.blocking_send(Err(anyhow::anyhow!("HTTP {}", code)));
        }
        Ok(())
    })();

    if let Err(e) = result {
        let _ = chunk_tx.blocking_send(Err(e));
    }
}
