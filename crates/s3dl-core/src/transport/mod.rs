//! Narrow capability the engine needs from an S3-compatible HTTP API.
//!
//! Keeping this to two operations lets the rest of the crate stay ignorant
//! of which S3 client (or fake, in tests) it's talking to.

mod curl_transport;
#[cfg(any(test, feature = "test-util"))]
pub mod mock;

pub use curl_transport::CurlTransport;

use async_trait::async_trait;

/// Result of a HEAD request: only the size is load-bearing for this engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeadInfo {
    pub content_length: u64,
}

/// One chunk of a streamed ranged GET body.
pub type Chunk = Vec<u8>;

/// A live ranged GET: a declared content length plus a channel of chunks.
/// Exhausting the receiver (it returns `None`) signals a normal end of stream;
/// the caller is responsible for verifying the total bytes received against
/// the declared length.
pub struct RangeStream {
    pub content_length: Option<u64>,
    pub chunks: tokio::sync::mpsc::Receiver<Result<Chunk, anyhow::Error>>,
}

/// Capability the Segment Worker and Supervisor need from the transport.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Fetches object metadata. Used once, by the Supervisor, to compute the
    /// segment plan.
    async fn head(&self, bucket: &str, key: &str) -> anyhow::Result<HeadInfo>;

    /// Issues a ranged GET for `bytes=start-end` (inclusive) and returns a
    /// stream of body chunks. Must not buffer the whole body before returning.
    async fn get_range(
        &self,
        bucket: &str,
        key: &str,
        start: u64,
        end_inclusive: u64,
    ) -> anyhow::Result<RangeStream>;
}
