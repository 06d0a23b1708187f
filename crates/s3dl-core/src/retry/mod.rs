//! Error classification and retry policy for segment downloads.
//!
//! Retries here are unbounded by design: a multi-hour network outage should
//! not cause the engine to give up on a segment. The only backoff is a fixed
//! one-second sleep between attempts (see the Design Notes this crate follows
//! for large resumable transfers). Callers that need to stop retrying do so
//! by cancelling the worker, not by exhausting a retry budget.

mod classify;
mod error;

pub use classify::{classify, classify_curl_error, classify_http_status};
pub use error::SegmentError;

use std::time::Duration;

/// High-level classification of a segment error, used only for logging —
/// every kind below is retried with the same fixed backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Timeout,
    Throttled,
    Connection,
    Http5xx(u16),
    Other,
}

/// Fixed backoff applied between attempts, regardless of error kind or
/// attempt count.
pub const RETRY_DELAY: Duration = Duration::from_secs(1);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_delay_is_one_second() {
        assert_eq!(RETRY_DELAY, Duration::from_secs(1));
    }
}
