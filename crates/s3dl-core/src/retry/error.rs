//! Segment download error type used for classification and logging.

use thiserror::Error;

/// Error observed during a single segment attempt. Every variant is retried
/// by the Segment Worker; this type exists so attempts can be logged with a
/// meaningful cause, not to gate a retry decision.
#[derive(Debug, Error)]
pub enum SegmentError {
    /// The transport reported a transfer error (connection reset, DNS, timeout).
    #[error("transport error: {0}")]
    Transport(#[source] anyhow::Error),
    /// The transport returned a non-2xx status for a ranged GET.
    #[error("HTTP {0}")]
    Http(u32),
    /// The stream ended having delivered fewer bytes than expected.
    #[error("partial transfer: expected {expected} bytes, got {received}")]
    PartialTransfer { expected: u64, received: u64 },
    /// Writing to the scratch file failed.
    #[error("storage error: {0}")]
    Storage(#[source] std::io::Error),
}
