//! Fatal engine errors: the only errors that stop a run outright.
//!
//! Segment Worker failures are always retried (see [`crate::retry`]) and
//! never reach here. Raised by the initial head request (`HeadFailed`) and
//! by the final assembly pass (everything else).

use thiserror::Error;

/// An unrecoverable failure. Unlike [`crate::retry::SegmentError`], these are
/// never retried; the Supervisor propagates them and the run exits non-zero.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A scratch file's on-disk length didn't match its expected segment
    /// length at assembly time.
    #[error("segment {segment_index} verification failed: expected {expected} bytes, found {actual}")]
    SegmentVerificationFailed {
        segment_index: usize,
        expected: u64,
        actual: u64,
    },
    /// The assembled file's final length didn't match the object's total size.
    #[error("final file length mismatch: expected {expected} bytes, found {actual}")]
    FinalLengthMismatch { expected: u64, actual: u64 },
    /// The initial head request failed or returned no usable size.
    #[error("head request failed: {0}")]
    HeadFailed(#[source] anyhow::Error),
    /// Opening, reading, or writing a file during final assembly failed.
    #[error("assembly I/O error: {0}")]
    AssemblyIoError(#[source] std::io::Error),
}
