//! Concurrent segmented downloader for S3-compatible objects: splits an
//! object into byte-range segments, fetches them over independent
//! connections, and resumes from on-disk scratch state after an interruption.

pub mod assembler;
pub mod cancellation;
pub mod config;
pub mod error;
pub mod logging;
pub mod object_key;
pub mod progress;
pub mod resume;
pub mod retry;
pub mod segmenter;
pub mod sidecar;
pub mod supervisor;
pub mod transport;
pub mod worker;
