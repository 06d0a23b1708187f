//! Resume Inspector: classifies a segment's scratch file before an attempt.

use std::path::Path;

/// Classification of a scratch file relative to its expected length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumeClassification {
    /// No scratch file exists yet.
    Absent,
    /// Scratch file exists and is shorter than expected; `resume_bytes` holds
    /// its current length.
    PartialValid { resume_bytes: u64 },
    /// Scratch file exists and its length exactly matches the segment.
    Complete,
    /// Scratch file exists but is longer than expected. The inspector has
    /// already deleted it; the segment must restart from 0.
    CorruptOverlong,
    /// A filesystem error occurred while stating the file. The file is left
    /// untouched; the segment starts fresh without deleting anything.
    InspectionError,
}

impl ResumeClassification {
    /// Bytes already on disk that a worker can treat as its resume baseline.
    pub fn resume_bytes(&self) -> u64 {
        match self {
            ResumeClassification::Absent
            | ResumeClassification::CorruptOverlong
            | ResumeClassification::InspectionError => 0,
            ResumeClassification::PartialValid { resume_bytes } => *resume_bytes,
            ResumeClassification::Complete => 0, // caller reads expected_len instead
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, ResumeClassification::Complete)
    }
}

/// Inspects `scratch_path` against `expected_len`, classifying its resume
/// state. On `CorruptOverlong`, the file is deleted as a side effect.
pub async fn inspect(scratch_path: &Path, expected_len: u64) -> ResumeClassification {
    let meta = match tokio::fs::metadata(scratch_path).await {
        Ok(m) => m,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return ResumeClassification::Absent;
        }
        Err(e) => {
            tracing::warn!(path = %scratch_path.display(), error = %e, "resume inspection failed");
            return ResumeClassification::InspectionError;
        }
    };

    let len = meta.len();
    if len == expected_len {
        ResumeClassification::Complete
    } else if len < expected_len {
        ResumeClassification::PartialValid { resume_bytes: len }
    } else {
        tracing::warn!(
            path = %scratch_path.display(),
            len,
            expected_len,
            "scratch file longer than expected segment, deleting"
        );
        if let Err(e) = tokio::fs::remove_file(scratch_path).await {
            tracing::warn!(path = %scratch_path.display(), error = %e, "failed to delete overlong scratch file");
        }
        ResumeClassification::CorruptOverlong
    }
}
