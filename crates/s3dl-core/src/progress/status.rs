//! Explicit per-segment status, replacing substring matching on display text
//! with exact enum matching. `Display` still renders the same human-facing
//! strings a substring-matching implementation would have produced.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentStatus {
    Pending,
    Downloading { attempt: u32, resume_pct: u8 },
    Retrying { attempt: u32, resume_pct: u8 },
    Completed,
    CompletedAlreadyExists,
    CompletedResumed,
}

impl SegmentStatus {
    pub fn is_completed(&self) -> bool {
        matches!(
            self,
            SegmentStatus::Completed
                | SegmentStatus::CompletedAlreadyExists
                | SegmentStatus::CompletedResumed
        )
    }

    pub fn is_downloading(&self) -> bool {
        matches!(self, SegmentStatus::Downloading { .. })
    }

    pub fn is_retrying(&self) -> bool {
        matches!(self, SegmentStatus::Retrying { .. })
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, SegmentStatus::Pending)
    }
}

impl fmt::Display for SegmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SegmentStatus::Pending => write!(f, "pending"),
            SegmentStatus::Downloading { attempt, resume_pct } => {
                write!(f, "downloading (attempt {}, {}% resumed)", attempt, resume_pct)
            }
            SegmentStatus::Retrying { attempt, resume_pct } => {
                write!(f, "retrying now (attempt {}, {}% saved)", attempt, resume_pct)
            }
            SegmentStatus::Completed => write!(f, "completed"),
            SegmentStatus::CompletedAlreadyExists => write!(f, "completed (already exists)"),
            SegmentStatus::CompletedResumed => write!(f, "completed (resumed)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_matches_expected_human_text() {
        assert_eq!(SegmentStatus::Pending.to_string(), "pending");
        assert_eq!(SegmentStatus::Completed.to_string(), "completed");
        assert_eq!(
            SegmentStatus::CompletedAlreadyExists.to_string(),
            "completed (already exists)"
        );
        assert_eq!(
            SegmentStatus::CompletedResumed.to_string(),
            "completed (resumed)"
        );
        assert_eq!(
            SegmentStatus::Downloading { attempt: 2, resume_pct: 40 }.to_string(),
            "downloading (attempt 2, 40% resumed)"
        );
        assert_eq!(
            SegmentStatus::Retrying { attempt: 3, resume_pct: 60 }.to_string(),
            "retrying now (attempt 3, 60% saved)"
        );
    }

    #[test]
    fn classification_helpers_are_exact() {
        assert!(SegmentStatus::CompletedResumed.is_completed());
        assert!(!SegmentStatus::Pending.is_completed());
        assert!(SegmentStatus::Downloading { attempt: 1, resume_pct: 0 }.is_downloading());
        assert!(SegmentStatus::Retrying { attempt: 1, resume_pct: 0 }.is_retrying());
        assert!(SegmentStatus::Pending.is_pending());
    }
}
