//! Range math: splits an object into N contiguous, non-overlapping segments
//! and computes HTTP Range header bounds for each.

mod range;

pub use range::{plan_segments, Segment};
