//! Progress Tracker: speed history, ETA estimation, and the live display.

mod display;
mod eta;
mod history;
mod status;
mod tracker;

pub use display::{format_line, spawn_display_task};
pub use eta::EtaMethod;
pub use status::SegmentStatus;
pub use tracker::{ProgressTracker, SegmentView, Snapshot};
