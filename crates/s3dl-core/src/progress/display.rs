//! Periodic single-line progress display.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use super::tracker::{ProgressTracker, Snapshot};
use crate::cancellation::CancellationToken;

const TICK_INTERVAL: Duration = Duration::from_millis(500);
const MIB: f64 = 1024.0 * 1024.0;

/// Renders one snapshot as the single line the display task rewrites.
pub fn format_line(snap: &Snapshot) -> String {
    let pct = snap.fraction() * 100.0;
    let eta_str = match snap.eta {
        Some(d) => format_duration(d),
        None => "unknown".to_string(),
    };
    format!(
        "\r  {:.1} / {:.1} MiB ({:.1}%)  overall {:.2} MiB/s  active {:.2} MiB/s ({}/{})  ETA {} ({})  done {} retrying {} pending {} retries {} (max {})  ",
        snap.total_downloaded as f64 / MIB,
        snap.total_size as f64 / MIB,
        pct,
        snap.overall_speed / MIB,
        snap.active_speed / MIB,
        snap.active_count,
        snap.segments.len(),
        eta_str,
        snap.eta_method,
        snap.completed_count(),
        snap.retrying_count(),
        snap.pending_count(),
        snap.total_retries,
        snap.max_retries,
    )
}

fn format_duration(d: Duration) -> String {
    let total_secs = d.as_secs();
    let h = total_secs / 3600;
    let m = (total_secs % 3600) / 60;
    let s = total_secs % 60;
    if h > 0 {
        format!("{}h{:02}m{:02}s", h, m, s)
    } else if m > 0 {
        format!("{}m{:02}s", m, s)
    } else {
        format!("{}s", s)
    }
}

/// Spawns the 500ms display ticker. Stops when `cancel` fires or when the
/// tracker reports every segment complete.
pub fn spawn_display_task(
    tracker: Arc<ProgressTracker>,
    cancel: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(TICK_INTERVAL);
        loop {
            interval.tick().await;
            let snap = tracker.snapshot().await;
            let line = format_line(&snap);
            let _ = write!(std::io::stdout(), "{}", line);
            let _ = std::io::stdout().flush();
            if cancel.is_cancelled() || snap.completed_count() == snap.segments.len() {
                println!();
                break;
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::eta::EtaMethod;
    use crate::progress::tracker::SegmentView;
    use crate::progress::status::SegmentStatus;

    fn sample_snapshot() -> Snapshot {
        Snapshot {
            segments: vec![SegmentView {
                index: 0,
                status: SegmentStatus::Completed,
                downloaded: 1_048_576,
                expected_len: 1_048_576,
                retries: 0,
            }],
            total_downloaded: 1_048_576,
            total_size: 2_097_152,
            elapsed: Duration::from_secs(1),
            overall_speed: 1_048_576.0,
            active_speed: 0.0,
            active_count: 0,
            eta_method: EtaMethod::Overall,
            eta: Some(Duration::from_secs(1)),
            total_retries: 0,
            max_retries: 0,
        }
    }

    #[test]
    fn format_line_includes_percentage_and_eta() {
        let line = format_line(&sample_snapshot());
        assert!(line.contains("50.0%"));
        assert!(line.contains("ETA 1s (overall)"));
    }

    #[test]
    fn duration_formatting_scales_unit() {
        assert_eq!(format_duration(Duration::from_secs(5)), "5s");
        assert_eq!(format_duration(Duration::from_secs(65)), "1m05s");
        assert_eq!(format_duration(Duration::from_secs(3665)), "1h01m05s");
    }
}
