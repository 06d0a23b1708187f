//! Progress Tracker: per-segment and global speed history, ETA selection,
//! and the data backing the periodic display line.

use std::time::{Duration, Instant};

use tokio::sync::Mutex;

use super::eta::{select_eta, EtaMethod};
use super::history::{GlobalHistory, SegmentHistory, SpeedSample};
use super::status::SegmentStatus;

const SEGMENT_HISTORY_CAPACITY: usize = 10;
const GLOBAL_HISTORY_MAX_AGE: Duration = Duration::from_secs(30);
const GLOBAL_SAMPLE_MIN_INTERVAL: Duration = Duration::from_secs(1);
const ACTIVE_WINDOW: Duration = Duration::from_secs(5);
const SEGMENT_RECENT_SAMPLES: usize = 5;
const GLOBAL_RECENT_SAMPLES: usize = 10;

struct SegmentSlot {
    expected_len: u64,
    downloaded: u64,
    retries: u32,
    status: SegmentStatus,
    history: SegmentHistory,
    instantaneous_speed: f64,
    last_update_ms: Option<u64>,
    last_sample: Option<(u64, u64)>, // (downloaded, at_ms)
}

impl SegmentSlot {
    fn new(expected_len: u64) -> Self {
        Self {
            expected_len,
            downloaded: 0,
            retries: 0,
            status: SegmentStatus::Pending,
            history: SegmentHistory::new(SEGMENT_HISTORY_CAPACITY),
            instantaneous_speed: 0.0,
            last_update_ms: None,
            last_sample: None,
        }
    }
}

struct GlobalState {
    history: GlobalHistory,
    last_snapshot: Option<(u64, u64)>, // (total_bytes, at_ms)
}

/// Per-segment, read-only view used to render the display line.
#[derive(Debug, Clone)]
pub struct SegmentView {
    pub index: usize,
    pub status: SegmentStatus,
    pub downloaded: u64,
    pub expected_len: u64,
    pub retries: u32,
}

/// Full snapshot handed to the display task every tick.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub segments: Vec<SegmentView>,
    pub total_downloaded: u64,
    pub total_size: u64,
    pub elapsed: Duration,
    pub overall_speed: f64,
    pub active_speed: f64,
    pub active_count: usize,
    pub eta_method: EtaMethod,
    pub eta: Option<Duration>,
    pub total_retries: u32,
    pub max_retries: u32,
}

impl Snapshot {
    pub fn completed_count(&self) -> usize {
        self.segments.iter().filter(|s| s.status.is_completed()).count()
    }
    pub fn downloading_count(&self) -> usize {
        self.segments.iter().filter(|s| s.status.is_downloading()).count()
    }
    pub fn pending_count(&self) -> usize {
        self.segments.iter().filter(|s| s.status.is_pending()).count()
    }
    pub fn retrying_count(&self) -> usize {
        self.segments.iter().filter(|s| s.status.is_retrying()).count()
    }
    pub fn fraction(&self) -> f64 {
        if self.total_size == 0 {
            1.0
        } else {
            self.total_downloaded as f64 / self.total_size as f64
        }
    }
}

/// Tracks every segment's progress and derives throughput/ETA for display.
/// Each segment's mutable state lives in its own mutex (one per array slot)
/// rather than behind a single shared lock, so concurrent workers writing to
/// different segments never contend with each other.
pub struct ProgressTracker {
    segments: Vec<Mutex<SegmentSlot>>,
    global: Mutex<GlobalState>,
    start: Instant,
    total_size: u64,
}

impl ProgressTracker {
    pub fn new(total_size: u64, segment_lens: &[u64]) -> Self {
        Self {
            segments: segment_lens.iter().map(|&l| Mutex::new(SegmentSlot::new(l))).collect(),
            global: Mutex::new(GlobalState {
                history: GlobalHistory::new(GLOBAL_HISTORY_MAX_AGE),
                last_snapshot: None,
            }),
            start: Instant::now(),
            total_size,
        }
    }

    fn now_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Sets a segment's status directly (no byte-count change implied).
    pub async fn set_status(&self, index: usize, status: SegmentStatus) {
        let mut slot = self.segments[index].lock().await;
        slot.status = status;
    }

    /// Primes a segment at startup with a resume baseline, without treating
    /// it as a throughput sample.
    pub async fn prime(&self, index: usize, downloaded: u64, status: SegmentStatus) {
        let mut slot = self.segments[index].lock().await;
        slot.downloaded = downloaded;
        slot.status = status;
    }

    pub async fn increment_retries(&self, index: usize) -> u32 {
        let mut slot = self.segments[index].lock().await;
        slot.retries += 1;
        slot.retries
    }

    /// Records a new downloaded-byte total for segment `index`. `speed_hint`,
    /// if given, overrides the speed computed from the previous sample.
    pub async fn update_progress(&self, index: usize, new_downloaded: u64, speed_hint: Option<f64>) {
        let now = self.now_ms();
        {
            let mut slot = self.segments[index].lock().await;
            let speed = match speed_hint {
                Some(s) if s > 0.0 => s,
                _ => match slot.last_sample {
                    Some((prev_bytes, prev_ms)) => {
                        let dt_ms = now.saturating_sub(prev_ms).max(1);
                        let delta = new_downloaded.saturating_sub(prev_bytes) as f64;
                        delta / (dt_ms as f64 / 1000.0)
                    }
                    None => 0.0,
                },
            };
            slot.downloaded = new_downloaded;
            slot.instantaneous_speed = speed;
            slot.last_update_ms = Some(now);
            slot.last_sample = Some((new_downloaded, now));
            slot.history.push(SpeedSample { speed_bytes_per_sec: speed, at_ms: now });
        };

        let total = self.total_downloaded().await;
        let mut global = self.global.lock().await;
        let should_sample = match global.last_snapshot {
            None => true,
            Some((_, last_ms)) => now.saturating_sub(last_ms) >= GLOBAL_SAMPLE_MIN_INTERVAL.as_millis() as u64,
        };
        if should_sample {
            if let Some((last_bytes, last_ms)) = global.last_snapshot {
                let dt_ms = now.saturating_sub(last_ms).max(1);
                let delta = total.saturating_sub(last_bytes) as f64;
                let speed = delta / (dt_ms as f64 / 1000.0);
                global.history.push(SpeedSample { speed_bytes_per_sec: speed, at_ms: now });
            }
            global.last_snapshot = Some((total, now));
        }
    }

    async fn total_downloaded(&self) -> u64 {
        let mut total = 0u64;
        for slot in &self.segments {
            total += slot.lock().await.downloaded;
        }
        total
    }

    /// Builds a full snapshot for the display task.
    pub async fn snapshot(&self) -> Snapshot {
        let now = self.now_ms();
        let mut segments = Vec::with_capacity(self.segments.len());
        let mut total_downloaded = 0u64;
        let mut total_retries = 0u32;
        let mut max_retries = 0u32;
        let mut active_count = 0usize;
        let mut active_aggregate_speed = 0.0;

        for (i, slot_mutex) in self.segments.iter().enumerate() {
            let slot = slot_mutex.lock().await;
            total_downloaded += slot.downloaded;
            total_retries += slot.retries;
            max_retries = max_retries.max(slot.retries);

            let recently_updated = slot
                .last_update_ms
                .map(|t| now.saturating_sub(t) < ACTIVE_WINDOW.as_millis() as u64)
                .unwrap_or(false);
            if recently_updated && slot.instantaneous_speed > 0.0 {
                active_count += 1;
                active_aggregate_speed += slot.history.recent_average(SEGMENT_RECENT_SAMPLES);
            }

            segments.push(SegmentView {
                index: i,
                status: slot.status,
                downloaded: slot.downloaded,
                expected_len: slot.expected_len,
                retries: slot.retries,
            });
        }

        let elapsed = self.start.elapsed();
        let overall_speed = if elapsed.as_secs_f64() > 0.0 {
            total_downloaded as f64 / elapsed.as_secs_f64()
        } else {
            0.0
        };

        let global_speed = {
            let global = self.global.lock().await;
            if global.history.is_empty() {
                overall_speed
            } else {
                global.history.recent_average(GLOBAL_RECENT_SAMPLES)
            }
        };

        let remaining = self.total_size.saturating_sub(total_downloaded);
        let (eta_method, eta) = select_eta(
            remaining,
            active_count,
            active_aggregate_speed,
            global_speed,
            overall_speed,
        );

        Snapshot {
            segments,
            total_downloaded,
            total_size: self.total_size,
            elapsed,
            overall_speed,
            active_speed: active_aggregate_speed,
            active_count,
            eta_method,
            eta,
            total_retries,
            max_retries,
        }
    }
}
