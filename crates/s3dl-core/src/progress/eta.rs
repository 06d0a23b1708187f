//! ETA method selection: pure functions, kept separate from the stateful
//! tracker so the priority logic is easy to test in isolation.

use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EtaMethod {
    Active,
    Global,
    Overall,
    Unknown,
}

impl fmt::Display for EtaMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EtaMethod::Active => write!(f, "active"),
            EtaMethod::Global => write!(f, "global"),
            EtaMethod::Overall => write!(f, "overall"),
            EtaMethod::Unknown => write!(f, "unknown"),
        }
    }
}

fn finite_positive_eta(remaining: u64, speed_bytes_per_sec: f64) -> Option<Duration> {
    if !speed_bytes_per_sec.is_finite() || speed_bytes_per_sec <= 0.0 {
        return None;
    }
    let secs = remaining as f64 / speed_bytes_per_sec;
    if !secs.is_finite() || secs < 0.0 {
        return None;
    }
    Some(Duration::from_secs_f64(secs))
}

/// Picks the highest-priority usable ETA: active (with >=2 active segments),
/// then global, then overall, else "unknown".
pub fn select_eta(
    remaining: u64,
    active_segment_count: usize,
    active_aggregate_speed: f64,
    global_average_speed: f64,
    overall_average_speed: f64,
) -> (EtaMethod, Option<Duration>) {
    if remaining == 0 {
        return (EtaMethod::Overall, Some(Duration::ZERO));
    }

    if active_segment_count >= 2 {
        if let Some(d) = finite_positive_eta(remaining, active_aggregate_speed) {
            return (EtaMethod::Active, Some(d));
        }
    }
    if let Some(d) = finite_positive_eta(remaining, global_average_speed) {
        return (EtaMethod::Global, Some(d));
    }
    if let Some(d) = finite_positive_eta(remaining, overall_average_speed) {
        return (EtaMethod::Overall, Some(d));
    }
    (EtaMethod::Unknown, None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefers_active_with_two_or_more_active_segments() {
        let (method, eta) = select_eta(1000, 2, 100.0, 50.0, 10.0);
        assert_eq!(method, EtaMethod::Active);
        assert_eq!(eta, Some(Duration::from_secs(10)));
    }

    #[test]
    fn falls_back_to_global_when_fewer_than_two_active() {
        let (method, eta) = select_eta(1000, 1, 100.0, 50.0, 10.0);
        assert_eq!(method, EtaMethod::Global);
        assert_eq!(eta, Some(Duration::from_secs(20)));
    }

    #[test]
    fn falls_back_to_overall_when_global_speed_is_zero() {
        let (method, eta) = select_eta(1000, 0, 0.0, 0.0, 100.0);
        assert_eq!(method, EtaMethod::Overall);
        assert_eq!(eta, Some(Duration::from_secs(10)));
    }

    #[test]
    fn unknown_when_all_speeds_are_zero() {
        let (method, eta) = select_eta(1000, 0, 0.0, 0.0, 0.0);
        assert_eq!(method, EtaMethod::Unknown);
        assert_eq!(eta, None);
    }

    #[test]
    fn zero_remaining_is_zero_eta() {
        let (method, eta) = select_eta(0, 3, 100.0, 100.0, 100.0);
        assert_eq!(method, EtaMethod::Overall);
        assert_eq!(eta, Some(Duration::ZERO));
    }
}
