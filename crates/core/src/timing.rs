use crate::model::PlaybackWindow;
use std::time::{SystemTime, UNIX_EPOCH};

pub fn epoch_millis(at: SystemTime) -> i64 {
    at.duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

pub fn compute(now: SystemTime, duration_secs: u64) -> PlaybackWindow {
    let start_ms = epoch_millis(now);
    let length_ms = i64::try_from(duration_secs.saturating_mul(1_000)).unwrap_or(i64::MAX);
    PlaybackWindow {
        start_ms,
        end_ms: start_ms.saturating_add(length_ms),
    }
}

#[cfg(test)]
mod tests {
    use super::{compute, epoch_millis};
    use std::time::{Duration, UNIX_EPOCH};

    #[test]
    fn window_is_anchored_at_now() {
        let t = UNIX_EPOCH + Duration::from_millis(1_700_000_000_123);
        let window = compute(t, 225);
        assert_eq!(window.start_ms, 1_700_000_000_123);
        assert_eq!(window.end_ms, 1_700_000_000_123 + 225_000);
    }

    #[test]
    fn zero_length_track() {
        let t = UNIX_EPOCH + Duration::from_secs(42);
        let window = compute(t, 0);
        assert_eq!(window.start_ms, window.end_ms);
    }

    #[test]
    fn pre_epoch_clamps() {
        assert_eq!(epoch_millis(UNIX_EPOCH - Duration::from_secs(1)), 0);
    }

    #[test]
    fn huge_duration_saturates() {
        let window = compute(UNIX_EPOCH + Duration::from_secs(1), u64::MAX);
        assert_eq!(window.end_ms, i64::MAX);
    }
}
