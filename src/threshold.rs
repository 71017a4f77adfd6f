//! Played-threshold calculation
//!
//! A track counts as "played" once playback has run for a configured
//! percentage of its duration. This module computes the number of seconds to
//! wait before checking.

const DEFAULT_PLAYED_PERCENT: u32 = 50;

/// Seconds of playback after which a track counts as played.
///
/// `played_percent` outside 1-100 falls back to 50. A missing or zero
/// duration (live streams) returns 0, meaning "record immediately,
/// best-effort" rather than waiting for a confirmation that never comes.
pub fn played_threshold_secs(duration_secs: Option<f64>, played_percent: u32) -> u64 {
    let percent = if (1..=100).contains(&played_percent) {
        played_percent
    } else {
        DEFAULT_PLAYED_PERCENT
    };

    match duration_secs {
        Some(d) if d > 0.0 => {
            let secs = (d * percent as f64 / 100.0).floor() as u64;
            secs.max(1)
        }
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_half_of_duration() {
        assert_eq!(played_threshold_secs(Some(200.0), 50), 100);
        assert_eq!(played_threshold_secs(Some(300.0), 10), 30);
        assert_eq!(played_threshold_secs(Some(180.0), 100), 180);
    }

    #[test]
    fn test_floor_and_minimum() {
        // 7 * 33% = 2.31 -> 2
        assert_eq!(played_threshold_secs(Some(7.0), 33), 2);
        // Very short tracks still wait at least one second
        assert_eq!(played_threshold_secs(Some(1.0), 1), 1);
        assert_eq!(played_threshold_secs(Some(0.5), 50), 1);
    }

    #[test]
    fn test_out_of_range_percent_defaults_to_half() {
        assert_eq!(played_threshold_secs(Some(200.0), 0), 100);
        assert_eq!(played_threshold_secs(Some(200.0), 101), 100);
        assert_eq!(played_threshold_secs(Some(200.0), 5000), 100);
    }

    #[test]
    fn test_unknown_duration_is_immediate() {
        assert_eq!(played_threshold_secs(None, 50), 0);
        assert_eq!(played_threshold_secs(Some(0.0), 50), 0);
        assert_eq!(played_threshold_secs(Some(-1.0), 50), 0);
    }

    #[test]
    fn test_matches_formula_across_range() {
        for d in [1u64, 10, 63, 200, 3600] {
            for p in [1u32, 25, 50, 99, 100] {
                let expected = ((d * p as u64) / 100).max(1);
                assert_eq!(played_threshold_secs(Some(d as f64), p), expected);
            }
        }
    }
}
