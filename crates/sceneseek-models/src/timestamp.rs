//! Timestamp keys and frame timestamp formatting.
//!
//! Two timestamp encodings cross component boundaries:
//! - frame tags in `MM:SS.ss` form, attached to sampled frames
//! - archive keys in `{start_ms}_{end_ms}` form, mapping embeddings back to
//!   the shot interval they describe

use crate::shot::Shot;

/// Interval assumed when a timestamp key carries only a single start time.
const DEFAULT_SPAN_MS: u64 = 2000;

/// Format a frame time (seconds) as `MM:SS.ss`.
pub fn format_frame_timestamp(seconds: f64) -> String {
    let seconds = seconds.max(0.0);
    format!("{:02}:{:05.2}", (seconds / 60.0) as u32, seconds % 60.0)
}

/// Archive key for a shot interval: `"{start_ms}_{end_ms}"`.
pub fn ts_key(shot: &Shot) -> String {
    format!("{}_{}", shot.start_ms, shot.end_ms)
}

/// Fallback archive key for a sentence with no matching interval.
pub fn idx_key(idx: usize) -> String {
    format!("idx_{}", idx)
}

/// Parse a timestamp key back into an interval.
///
/// `"{start}_{end}"` parses to its interval; a bare millisecond value maps to
/// a default-width window starting there; anything else maps to the window at
/// zero. This mirrors how keys are consumed during frame refinement, where a
/// best-effort interval beats a hard failure.
pub fn parse_ts_key(key: &str) -> Shot {
    let parts: Vec<&str> = key.split('_').collect();
    if parts.len() == 2 {
        if let (Ok(start), Ok(end)) = (parts[0].parse::<f64>(), parts[1].parse::<f64>()) {
            if start >= 0.0 && end >= start {
                return Shot::new(start.round() as u64, end.round() as u64);
            }
        }
    }
    if let Ok(t) = key.parse::<f64>() {
        if t >= 0.0 {
            let start = t.round() as u64;
            return Shot::new(start, start + DEFAULT_SPAN_MS);
        }
    }
    Shot::new(0, DEFAULT_SPAN_MS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_frame_timestamp() {
        assert_eq!(format_frame_timestamp(0.0), "00:00.00");
        assert_eq!(format_frame_timestamp(75.5), "01:15.50");
        assert_eq!(format_frame_timestamp(605.25), "10:05.25");
    }

    #[test]
    fn test_ts_key_round_trip() {
        let shot = Shot::new(1500, 4200);
        assert_eq!(ts_key(&shot), "1500_4200");
        assert_eq!(parse_ts_key("1500_4200"), shot);
    }

    #[test]
    fn test_parse_bare_millis() {
        assert_eq!(parse_ts_key("3000"), Shot::new(3000, 5000));
    }

    #[test]
    fn test_parse_garbage_defaults_to_zero_window() {
        assert_eq!(parse_ts_key("idx_3"), Shot::new(0, 2000));
        assert_eq!(parse_ts_key("not a key"), Shot::new(0, 2000));
    }

    #[test]
    fn test_idx_key() {
        assert_eq!(idx_key(7), "idx_7");
    }
}
