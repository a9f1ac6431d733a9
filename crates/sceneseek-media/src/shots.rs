//! Shot boundary detection.
//!
//! Boundaries come from FFmpeg's content-change detector: the `scene` filter
//! scores frame-to-frame change, `showinfo` reports the timestamps of frames
//! whose score exceeds the threshold, and the timestamps are parsed back out
//! of stderr. Trailing credits/logos are kept out by dropping any shot that
//! ends inside the excluded trailing window.

use std::path::Path;

use tracing::{debug, info};

use sceneseek_models::Shot;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::MediaResult;
use crate::probe::{probe_video, VideoInfo};

/// Configuration for shot boundary detection.
#[derive(Debug, Clone)]
pub struct ShotDetectConfig {
    /// Content-change score above which a boundary is declared (0.0-1.0)
    pub threshold: f64,
    /// Trailing window (seconds) excluded from shot construction
    pub excluded_trailing_secs: f64,
}

impl Default for ShotDetectConfig {
    fn default() -> Self {
        Self {
            threshold: 0.3,
            excluded_trailing_secs: 30.0,
        }
    }
}

/// Detect raw shot boundary timestamps (seconds) in a video.
///
/// Returns only the detected change points; implicit start/end boundaries
/// are added by [`shots_from_boundaries`].
pub async fn detect_shot_boundaries(
    path: impl AsRef<Path>,
    threshold: f64,
) -> MediaResult<Vec<f64>> {
    let path = path.as_ref();

    let filter = format!("select='gt(scene,{})',showinfo", threshold);
    let cmd = FfmpegCommand::null_output(path).filter_complex(filter);

    let stderr = FfmpegRunner::new().run_capture_stderr(&cmd).await?;
    let times = parse_pts_times(&stderr);

    debug!(
        path = %path.display(),
        boundaries = times.len(),
        "Shot boundary detection complete"
    );

    Ok(times)
}

/// Parse `pts_time:` values out of showinfo stderr output.
fn parse_pts_times(stderr: &str) -> Vec<f64> {
    let mut times = Vec::new();
    for line in stderr.lines() {
        if let Some(rest) = line.split("pts_time:").nth(1) {
            let token: String = rest
                .chars()
                .take_while(|c| c.is_ascii_digit() || *c == '.')
                .collect();
            if let Ok(t) = token.parse::<f64>() {
                times.push(t);
            }
        }
    }
    times
}

/// Convert boundary timestamps into half-open shots.
///
/// `0.0` is always an implicit first boundary and the stream duration an
/// implicit last one. Shots ending after
/// `duration - excluded_trailing_secs` are dropped.
pub fn shots_from_boundaries(
    boundaries: &[f64],
    duration_secs: f64,
    excluded_trailing_secs: f64,
) -> Vec<Shot> {
    let mut times: Vec<f64> = boundaries.to_vec();

    if times.first().map(|t| *t != 0.0).unwrap_or(true) {
        times.insert(0, 0.0);
    }
    if times.last().map(|t| *t < duration_secs).unwrap_or(true) {
        times.push(duration_secs);
    }

    let cutoff = duration_secs - excluded_trailing_secs;
    let mut shots = Vec::with_capacity(times.len().saturating_sub(1));

    for pair in times.windows(2) {
        let (start, end) = (pair[0], pair[1]);
        if end <= start {
            continue;
        }
        if end > cutoff {
            continue;
        }
        shots.push(Shot::new(
            (start * 1000.0).round() as u64,
            (end * 1000.0).round() as u64,
        ));
    }

    shots
}

/// Split a video into `count` uniform half-open segments.
///
/// Fallback used when boundary detection is disabled or finds nothing
/// usable; zero-length segments from very short videos are omitted.
pub fn uniform_segments(duration_ms: u64, count: usize) -> Vec<Shot> {
    let mut shots = Vec::with_capacity(count);
    for i in 0..count {
        let start = duration_ms * i as u64 / count as u64;
        let end = duration_ms * (i as u64 + 1) / count as u64;
        if end > start {
            shots.push(Shot::new(start, end));
        }
    }
    shots
}

/// Probe a video and detect its shots in one pass.
pub async fn detect_shots(
    path: impl AsRef<Path>,
    config: &ShotDetectConfig,
) -> MediaResult<(Vec<Shot>, VideoInfo)> {
    let path = path.as_ref();

    let info = probe_video(path).await?;
    let boundaries = detect_shot_boundaries(path, config.threshold).await?;
    let shots = shots_from_boundaries(&boundaries, info.duration, config.excluded_trailing_secs);

    info!(
        path = %path.display(),
        shots = shots.len(),
        duration_secs = info.duration,
        "Detected shots"
    );

    Ok((shots, info))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sceneseek_models::shot::validate_shot_list;

    #[test]
    fn test_parse_pts_times() {
        let stderr = "\
[Parsed_showinfo_1 @ 0x5555] n:   0 pts:  12800 pts_time:5.12    duration_time:0.04\n\
irrelevant line\n\
[Parsed_showinfo_1 @ 0x5555] n:   1 pts:  25600 pts_time:10.24   duration_time:0.04\n";
        assert_eq!(parse_pts_times(stderr), vec![5.12, 10.24]);
    }

    #[test]
    fn test_single_cut_two_shots() {
        // 10s video, one cut at 5s, no trailing exclusion
        let shots = shots_from_boundaries(&[5.0], 10.0, 0.0);
        assert_eq!(shots, vec![Shot::new(0, 5000), Shot::new(5000, 10_000)]);
    }

    #[test]
    fn test_no_cuts_yields_single_shot() {
        let shots = shots_from_boundaries(&[], 10.0, 0.0);
        assert_eq!(shots, vec![Shot::new(0, 10_000)]);
    }

    #[test]
    fn test_trailing_window_dropped() {
        // Cut at 60s of a 100s video; 30s trailing exclusion drops everything
        // that ends past 70s.
        let shots = shots_from_boundaries(&[60.0], 100.0, 30.0);
        assert_eq!(shots, vec![Shot::new(0, 60_000)]);
    }

    #[test]
    fn test_shot_list_invariants() {
        let shots = shots_from_boundaries(&[3.2, 7.9, 41.0], 120.0, 30.0);
        assert!(validate_shot_list(&shots, 90_000));
        assert!(!shots.is_empty());
    }

    #[test]
    fn test_explicit_zero_boundary_not_duplicated() {
        let shots = shots_from_boundaries(&[0.0, 5.0], 10.0, 0.0);
        assert_eq!(shots, vec![Shot::new(0, 5000), Shot::new(5000, 10_000)]);
    }

    #[test]
    fn test_uniform_segments() {
        let shots = uniform_segments(10_000, 4);
        assert_eq!(shots.len(), 4);
        assert_eq!(shots[0], Shot::new(0, 2500));
        assert_eq!(shots[3], Shot::new(7500, 10_000));
        assert!(validate_shot_list(&shots, 10_000));
    }

    #[test]
    fn test_uniform_segments_short_video() {
        // 5ms video split 13 ways produces only non-empty segments
        let shots = uniform_segments(5, 13);
        assert!(shots.len() < 13);
        assert!(validate_shot_list(&shots, 5));
    }
}
