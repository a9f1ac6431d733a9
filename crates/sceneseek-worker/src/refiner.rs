//! Frame refinement: visual re-ranking inside a candidate window.
//!
//! Caption embeddings localize a query to a shot, not a frame. The refiner
//! steps through the candidate window at a fixed interval, scores each
//! decodable frame against the query in a joint image-text embedding space,
//! and keeps the maximum. This second model is intentionally different from
//! the sentence embedder: coarse semantic match first, literal pixels second.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::DynamicImage;
use tracing::debug;

use sceneseek_media::decode_frame_at_ms;
use sceneseek_ml_client::ImageTextScorer;
use sceneseek_models::Shot;

use crate::error::WorkerResult;

/// The best frame found inside one candidate window.
#[derive(Debug, Clone)]
pub struct RefinedFrame {
    pub image: DynamicImage,
    pub time_ms: u64,
    pub score: f32,
}

/// Scale a vector to unit L2 norm. Zero vectors are returned unchanged.
pub fn l2_normalize(v: &[f32]) -> Vec<f32> {
    let norm = v.iter().map(|x| (*x as f64) * (*x as f64)).sum::<f64>().sqrt();
    if norm > 0.0 {
        v.iter().map(|x| (*x as f64 / norm) as f32).collect()
    } else {
        v.to_vec()
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Locate a video file by id across the given directories.
///
/// Filenames are matched by substring against the id; directories are
/// searched in priority order and the first match wins (alphabetical within
/// a directory, for reproducibility). `None` when no directory has a match.
pub async fn find_video_by_id(dirs: &[PathBuf], video_id: &str) -> Option<PathBuf> {
    for dir in dirs {
        let mut entries = match tokio::fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(_) => continue,
        };

        let mut matches = Vec::new();
        while let Ok(Some(entry)) = entries.next_entry().await {
            let path = entry.path();
            let is_video = path
                .extension()
                .map(|e| e == "mp4" || e == "mkv" || e == "webm")
                .unwrap_or(false);
            let name_matches = path
                .file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.contains(video_id))
                .unwrap_or(false);
            if is_video && name_matches {
                matches.push(path);
            }
        }

        matches.sort();
        if let Some(path) = matches.into_iter().next() {
            return Some(path);
        }
    }
    None
}

/// Find the best-matching frame within `window`.
///
/// `query_embedding` must already be L2-normalized. Frames that fail to
/// decode are skipped; `Ok(None)` means nothing in the window decoded.
/// Scorer errors propagate so the caller's unload discipline can run.
pub async fn find_best_frame(
    scorer: &dyn ImageTextScorer,
    video: &Path,
    window: Shot,
    query_embedding: &[f32],
    sampling_interval_ms: u64,
) -> WorkerResult<Option<RefinedFrame>> {
    let interval = sampling_interval_ms.max(1);
    let mut best: Option<RefinedFrame> = None;

    let mut t = window.start_ms;
    while t <= window.end_ms {
        let image = match decode_frame_at_ms(video, t).await {
            Ok(image) => image,
            Err(e) => {
                debug!(
                    video = %video.display(),
                    time_ms = t,
                    error = %e,
                    "Skipping undecodable frame during refinement"
                );
                t += interval;
                continue;
            }
        };

        let mut png = Vec::new();
        image.write_to(&mut Cursor::new(&mut png), image::ImageOutputFormat::Png)?;

        let frame_embedding = l2_normalize(&scorer.embed_image(&png).await?);
        let score = dot(query_embedding, &frame_embedding);

        if best.as_ref().map(|b| score > b.score).unwrap_or(true) {
            best = Some(RefinedFrame {
                image,
                time_ms: t,
                score,
            });
        }

        t += interval;
    }

    if let Some(ref frame) = best {
        debug!(
            video = %video.display(),
            time_ms = frame.time_ms,
            score = frame.score,
            "Refined best frame"
        );
    }

    Ok(best)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_l2_normalize() {
        let v = l2_normalize(&[3.0, 4.0]);
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[1] - 0.8).abs() < 1e-6);
        let norm: f32 = v.iter().map(|x| x * x).sum();
        assert!((norm - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_l2_normalize_zero_vector() {
        assert_eq!(l2_normalize(&[0.0, 0.0]), vec![0.0, 0.0]);
    }

    #[tokio::test]
    async fn test_find_video_by_id_first_dir_wins() {
        let dir_a = TempDir::new().unwrap();
        let dir_b = TempDir::new().unwrap();
        let in_a = dir_a.path().join("movie_dQw4w9WgXcQ.mp4");
        let in_b = dir_b.path().join("other_dQw4w9WgXcQ.mp4");
        std::fs::write(&in_a, b"").unwrap();
        std::fs::write(&in_b, b"").unwrap();

        let dirs = vec![dir_a.path().to_path_buf(), dir_b.path().to_path_buf()];
        let found = find_video_by_id(&dirs, "dQw4w9WgXcQ").await.unwrap();
        assert_eq!(found, in_a);
    }

    #[tokio::test]
    async fn test_find_video_by_id_ignores_non_video_files() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("notes_dQw4w9WgXcQ.txt"), b"").unwrap();

        let dirs = vec![dir.path().to_path_buf()];
        assert!(find_video_by_id(&dirs, "dQw4w9WgXcQ").await.is_none());
    }

    #[tokio::test]
    async fn test_find_video_by_id_missing_dir() {
        let dirs = vec![PathBuf::from("/no/such/dir")];
        assert!(find_video_by_id(&dirs, "anything").await.is_none());
    }
}
