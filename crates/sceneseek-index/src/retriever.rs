//! Caption-level similarity retrieval.
//!
//! A linear scan over every stored embedding. The archive is demo-scale
//! (hundreds of videos, a few shots each), so no index structure is built;
//! replacing the scan with an ANN index is an explicit non-goal.

use std::cmp::Ordering;

use tracing::debug;

use sceneseek_ml_client::TextEmbedder;
use sceneseek_models::{SimilarityResult, VideoId};

use crate::archive::EmbeddingArchive;
use crate::error::IndexResult;

/// Cosine similarity between two vectors. Zero-norm inputs score 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += *x as f64 * *y as f64;
        norm_a += *x as f64 * *x as f64;
        norm_b += *y as f64 * *y as f64;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom > 0.0 {
        (dot / denom) as f32
    } else {
        0.0
    }
}

/// Rank every archived segment against a free-text query and return the
/// top `top_k` matches, best first. Ties keep archive iteration order
/// (the sort is stable).
pub async fn query(
    embedder: &dyn TextEmbedder,
    archive: &EmbeddingArchive,
    text: &str,
    top_k: usize,
) -> IndexResult<Vec<SimilarityResult>> {
    let query_embedding = embedder.embed(text).await?;

    let mut results: Vec<SimilarityResult> = archive
        .iter_segments()
        .map(|(video_id, ts_key, vector)| SimilarityResult {
            video_id: VideoId::new(video_id),
            ts_key: ts_key.to_string(),
            score: cosine_similarity(&query_embedding, vector),
        })
        .collect();

    results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    results.truncate(top_k);

    debug!(
        query = text,
        candidates = results.len(),
        best = results.first().map(|r| r.score).unwrap_or(0.0),
        "Similarity query complete"
    );

    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::VideoEmbeddings;
    use async_trait::async_trait;
    use sceneseek_ml_client::MlResult;

    struct UnitEmbedder;

    #[async_trait]
    impl TextEmbedder for UnitEmbedder {
        async fn embed(&self, _text: &str) -> MlResult<Vec<f32>> {
            Ok(vec![1.0, 0.0])
        }
    }

    fn archive_with(entries: &[(&str, &[(&str, [f32; 2])])]) -> EmbeddingArchive {
        let mut archive = EmbeddingArchive::new();
        for (video_id, segments) in entries {
            let mut entry = VideoEmbeddings::default();
            for (key, vec) in *segments {
                entry.push(*key, vec.to_vec());
            }
            archive.insert(&VideoId::new(*video_id), entry);
        }
        archive
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_similarity_degenerate_inputs() {
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[tokio::test]
    async fn test_query_ranks_and_truncates() {
        let archive = archive_with(&[
            ("vid_a", &[("0_1000", [1.0, 0.0]), ("1000_2000", [0.0, 1.0])]),
            ("vid_b", &[("0_1000", [0.7, 0.7])]),
            ("vid_c", &[("0_1000", [-1.0, 0.0])]),
        ]);

        let results = query(&UnitEmbedder, &archive, "anything", 2).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].video_id.as_str(), "vid_a");
        assert_eq!(results[0].ts_key, "0_1000");
        assert!(results[0].score >= results[1].score);
        assert!(results.iter().all(|r| archive.contains(r.video_id.as_str())));
    }

    #[tokio::test]
    async fn test_query_returns_at_most_top_k() {
        let archive = archive_with(&[("vid_a", &[("0_1000", [1.0, 0.0])])]);
        let results = query(&UnitEmbedder, &archive, "q", 5).await.unwrap();
        assert_eq!(results.len(), 1);
    }

    #[tokio::test]
    async fn test_query_stable_tie_break() {
        // Identical vectors tie; archive iteration order (sorted ids) wins.
        let archive = archive_with(&[
            ("vid_b", &[("0_1000", [1.0, 0.0])]),
            ("vid_a", &[("0_1000", [1.0, 0.0])]),
        ]);
        let results = query(&UnitEmbedder, &archive, "q", 2).await.unwrap();
        assert_eq!(results[0].video_id.as_str(), "vid_a");
        assert_eq!(results[1].video_id.as_str(), "vid_b");
    }

    #[tokio::test]
    async fn test_query_empty_archive() {
        let archive = EmbeddingArchive::new();
        let results = query(&UnitEmbedder, &archive, "q", 5).await.unwrap();
        assert!(results.is_empty());
    }
}
