//! Merging scene artifacts into the embedding archive.
//!
//! The merge is idempotent: a video id already present in the archive is
//! never re-embedded or overwritten, at both the file level (artifact stem)
//! and the nested id level. Re-running over a growing artifact folder only
//! pays for the new videos.

use std::path::Path;

use tracing::{info, warn};

use sceneseek_ml_client::TextEmbedder;
use sceneseek_models::SceneDocument;

use crate::archive::{EmbeddingArchive, VideoEmbeddings};
use crate::error::{IndexError, IndexResult};

/// Counters describing one merge run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    /// Videos newly embedded and added
    pub added_videos: usize,
    /// Artifact files skipped because their stem was already archived
    pub skipped_files: usize,
    /// Nested video ids skipped because they were already archived
    pub skipped_ids: usize,
    /// Artifact files rejected as malformed
    pub rejected_files: usize,
    /// Sentences embedded this run
    pub embedded_segments: usize,
}

/// Merge every scene artifact in `json_folder` into the archive at
/// `existing_path`, writing the result to `output_path`.
///
/// `existing_path` and `output_path` may be the same file; the save goes
/// through a temp file either way.
pub async fn merge(
    embedder: &dyn TextEmbedder,
    existing_path: impl AsRef<Path>,
    json_folder: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
) -> IndexResult<MergeOutcome> {
    let json_folder = json_folder.as_ref();

    let mut archive = EmbeddingArchive::load_or_empty(existing_path.as_ref()).await?;
    let mut outcome = MergeOutcome::default();

    // Stable file order keeps merges reproducible.
    let mut json_files = Vec::new();
    let mut entries = tokio::fs::read_dir(json_folder).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().map(|e| e == "json").unwrap_or(false) {
            json_files.push(path);
        }
    }
    json_files.sort();

    for json_path in &json_files {
        let stem = match json_path.file_stem().and_then(|s| s.to_str()) {
            Some(stem) => stem.to_string(),
            None => continue,
        };

        if archive.contains(&stem) {
            info!(video_id = %stem, "Already archived, skipping artifact file");
            outcome.skipped_files += 1;
            continue;
        }

        let text = tokio::fs::read_to_string(json_path).await?;
        let doc = match SceneDocument::from_json_str(&text) {
            Ok(doc) => doc,
            Err(e) => {
                warn!(
                    path = %json_path.display(),
                    error = %e,
                    "Rejecting malformed scene artifact"
                );
                outcome.rejected_files += 1;
                continue;
            }
        };

        if archive.contains(doc.video_id.as_str()) {
            info!(
                video_id = %doc.video_id,
                path = %json_path.display(),
                "Video id already archived, keeping existing entry"
            );
            outcome.skipped_ids += 1;
            continue;
        }

        let entry = embed_document(embedder, &doc, archive.dimension()).await?;
        outcome.embedded_segments += entry.segments.len();

        info!(
            video_id = %doc.video_id,
            segments = entry.segments.len(),
            "Added video embeddings"
        );
        archive.insert(&doc.video_id, entry);
        outcome.added_videos += 1;
    }

    archive.save(output_path.as_ref()).await?;
    Ok(outcome)
}

/// Embed every sentence of a document, in order, keyed by its interval.
async fn embed_document(
    embedder: &dyn TextEmbedder,
    doc: &SceneDocument,
    mut expected_dim: Option<usize>,
) -> IndexResult<VideoEmbeddings> {
    let mut entry = VideoEmbeddings::default();

    for (idx, sentence) in doc.sentences.iter().enumerate() {
        let vector = embedder.embed(sentence).await?;

        match expected_dim {
            None => expected_dim = Some(vector.len()),
            Some(d) if d != vector.len() => {
                return Err(IndexError::DimensionMismatch {
                    expected: d,
                    actual: vector.len(),
                });
            }
            Some(_) => {}
        }

        entry.push(doc.key_for(idx), vector);
    }

    Ok(entry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use sceneseek_ml_client::MlResult;
    use sceneseek_models::{Shot, VideoId};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    /// Deterministic fake embedder: vector derived from sentence length.
    struct FakeEmbedder {
        calls: AtomicUsize,
    }

    impl FakeEmbedder {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TextEmbedder for FakeEmbedder {
        async fn embed(&self, text: &str) -> MlResult<Vec<f32>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![text.len() as f32, 1.0])
        }
    }

    async fn write_artifact(dir: &Path, video_id: &str, sentences: &[&str]) {
        let shots: Vec<Shot> = (0..sentences.len() as u64)
            .map(|i| Shot::new(i * 2000, (i + 1) * 2000))
            .collect();
        let doc = SceneDocument::new(
            VideoId::new(video_id),
            sentences.len() as u64 * 2000,
            shots,
            sentences.iter().map(|s| s.to_string()).collect(),
        )
        .unwrap();
        tokio::fs::write(
            dir.join(format!("{video_id}.json")),
            doc.to_json_string().unwrap(),
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_merge_produces_interval_keys() {
        let dir = TempDir::new().unwrap();
        let json_dir = dir.path().join("json");
        tokio::fs::create_dir_all(&json_dir).await.unwrap();
        write_artifact(&json_dir, "vid_round_trip", &["a", "b"]).await;

        let archive_path = dir.path().join("archive.json");
        let embedder = FakeEmbedder::new();
        let outcome = merge(&embedder, &archive_path, &json_dir, &archive_path)
            .await
            .unwrap();
        assert_eq!(outcome.added_videos, 1);
        assert_eq!(outcome.embedded_segments, 2);

        let archive = EmbeddingArchive::load_or_empty(&archive_path).await.unwrap();
        let entry = archive.get("vid_round_trip").unwrap();
        let keys: Vec<&str> = entry.segments.iter().map(|s| s.ts_key.as_str()).collect();
        assert_eq!(keys, vec!["0_2000", "2000_4000"]);
    }

    #[tokio::test]
    async fn test_merge_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let json_dir = dir.path().join("json");
        tokio::fs::create_dir_all(&json_dir).await.unwrap();
        write_artifact(&json_dir, "vid_one", &["first", "second"]).await;
        write_artifact(&json_dir, "vid_two", &["third"]).await;

        let archive_path = dir.path().join("archive.json");
        let embedder = FakeEmbedder::new();

        let first = merge(&embedder, &archive_path, &json_dir, &archive_path)
            .await
            .unwrap();
        assert_eq!(first.added_videos, 2);
        let after_first = tokio::fs::read(&archive_path).await.unwrap();
        let calls_after_first = embedder.call_count();

        let second = merge(&embedder, &archive_path, &json_dir, &archive_path)
            .await
            .unwrap();
        assert_eq!(second.added_videos, 0);
        assert_eq!(second.skipped_files, 2);
        // No re-embedding on the second run, and the archive is byte-identical.
        assert_eq!(embedder.call_count(), calls_after_first);
        let after_second = tokio::fs::read(&archive_path).await.unwrap();
        assert_eq!(after_first, after_second);
    }

    #[tokio::test]
    async fn test_merge_rejects_malformed_artifact() {
        let dir = TempDir::new().unwrap();
        let json_dir = dir.path().join("json");
        tokio::fs::create_dir_all(&json_dir).await.unwrap();
        tokio::fs::write(json_dir.join("broken.json"), "{not json")
            .await
            .unwrap();
        write_artifact(&json_dir, "vid_good", &["fine"]).await;

        let archive_path = dir.path().join("archive.json");
        let embedder = FakeEmbedder::new();
        let outcome = merge(&embedder, &archive_path, &json_dir, &archive_path)
            .await
            .unwrap();
        assert_eq!(outcome.rejected_files, 1);
        assert_eq!(outcome.added_videos, 1);
    }

    #[tokio::test]
    async fn test_merge_first_write_wins_for_nested_id() {
        let dir = TempDir::new().unwrap();
        let json_dir = dir.path().join("json");
        tokio::fs::create_dir_all(&json_dir).await.unwrap();

        // Artifact whose file stem differs from its nested video id.
        let doc = SceneDocument::new(
            VideoId::new("vid_nested"),
            2000,
            vec![Shot::new(0, 2000)],
            vec!["text".to_string()],
        )
        .unwrap();
        tokio::fs::write(json_dir.join("other_stem.json"), doc.to_json_string().unwrap())
            .await
            .unwrap();

        let archive_path = dir.path().join("archive.json");
        let mut existing = EmbeddingArchive::new();
        let mut entry = VideoEmbeddings::default();
        entry.push("0_2000", vec![42.0, 42.0]);
        existing.insert(&VideoId::new("vid_nested"), entry);
        existing.save(&archive_path).await.unwrap();

        let embedder = FakeEmbedder::new();
        let outcome = merge(&embedder, &archive_path, &json_dir, &archive_path)
            .await
            .unwrap();
        assert_eq!(outcome.skipped_ids, 1);
        assert_eq!(outcome.added_videos, 0);

        // The pre-existing vector survives.
        let archive = EmbeddingArchive::load_or_empty(&archive_path).await.unwrap();
        assert_eq!(
            archive.get("vid_nested").unwrap().segments[0].vector,
            vec![42.0, 42.0]
        );
    }
}
