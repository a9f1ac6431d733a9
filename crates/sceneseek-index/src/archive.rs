//! The persistent embedding archive.
//!
//! One named entry per video id, each holding an ordered list of
//! `(timestamp_key, vector)` pairs. The format only supports whole-file
//! save: writes go to a fresh temp file in the destination directory and
//! are renamed into place, so a failed write never corrupts the previous
//! archive.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use sceneseek_models::VideoId;

use crate::error::{IndexError, IndexResult};

/// One caption embedding keyed by its shot interval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentEmbedding {
    pub ts_key: String,
    pub vector: Vec<f32>,
}

/// Ordered per-video embeddings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VideoEmbeddings {
    pub segments: Vec<SegmentEmbedding>,
}

impl VideoEmbeddings {
    pub fn push(&mut self, ts_key: impl Into<String>, vector: Vec<f32>) {
        self.segments.push(SegmentEmbedding {
            ts_key: ts_key.into(),
            vector,
        });
    }
}

/// The whole archive: `video_id -> ordered segment embeddings`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingArchive {
    videos: BTreeMap<String, VideoEmbeddings>,
}

impl EmbeddingArchive {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load an archive, or start empty when the file does not exist.
    pub async fn load_or_empty(path: impl AsRef<Path>) -> IndexResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!(path = %path.display(), "No existing archive, starting empty");
            return Ok(Self::new());
        }
        let bytes = tokio::fs::read(path).await?;
        let archive: Self = serde_json::from_slice(&bytes)
            .map_err(|e| IndexError::invalid_archive(path, e.to_string()))?;
        archive.validate(path)?;
        Ok(archive)
    }

    /// Every stored vector must share one dimension.
    fn validate(&self, path: &Path) -> IndexResult<()> {
        let mut dim = None;
        for (video_id, entry) in &self.videos {
            for segment in &entry.segments {
                match dim {
                    None => dim = Some(segment.vector.len()),
                    Some(d) if d != segment.vector.len() => {
                        return Err(IndexError::invalid_archive(
                            path,
                            format!(
                                "vector dimension {} under '{}' conflicts with {}",
                                segment.vector.len(),
                                video_id,
                                d
                            ),
                        ));
                    }
                    Some(_) => {}
                }
            }
        }
        Ok(())
    }

    /// Persist the whole archive via temp file + rename.
    pub async fn save(&self, path: impl AsRef<Path>) -> IndexResult<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.exists() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let tmp_path = path.with_extension("tmp");
        let bytes = serde_json::to_vec(self)?;

        tokio::fs::write(&tmp_path, &bytes).await?;
        if let Err(e) = tokio::fs::rename(&tmp_path, path).await {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(IndexError::from(e));
        }

        debug!(
            path = %path.display(),
            videos = self.videos.len(),
            "Archive saved"
        );
        Ok(())
    }

    /// Whether the archive holds an entry for this id.
    pub fn contains(&self, video_id: &str) -> bool {
        self.videos.contains_key(video_id)
    }

    /// Insert a new video entry. Existing entries are never replaced;
    /// returns `false` (and leaves the archive unchanged) when the id is
    /// already present.
    pub fn insert(&mut self, video_id: &VideoId, entry: VideoEmbeddings) -> bool {
        if self.contains(video_id.as_str()) {
            return false;
        }
        self.videos.insert(video_id.as_str().to_string(), entry);
        true
    }

    /// Look up one video's embeddings.
    pub fn get(&self, video_id: &str) -> Option<&VideoEmbeddings> {
        self.videos.get(video_id)
    }

    /// Number of video entries.
    pub fn len(&self) -> usize {
        self.videos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.videos.is_empty()
    }

    /// Dimension of stored vectors, when any exist.
    pub fn dimension(&self) -> Option<usize> {
        self.videos
            .values()
            .flat_map(|v| v.segments.first())
            .map(|s| s.vector.len())
            .next()
    }

    /// Iterate `(video_id, ts_key, vector)` in stable order.
    pub fn iter_segments(&self) -> impl Iterator<Item = (&str, &str, &[f32])> {
        self.videos.iter().flat_map(|(video_id, entry)| {
            entry
                .segments
                .iter()
                .map(move |s| (video_id.as_str(), s.ts_key.as_str(), s.vector.as_slice()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn entry(keys_and_vecs: &[(&str, Vec<f32>)]) -> VideoEmbeddings {
        let mut e = VideoEmbeddings::default();
        for (key, vec) in keys_and_vecs {
            e.push(*key, vec.clone());
        }
        e
    }

    #[tokio::test]
    async fn test_save_and_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("archive.json");

        let mut archive = EmbeddingArchive::new();
        archive.insert(
            &VideoId::new("vid_a"),
            entry(&[("0_2000", vec![0.1, 0.2]), ("2000_4000", vec![0.3, 0.4])]),
        );
        archive.save(&path).await.unwrap();

        let loaded = EmbeddingArchive::load_or_empty(&path).await.unwrap();
        assert_eq!(loaded, archive);
        assert_eq!(loaded.dimension(), Some(2));
    }

    #[tokio::test]
    async fn test_load_missing_is_empty() {
        let dir = TempDir::new().unwrap();
        let archive = EmbeddingArchive::load_or_empty(dir.path().join("none.json"))
            .await
            .unwrap();
        assert!(archive.is_empty());
    }

    #[tokio::test]
    async fn test_load_rejects_mixed_dimensions() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("archive.json");
        let json = r#"{"videos": {
            "a": {"segments": [{"ts_key": "0_1000", "vector": [0.1, 0.2]}]},
            "b": {"segments": [{"ts_key": "0_1000", "vector": [0.1]}]}
        }}"#;
        tokio::fs::write(&path, json).await.unwrap();

        let err = EmbeddingArchive::load_or_empty(&path).await.unwrap_err();
        assert!(matches!(err, IndexError::InvalidArchive { .. }));
    }

    #[test]
    fn test_insert_never_replaces() {
        let mut archive = EmbeddingArchive::new();
        let id = VideoId::new("vid_a");
        assert!(archive.insert(&id, entry(&[("0_1000", vec![1.0])])));
        assert!(!archive.insert(&id, entry(&[("0_1000", vec![9.0])])));
        assert_eq!(archive.get("vid_a").unwrap().segments[0].vector, vec![1.0]);
    }

    #[test]
    fn test_iter_segments_order() {
        let mut archive = EmbeddingArchive::new();
        archive.insert(
            &VideoId::new("b"),
            entry(&[("0_1000", vec![1.0]), ("1000_2000", vec![2.0])]),
        );
        archive.insert(&VideoId::new("a"), entry(&[("0_500", vec![3.0])]));

        let seen: Vec<(&str, &str)> = archive
            .iter_segments()
            .map(|(id, key, _)| (id, key))
            .collect();
        assert_eq!(
            seen,
            vec![("a", "0_500"), ("b", "0_1000"), ("b", "1000_2000")]
        );
    }

    #[tokio::test]
    async fn test_save_leaves_no_temp_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("archive.json");
        EmbeddingArchive::new().save(&path).await.unwrap();
        assert!(path.exists());
        assert!(!path.with_extension("tmp").exists());
    }
}
