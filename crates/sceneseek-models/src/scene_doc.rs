//! The per-video scene JSON artifact.
//!
//! This is the durable hand-off format between captioning and embedding:
//!
//! ```json
//! { "<video_id>": { "duration": 183000,
//!                   "timestamps": [[0, 2000], [2000, 4000]],
//!                   "sentences": ["...", "..."] } }
//! ```
//!
//! Arrays are index-aligned; `timestamps.len() == sentences.len()`.
//! Malformed artifacts are rejected at this boundary rather than propagated
//! as empty-looking documents.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::shot::Shot;
use crate::timestamp::{idx_key, ts_key};
use crate::video::VideoId;

/// How the `duration` field of a scene document is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DurationMode {
    /// End time of the last kept shot.
    Scene,
    /// Full stream duration minus the excluded trailing window.
    #[default]
    Subtract,
    /// Full stream duration.
    Full,
}

impl DurationMode {
    /// Parse a mode name (`scene` / `subtract` / `full`).
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "scene" => Some(Self::Scene),
            "subtract" => Some(Self::Subtract),
            "full" => Some(Self::Full),
            _ => None,
        }
    }
}

pub type SceneDocumentResult<T> = Result<T, SceneDocumentError>;

/// Errors raised when validating a scene artifact.
#[derive(Debug, Error)]
pub enum SceneDocumentError {
    #[error("artifact contains no video entry")]
    Empty,

    #[error("artifact contains {0} video entries, expected exactly one")]
    MultipleVideos(usize),

    #[error("timestamps ({timestamps}) and sentences ({sentences}) are not index-aligned")]
    LengthMismatch { timestamps: usize, sentences: usize },

    #[error("timestamp {index} is reversed or overlaps its predecessor")]
    UnorderedTimestamps { index: usize },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SceneDocumentBody {
    duration: u64,
    timestamps: Vec<[u64; 2]>,
    sentences: Vec<String>,
}

/// A validated per-video scene artifact.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneDocument {
    pub video_id: VideoId,
    pub duration_ms: u64,
    pub timestamps: Vec<Shot>,
    pub sentences: Vec<String>,
}

impl SceneDocument {
    /// Build a document from captioning output. `shots` and `sentences` must
    /// already be index-aligned.
    pub fn new(
        video_id: VideoId,
        duration_ms: u64,
        shots: Vec<Shot>,
        sentences: Vec<String>,
    ) -> SceneDocumentResult<Self> {
        let doc = Self {
            video_id,
            duration_ms,
            timestamps: shots,
            sentences,
        };
        doc.validate()?;
        Ok(doc)
    }

    /// Validate alignment and interval ordering.
    pub fn validate(&self) -> SceneDocumentResult<()> {
        if self.timestamps.len() != self.sentences.len() {
            return Err(SceneDocumentError::LengthMismatch {
                timestamps: self.timestamps.len(),
                sentences: self.sentences.len(),
            });
        }
        let mut prev_end = 0u64;
        for (i, shot) in self.timestamps.iter().enumerate() {
            if shot.start_ms >= shot.end_ms || shot.start_ms < prev_end {
                return Err(SceneDocumentError::UnorderedTimestamps { index: i });
            }
            prev_end = shot.end_ms;
        }
        Ok(())
    }

    /// Archive key for the `idx`-th sentence: the interval key when an
    /// interval exists at that index, the positional fallback otherwise.
    pub fn key_for(&self, idx: usize) -> String {
        match self.timestamps.get(idx) {
            Some(shot) => ts_key(shot),
            None => idx_key(idx),
        }
    }

    /// Serialize to the wire format.
    pub fn to_json_string(&self) -> SceneDocumentResult<String> {
        let body = SceneDocumentBody {
            duration: self.duration_ms,
            timestamps: self
                .timestamps
                .iter()
                .map(|s| [s.start_ms, s.end_ms])
                .collect(),
            sentences: self.sentences.clone(),
        };
        let mut outer = BTreeMap::new();
        outer.insert(self.video_id.as_str().to_string(), body);
        Ok(serde_json::to_string_pretty(&outer)?)
    }

    /// Parse and validate an artifact from its wire format.
    pub fn from_json_str(s: &str) -> SceneDocumentResult<Self> {
        let outer: BTreeMap<String, SceneDocumentBody> = serde_json::from_str(s)?;
        if outer.is_empty() {
            return Err(SceneDocumentError::Empty);
        }
        if outer.len() > 1 {
            return Err(SceneDocumentError::MultipleVideos(outer.len()));
        }
        let Some((video_id, body)) = outer.into_iter().next() else {
            return Err(SceneDocumentError::Empty);
        };

        let mut timestamps = Vec::with_capacity(body.timestamps.len());
        for (index, [start, end]) in body.timestamps.iter().enumerate() {
            if start >= end {
                return Err(SceneDocumentError::UnorderedTimestamps { index });
            }
            timestamps.push(Shot::new(*start, *end));
        }

        let doc = Self {
            video_id: VideoId::new(video_id),
            duration_ms: body.duration,
            timestamps,
            sentences: body.sentences,
        };
        doc.validate()?;
        Ok(doc)
    }
}
