//! Retrieval result types.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::shot::Shot;
use crate::video::VideoId;

/// One caption-level match from the embedding archive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityResult {
    pub video_id: VideoId,
    /// Archive key of the matched segment (`"{start_ms}_{end_ms}"` or `"idx_{n}"`).
    pub ts_key: String,
    /// Cosine similarity against the query embedding.
    pub score: f32,
}

/// The final retrieval artifact: the best frame within a candidate window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BestFrame {
    pub video_id: VideoId,
    /// Candidate window from the caption-level match.
    pub time_range: Shot,
    /// Time of the best frame inside the window, milliseconds.
    pub best_time_ms: u64,
    /// Caption-level (semantic) similarity of the candidate.
    pub caption_score: f32,
    /// Visual similarity of the winning frame.
    pub frame_score: f32,
    /// Where the frame image was written.
    pub frame_path: PathBuf,
}
