//! Video identifiers.
//!
//! Movie-clip filenames carry a YouTube-style id in their suffix
//! (e.g. `Some Movie (1999)_dQw4w9WgXcQ.mp4`). The id-extraction strategy is
//! configurable because corpora disagree on naming; both supported strategies
//! produce stable ids for the same file across runs.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Length of a YouTube video id.
const YOUTUBE_ID_LEN: usize = 11;

/// Stems shorter than this are taken verbatim under [`IdStrategy::YoutubeSuffix`];
/// longer stems are assumed to end with a YouTube id.
const SHORT_STEM_LEN: usize = 20;

/// Strategy for deriving a [`VideoId`] from a filename.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum IdStrategy {
    /// Take the last 11 characters of the file stem (YouTube-id convention),
    /// or the whole stem when it is too short to carry one.
    #[default]
    YoutubeSuffix,
    /// Use the whole file stem verbatim.
    FullStem,
}

impl IdStrategy {
    /// Parse a strategy name (`youtube_suffix` / `full_stem`).
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "youtube_suffix" | "youtube" | "suffix" => Some(Self::YoutubeSuffix),
            "full_stem" | "stem" | "full" => Some(Self::FullStem),
            _ => None,
        }
    }
}

/// Stable identifier for a video, derived from its filename.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VideoId(String);

impl VideoId {
    /// Wrap an already-derived id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Derive an id from a file path using the given strategy.
    ///
    /// Returns `None` when the path has no usable UTF-8 stem.
    pub fn from_path(path: impl AsRef<Path>, strategy: IdStrategy) -> Option<Self> {
        let stem = path.as_ref().file_stem()?.to_str()?;
        if stem.is_empty() {
            return None;
        }
        Some(Self::from_stem(stem, strategy))
    }

    /// Derive an id from a file stem using the given strategy.
    pub fn from_stem(stem: &str, strategy: IdStrategy) -> Self {
        match strategy {
            IdStrategy::FullStem => Self(stem.to_string()),
            IdStrategy::YoutubeSuffix => {
                let chars = stem.chars().count();
                if chars < SHORT_STEM_LEN {
                    Self(stem.to_string())
                } else {
                    let skip = chars - YOUTUBE_ID_LEN;
                    Self(stem.chars().skip(skip).collect())
                }
            }
        }
    }

    /// The id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for VideoId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for VideoId {
    fn from(s: String) -> Self {
        Self(s)
    }
}
