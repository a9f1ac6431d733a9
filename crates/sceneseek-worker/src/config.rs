//! Worker configuration.

use std::path::PathBuf;

use sceneseek_ml_client::GenerationParams;
use sceneseek_models::{DurationMode, IdStrategy};

/// Configuration for the captioning pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Directory of input videos
    pub video_dir: PathBuf,
    /// Directory for scene JSON artifacts
    pub output_json_dir: PathBuf,
    /// Path of the embedding archive
    pub archive_path: PathBuf,
    /// Frames sampled per shot
    pub num_segments: usize,
    /// Square model input size in pixels
    pub input_size: u32,
    /// Shots captioned per forward pass
    pub batch_size: usize,
    /// Content-change score declaring a shot boundary
    pub shot_threshold: f64,
    /// Trailing window excluded from shots (credits/logos), seconds
    pub excluded_trailing_secs: f64,
    /// Whether to transcribe dialogue and condition captions on it
    pub use_audio: bool,
    /// How the artifact duration field is computed
    pub duration_mode: DurationMode,
    /// How video ids derive from filenames
    pub id_strategy: IdStrategy,
    /// Max concurrent boundary-detection processes
    pub max_detect_parallel: usize,
    /// Uniform segments used when boundary detection yields nothing
    pub uniform_segment_count: usize,
    /// Caption generation parameters
    pub generation: GenerationParams,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            video_dir: PathBuf::from("./videos"),
            output_json_dir: PathBuf::from("./json_output"),
            archive_path: PathBuf::from("./embeddings.json"),
            num_segments: 8,
            input_size: 448,
            batch_size: 4,
            shot_threshold: 0.3,
            excluded_trailing_secs: 30.0,
            use_audio: true,
            duration_mode: DurationMode::default(),
            id_strategy: IdStrategy::default(),
            max_detect_parallel: 4,
            uniform_segment_count: 13,
            generation: GenerationParams::default(),
        }
    }
}

impl PipelineConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            video_dir: env_path("SCENESEEK_VIDEO_DIR", default.video_dir),
            output_json_dir: env_path("SCENESEEK_JSON_DIR", default.output_json_dir),
            archive_path: env_path("SCENESEEK_ARCHIVE", default.archive_path),
            num_segments: env_parse("SCENESEEK_NUM_SEGMENTS", default.num_segments),
            input_size: env_parse("SCENESEEK_INPUT_SIZE", default.input_size),
            batch_size: env_parse("SCENESEEK_BATCH_SIZE", default.batch_size).max(1),
            shot_threshold: env_parse("SCENESEEK_SHOT_THRESHOLD", default.shot_threshold),
            excluded_trailing_secs: env_parse(
                "SCENESEEK_EXCLUDE_TRAILING_SECS",
                default.excluded_trailing_secs,
            ),
            use_audio: env_parse("SCENESEEK_USE_AUDIO", default.use_audio),
            duration_mode: std::env::var("SCENESEEK_DURATION_MODE")
                .ok()
                .and_then(|s| DurationMode::parse(&s))
                .unwrap_or(default.duration_mode),
            id_strategy: std::env::var("SCENESEEK_ID_STRATEGY")
                .ok()
                .and_then(|s| IdStrategy::parse(&s))
                .unwrap_or(default.id_strategy),
            max_detect_parallel: env_parse(
                "SCENESEEK_MAX_DETECT_PARALLEL",
                default.max_detect_parallel,
            )
            .max(1),
            uniform_segment_count: env_parse(
                "SCENESEEK_UNIFORM_SEGMENTS",
                default.uniform_segment_count,
            )
            .max(1),
            generation: default.generation,
        }
    }
}

/// Configuration for the query-time retrieval flow.
#[derive(Debug, Clone)]
pub struct RetrievalConfig {
    /// Path of the embedding archive
    pub archive_path: PathBuf,
    /// Directories searched for video files, in priority order
    pub video_dirs: Vec<PathBuf>,
    /// Directory where refined frames are written
    pub output_dir: PathBuf,
    /// Caption-level candidates to refine
    pub top_k: usize,
    /// Frame sampling step inside a candidate window, milliseconds
    pub sampling_interval_ms: u64,
    /// Translate queries to English before retrieval
    pub translate_queries: bool,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            archive_path: PathBuf::from("./embeddings.json"),
            video_dirs: vec![PathBuf::from("./videos")],
            output_dir: PathBuf::from("./extracted_frames"),
            top_k: 5,
            sampling_interval_ms: 500,
            translate_queries: false,
        }
    }
}

impl RetrievalConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            archive_path: env_path("SCENESEEK_ARCHIVE", default.archive_path),
            video_dirs: std::env::var("SCENESEEK_VIDEO_DIRS")
                .map(|v| v.split(':').map(PathBuf::from).collect())
                .unwrap_or(default.video_dirs),
            output_dir: env_path("SCENESEEK_FRAME_DIR", default.output_dir),
            top_k: env_parse("SCENESEEK_TOP_K", default.top_k).max(1),
            sampling_interval_ms: env_parse(
                "SCENESEEK_SAMPLING_INTERVAL_MS",
                default.sampling_interval_ms,
            )
            .max(1),
            translate_queries: env_parse("SCENESEEK_TRANSLATE_QUERIES", default.translate_queries),
        }
    }
}

fn env_path(key: &str, default: PathBuf) -> PathBuf {
    std::env::var(key).map(PathBuf::from).unwrap_or(default)
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.num_segments, 8);
        assert_eq!(config.input_size, 448);
        assert_eq!(config.batch_size, 4);
        assert!((config.shot_threshold - 0.3).abs() < f64::EPSILON);
        assert_eq!(config.duration_mode, DurationMode::Subtract);
    }

    #[test]
    fn test_retrieval_defaults() {
        let config = RetrievalConfig::default();
        assert_eq!(config.top_k, 5);
        assert_eq!(config.sampling_interval_ms, 500);
        assert!(!config.translate_queries);
    }
}
