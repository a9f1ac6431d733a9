//! FFmpeg CLI wrapper for the SceneSeek pipeline.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building
//! - Video probing (duration, frame rate, frame count)
//! - Shot boundary detection via the `scene` filter
//! - Frame-index sampling and tensor preprocessing
//! - Audio track extraction for transcription

pub mod audio;
pub mod command;
pub mod error;
pub mod frames;
pub mod probe;
pub mod shots;

pub use audio::extract_audio_wav;
pub use command::{FfmpegCommand, FfmpegRunner};
pub use error::{MediaError, MediaResult};
pub use frames::{
    decode_frame_at_ms, extract_frame_set, preprocess_frame, sample_frame_indices, FramePrepConfig,
    FrameSet, IMAGENET_MEAN, IMAGENET_STD,
};
pub use probe::{get_duration, probe_video, VideoInfo};
pub use shots::{
    detect_shot_boundaries, detect_shots, shots_from_boundaries, uniform_segments, ShotDetectConfig,
};
