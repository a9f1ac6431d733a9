//! Shared data models for the SceneSeek pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Video identifiers and the filename-derived id strategies
//! - Shots (half-open time intervals from boundary detection)
//! - The per-video scene JSON artifact exchanged between pipeline stages
//! - Timestamp keys and frame timestamp formatting
//! - Retrieval result types

pub mod retrieval;
pub mod scene_doc;
pub mod shot;
pub mod timestamp;
pub mod video;

// Re-export common types
pub use retrieval::{BestFrame, SimilarityResult};
pub use scene_doc::{DurationMode, SceneDocument, SceneDocumentError};
pub use shot::Shot;
pub use timestamp::{format_frame_timestamp, idx_key, parse_ts_key, ts_key};
pub use video::{IdStrategy, VideoId};
