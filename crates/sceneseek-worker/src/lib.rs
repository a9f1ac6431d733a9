//! Video understanding pipeline worker.
//!
//! Ties the media, model-client, and index crates together: batch shot
//! detection and captioning on the ingest side, two-stage text-to-frame
//! retrieval on the query side.

pub mod caption_engine;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod prompts;
pub mod refiner;
pub mod retrieval;

pub use caption_engine::CaptionEngine;
pub use config::{PipelineConfig, RetrievalConfig};
pub use error::{WorkerError, WorkerResult};
pub use pipeline::{PipelineOutcome, VideoPipeline};
pub use refiner::{find_best_frame, find_video_by_id, RefinedFrame};
pub use retrieval::RetrievalService;
