//! Client for the model server hosting the heavy models.
//!
//! Captioning, sentence embedding, joint image-text embedding, speech
//! recognition, and translation all live behind one HTTP service that owns
//! the accelerator. This crate provides the typed client plus the capability
//! traits the pipeline consumes, keeping model internals out of scope.

pub mod capabilities;
pub mod client;
pub mod error;
pub mod types;

pub use capabilities::{Captioner, ImageTextScorer, TextEmbedder, Transcriber, Translator};
pub use client::{MlClient, MlClientConfig};
pub use error::{MlError, MlResult};
pub use types::{GenerationParams, ModelKind, TensorPayload};
