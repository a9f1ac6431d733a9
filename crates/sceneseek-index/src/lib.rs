//! Persistent caption-embedding archive and similarity retrieval.
//!
//! The archive is the durable product of the captioning pipeline: per-video,
//! per-shot sentence embeddings keyed by their time interval. This crate owns
//! the archive file exclusively; all access goes through load/merge/save,
//! never shared in-place mutation.

pub mod archive;
pub mod error;
pub mod retriever;
pub mod store;

pub use archive::{EmbeddingArchive, SegmentEmbedding, VideoEmbeddings};
pub use error::{IndexError, IndexResult};
pub use retriever::{cosine_similarity, query};
pub use store::{merge, MergeOutcome};
