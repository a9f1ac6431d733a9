//! Capability traits over the opaque models.
//!
//! The pipeline depends on these traits rather than on [`MlClient`] directly,
//! so tests can inject fakes and alternative backends can slot in without
//! touching pipeline code. The contract is input/output only; nothing behind
//! a trait exposes model internals.

use async_trait::async_trait;

use crate::client::MlClient;
use crate::error::MlResult;
use crate::types::{GenerationParams, ModelKind, TensorPayload};

/// `embed(text) -> vector` over caption sentences and queries.
#[async_trait]
pub trait TextEmbedder: Send + Sync {
    async fn embed(&self, text: &str) -> MlResult<Vec<f32>>;

    async fn embed_batch(&self, texts: &[String]) -> MlResult<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed(text).await?);
        }
        Ok(out)
    }
}

/// `caption(frames, prompt) -> text` with explicit accelerator lifecycle.
#[async_trait]
pub trait Captioner: Send + Sync {
    /// Put the caption model on the accelerator.
    async fn load(&self) -> MlResult<()>;

    /// Release the caption model's accelerator memory.
    async fn unload(&self) -> MlResult<()>;

    /// Caption one mini-batch; `frames` and `prompts` are index-aligned.
    async fn caption(
        &self,
        frames: Vec<TensorPayload>,
        prompts: Vec<String>,
        params: &GenerationParams,
    ) -> MlResult<Vec<String>>;
}

/// Joint image-text embedding used for frame re-ranking, with explicit
/// accelerator lifecycle.
#[async_trait]
pub trait ImageTextScorer: Send + Sync {
    async fn load(&self) -> MlResult<()>;

    async fn unload(&self) -> MlResult<()>;

    /// Embed a query in the joint space.
    async fn embed_text(&self, text: &str) -> MlResult<Vec<f32>>;

    /// Embed a frame (PNG bytes) in the joint space.
    async fn embed_image(&self, image_png: &[u8]) -> MlResult<Vec<f32>>;
}

/// `transcribe(audio) -> text`.
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, audio_wav: &[u8]) -> MlResult<String>;
}

/// `translate(text, src, dst) -> text`.
#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(&self, text: &str, source: &str, target: &str) -> MlResult<String>;
}

#[async_trait]
impl TextEmbedder for MlClient {
    async fn embed(&self, text: &str) -> MlResult<Vec<f32>> {
        let mut embeddings = self.embed_texts(vec![text.to_string()]).await?;
        Ok(embeddings.pop().unwrap_or_default())
    }

    async fn embed_batch(&self, texts: &[String]) -> MlResult<Vec<Vec<f32>>> {
        self.embed_texts(texts.to_vec()).await
    }
}

#[async_trait]
impl Captioner for MlClient {
    async fn load(&self) -> MlResult<()> {
        self.load_model(ModelKind::Caption).await
    }

    async fn unload(&self) -> MlResult<()> {
        self.unload_model(ModelKind::Caption).await
    }

    async fn caption(
        &self,
        frames: Vec<TensorPayload>,
        prompts: Vec<String>,
        params: &GenerationParams,
    ) -> MlResult<Vec<String>> {
        self.caption_batch(frames, prompts, params).await
    }
}

#[async_trait]
impl ImageTextScorer for MlClient {
    async fn load(&self) -> MlResult<()> {
        self.load_model(ModelKind::ImageText).await
    }

    async fn unload(&self) -> MlResult<()> {
        self.unload_model(ModelKind::ImageText).await
    }

    async fn embed_text(&self, text: &str) -> MlResult<Vec<f32>> {
        self.embed_query(text).await
    }

    async fn embed_image(&self, image_png: &[u8]) -> MlResult<Vec<f32>> {
        MlClient::embed_image(self, image_png).await
    }
}

#[async_trait]
impl Transcriber for MlClient {
    async fn transcribe(&self, audio_wav: &[u8]) -> MlResult<String> {
        MlClient::transcribe(self, audio_wav).await
    }
}

#[async_trait]
impl Translator for MlClient {
    async fn translate(&self, text: &str, source: &str, target: &str) -> MlResult<String> {
        MlClient::translate(self, text, source, target).await
    }
}
