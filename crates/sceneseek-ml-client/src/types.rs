//! Model server request/response types.

use serde::{Deserialize, Serialize};

use crate::error::{MlError, MlResult};

/// Heavy models hosted by the server, addressable for load/unload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    /// Vision-language caption model
    Caption,
    /// Sentence embedding model
    TextEmbed,
    /// Joint image-text embedding model used for frame re-ranking
    ImageText,
    /// Speech-to-text model
    Transcribe,
    /// Translation model
    Translate,
}

impl ModelKind {
    /// URL path segment for this model.
    pub fn path_segment(&self) -> &'static str {
        match self {
            Self::Caption => "caption",
            Self::TextEmbed => "text-embed",
            Self::ImageText => "image-text",
            Self::Transcribe => "transcribe",
            Self::Translate => "translate",
        }
    }
}

/// Generation parameters for captioning, fixed by configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationParams {
    pub max_new_tokens: u32,
    pub num_beams: u32,
    pub no_repeat_ngram_size: u32,
    pub length_penalty: f32,
    pub early_stopping: bool,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            max_new_tokens: 512,
            num_beams: 2,
            no_repeat_ngram_size: 3,
            length_penalty: 1.0,
            early_stopping: true,
        }
    }
}

/// A dense tensor shipped as shape plus flat row-major data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TensorPayload {
    pub shape: Vec<usize>,
    pub data: Vec<f32>,
}

impl TensorPayload {
    /// Build a payload from a 4-dimensional frame tensor.
    pub fn from_array4(array: &ndarray::Array4<f32>) -> Self {
        Self {
            shape: array.shape().to_vec(),
            data: array.iter().copied().collect(),
        }
    }

    /// Check that the data length matches the declared shape.
    pub fn validate(&self) -> MlResult<()> {
        let expected: usize = self.shape.iter().product();
        if expected != self.data.len() {
            return Err(MlError::InvalidResponse(format!(
                "tensor shape {:?} implies {} elements, got {}",
                self.shape,
                expected,
                self.data.len()
            )));
        }
        Ok(())
    }
}

/// Request for batched caption generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptionRequest {
    /// One tensor per shot, each `[n, 3, size, size]`
    pub frames: Vec<TensorPayload>,
    /// One prompt per shot, index-aligned with `frames`
    pub prompts: Vec<String>,
    pub params: GenerationParams,
}

/// Response to a caption request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptionResponse {
    pub captions: Vec<String>,
}

/// Request for text embeddings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbedTextRequest {
    pub texts: Vec<String>,
}

/// Response carrying one embedding per input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbedResponse {
    pub embeddings: Vec<Vec<f32>>,
}

/// Request for an image embedding; image bytes are base64-encoded PNG.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbedImageRequest {
    pub image_png: String,
}

/// Request for audio transcription; audio bytes are base64-encoded WAV.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscribeRequest {
    pub audio_wav: String,
}

/// Response to a transcription request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscribeResponse {
    pub transcript: String,
}

/// Request for translation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslateRequest {
    pub text: String,
    pub source_lang: String,
    pub target_lang: String,
}

/// Response to a translation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslateResponse {
    pub text: String,
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tensor_payload_from_array() {
        let array = ndarray::Array4::<f32>::zeros((2, 3, 4, 4));
        let payload = TensorPayload::from_array4(&array);
        assert_eq!(payload.shape, vec![2, 3, 4, 4]);
        assert_eq!(payload.data.len(), 96);
        payload.validate().unwrap();
    }

    #[test]
    fn test_tensor_payload_rejects_shape_mismatch() {
        let payload = TensorPayload {
            shape: vec![2, 2],
            data: vec![0.0; 3],
        };
        assert!(payload.validate().is_err());
    }

    #[test]
    fn test_generation_params_defaults() {
        let params = GenerationParams::default();
        assert_eq!(params.max_new_tokens, 512);
        assert_eq!(params.num_beams, 2);
        assert!(params.early_stopping);
    }

    #[test]
    fn test_model_kind_paths() {
        assert_eq!(ModelKind::Caption.path_segment(), "caption");
        assert_eq!(ModelKind::ImageText.path_segment(), "image-text");
    }
}
