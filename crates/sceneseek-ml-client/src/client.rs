//! Model server HTTP client.

use std::time::Duration;

use base64::Engine as _;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{MlError, MlResult};
use crate::types::{
    CaptionRequest, CaptionResponse, EmbedImageRequest, EmbedResponse, EmbedTextRequest,
    GenerationParams, HealthResponse, ModelKind, TensorPayload, TranscribeRequest,
    TranscribeResponse, TranslateRequest, TranslateResponse,
};

/// Configuration for the ML client.
#[derive(Debug, Clone)]
pub struct MlClientConfig {
    /// Base URL of the model server
    pub base_url: String,
    /// Request timeout
    pub timeout: Duration,
    /// Max retries
    pub max_retries: u32,
}

impl Default for MlClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8001".to_string(),
            timeout: Duration::from_secs(600), // captioning a long batch is slow
            max_retries: 2,
        }
    }
}

impl MlClientConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            base_url: std::env::var("ML_SERVICE_URL")
                .unwrap_or_else(|_| "http://localhost:8001".to_string()),
            timeout: Duration::from_secs(
                std::env::var("ML_SERVICE_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(600),
            ),
            max_retries: std::env::var("ML_SERVICE_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(2),
        }
    }
}

/// Client for the model server hosting the heavy models.
///
/// The server owns accelerator memory; `load_model`/`unload_model` move a
/// model on and off the accelerator. Everything else is a plain
/// request/response call against whichever model is resident.
#[derive(Clone)]
pub struct MlClient {
    http: Client,
    config: MlClientConfig,
}

impl MlClient {
    /// Create a new client.
    pub fn new(config: MlClientConfig) -> MlResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(MlError::Network)?;

        Ok(Self { http, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> MlResult<Self> {
        Self::new(MlClientConfig::from_env())
    }

    /// Check if the model server is healthy.
    pub async fn health_check(&self) -> MlResult<bool> {
        let url = format!("{}/health", self.config.base_url);

        match self.http.get(&url).send().await {
            Ok(response) if response.status().is_success() => {
                let health: HealthResponse = response.json().await?;
                Ok(health.status == "healthy" || health.status == "ok")
            }
            Ok(response) => {
                warn!("Model server health check failed: {}", response.status());
                Ok(false)
            }
            Err(e) => {
                warn!("Model server health check error: {}", e);
                Ok(false)
            }
        }
    }

    /// Load a model onto the accelerator.
    pub async fn load_model(&self, kind: ModelKind) -> MlResult<()> {
        let url = format!(
            "{}/models/{}/load",
            self.config.base_url,
            kind.path_segment()
        );
        self.post_empty(&url).await
    }

    /// Unload a model, releasing accelerator memory.
    pub async fn unload_model(&self, kind: ModelKind) -> MlResult<()> {
        let url = format!(
            "{}/models/{}/unload",
            self.config.base_url,
            kind.path_segment()
        );
        self.post_empty(&url).await
    }

    /// Generate captions for a batch of frame tensors.
    pub async fn caption_batch(
        &self,
        frames: Vec<TensorPayload>,
        prompts: Vec<String>,
        params: &GenerationParams,
    ) -> MlResult<Vec<String>> {
        for payload in &frames {
            payload.validate()?;
        }
        let request = CaptionRequest {
            frames,
            prompts,
            params: params.clone(),
        };
        let url = format!("{}/caption", self.config.base_url);
        let response: CaptionResponse = self.post_json(&url, &request).await?;

        if response.captions.len() != request.prompts.len() {
            return Err(MlError::InvalidResponse(format!(
                "requested {} captions, got {}",
                request.prompts.len(),
                response.captions.len()
            )));
        }
        Ok(response.captions)
    }

    /// Embed a batch of sentences.
    pub async fn embed_texts(&self, texts: Vec<String>) -> MlResult<Vec<Vec<f32>>> {
        let count = texts.len();
        let url = format!("{}/embed/text", self.config.base_url);
        let response: EmbedResponse = self.post_json(&url, &EmbedTextRequest { texts }).await?;

        if response.embeddings.len() != count {
            return Err(MlError::InvalidResponse(format!(
                "requested {} embeddings, got {}",
                count,
                response.embeddings.len()
            )));
        }
        Ok(response.embeddings)
    }

    /// Embed a query for the joint image-text space.
    pub async fn embed_query(&self, text: &str) -> MlResult<Vec<f32>> {
        let url = format!("{}/embed/query", self.config.base_url);
        let request = EmbedTextRequest {
            texts: vec![text.to_string()],
        };
        let mut response: EmbedResponse = self.post_json(&url, &request).await?;
        response
            .embeddings
            .pop()
            .ok_or_else(|| MlError::InvalidResponse("empty embedding response".to_string()))
    }

    /// Embed a frame image (PNG bytes) in the joint image-text space.
    pub async fn embed_image(&self, image_png: &[u8]) -> MlResult<Vec<f32>> {
        let url = format!("{}/embed/image", self.config.base_url);
        let request = EmbedImageRequest {
            image_png: base64::engine::general_purpose::STANDARD.encode(image_png),
        };
        let mut response: EmbedResponse = self.post_json(&url, &request).await?;
        response
            .embeddings
            .pop()
            .ok_or_else(|| MlError::InvalidResponse("empty embedding response".to_string()))
    }

    /// Transcribe an audio track (WAV bytes).
    pub async fn transcribe(&self, audio_wav: &[u8]) -> MlResult<String> {
        let url = format!("{}/transcribe", self.config.base_url);
        let request = TranscribeRequest {
            audio_wav: base64::engine::general_purpose::STANDARD.encode(audio_wav),
        };
        let response: TranscribeResponse = self.post_json(&url, &request).await?;
        Ok(response.transcript.trim().to_string())
    }

    /// Translate text between languages.
    pub async fn translate(&self, text: &str, source: &str, target: &str) -> MlResult<String> {
        let url = format!("{}/translate", self.config.base_url);
        let request = TranslateRequest {
            text: text.to_string(),
            source_lang: source.to_string(),
            target_lang: target.to_string(),
        };
        let response: TranslateResponse = self.post_json(&url, &request).await?;
        Ok(response.text)
    }

    /// POST a JSON body and decode a JSON response, with retry.
    async fn post_json<Req: Serialize, Resp: DeserializeOwned>(
        &self,
        url: &str,
        request: &Req,
    ) -> MlResult<Resp> {
        debug!("POST {}", url);

        let response = self
            .with_retry(|| async {
                self.http
                    .post(url)
                    .json(request)
                    .send()
                    .await
                    .map_err(MlError::Network)
            })
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(MlError::RequestFailed(format!(
                "model server returned {}: {}",
                status, body
            )));
        }

        Ok(response.json().await?)
    }

    /// POST with no body, with retry.
    async fn post_empty(&self, url: &str) -> MlResult<()> {
        debug!("POST {}", url);

        let response = self
            .with_retry(|| async { self.http.post(url).send().await.map_err(MlError::Network) })
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(MlError::RequestFailed(format!(
                "model server returned {}: {}",
                status, body
            )));
        }

        Ok(())
    }

    /// Execute with retry logic.
    async fn with_retry<F, Fut, T>(&self, operation: F) -> MlResult<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = MlResult<T>>,
    {
        let mut last_error = None;

        for attempt in 0..=self.config.max_retries {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) if e.is_retryable() && attempt < self.config.max_retries => {
                    let delay = Duration::from_millis(500 * 2u64.pow(attempt));
                    warn!(
                        "Model server request failed (attempt {}), retrying in {:?}: {}",
                        attempt + 1,
                        delay,
                        e
                    );
                    tokio::time::sleep(delay).await;
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or(MlError::RequestFailed("Unknown error".to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_config_defaults() {
        let config = MlClientConfig::default();
        assert_eq!(config.base_url, "http://localhost:8001");
        assert_eq!(config.timeout, Duration::from_secs(600));
        assert_eq!(config.max_retries, 2);
    }

    fn client_for(server: &MockServer) -> MlClient {
        MlClient::new(MlClientConfig {
            base_url: server.uri(),
            timeout: Duration::from_secs(5),
            max_retries: 2,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_embed_texts_round_trip() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embed/text"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "embeddings": [[0.1, 0.2], [0.3, 0.4]]
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let embeddings = client
            .embed_texts(vec!["a".to_string(), "b".to_string()])
            .await
            .unwrap();
        assert_eq!(embeddings.len(), 2);
        assert_eq!(embeddings[0], vec![0.1, 0.2]);
    }

    #[tokio::test]
    async fn test_embed_texts_count_mismatch_is_invalid() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embed/text"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "embeddings": [[0.1, 0.2]]
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client
            .embed_texts(vec!["a".to_string(), "b".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(err, MlError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_load_unload_endpoints() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/caption/load"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/models/caption/unload"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        client.load_model(ModelKind::Caption).await.unwrap();
        client.unload_model(ModelKind::Caption).await.unwrap();
    }

    #[tokio::test]
    async fn test_request_failure_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/translate"))
            .respond_with(ResponseTemplate::new(422))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client.translate("text", "ko", "en").await.unwrap_err();
        assert!(matches!(err, MlError::RequestFailed(_)));
    }
}
