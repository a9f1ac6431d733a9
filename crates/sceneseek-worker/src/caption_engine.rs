//! Caption engine: model lifecycle plus batched generation.
//!
//! The engine is the only component allowed to hold the caption model on the
//! accelerator. Its lifecycle is an explicit state machine
//! (`Unloaded -> Loaded -> Unloaded`) rather than a process-wide singleton:
//! `load`/`unload` are idempotent, and callers that run generation wrap it so
//! unload executes on every exit path, keeping the accelerator free after
//! failures.

use tracing::{debug, info, warn};

use sceneseek_media::FrameSet;
use sceneseek_ml_client::{Captioner, GenerationParams, MlError, TensorPayload};

use crate::error::{WorkerError, WorkerResult};
use crate::prompts::frame_prefix;

/// Caption engine over an injected caption capability.
pub struct CaptionEngine<C: Captioner> {
    backend: C,
    params: GenerationParams,
    batch_size: usize,
    loaded: bool,
}

impl<C: Captioner> CaptionEngine<C> {
    /// Create an engine in the `Unloaded` state.
    pub fn new(backend: C, params: GenerationParams, batch_size: usize) -> Self {
        Self {
            backend,
            params,
            batch_size: batch_size.max(1),
            loaded: false,
        }
    }

    /// Whether the caption model currently occupies the accelerator.
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Put the caption model on the accelerator. No-op when already loaded.
    pub async fn load(&mut self) -> WorkerResult<()> {
        if self.loaded {
            debug!("Caption model already loaded");
            return Ok(());
        }
        self.backend.load().await?;
        self.loaded = true;
        info!("Caption model loaded");
        Ok(())
    }

    /// Release the caption model. No-op when already unloaded.
    pub async fn unload(&mut self) -> WorkerResult<()> {
        if !self.loaded {
            return Ok(());
        }
        self.backend.unload().await?;
        self.loaded = false;
        info!("Caption model unloaded");
        Ok(())
    }

    /// Caption a list of frame sets, one sentence per set, in fixed-size
    /// mini-batches to bound peak accelerator memory.
    ///
    /// Requires the `Loaded` state; generation parameters are fixed at
    /// construction.
    pub async fn caption_shots(
        &self,
        frame_sets: &[FrameSet],
        prompt: &str,
    ) -> WorkerResult<Vec<String>> {
        if !self.loaded {
            return Err(WorkerError::Ml(MlError::ModelNotLoaded(
                "caption".to_string(),
            )));
        }
        if frame_sets.is_empty() {
            return Ok(Vec::new());
        }

        let mut captions = Vec::with_capacity(frame_sets.len());

        for batch in frame_sets.chunks(self.batch_size) {
            let frames: Vec<TensorPayload> = batch
                .iter()
                .map(|set| TensorPayload::from_array4(&set.pixels))
                .collect();
            let prompts: Vec<String> = batch
                .iter()
                .map(|set| format!("{}{}", frame_prefix(set.len()), prompt))
                .collect();

            debug!(batch = batch.len(), "Captioning mini-batch");
            let batch_captions = self.backend.caption(frames, prompts, &self.params).await?;
            captions.extend(batch_captions);
        }

        Ok(captions)
    }

    /// Run a captioning pass with the load/unload discipline applied:
    /// load before use, unload after, including when generation fails.
    pub async fn caption_shots_guarded(
        &mut self,
        frame_sets: &[FrameSet],
        prompt: &str,
    ) -> WorkerResult<Vec<String>> {
        self.load().await?;
        let result = self.caption_shots(frame_sets, prompt).await;
        if let Err(e) = self.unload().await {
            warn!(error = %e, "Caption model unload failed after generation");
        }
        result
    }
}
