//! The batch captioning pipeline.
//!
//! Per batch: shot boundaries are detected concurrently across videos over a
//! bounded pool (detection is an external FFmpeg process, so it parallelizes
//! well), then each video is decoded and captioned sequentially while the
//! caption model holds the accelerator. One scene JSON artifact is written
//! per video; a failed video is logged and skipped without aborting the rest
//! of the batch.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use sceneseek_media::{
    detect_shots, extract_audio_wav, extract_frame_set, uniform_segments, FramePrepConfig,
    FrameSet, ShotDetectConfig, VideoInfo,
};
use sceneseek_ml_client::{Captioner, Transcriber};
use sceneseek_models::{DurationMode, SceneDocument, Shot, VideoId};

use crate::caption_engine::CaptionEngine;
use crate::config::PipelineConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::prompts::{audio_prompt, DEFAULT_PROMPT};

/// Result of processing one video.
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub video_id: VideoId,
    pub shots: usize,
    pub artifact_path: PathBuf,
}

/// Orchestrates shot detection, frame sampling, transcription, and
/// captioning for batches of videos.
pub struct VideoPipeline<C: Captioner, T: Transcriber> {
    config: PipelineConfig,
    engine: CaptionEngine<C>,
    transcriber: Option<T>,
}

impl<C: Captioner, T: Transcriber> VideoPipeline<C, T> {
    pub fn new(config: PipelineConfig, captioner: C, transcriber: Option<T>) -> Self {
        let engine = CaptionEngine::new(
            captioner,
            config.generation.clone(),
            config.batch_size,
        );
        Self {
            config,
            engine,
            transcriber,
        }
    }

    /// Process a batch of videos end to end.
    ///
    /// The caption model is loaded once for the whole batch and unloaded on
    /// every exit path, so a failing video cannot leave the accelerator
    /// occupied.
    pub async fn process_batch(
        &mut self,
        video_paths: &[PathBuf],
    ) -> WorkerResult<Vec<PipelineOutcome>> {
        let detections = self.detect_all(video_paths).await;

        self.engine.load().await?;
        let result = self.run_all(video_paths, detections).await;
        if let Err(e) = self.engine.unload().await {
            warn!(error = %e, "Caption model unload failed after batch");
        }
        result
    }

    /// Detect shot boundaries for every video concurrently, bounded by the
    /// configured pool size. Results are collected positionally; completion
    /// order does not matter.
    async fn detect_all(
        &self,
        video_paths: &[PathBuf],
    ) -> Vec<WorkerResult<(Vec<Shot>, VideoInfo)>> {
        let semaphore = Arc::new(Semaphore::new(self.config.max_detect_parallel));
        let detect_config = ShotDetectConfig {
            threshold: self.config.shot_threshold,
            excluded_trailing_secs: self.config.excluded_trailing_secs,
        };

        let handles: Vec<_> = video_paths
            .iter()
            .map(|path| {
                let semaphore = Arc::clone(&semaphore);
                let config = detect_config.clone();
                let path = path.clone();
                tokio::spawn(async move {
                    // The semaphore is never closed; a failed acquire only loses the bound.
                    let _permit = semaphore.acquire_owned().await.ok();
                    detect_shots(&path, &config).await
                })
            })
            .collect();

        futures::future::join_all(handles)
            .await
            .into_iter()
            .map(|joined| match joined {
                Ok(detection) => detection.map_err(WorkerError::from),
                Err(e) => Err(WorkerError::video_failed(format!(
                    "detection task failed: {e}"
                ))),
            })
            .collect()
    }

    /// Run the per-video loop. Failures are isolated per video.
    async fn run_all(
        &self,
        video_paths: &[PathBuf],
        detections: Vec<WorkerResult<(Vec<Shot>, VideoInfo)>>,
    ) -> WorkerResult<Vec<PipelineOutcome>> {
        let mut outcomes = Vec::new();

        for (path, detection) in video_paths.iter().zip(detections) {
            let (shots, info) = match detection {
                Ok(detection) => detection,
                Err(e) => {
                    error!(
                        video = %path.display(),
                        error = %e,
                        "Skipping video: boundary detection failed"
                    );
                    metrics::counter!("sceneseek_videos_failed").increment(1);
                    continue;
                }
            };

            match self.process_video(path, shots, &info).await {
                Ok(outcome) => {
                    info!(
                        video_id = %outcome.video_id,
                        shots = outcome.shots,
                        artifact = %outcome.artifact_path.display(),
                        "Video processed"
                    );
                    metrics::counter!("sceneseek_videos_processed").increment(1);
                    outcomes.push(outcome);
                }
                Err(e) => {
                    error!(
                        video = %path.display(),
                        error = %e,
                        "Skipping video: processing failed"
                    );
                    metrics::counter!("sceneseek_videos_failed").increment(1);
                }
            }
        }

        Ok(outcomes)
    }

    /// Caption one video and write its scene artifact.
    async fn process_video(
        &self,
        path: &Path,
        shots: Vec<Shot>,
        info: &VideoInfo,
    ) -> WorkerResult<PipelineOutcome> {
        let video_id = VideoId::from_path(path, self.config.id_strategy).ok_or_else(|| {
            WorkerError::video_failed(format!("no usable file stem: {}", path.display()))
        })?;

        let shots = if shots.is_empty() {
            warn!(
                video_id = %video_id,
                "No shots survived boundary detection, falling back to uniform segments"
            );
            uniform_segments(info.duration_ms(), self.config.uniform_segment_count)
        } else {
            shots
        };
        if shots.is_empty() {
            return Err(WorkerError::video_failed("video too short to segment"));
        }

        let mut prompt = DEFAULT_PROMPT.to_string();
        if let Some(clause) = self.transcript_clause(path).await {
            prompt.push_str(&clause);
        }

        let frame_config = FramePrepConfig {
            num_segments: self.config.num_segments,
            input_size: self.config.input_size,
        };

        // Sentences stay index-aligned with shots; shots with no decodable
        // frames keep an empty caption.
        let mut sentences = vec![String::new(); shots.len()];
        let mut kept_indices = Vec::new();
        let mut frame_sets: Vec<FrameSet> = Vec::new();

        for (idx, shot) in shots.iter().enumerate() {
            if let Some(set) = extract_frame_set(path, info, shot, &frame_config).await? {
                kept_indices.push(idx);
                frame_sets.push(set);
            }
        }

        let captions = self.engine.caption_shots(&frame_sets, &prompt).await?;
        for (idx, caption) in kept_indices.into_iter().zip(captions) {
            sentences[idx] = caption;
        }
        metrics::counter!("sceneseek_shots_captioned").increment(frame_sets.len() as u64);

        let duration_ms = match self.config.duration_mode {
            DurationMode::Scene => shots.last().map(|s| s.end_ms).unwrap_or(0),
            DurationMode::Subtract => info
                .duration_ms()
                .saturating_sub((self.config.excluded_trailing_secs * 1000.0).round() as u64),
            DurationMode::Full => info.duration_ms(),
        };

        let shot_count = shots.len();
        let doc = SceneDocument::new(video_id.clone(), duration_ms, shots, sentences)?;

        tokio::fs::create_dir_all(&self.config.output_json_dir).await?;
        let artifact_path = self
            .config
            .output_json_dir
            .join(format!("{}.json", video_id));
        tokio::fs::write(&artifact_path, doc.to_json_string()?).await?;

        Ok(PipelineOutcome {
            video_id,
            shots: shot_count,
            artifact_path,
        })
    }

    /// Transcribe the video's dialogue and render the prompt clause.
    /// Transcription failures degrade to a visual-only prompt.
    async fn transcript_clause(&self, path: &Path) -> Option<String> {
        if !self.config.use_audio {
            return None;
        }
        let transcriber = self.transcriber.as_ref()?;

        match self.transcribe_video(transcriber, path).await {
            Ok(transcript) if !transcript.is_empty() => Some(audio_prompt(&transcript)),
            Ok(_) => {
                info!(video = %path.display(), "Empty transcript, captioning without audio");
                None
            }
            Err(e) => {
                warn!(
                    video = %path.display(),
                    error = %e,
                    "Transcription failed, captioning without audio"
                );
                None
            }
        }
    }

    async fn transcribe_video(&self, transcriber: &T, path: &Path) -> WorkerResult<String> {
        let workdir = tempfile::tempdir()?;
        let wav_path = extract_audio_wav(path, workdir.path()).await?;
        let wav_bytes = tokio::fs::read(&wav_path).await?;
        Ok(transcriber.transcribe(&wav_bytes).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use sceneseek_ml_client::{GenerationParams, MlResult, TensorPayload};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingCaptioner {
        loads: AtomicUsize,
        unloads: AtomicUsize,
    }

    #[async_trait]
    impl Captioner for &CountingCaptioner {
        async fn load(&self) -> MlResult<()> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn unload(&self) -> MlResult<()> {
            self.unloads.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn caption(
            &self,
            _frames: Vec<TensorPayload>,
            prompts: Vec<String>,
            _params: &GenerationParams,
        ) -> MlResult<Vec<String>> {
            Ok(prompts.iter().map(|_| "caption".to_string()).collect())
        }
    }

    struct NoopTranscriber;

    #[async_trait]
    impl Transcriber for NoopTranscriber {
        async fn transcribe(&self, _audio_wav: &[u8]) -> MlResult<String> {
            Ok(String::new())
        }
    }

    #[tokio::test]
    async fn test_empty_batch_still_cycles_model() {
        let captioner = CountingCaptioner::default();
        let config = PipelineConfig {
            generation: GenerationParams::default(),
            ..PipelineConfig::default()
        };
        let mut pipeline: VideoPipeline<_, NoopTranscriber> =
            VideoPipeline::new(config, &captioner, None);

        let outcomes = pipeline.process_batch(&[]).await.unwrap();
        assert!(outcomes.is_empty());
        assert_eq!(captioner.loads.load(Ordering::SeqCst), 1);
        assert_eq!(captioner.unloads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_missing_video_is_skipped_not_fatal() {
        let captioner = CountingCaptioner::default();
        let mut pipeline: VideoPipeline<_, NoopTranscriber> =
            VideoPipeline::new(PipelineConfig::default(), &captioner, None);

        // Nonexistent path: detection fails, the batch itself succeeds.
        let outcomes = pipeline
            .process_batch(&[PathBuf::from("/definitely/not/here.mp4")])
            .await
            .unwrap();
        assert!(outcomes.is_empty());
        // Accelerator cycled exactly once regardless.
        assert_eq!(captioner.unloads.load(Ordering::SeqCst), 1);
    }
}
