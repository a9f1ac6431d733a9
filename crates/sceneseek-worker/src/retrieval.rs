//! Two-stage text-to-frame retrieval.
//!
//! Stage one ranks archived caption embeddings against the query (coarse,
//! semantic). Stage two re-scores literal frames inside each candidate
//! window with a joint image-text model (fine, visual) and saves the winner.
//! Candidates whose video file is missing are skipped; an empty result list
//! is a valid outcome, not an error.

use image::ImageOutputFormat;
use std::io::Cursor;
use tracing::{info, warn};

use sceneseek_index::EmbeddingArchive;
use sceneseek_ml_client::{ImageTextScorer, TextEmbedder, Translator};
use sceneseek_models::{parse_ts_key, BestFrame, SimilarityResult};

use crate::config::RetrievalConfig;
use crate::error::WorkerResult;
use crate::refiner::{find_best_frame, find_video_by_id, l2_normalize};

/// Query language assumed when translation is enabled.
const QUERY_SOURCE_LANG: &str = "ko";
/// Retrieval operates over English captions.
const QUERY_TARGET_LANG: &str = "en";

/// Query-time retrieval over the embedding archive and video directories.
pub struct RetrievalService<E, S, L> {
    config: RetrievalConfig,
    embedder: E,
    scorer: S,
    translator: Option<L>,
}

impl<E, S, L> RetrievalService<E, S, L>
where
    E: TextEmbedder,
    S: ImageTextScorer,
    L: Translator,
{
    pub fn new(config: RetrievalConfig, embedder: E, scorer: S, translator: Option<L>) -> Self {
        Self {
            config,
            embedder,
            scorer,
            translator,
        }
    }

    /// Run the full two-stage search for a free-text query.
    pub async fn search(&self, query_text: &str) -> WorkerResult<Vec<BestFrame>> {
        let query_text = self.normalized_query(query_text).await;

        let archive = EmbeddingArchive::load_or_empty(&self.config.archive_path).await?;
        if archive.is_empty() {
            warn!("Embedding archive is empty, nothing to retrieve");
            return Ok(Vec::new());
        }

        let candidates =
            sceneseek_index::query(&self.embedder, &archive, &query_text, self.config.top_k)
                .await?;
        info!(
            query = %query_text,
            candidates = candidates.len(),
            "Caption-level candidates selected"
        );
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        tokio::fs::create_dir_all(&self.config.output_dir).await?;

        // The joint image-text model is loaded once for all candidates and
        // released on every exit path.
        self.scorer.load().await?;
        let result = self.refine_candidates(&query_text, &candidates).await;
        if let Err(e) = self.scorer.unload().await {
            warn!(error = %e, "Scorer unload failed after retrieval");
        }
        result
    }

    /// Translate the query when configured; translation failures fall back
    /// to the original text.
    async fn normalized_query(&self, query_text: &str) -> String {
        if !self.config.translate_queries {
            return query_text.to_string();
        }
        let Some(translator) = &self.translator else {
            return query_text.to_string();
        };

        match translator
            .translate(query_text, QUERY_SOURCE_LANG, QUERY_TARGET_LANG)
            .await
        {
            Ok(translated) => {
                info!(original = query_text, translated = %translated, "Query translated");
                translated
            }
            Err(e) => {
                warn!(error = %e, "Query translation failed, using original text");
                query_text.to_string()
            }
        }
    }

    /// Stage two over all candidates. Per-candidate file lookups and decode
    /// failures skip the candidate; scorer errors propagate.
    async fn refine_candidates(
        &self,
        query_text: &str,
        candidates: &[SimilarityResult],
    ) -> WorkerResult<Vec<BestFrame>> {
        let query_embedding = l2_normalize(&self.scorer.embed_text(query_text).await?);

        let mut results = Vec::new();

        for (rank, candidate) in candidates.iter().enumerate() {
            let window = parse_ts_key(&candidate.ts_key);

            let Some(video_path) =
                find_video_by_id(&self.config.video_dirs, candidate.video_id.as_str()).await
            else {
                warn!(
                    video_id = %candidate.video_id,
                    "Video file not found, skipping candidate"
                );
                continue;
            };

            let refined = find_best_frame(
                &self.scorer,
                &video_path,
                window,
                &query_embedding,
                self.config.sampling_interval_ms,
            )
            .await?;

            let Some(refined) = refined else {
                warn!(
                    video_id = %candidate.video_id,
                    window = %window.display_range(),
                    "No decodable frame in candidate window, skipping"
                );
                continue;
            };

            let frame_path = self
                .config
                .output_dir
                .join(format!("extracted_frame_{}.jpg", rank + 1));
            save_jpeg(&refined.image, &frame_path).await?;

            info!(
                video_id = %candidate.video_id,
                window = %window.display_range(),
                best_time_ms = refined.time_ms,
                caption_score = candidate.score,
                frame_score = refined.score,
                frame = %frame_path.display(),
                "Candidate refined"
            );

            results.push(BestFrame {
                video_id: candidate.video_id.clone(),
                time_range: window,
                best_time_ms: refined.time_ms,
                caption_score: candidate.score,
                frame_score: refined.score,
                frame_path,
            });
        }

        Ok(results)
    }
}

/// Encode and write a frame as JPEG.
async fn save_jpeg(image: &image::DynamicImage, path: &std::path::Path) -> WorkerResult<()> {
    let mut bytes = Vec::new();
    image
        .to_rgb8()
        .write_to(&mut Cursor::new(&mut bytes), ImageOutputFormat::Jpeg(90))?;
    tokio::fs::write(path, bytes).await?;
    Ok(())
}
