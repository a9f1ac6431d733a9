//! Batch captioning worker binary.
//!
//! Processes every video in the configured directory: shot detection, frame
//! sampling, captioning (optionally conditioned on transcribed dialogue),
//! scene artifact writes, and finally a merge of the new artifacts into the
//! embedding archive.

use std::path::PathBuf;

use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use sceneseek_ml_client::MlClient;
use sceneseek_worker::{PipelineConfig, VideoPipeline};

#[tokio::main]
async fn main() {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing with colored output for dev, JSON for production
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env()
        .add_directive("sceneseek=info".parse().unwrap());

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }

    info!("Starting sceneseek-worker");

    let config = PipelineConfig::from_env();
    info!("Pipeline config: {:?}", config);

    let video_paths = match list_videos(&config.video_dir).await {
        Ok(paths) => paths,
        Err(e) => {
            error!(
                dir = %config.video_dir.display(),
                error = %e,
                "Failed to list input videos"
            );
            std::process::exit(1);
        }
    };

    if video_paths.is_empty() {
        warn!(dir = %config.video_dir.display(), "No input videos found");
        return;
    }
    info!(videos = video_paths.len(), "Input videos discovered");

    let client = match MlClient::from_env() {
        Ok(client) => client,
        Err(e) => {
            error!("Failed to create model client: {}", e);
            std::process::exit(1);
        }
    };

    if !client.health_check().await.unwrap_or(false) {
        warn!("Model server health check failed, continuing anyway");
    }

    let transcriber = config.use_audio.then(|| client.clone());
    let mut pipeline = VideoPipeline::new(config.clone(), client.clone(), transcriber);

    let outcomes = match pipeline.process_batch(&video_paths).await {
        Ok(outcomes) => outcomes,
        Err(e) => {
            error!("Batch processing failed: {}", e);
            std::process::exit(1);
        }
    };
    info!(
        processed = outcomes.len(),
        failed = video_paths.len() - outcomes.len(),
        "Batch captioning complete"
    );

    match sceneseek_index::merge(
        &client,
        &config.archive_path,
        &config.output_json_dir,
        &config.archive_path,
    )
    .await
    {
        Ok(outcome) => {
            info!(
                added = outcome.added_videos,
                skipped = outcome.skipped_files + outcome.skipped_ids,
                rejected = outcome.rejected_files,
                segments = outcome.embedded_segments,
                archive = %config.archive_path.display(),
                "Embedding merge complete"
            );
        }
        Err(e) => {
            error!("Embedding merge failed: {}", e);
            std::process::exit(1);
        }
    }

    info!("Worker finished");
}

/// List video files in a directory, sorted for stable batch order.
async fn list_videos(dir: &std::path::Path) -> std::io::Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path
            .extension()
            .map(|e| e == "mp4" || e == "mkv" || e == "webm")
            .unwrap_or(false)
        {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}
