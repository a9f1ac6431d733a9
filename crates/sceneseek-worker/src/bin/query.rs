//! Text-to-frame query binary.
//!
//! Usage: `sceneseek-query <free-text query>`
//!
//! Runs the two-stage search (caption-embedding retrieval, then visual frame
//! refinement) and prints the refined candidates.

use anyhow::{bail, Context};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use sceneseek_ml_client::MlClient;
use sceneseek_worker::{RetrievalConfig, RetrievalService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = EnvFilter::from_default_env()
        .add_directive("sceneseek=info".parse().unwrap());
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(env_filter)
        .init();

    let query_text = std::env::args().skip(1).collect::<Vec<_>>().join(" ");
    if query_text.trim().is_empty() {
        bail!("usage: sceneseek-query <free-text query>");
    }

    let config = RetrievalConfig::from_env();
    info!("Retrieval config: {:?}", config);

    let client = MlClient::from_env().context("failed to create model client")?;
    let translator = config.translate_queries.then(|| client.clone());
    let service = RetrievalService::new(config, client.clone(), client.clone(), translator);

    let results = service
        .search(&query_text)
        .await
        .context("retrieval failed")?;

    if results.is_empty() {
        println!("No matching frames found.");
        return Ok(());
    }

    let as_json = std::env::var("SCENESEEK_QUERY_JSON")
        .map(|v| v.to_lowercase() == "true")
        .unwrap_or(false);
    if as_json {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }

    println!("Best frames for: {query_text}");
    for (rank, frame) in results.iter().enumerate() {
        println!(
            "{:>2}. {}  window {}  best at {:.1}s  caption score {:.4}  frame score {:.4}  -> {}",
            rank + 1,
            frame.video_id,
            frame.time_range.display_range(),
            frame.best_time_ms as f64 / 1000.0,
            frame.caption_score,
            frame.frame_score,
            frame.frame_path.display(),
        );
    }

    Ok(())
}
