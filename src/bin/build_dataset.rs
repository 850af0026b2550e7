//! Builds the movie dataset served by `cinemood-api`.
//!
//! Reads `TMDB_API_KEY` and `GEMINI_API_KEY` (and optionally `REDIS_URL`)
//! from the environment or `.env`.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cinemood_api::{
    config::Config,
    db::{create_redis_client, Cache},
    services::{
        DatasetPipeline, GeminiClient, GenerativeModel, PipelineConfig, RetryPolicy, TmdbProvider,
    },
};

#[derive(Debug, Parser)]
#[command(name = "build-dataset", about = "Harvest, enrich and bake the movie dataset")]
struct Args {
    /// Top-rated pages to harvest (20 movies per page)
    #[arg(long, default_value_t = 25)]
    pages: u32,

    /// Movies kept after ranking
    #[arg(long, default_value_t = 250)]
    limit: usize,

    /// Minimum TMDb vote average
    #[arg(long, default_value_t = 0.0)]
    min_rating: f64,

    /// Minimum TMDb vote count
    #[arg(long, default_value_t = 100)]
    min_votes: u32,

    #[arg(long, default_value = "data/movies.json")]
    output: PathBuf,

    /// Checkpoint file used to resume an interrupted run
    #[arg(long, default_value = "data/movies.progress.json")]
    progress: PathBuf,

    /// Skip generative enrichment (reviews, mood tags, suggestions)
    #[arg(long)]
    skip_ai: bool,

    /// Attempts per upstream call, including the first
    #[arg(long, default_value_t = 8)]
    max_attempts: u32,

    /// Movies enriched between checkpoints
    #[arg(long, default_value_t = 10)]
    batch_size: usize,

    /// Pause between upstream requests, in milliseconds
    #[arg(long, default_value_t = 250)]
    delay_ms: u64,
}

impl Args {
    fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            pages: self.pages,
            limit: self.limit,
            min_rating: self.min_rating,
            min_votes: self.min_votes,
            output: self.output.clone(),
            progress: self.progress.clone(),
            skip_ai: self.skip_ai,
            batch_size: self.batch_size,
            request_delay: Duration::from_millis(self.delay_ms),
            retry: RetryPolicy {
                max_attempts: self.max_attempts,
                ..RetryPolicy::default()
            },
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let config = Config::from_env()?;

    let cache_parts = match config.redis_url.as_deref() {
        Some(url) => Some(Cache::new(create_redis_client(url)?)),
        None => None,
    };
    let (cache, cache_writer) = match cache_parts {
        Some((cache, writer)) => (Some(cache), Some(writer)),
        None => (None, None),
    };

    let tmdb_key = config
        .tmdb_api_key
        .clone()
        .context("TMDB_API_KEY is required to build the dataset")?;
    let provider = Arc::new(TmdbProvider::new(tmdb_key, config.tmdb_api_url.clone(), cache)?);

    let model: Option<Arc<dyn GenerativeModel>> = if args.skip_ai {
        None
    } else {
        let key = config
            .gemini_api_key
            .clone()
            .context("GEMINI_API_KEY is required unless --skip-ai is given")?;
        Some(Arc::new(GeminiClient::new(
            key,
            config.gemini_api_url.clone(),
            config.gemini_model.clone(),
        )?))
    };

    tracing::info!(?args, "Starting dataset build");

    let outcome = match DatasetPipeline::new(provider, model, args.pipeline_config()) {
        Ok(pipeline) => pipeline.run().await,
        Err(e) => Err(e),
    };

    // Flush queued cache writes whether or not the build succeeded.
    if let Some(writer) = cache_writer {
        writer.shutdown().await;
    }

    let collection = outcome?;
    println!(
        "Wrote {} movies to {}",
        collection.count,
        args.output.display()
    );

    Ok(())
}
