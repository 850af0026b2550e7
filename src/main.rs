use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use cinemood_api::{
    api::{create_router, AppState},
    config::Config,
    db::{create_redis_client, Cache, CacheWriterHandle},
    services::{ChatService, GeminiClient, GenerativeModel, MovieProvider, MovieStore, TmdbProvider},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env()?;

    let store = MovieStore::load(&config.dataset_path)
        .with_context(|| format!("Failed to load dataset from {}", config.dataset_path))?;

    let (cache, cache_writer) = match config.redis_url.as_deref() {
        Some(url) => {
            let (cache, writer) = Cache::new(create_redis_client(url)?);
            (Some(cache), Some(writer))
        }
        None => {
            tracing::info!("REDIS_URL not set, TMDb responses will not be cached");
            (None, None)
        }
    };

    let mut state = AppState::new(store).with_limits(&config);

    let provider: Option<Arc<dyn MovieProvider>> = match config.tmdb_api_key.clone() {
        Some(key) => Some(Arc::new(TmdbProvider::new(
            key,
            config.tmdb_api_url.clone(),
            cache,
        )?)),
        None => {
            tracing::warn!("TMDB_API_KEY not set, discovery and chat are disabled");
            None
        }
    };

    let model: Option<Arc<dyn GenerativeModel>> = match config.gemini_api_key.clone() {
        Some(key) => Some(Arc::new(GeminiClient::new(
            key,
            config.gemini_api_url.clone(),
            config.gemini_model.clone(),
        )?)),
        None => {
            tracing::warn!("GEMINI_API_KEY not set, chat is disabled");
            None
        }
    };

    if let Some(provider) = provider {
        if let Some(model) = model {
            state = state.with_chat(Arc::new(ChatService::new(model, provider.clone())));
        }
        state = state.with_provider(provider);
    }

    let app = create_router(state);

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!(addr = %addr, "Server listening");

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    // In-flight requests are done; flush what they queued before exiting.
    flush_cache(cache_writer).await;
    served?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received");
}

async fn flush_cache(cache_writer: Option<CacheWriterHandle>) {
    if let Some(writer) = cache_writer {
        writer.shutdown().await;
    }
}
