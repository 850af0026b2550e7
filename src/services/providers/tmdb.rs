/// TMDb (The Movie Database) provider
///
/// Discovery results are passed through untouched; detail lookups append
/// credits, videos, keywords and release dates in a single request so the
/// dataset pipeline needs one call per movie.
use crate::{
    cached,
    db::{Cache, CacheKey},
    error::{AppError, AppResult},
    models::{DiscoverQuery, MoviePage, TmdbMovieDetails},
    services::providers::MovieProvider,
};
use reqwest::{Client as HttpClient, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

const DISCOVER_CACHE_TTL: u64 = 3600; // 1 hour
const DETAILS_CACHE_TTL: u64 = 604800; // 1 week
const TOP_RATED_CACHE_TTL: u64 = 86400; // 1 day
const REQUEST_TIMEOUT_SECS: u64 = 30;
const DETAIL_APPENDS: &str = "credits,videos,keywords,release_dates";

#[derive(Clone)]
pub struct TmdbProvider {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
    cache: Option<Cache>,
}

impl TmdbProvider {
    pub fn new(api_key: String, api_url: String, cache: Option<Cache>) -> AppResult<Self> {
        if api_key.trim().is_empty() {
            return Err(AppError::InvalidInput(
                "TMDb API key cannot be empty".to_string(),
            ));
        }

        let http_client = HttpClient::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        tracing::info!(
            api_url = %api_url,
            caching = cache.is_some(),
            "TMDb provider initialized"
        );

        Ok(Self {
            http_client,
            api_key,
            api_url: api_url.trim_end_matches('/').to_string(),
            cache,
        })
    }

    /// GET `path` with the API key plus `query`, mapping TMDb failure statuses
    async fn get_json<T, Q>(&self, path: &str, query: &Q) -> AppResult<T>
    where
        T: DeserializeOwned,
        Q: serde::Serialize + ?Sized,
    {
        let url = format!("{}{}", self.api_url, path);

        let response = self
            .http_client
            .get(&url)
            .query(&[("api_key", self.api_key.as_str())])
            .query(query)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(map_error_status(path, status, body));
        }

        let response_text = response.text().await?;
        serde_json::from_str(&response_text).map_err(|e| {
            tracing::error!(
                error = %e,
                path = %path,
                "Failed to deserialize TMDb response"
            );
            AppError::ExternalApi(format!("Failed to parse TMDb response from {}: {}", path, e))
        })
    }
}

fn map_error_status(path: &str, status: StatusCode, body: String) -> AppError {
    match status {
        StatusCode::TOO_MANY_REQUESTS => {
            AppError::RateLimited(format!("TMDb rate limit exceeded on {}", path))
        }
        StatusCode::NOT_FOUND => AppError::NotFound(format!("TMDb resource not found: {}", path)),
        StatusCode::UNAUTHORIZED => {
            AppError::ExternalApi("TMDb API key is invalid or missing".to_string())
        }
        _ => AppError::ExternalApi(format!(
            "TMDb API returned status {}: {}",
            status, body
        )),
    }
}

#[async_trait::async_trait]
impl MovieProvider for TmdbProvider {
    async fn discover(&self, query: &DiscoverQuery) -> AppResult<MoviePage> {
        cached!(
            self.cache.as_ref(),
            CacheKey::Discover(query.cache_fragment()),
            DISCOVER_CACHE_TTL,
            async move {
                let page: MoviePage = self.get_json("/discover/movie", query).await?;

                tracing::info!(
                    results = page.results.len(),
                    total_results = page.total_results,
                    provider = "tmdb",
                    "Discover completed"
                );

                Ok::<_, AppError>(page)
            }
        )
    }

    async fn movie_details(&self, id: i64) -> AppResult<TmdbMovieDetails> {
        cached!(
            self.cache.as_ref(),
            CacheKey::MovieDetails(id),
            DETAILS_CACHE_TTL,
            async move {
                let details: TmdbMovieDetails = self
                    .get_json(
                        &format!("/movie/{}", id),
                        &[("append_to_response", DETAIL_APPENDS)],
                    )
                    .await?;

                tracing::debug!(movie_id = id, title = %details.title, provider = "tmdb", "Details fetched");

                Ok::<_, AppError>(details)
            }
        )
    }

    async fn top_rated(&self, page: u32) -> AppResult<MoviePage> {
        cached!(
            self.cache.as_ref(),
            CacheKey::TopRated(page),
            TOP_RATED_CACHE_TTL,
            async move {
                let page_str = page.to_string();
                let result: MoviePage = self
                    .get_json("/movie/top_rated", &[("page", page_str.as_str())])
                    .await?;
                Ok::<_, AppError>(result)
            }
        )
    }

    fn name(&self) -> &'static str {
        "tmdb"
    }
}
