//! Offline dataset build: harvest from TMDb, rank, enrich with a generative
//! model, checkpoint, write.
//!
//! The loop is sequential on purpose; both upstream APIs are rate limited and
//! a parallel run only trades throughput for 429s.

use rand::Rng;
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::{
    error::{AppError, AppResult},
    models::{MovieCollection, MovieRecord},
    services::{generative::GenerativeModel, providers::MovieProvider},
};

pub const MOOD_TAG_COUNT: usize = 5;

/// Bounded retry with two delay shapes
///
/// Rate-limit errors back off multiplicatively with jitter, capped at
/// `max_delay`. Any other error waits `error_delay`. Both share
/// `max_attempts`, which counts the first try.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
    /// Fractional spread applied to rate-limit delays, e.g. 0.2 = ±20%
    pub jitter: f64,
    pub error_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 8,
            initial_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(120),
            multiplier: 2.0,
            jitter: 0.2,
            error_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Un-jittered rate-limit delay before retry number `retry` (1-based)
    pub fn backoff_delay(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(63) as i32;
        let secs = self.initial_delay.as_secs_f64() * self.multiplier.powi(exponent);
        let capped = secs.min(self.max_delay.as_secs_f64());
        Duration::from_secs_f64(capped.max(0.0))
    }

    fn jittered(&self, delay: Duration) -> Duration {
        if self.jitter <= 0.0 {
            return delay;
        }
        let factor = rand::rng().random_range((1.0 - self.jitter)..=(1.0 + self.jitter));
        let secs = (delay.as_secs_f64() * factor).min(self.max_delay.as_secs_f64());
        Duration::from_secs_f64(secs.max(0.0))
    }

    /// Delay to wait after `err` on retry number `retry`
    pub fn delay_for(&self, err: &AppError, retry: u32) -> Duration {
        if err.is_rate_limited() {
            self.jittered(self.backoff_delay(retry))
        } else {
            self.error_delay
        }
    }

    /// Runs `op` until it succeeds or attempts run out, returning the last error
    pub async fn run<T, F, Fut>(&self, what: &str, mut op: F) -> AppResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = AppResult<T>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt >= max_attempts => {
                    tracing::error!(what, attempts = attempt, error = %e, "Giving up after max attempts");
                    return Err(e);
                }
                Err(e) => {
                    let delay = self.delay_for(&e, attempt);
                    tracing::warn!(
                        what,
                        attempt,
                        rate_limited = e.is_rate_limited(),
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Top-rated pages to harvest (20 movies each)
    pub pages: u32,
    /// Movies kept after ranking
    pub limit: usize,
    pub min_rating: f64,
    pub min_votes: u32,
    pub output: PathBuf,
    /// Side file holding enriched movies of an interrupted run
    pub progress: PathBuf,
    pub skip_ai: bool,
    /// Movies enriched between checkpoint writes
    pub batch_size: usize,
    /// Pause between consecutive upstream requests
    pub request_delay: Duration,
    pub retry: RetryPolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            pages: 25,
            limit: 250,
            min_rating: 0.0,
            min_votes: 100,
            output: PathBuf::from("data/movies.json"),
            progress: PathBuf::from("data/movies.progress.json"),
            skip_ai: false,
            batch_size: 10,
            request_delay: Duration::from_millis(250),
            retry: RetryPolicy::default(),
        }
    }
}

pub struct DatasetPipeline {
    provider: Arc<dyn MovieProvider>,
    model: Option<Arc<dyn GenerativeModel>>,
    config: PipelineConfig,
}

impl DatasetPipeline {
    pub fn new(
        provider: Arc<dyn MovieProvider>,
        model: Option<Arc<dyn GenerativeModel>>,
        config: PipelineConfig,
    ) -> AppResult<Self> {
        if !config.skip_ai && model.is_none() {
            return Err(AppError::InvalidInput(
                "A generative model is required unless AI enrichment is skipped".to_string(),
            ));
        }
        if config.batch_size == 0 {
            return Err(AppError::InvalidInput("Batch size must be positive".to_string()));
        }
        Ok(Self {
            provider,
            model,
            config,
        })
    }

    /// Full run: harvest, rank, enrich with checkpoints, write the collection
    pub async fn run(&self) -> AppResult<MovieCollection> {
        let harvested = self.harvest().await?;
        let ranked = rank_candidates(
            harvested,
            self.config.min_rating,
            self.config.min_votes,
            self.config.limit,
        );
        tracing::info!(selected = ranked.len(), "Candidates ranked");

        let mut done: HashMap<i64, MovieRecord> = load_checkpoint(&self.config.progress)?
            .into_iter()
            .map(|m| (m.id, m))
            .collect();
        if !done.is_empty() {
            tracing::info!(resumed = done.len(), "Resuming from checkpoint");
        }

        let total = ranked.len();
        let mut movies: Vec<MovieRecord> = Vec::with_capacity(total);
        let mut since_checkpoint = 0;

        for (idx, mut movie) in ranked.into_iter().enumerate() {
            if let Some(previous) = done.remove(&movie.id) {
                movies.push(previous);
                continue;
            }

            if !self.config.skip_ai {
                self.enrich(&mut movie).await;
                tokio::time::sleep(self.config.request_delay).await;
            }

            tracing::info!(
                progress = idx + 1,
                total,
                movie_id = movie.id,
                title = %movie.title,
                tagged = movie.mood_tags.is_some(),
                "Movie processed"
            );
            movies.push(movie);

            since_checkpoint += 1;
            if since_checkpoint >= self.config.batch_size {
                save_checkpoint(&self.config.progress, &movies)?;
                since_checkpoint = 0;
            }
        }

        let collection = MovieCollection::new(movies, chrono::Utc::now());
        write_collection(&self.config.output, &collection)?;

        if self.config.progress.exists() {
            std::fs::remove_file(&self.config.progress)?;
        }

        tracing::info!(
            movies = collection.count,
            output = %self.config.output.display(),
            avg_rating = collection.stats.avg_rating,
            "Dataset written"
        );

        Ok(collection)
    }

    /// Pulls top-rated listings and resolves each movie's details
    ///
    /// A movie whose details cannot be fetched is skipped, not fatal.
    pub async fn harvest(&self) -> AppResult<Vec<MovieRecord>> {
        let mut seen = HashSet::new();
        let mut movies = Vec::new();

        for page_no in 1..=self.config.pages {
            let page = self
                .config
                .retry
                .run("top_rated", || self.provider.top_rated(page_no))
                .await?;

            for summary in &page.results {
                if !seen.insert(summary.id) {
                    continue;
                }

                let id = summary.id;
                match self
                    .config
                    .retry
                    .run("movie_details", || self.provider.movie_details(id))
                    .await
                {
                    Ok(details) => movies.push(MovieRecord::from(details)),
                    Err(e) => {
                        tracing::warn!(movie_id = id, error = %e, "Skipping movie without details")
                    }
                }
                tokio::time::sleep(self.config.request_delay).await;
            }

            tracing::info!(page = page_no, harvested = movies.len(), "Page harvested");
            if page_no >= page.total_pages {
                break;
            }
        }

        Ok(movies)
    }

    /// Fills the three AI fields; a field whose generation fails stays `None`
    pub async fn enrich(&self, movie: &mut MovieRecord) {
        let Some(model) = self.model.as_deref() else {
            return;
        };

        movie.ai_review = self.generate(model, "review", &review_prompt(movie)).await;
        movie.mood_tags = self
            .generate(model, "mood_tags", &mood_tags_prompt(movie))
            .await
            .and_then(|text| parse_mood_tags(&text));
        movie.watch_suggestion = self
            .generate(model, "watch_suggestion", &suggestion_prompt(movie))
            .await
            .map(|s| first_sentence(&s));
    }

    async fn generate(&self, model: &dyn GenerativeModel, what: &str, prompt: &str) -> Option<String> {
        match self
            .config
            .retry
            .run(what, || model.generate_text(prompt))
            .await
        {
            Ok(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
            Ok(_) => None,
            Err(e) => {
                tracing::warn!(what, error = %e, "Generation failed, leaving field empty");
                None
            }
        }
    }
}

/// Drops movies below the floors, orders by score then vote count, keeps `limit`
pub fn rank_candidates(
    movies: Vec<MovieRecord>,
    min_rating: f64,
    min_votes: u32,
    limit: usize,
) -> Vec<MovieRecord> {
    let mut movies: Vec<MovieRecord> = movies
        .into_iter()
        .filter(|m| m.vote_average >= min_rating && m.vote_count >= min_votes)
        .collect();
    movies.sort_by(|a, b| {
        b.score_percent
            .cmp(&a.score_percent)
            .then_with(|| b.vote_count.cmp(&a.vote_count))
    });
    movies.truncate(limit);
    movies
}

fn describe(movie: &MovieRecord) -> String {
    let genres: Vec<&str> = movie.genres.iter().map(|g| g.name.as_str()).collect();
    let year = movie
        .release_year
        .map(|y| format!(" ({})", y))
        .unwrap_or_default();
    format!(
        "\"{}\"{}; genres: {}; plot: {}",
        movie.title,
        year,
        if genres.is_empty() { "unknown".to_string() } else { genres.join(", ") },
        if movie.overview.is_empty() { "unknown" } else { movie.overview.as_str() }
    )
}

pub fn review_prompt(movie: &MovieRecord) -> String {
    format!(
        "Write an engaging, spoiler-free review of about 100 words for the movie {}. \
         Focus on tone, performances and who will enjoy it. Return only the review text.",
        describe(movie)
    )
}

pub fn mood_tags_prompt(movie: &MovieRecord) -> String {
    format!(
        "Give exactly {} short mood tags (one or two words each, e.g. uplifting, tense, \
         bittersweet) describing how it feels to watch the movie {}. \
         Return only the tags, comma-separated.",
        MOOD_TAG_COUNT,
        describe(movie)
    )
}

pub fn suggestion_prompt(movie: &MovieRecord) -> String {
    format!(
        "In one sentence, suggest when or with whom to watch the movie {}. \
         Return only that sentence.",
        describe(movie)
    )
}

/// Extracts exactly five tags from a comma- or line-separated model answer
pub fn parse_mood_tags(text: &str) -> Option<Vec<String>> {
    let tags: Vec<String> = text
        .split([',', '\n'])
        .map(|t| {
            strip_list_marker(t)
                .trim_matches(|c: char| c == '"' || c == '\'' || c == '.' || c.is_whitespace())
                .to_string()
        })
        .filter(|t| !t.is_empty())
        .take(MOOD_TAG_COUNT)
        .collect();

    (tags.len() == MOOD_TAG_COUNT).then_some(tags)
}

/// Drops a leading "- ", "* ", "• " bullet or a "1. " / "2) " counter
///
/// Digits that belong to the tag itself ("80s nostalgia", "3D spectacle") stay.
fn strip_list_marker(item: &str) -> &str {
    let item = item.trim_start();

    if let Some(rest) = item.strip_prefix(['-', '*', '•']) {
        if rest.starts_with(char::is_whitespace) {
            return rest;
        }
    }

    let digits = item.len() - item.trim_start_matches(|c: char| c.is_ascii_digit()).len();
    if digits > 0 {
        if let Some(rest) = item[digits..].strip_prefix(['.', ')']) {
            if rest.is_empty() || rest.starts_with(char::is_whitespace) {
                return rest;
            }
        }
    }

    item
}

const ABBREVIATIONS: &[&str] = &["Dr", "Mr", "Mrs", "Ms", "St", "Jr", "Sr", "Mt", "Prof", "vs", "etc"];

/// Text up to the first sentence terminator that is followed by whitespace
/// or the end, skipping common abbreviations and single-letter initials
fn first_sentence(text: &str) -> String {
    let text = text.trim();

    for (idx, c) in text.char_indices() {
        if !matches!(c, '.' | '!' | '?') {
            continue;
        }
        let end = idx + c.len_utf8();
        let at_boundary = text[end..].chars().next().map_or(true, char::is_whitespace);
        if !at_boundary || (c == '.' && ends_with_abbreviation(&text[..idx])) {
            continue;
        }
        return text[..end].to_string();
    }

    text.to_string()
}

fn ends_with_abbreviation(before: &str) -> bool {
    let word = before.rsplit(char::is_whitespace).next().unwrap_or_default();
    let initial = word.chars().count() == 1 && word.chars().all(char::is_uppercase);
    initial || ABBREVIATIONS.contains(&word)
}

/// Movies enriched by an earlier, interrupted run; empty when there is none
pub fn load_checkpoint(path: &Path) -> AppResult<Vec<MovieRecord>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

/// Replaces the checkpoint file via a temporary sibling and rename
pub fn save_checkpoint(path: &Path, movies: &[MovieRecord]) -> AppResult<()> {
    ensure_parent(path)?;
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, serde_json::to_vec(movies)?)?;
    std::fs::rename(&tmp, path)?;
    tracing::debug!(path = %path.display(), movies = movies.len(), "Checkpoint saved");
    Ok(())
}

pub fn write_collection(path: &Path, collection: &MovieCollection) -> AppResult<()> {
    ensure_parent(path)?;
    std::fs::write(path, serde_json::to_vec_pretty(collection)?)?;
    Ok(())
}

fn ensure_parent(path: &Path) -> AppResult<()> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => Ok(std::fs::create_dir_all(dir)?),
        _ => Ok(()),
    }
}
