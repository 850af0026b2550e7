use axum::{extract::State, http::StatusCode, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::{
    error::{AppError, AppResult},
    models::{
        DatasetStats, DiscoverQuery, Era, LabeledMood, Mood, MoodCount, MoodDefinition, MoodKey,
        MoviePage, MovieRecord,
    },
    services::{ChatMessage, ChatResponse},
};

use super::extract::{self, Path, Query};
use super::AppState;

// Request/Response types

#[derive(Debug, Default, Deserialize)]
pub struct LimitParams {
    pub limit: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
pub struct MovieFilter {
    pub genre: Option<String>,
    pub era: Option<String>,
    pub q: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct MoodsResponse {
    pub moods: Vec<&'static MoodDefinition>,
    pub labeled_moods: Vec<&'static MoodDefinition>,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub count: usize,
    pub generated_at: Option<DateTime<Utc>>,
    pub stats: DatasetStats,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
}

fn owned(movies: Vec<&MovieRecord>) -> Vec<MovieRecord> {
    movies.into_iter().cloned().collect()
}

fn definitions<M: MoodKey>() -> Vec<&'static MoodDefinition> {
    M::all().iter().map(|m| m.definition()).collect()
}

// Handlers

pub async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

pub async fn list_moods() -> Json<MoodsResponse> {
    Json(MoodsResponse {
        moods: definitions::<Mood>(),
        labeled_moods: definitions::<LabeledMood>(),
    })
}

/// Ranked recommendations for one member of the `M` taxonomy
///
/// An unknown mood is a 400; a known mood with no matches is an empty list.
pub async fn mood_movies<M: MoodKey>(
    State(state): State<AppState>,
    Path(mood): Path<String>,
    Query(params): Query<LimitParams>,
) -> AppResult<Json<Vec<MovieRecord>>> {
    let mood: M = mood.parse()?;
    let limit = state.limit(params.limit);
    let movies = state.store.recommend(mood.definition(), limit);
    Ok(Json(owned(movies)))
}

pub async fn mood_tags(State(state): State<AppState>) -> Json<Vec<String>> {
    Json(state.store.mood_tags().to_vec())
}

pub async fn top_mood_tags(
    State(state): State<AppState>,
    Query(params): Query<LimitParams>,
) -> Json<Vec<MoodCount>> {
    Json(state.store.top_moods(state.limit(params.limit)))
}

pub async fn mood_tag_movies(
    State(state): State<AppState>,
    Path(tag): Path<String>,
) -> AppResult<Json<Vec<MovieRecord>>> {
    let movies = state.store.movies_with_mood_tag(&tag)?;
    Ok(Json(owned(movies)))
}

pub async fn get_movie(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<MovieRecord>> {
    state
        .store
        .movie(id)
        .cloned()
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Movie {} not found", id)))
}

pub async fn similar_movies(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(params): Query<LimitParams>,
) -> AppResult<Json<Vec<MovieRecord>>> {
    let movies = state.store.similar_movies(id, state.limit(params.limit))?;
    Ok(Json(owned(movies)))
}

/// Dataset listing narrowed by any combination of title query, genre and era
pub async fn list_movies(
    State(state): State<AppState>,
    Query(filter): Query<MovieFilter>,
) -> AppResult<Json<Vec<MovieRecord>>> {
    let limit = state.limit(filter.limit);
    let era = filter
        .era
        .as_deref()
        .map(str::parse::<Era>)
        .transpose()
        .map_err(AppError::InvalidInput)?;
    let genre = filter.genre.as_deref().map(|g| g.trim().to_lowercase());

    let candidates = match (filter.q.as_deref(), genre.as_deref()) {
        (Some(q), _) => state.store.search(q, usize::MAX)?,
        (None, Some(g)) => state.store.movies_by_genre(g),
        (None, None) => state.store.top_rated(usize::MAX),
    };

    let movies: Vec<MovieRecord> = candidates
        .into_iter()
        .filter(|m| era.map_or(true, |e| m.era == e))
        .filter(|m| {
            genre
                .as_deref()
                .map_or(true, |g| m.genres.iter().any(|mg| mg.name.to_lowercase() == g))
        })
        .take(limit)
        .cloned()
        .collect();

    Ok(Json(movies))
}

pub async fn stats(State(state): State<AppState>) -> Json<StatsResponse> {
    let collection = state.store.collection();
    Json(StatsResponse {
        count: state.store.len(),
        generated_at: collection.generated_at,
        stats: collection.stats.clone(),
    })
}

/// TMDb discovery, passed through without re-ranking
pub async fn discover(
    State(state): State<AppState>,
    Query(query): Query<DiscoverQuery>,
) -> AppResult<Json<MoviePage>> {
    let provider = state
        .provider
        .as_ref()
        .ok_or_else(|| AppError::Unavailable("TMDb discovery is not configured".to_string()))?;
    let page = provider.discover(&query).await?;
    Ok(Json(page))
}

pub async fn chat(
    State(state): State<AppState>,
    extract::Json(request): extract::Json<ChatRequest>,
) -> AppResult<Json<ChatResponse>> {
    let chat = state
        .chat
        .as_ref()
        .ok_or_else(|| AppError::Unavailable("Chat is not configured".to_string()))?;
    let response = chat.respond(&request.messages).await?;
    Ok(Json(response))
}
