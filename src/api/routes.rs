use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use super::handlers;
use super::AppState;
use crate::middleware::{make_span_with_request_id, request_id_middleware};
use crate::models::{LabeledMood, Mood};

/// Creates the application router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/api/v1", api_routes())
        // Request id is assigned before the trace span is created.
        .layer(
            ServiceBuilder::new()
                .layer(CorsLayer::permissive())
                .layer(middleware::from_fn(request_id_middleware))
                .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id)),
        )
        .with_state(state)
}

/// API routes under /api/v1
fn api_routes() -> Router<AppState> {
    Router::new()
        // Moods
        .route("/moods", get(handlers::list_moods))
        .route("/moods/:mood/movies", get(handlers::mood_movies::<Mood>))
        .route(
            "/labeled-moods/:mood/movies",
            get(handlers::mood_movies::<LabeledMood>),
        )
        // Mood tags
        .route("/mood-tags", get(handlers::mood_tags))
        .route("/mood-tags/top", get(handlers::top_mood_tags))
        .route("/mood-tags/:tag/movies", get(handlers::mood_tag_movies))
        // Dataset
        .route("/movies", get(handlers::list_movies))
        .route("/movies/:id", get(handlers::get_movie))
        .route("/movies/:id/similar", get(handlers::similar_movies))
        .route("/stats", get(handlers::stats))
        // Live TMDb
        .route("/discover", get(handlers::discover))
        .route("/chat", post(handlers::chat))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::MovieStore;
    use axum::{body::Body, http::Request, http::StatusCode};
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_unknown_route_is_not_found() {
        let app = create_router(AppState::new(MovieStore::from_movies(Vec::new())));
        let response = app
            .oneshot(Request::builder().uri("/api/v2/moods").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_generated_request_id_header() {
        let app = create_router(AppState::new(MovieStore::from_movies(Vec::new())));
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
    }
}
