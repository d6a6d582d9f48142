//! Router wiring for the study backend (spec §4.K route table).
//!
//! Kept as a library (re-exported modules below) so `main.rs` stays a thin
//! bootstrap and `build_router` is reusable from integration tests.

pub mod demo_fixtures;
pub mod envelope;
pub mod handlers;
pub mod middleware;
pub mod principal;
pub mod state;
pub mod unavailable;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use gurt_config::AppConfig;

use crate::state::AppState;

/// Build the CORS layer from the configured origin/methods/headers lists
/// (spec §4.K: "CORS attached to every response").
fn cors_layer(config: &AppConfig) -> CorsLayer {
    let methods: Vec<axum::http::Method> = config
        .cors_allow_methods
        .split(',')
        .filter_map(|m| m.trim().parse().ok())
        .collect();
    let headers: Vec<axum::http::HeaderName> = config
        .cors_allow_headers
        .split(',')
        .filter_map(|h| h.trim().parse().ok())
        .collect();

    let origin = if config.cors_allow_origin.trim() == "*" {
        AllowOrigin::any()
    } else {
        let origins: Vec<axum::http::HeaderValue> = config
            .cors_allow_origin
            .split(',')
            .filter_map(|o| o.trim().parse().ok())
            .collect();
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods(methods)
        .allow_headers(headers)
}

pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config);

    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/courses", get(handlers::courses::list_courses))
        .route("/courses/{course_id}/items", get(handlers::courses::list_course_items))
        .route("/courses/{course_id}/materials", get(handlers::courses::list_course_materials))
        .route("/uploads", post(handlers::uploads::create_upload_handler))
        .route("/docs/ingest", post(handlers::ingest::submit_ingest))
        .route("/docs/ingest/{job_id}", get(handlers::ingest::get_ingest_job))
        .route("/lms/connect", post(handlers::lms::connect))
        .route("/lms/sync", post(handlers::lms::sync))
        .route("/lms/sync/scheduled", post(handlers::lms::trigger_scheduled_sync))
        .route("/generate/flashcards", post(handlers::generation::flashcards))
        .route(
            "/generate/flashcards-from-materials",
            post(handlers::generation::flashcards_from_materials),
        )
        .route("/generate/practice-exam", post(handlers::generation::practice_exam))
        .route("/chat", post(handlers::chat::chat))
        .route("/study/today", get(handlers::study::study_today))
        .route("/study/review", post(handlers::study::review))
        .route("/study/mastery", get(handlers::study::mastery))
        .route("/calendar/token", post(handlers::calendar::mint_token))
        .route("/calendar/{token}", get(handlers::calendar::feed))
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
