use axum::{
    http::StatusCode,
    middleware,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    middleware::request_id::{make_span_with_request_id, request_id_middleware},
    services::{RecommendationService, RecordStore},
};

pub mod recommendations;
pub mod records;

/// Shared, read-only state injected into every handler
pub struct AppState {
    pub recommender: RecommendationService,
    pub record_store: Arc<dyn RecordStore>,
    /// Used when a recommendation request omits `top_k`
    pub default_top_k: usize,
}

/// Creates the application router with all routes
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .nest("/api/family", family_routes())
        .with_state(state)
        .layer(
            // Request IDs are assigned first so the trace span can record them
            ServiceBuilder::new()
                .layer(middleware::from_fn(request_id_middleware))
                .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
                .layer(CorsLayer::permissive()),
        )
}

/// Family routes under /api/family
fn family_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/recommend_destinations",
            post(recommendations::recommend_destinations),
        )
        .route("/save_family_record", post(records::save_family_record))
}

/// Service banner
async fn root() -> Json<Value> {
    Json(json!({
        "message": "Family Harmony AI: family holiday destination recommender",
        "endpoints": [
            "/api/family/recommend_destinations",
            "/api/family/save_family_record"
        ]
    }))
}

/// Health check endpoint
async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}
