use axum::{
    extract::{Query, State},
    Extension, Json,
};
use std::sync::Arc;

use crate::{
    error::AppResult,
    middleware::request_id::RequestId,
    models::{FamilyRequest, RecommendQuery, RecommendationResponse},
    routes::AppState,
};

/// Handler for the destination recommendation endpoint
pub async fn recommend_destinations(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    Query(query): Query<RecommendQuery>,
    Json(request): Json<FamilyRequest>,
) -> AppResult<Json<RecommendationResponse>> {
    let top_k = query
        .top_k
        .unwrap_or_else(|| i64::try_from(state.default_top_k).unwrap_or(i64::MAX));

    tracing::info!(
        request_id = %request_id,
        members = request.members.len(),
        top_k,
        "Processing recommendation request"
    );

    let recommendations = state.recommender.recommend(&request.members, top_k)?;

    tracing::info!(
        request_id = %request_id,
        returned = recommendations.len(),
        "Recommendations generated"
    );

    Ok(Json(RecommendationResponse { recommendations }))
}
