use axum::{extract::State, Extension, Json};
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::{
    error::AppResult,
    middleware::request_id::RequestId,
    models::SaveRecordResponse,
    routes::AppState,
    services::persistence::PreparedRecord,
};

/// Handler that appends a family record for future retraining
///
/// Saved records do not affect the running model or catalog.
pub async fn save_family_record(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    Json(record): Json<Map<String, Value>>,
) -> AppResult<Json<SaveRecordResponse>> {
    let prepared = PreparedRecord::from_json(&record)?;

    tracing::info!(
        request_id = %request_id,
        keys = record.len(),
        kept = prepared.columns.len(),
        "Saving family record"
    );

    let columns = state.record_store.append(prepared).await?;

    Ok(Json(SaveRecordResponse {
        status: "ok".to_string(),
        message: "Record saved".to_string(),
        columns,
    }))
}
