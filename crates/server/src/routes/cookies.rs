use std::collections::BTreeMap;

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    Json,
};
use models::request::{ListQuery, Operation, RemoveCookieRequest, SaveCookieRequest};
use models::CookieRecord;
use serde::Serialize;
use tracing::info;

use crate::errors::ApiError;
use crate::routes::auth::ServerState;

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub details: BTreeMap<String, i64>,
}

/// POST: route on the body's `operation` tag, then parse the same bytes as
/// that operation's request.
pub async fn dispatch(
    State(state): State<ServerState>,
    Path((cookie_type, user_id)): Path<(String, String)>,
    body: Bytes,
) -> Result<Json<SuccessResponse>, ApiError> {
    match Operation::peek(&body)? {
        Operation::Save => save(&state, &user_id, &cookie_type, &body).await?,
        Operation::Remove => remove(&state, &user_id, &cookie_type, &body).await?,
    }
    Ok(Json(SuccessResponse { success: true }))
}

async fn save(state: &ServerState, user_id: &str, cookie_type: &str, body: &[u8]) -> Result<(), ApiError> {
    let new = SaveCookieRequest::parse(body)?.validate()?;
    let record = state
        .cookies
        .save(user_id, cookie_type, new)
        .await
        .map_err(|e| ApiError::from_service(e, "Failed to save cookie"))?;
    info!(%user_id, %cookie_type, category = %record.category, "cookie saved");
    Ok(())
}

async fn remove(state: &ServerState, user_id: &str, cookie_type: &str, body: &[u8]) -> Result<(), ApiError> {
    let value = RemoveCookieRequest::parse(body)?.validate()?;
    let removed = state
        .cookies
        .remove(user_id, cookie_type, &value)
        .await
        .map_err(|e| ApiError::from_service(e, "Failed to remove cookie"))?;
    match removed {
        Some(category) => info!(%user_id, %cookie_type, %category, "cookie removed"),
        None => info!(%user_id, %cookie_type, "cookie to remove not found"),
    }
    Ok(())
}

/// GET: records for the namespace, filtered by `category`, shuffled when
/// `random=true`, capped by `qty`.
pub async fn list(
    State(state): State<ServerState>,
    Path((cookie_type, user_id)): Path<(String, String)>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<Vec<CookieRecord>>, ApiError> {
    let opts = ListQuery::from_pairs(pairs).validate()?;
    let records = state
        .cookies
        .list(&user_id, &cookie_type, &opts)
        .await
        .map_err(|e| ApiError::from_service(e, "Failed to retrieve cookies"))?;
    Ok(Json(records))
}

/// GET …/stats: positive per-category counts.
pub async fn stats(
    State(state): State<ServerState>,
    Path((cookie_type, user_id)): Path<(String, String)>,
) -> Result<Json<StatsResponse>, ApiError> {
    let details = state
        .cookies
        .stats(&user_id, &cookie_type)
        .await
        .map_err(|e| ApiError::from_service(e, "Failed to retrieve stats"))?;
    Ok(Json(StatsResponse { details }))
}
