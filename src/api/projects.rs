//! Project list and spreadsheet sync endpoints.

use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode},
};
use serde_json::json;
use tracing::warn;

use super::{ApiResponse, AppState, authenticated, error_response};
use crate::error::SyncError;
use crate::projects::{project_names, sync_projects};

/// GET /api/projects
///
/// A failed read answers 200 with an empty list and an `error` field.
pub(super) async fn list_projects(State(state): State<AppState>, headers: HeaderMap) -> ApiResponse {
    if let Err(resp) = authenticated(&state, &headers).await {
        return resp;
    }
    match project_names(state.db.as_ref()).await {
        Ok(names) => (StatusCode::OK, Json(json!({ "projects": names }))),
        Err(e) => (
            StatusCode::OK,
            Json(json!({ "projects": [], "error": e.to_string() })),
        ),
    }
}

/// POST /api/projects/sync
pub(super) async fn sync(State(state): State<AppState>, headers: HeaderMap) -> ApiResponse {
    let session = match authenticated(&state, &headers).await {
        Ok(session) => session,
        Err(resp) => return resp,
    };
    let Some(source) = state.sheets.as_ref() else {
        return error_response(StatusCode::SERVICE_UNAVAILABLE, SyncError::NotConfigured);
    };

    match sync_projects(source.as_ref(), state.db.as_ref()).await {
        Ok(count) => (StatusCode::OK, Json(json!({ "synced": count }))),
        Err(e) => {
            warn!(identity = %session.identity, error = %e, "Project sync failed");
            let status = match e {
                SyncError::NotConfigured => StatusCode::SERVICE_UNAVAILABLE,
                SyncError::Request(_) | SyncError::MissingColumn { .. } => StatusCode::BAD_GATEWAY,
                SyncError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            };
            error_response(status, e)
        }
    }
}
