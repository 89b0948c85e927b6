//! Login, logout, and per-session preferences.

use axum::{Json, extract::State, http::HeaderMap, http::StatusCode};
use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use super::{ApiResponse, AppState, auth_error_response, authenticated, bearer_token, error_response};
use crate::auth::Session;
use crate::tasks::DueFilter;

#[derive(Deserialize)]
pub(super) struct LoginRequest {
    email: String,
}

#[derive(Deserialize)]
pub(super) struct FilterRequest {
    filter: DueFilter,
}

fn session_body(session: &Session) -> serde_json::Value {
    json!({
        "token": session.token,
        "identity": session.identity,
        "role": session.role,
        "display_name": session.display_name(),
        "filter": session.filter,
    })
}

/// POST /api/login
pub(super) async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> ApiResponse {
    match state.sessions.login(&state.auth, &body.email).await {
        Ok(session) => (StatusCode::OK, Json(session_body(&session))),
        Err(e) => {
            warn!(email = %body.email.trim(), "Login rejected");
            auth_error_response(e)
        }
    }
}

/// POST /api/logout
pub(super) async fn logout(State(state): State<AppState>, headers: HeaderMap) -> ApiResponse {
    let token = match bearer_token(&headers) {
        Ok(token) => token,
        Err(e) => return auth_error_response(e),
    };
    if state.sessions.logout(token).await {
        (StatusCode::OK, Json(json!({"status": "logged_out"})))
    } else {
        error_response(StatusCode::UNAUTHORIZED, "Session not recognised")
    }
}

/// GET /api/session
pub(super) async fn current(State(state): State<AppState>, headers: HeaderMap) -> ApiResponse {
    match authenticated(&state, &headers).await {
        Ok(session) => (StatusCode::OK, Json(session_body(&session))),
        Err(resp) => resp,
    }
}

/// PUT /api/session/filter
///
/// Sets the diary focus used when `GET /api/tasks?view=diary` names no filter.
pub(super) async fn set_filter(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<FilterRequest>,
) -> ApiResponse {
    let token = match bearer_token(&headers) {
        Ok(token) => token,
        Err(e) => return auth_error_response(e),
    };
    match state.sessions.set_filter(token, body.filter).await {
        Ok(session) => (StatusCode::OK, Json(session_body(&session))),
        Err(e) => auth_error_response(e),
    }
}

/// GET /api/team
///
/// Roster identities other than the caller, for the assignee picker.
pub(super) async fn team(State(state): State<AppState>, headers: HeaderMap) -> ApiResponse {
    let session = match authenticated(&state, &headers).await {
        Ok(session) => session,
        Err(resp) => return resp,
    };
    let others: Vec<&String> = state
        .team
        .iter()
        .filter(|member| **member != session.identity)
        .collect();
    (StatusCode::OK, Json(json!({ "team": others })))
}
