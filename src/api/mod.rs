//! HTTP API for the dashboard.

mod projects;
mod session;
mod tasks;

use std::sync::Arc;

use axum::{
    Json, Router,
    http::{HeaderMap, StatusCode, header},
    routing::{get, patch, post, put},
};
use serde_json::{Value, json};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use uuid::Uuid;

use crate::auth::{Authenticator, Session, SessionRegistry};
use crate::config::AppConfig;
use crate::error::{AuthError, TaskError};
use crate::projects::SheetSource;
use crate::store::Database;
use crate::tasks::{CommandParser, TaskService};

/// Status plus JSON body, the shape every handler returns.
pub(crate) type ApiResponse = (StatusCode, Json<Value>);

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<Authenticator>,
    pub sessions: Arc<SessionRegistry>,
    pub tasks: TaskService,
    pub db: Arc<dyn Database>,
    /// Spreadsheet to sync projects from (None if not configured).
    pub sheets: Option<Arc<dyn SheetSource>>,
    /// Configured roster, in order.
    pub team: Arc<Vec<String>>,
    pub activity_window: usize,
}

impl AppState {
    pub fn new(
        config: &AppConfig,
        db: Arc<dyn Database>,
        sheets: Option<Arc<dyn SheetSource>>,
    ) -> Self {
        let parser = CommandParser::new(&config.team, config.name_matching);
        Self {
            auth: Arc::new(Authenticator::new(
                &config.company_domain,
                &config.admin_email,
            )),
            sessions: Arc::new(SessionRegistry::new()),
            tasks: TaskService::new(Arc::clone(&db), parser),
            db,
            sheets,
            team: Arc::new(config.team.clone()),
            activity_window: config.activity_window,
        }
    }
}

/// Build the Axum router with every dashboard route.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/login", post(session::login))
        .route("/api/logout", post(session::logout))
        .route("/api/session", get(session::current))
        .route("/api/session/filter", put(session::set_filter))
        .route("/api/team", get(session::team))
        .route("/api/tasks", get(tasks::list_tasks).post(tasks::create_task))
        .route("/api/tasks/command", post(tasks::create_from_command))
        .route("/api/tasks/{id}", patch(tasks::update_task))
        .route("/api/tasks/{id}/complete", post(tasks::complete_task))
        .route("/api/activity", get(tasks::recent_activity))
        .route("/api/projects", get(projects::list_projects))
        .route("/api/projects/sync", post(projects::sync))
        .layer(ServiceBuilder::new().layer(CorsLayer::permissive()))
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "taskhub"
    }))
}

pub(crate) fn error_response(status: StatusCode, message: impl ToString) -> ApiResponse {
    (status, Json(json!({ "error": message.to_string() })))
}

/// Pull the bearer token out of `Authorization`.
fn bearer_token(headers: &HeaderMap) -> Result<Uuid, AuthError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::MissingSession)?;
    let token = value
        .strip_prefix("Bearer ")
        .ok_or(AuthError::MissingSession)?;
    Uuid::parse_str(token.trim()).map_err(|_| AuthError::UnknownSession)
}

/// Resolve the caller's session or produce a 401.
pub(crate) async fn authenticated(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<Session, ApiResponse> {
    let token = bearer_token(headers).map_err(auth_error_response)?;
    state
        .sessions
        .get(token)
        .await
        .map_err(auth_error_response)
}

pub(crate) fn auth_error_response(err: AuthError) -> ApiResponse {
    let status = match err {
        AuthError::Forbidden { .. } => StatusCode::FORBIDDEN,
        AuthError::DomainRejected { .. } | AuthError::MissingSession | AuthError::UnknownSession => {
            StatusCode::UNAUTHORIZED
        }
    };
    error_response(status, err)
}

pub(crate) fn task_error_response(err: TaskError) -> ApiResponse {
    let status = match err {
        TaskError::Auth(auth) => return auth_error_response(auth),
        TaskError::EmptyDescription | TaskError::UnknownStatus(_) | TaskError::UnknownPriority(_) => {
            StatusCode::BAD_REQUEST
        }
        TaskError::NotFound { .. } => StatusCode::NOT_FOUND,
        TaskError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error_response(status, err)
}
