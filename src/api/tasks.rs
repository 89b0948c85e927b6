//! Task and activity endpoints.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
};
use chrono::{Local, NaiveDate};
use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use super::{ApiResponse, AppState, authenticated, error_response, task_error_response};
use crate::error::TaskError;
use crate::tasks::{DueFilter, Priority, TaskOptions, TaskStatus, TaskUpdate, TaskView};

fn today() -> NaiveDate {
    Local::now().date_naive()
}

#[derive(Deserialize)]
pub(super) struct TaskQuery {
    view: Option<String>,
    filter: Option<String>,
}

#[derive(Deserialize)]
pub(super) struct CreateTaskRequest {
    description: String,
    assignee: Option<String>,
    #[serde(flatten)]
    options: OptionsRequest,
}

#[derive(Deserialize)]
pub(super) struct CommandRequest {
    text: String,
    #[serde(flatten)]
    options: OptionsRequest,
}

#[derive(Deserialize, Default)]
pub(super) struct OptionsRequest {
    priority: Option<String>,
    due_date: Option<NaiveDate>,
    project: Option<String>,
}

impl OptionsRequest {
    fn into_options(self) -> Result<TaskOptions, TaskError> {
        let priority = match self.priority.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(p) => Some(p.parse::<Priority>()?),
        };
        Ok(TaskOptions {
            priority,
            due_date: self.due_date,
            project_ref: self.project,
        })
    }
}

#[derive(Deserialize)]
pub(super) struct UpdateRequest {
    status: String,
    staff_remark: Option<String>,
    manager_remark: Option<String>,
}

#[derive(Deserialize)]
pub(super) struct ActivityQuery {
    limit: Option<usize>,
}

/// GET /api/tasks?view=board|active|diary&filter=...
///
/// A failed read still answers 200, with an empty list and an `error` field.
pub(super) async fn list_tasks(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<TaskQuery>,
) -> ApiResponse {
    let session = match authenticated(&state, &headers).await {
        Ok(session) => session,
        Err(resp) => return resp,
    };

    let view = match query.view.as_deref().unwrap_or("board") {
        "board" => TaskView::Board,
        "active" => TaskView::Active,
        "diary" => {
            let filter = match query.filter.as_deref() {
                Some(raw) => match raw.parse::<DueFilter>() {
                    Ok(filter) => filter,
                    Err(e) => return error_response(StatusCode::BAD_REQUEST, e),
                },
                None => session.filter,
            };
            TaskView::Diary(filter)
        }
        other => {
            return error_response(StatusCode::BAD_REQUEST, format!("unknown view '{other}'"));
        }
    };

    match state.tasks.list_for(&session, view, today()).await {
        Ok(tasks) => (StatusCode::OK, Json(json!({ "tasks": tasks }))),
        Err(e) => {
            warn!(identity = %session.identity, error = %e, "Task list unavailable");
            (
                StatusCode::OK,
                Json(json!({ "tasks": [], "error": e.to_string() })),
            )
        }
    }
}

/// POST /api/tasks
///
/// Assignee defaults to the caller.
pub(super) async fn create_task(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<CreateTaskRequest>,
) -> ApiResponse {
    let session = match authenticated(&state, &headers).await {
        Ok(session) => session,
        Err(resp) => return resp,
    };
    let options = match body.options.into_options() {
        Ok(options) => options,
        Err(e) => return task_error_response(e),
    };
    let assignee = match body.assignee.as_deref().map(str::trim) {
        None | Some("") => session.identity.clone(),
        Some(raw) => match state.auth.authenticate(raw) {
            Ok((identity, _)) => identity,
            Err(e) => return error_response(StatusCode::BAD_REQUEST, e),
        },
    };

    match state
        .tasks
        .create(&session.identity, &assignee, &body.description, options, today())
        .await
    {
        Ok(task) => (StatusCode::CREATED, Json(json!(task))),
        Err(e) => task_error_response(e),
    }
}

/// POST /api/tasks/command
pub(super) async fn create_from_command(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<CommandRequest>,
) -> ApiResponse {
    let session = match authenticated(&state, &headers).await {
        Ok(session) => session,
        Err(resp) => return resp,
    };
    let options = match body.options.into_options() {
        Ok(options) => options,
        Err(e) => return task_error_response(e),
    };

    match state
        .tasks
        .create_from_command(&session.identity, &body.text, options, today())
        .await
    {
        Ok(task) => (StatusCode::CREATED, Json(json!(task))),
        Err(e) => task_error_response(e),
    }
}

/// PATCH /api/tasks/{id}
pub(super) async fn update_task(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(body): Json<UpdateRequest>,
) -> ApiResponse {
    let session = match authenticated(&state, &headers).await {
        Ok(session) => session,
        Err(resp) => return resp,
    };
    let status = match body.status.parse::<TaskStatus>() {
        Ok(status) => status,
        Err(e) => return task_error_response(e),
    };

    let mut update = TaskUpdate::status(status);
    if let Some(remark) = body.staff_remark {
        update = update.with_staff_remarks(remark);
    }
    if let Some(remark) = body.manager_remark {
        update = update.with_manager_remarks(remark);
    }

    match state.tasks.update(&session, id, update).await {
        Ok(task) => (StatusCode::OK, Json(json!(task))),
        Err(e) => task_error_response(e),
    }
}

/// POST /api/tasks/{id}/complete
pub(super) async fn complete_task(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> ApiResponse {
    let session = match authenticated(&state, &headers).await {
        Ok(session) => session,
        Err(resp) => return resp,
    };
    match state.tasks.complete(&session, id).await {
        Ok(task) => (StatusCode::OK, Json(json!(task))),
        Err(e) => task_error_response(e),
    }
}

/// GET /api/activity?limit=N
///
/// Same read-failure contract as the task list.
pub(super) async fn recent_activity(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ActivityQuery>,
) -> ApiResponse {
    if let Err(resp) = authenticated(&state, &headers).await {
        return resp;
    }
    // `limit` may shrink the configured window, never grow it.
    let limit = query
        .limit
        .unwrap_or(state.activity_window)
        .min(state.activity_window);
    match state.tasks.recent_activity(limit).await {
        Ok(entries) => (StatusCode::OK, Json(json!({ "activity": entries }))),
        Err(e) => {
            warn!(error = %e, "Activity feed unavailable");
            (
                StatusCode::OK,
                Json(json!({ "activity": [], "error": e.to_string() })),
            )
        }
    }
}
