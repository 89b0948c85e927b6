//! Unified `Database` trait, the single async interface for all persistence.

use async_trait::async_trait;

use crate::error::DatabaseError;
use crate::projects::model::Project;
use crate::tasks::activity::{ActivityEntry, NewActivity};
use crate::tasks::model::{NewTask, Task, TaskUpdate};

/// Backend-agnostic database trait covering tasks, activity, and projects.
///
/// No call spans more than one table, and none is retried.
#[async_trait]
pub trait Database: Send + Sync {
    /// Run all pending schema migrations.
    async fn init_schema(&self) -> Result<(), DatabaseError>;

    // ── Tasks ───────────────────────────────────────────────────────

    /// Insert a task with status `Open` and empty remarks. Returns the stored
    /// row including its assigned id and timestamp.
    async fn insert_task(&self, task: &NewTask) -> Result<Task, DatabaseError>;

    /// Get a task by id.
    async fn get_task(&self, id: i64) -> Result<Option<Task>, DatabaseError>;

    /// List tasks, newest first. `Some(assignee)` restricts to that assignee.
    async fn list_tasks(&self, assignee: Option<&str>) -> Result<Vec<Task>, DatabaseError>;

    /// Write status and any supplied remarks and return the updated row, or
    /// `None` if no task has `id`.
    async fn update_task(&self, id: i64, update: &TaskUpdate) -> Result<Option<Task>, DatabaseError>;

    // ── Activity ────────────────────────────────────────────────────

    /// Append an activity entry.
    async fn append_activity(&self, entry: &NewActivity) -> Result<(), DatabaseError>;

    /// Most recent entries first, at most `limit`.
    async fn recent_activity(&self, limit: usize) -> Result<Vec<ActivityEntry>, DatabaseError>;

    // ── Projects ────────────────────────────────────────────────────

    /// Insert or replace projects keyed by name. Returns rows written.
    async fn upsert_projects(&self, projects: &[Project]) -> Result<usize, DatabaseError>;

    /// All project names, alphabetical.
    async fn list_project_names(&self) -> Result<Vec<String>, DatabaseError>;
}
