//! libSQL backend — async `Database` trait implementation.
//!
//! Supports local file, in-memory, and hosted (remote) databases.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use libsql::{Connection, Database as LibSqlDatabase, params};
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info};

use crate::error::DatabaseError;
use crate::projects::model::Project;
use crate::store::migrations;
use crate::store::traits::Database;
use crate::tasks::activity::{ActivityEntry, NewActivity};
use crate::tasks::model::{NewTask, Task, TaskStatus, TaskUpdate};

/// libSQL database backend.
///
/// Stores a single connection that is reused for all operations.
/// `libsql::Connection` is `Send + Sync` and safe for concurrent async use.
pub struct LibSqlBackend {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlBackend {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Pool(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to open libSQL database: {e}")))?;

        let backend = Self::from_database(db).await?;
        info!(path = %path.display(), "Database opened");
        Ok(backend)
    }

    /// Connect to a hosted libSQL database and run migrations.
    pub async fn new_remote(url: &str, auth_token: &SecretString) -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_remote(url.to_string(), auth_token.expose_secret().to_string())
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to connect to {url}: {e}")))?;

        let backend = Self::from_database(db).await?;
        info!(url = %url, "Remote database connected");
        Ok(backend)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                DatabaseError::Pool(format!("Failed to create in-memory database: {e}"))
            })?;
        Self::from_database(db).await
    }

    async fn from_database(db: LibSqlDatabase) -> Result<Self, DatabaseError> {
        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;

        let backend = Self {
            db: Arc::new(db),
            conn,
        };
        backend.init_schema().await?;
        Ok(backend)
    }

    /// Get the connection.
    fn conn(&self) -> &Connection {
        &self.conn
    }
}

// ── Helper functions ────────────────────────────────────────────────

/// Parse an RFC 3339 or SQLite datetime string into DateTime<Utc>.
fn parse_datetime(s: &str) -> DateTime<Utc> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return dt.with_timezone(&Utc);
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
        return ndt.and_utc();
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return ndt.and_utc();
    }
    DateTime::<Utc>::MIN_UTC
}

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Read a nullable text column, treating `''` like NULL.
fn opt_column(row: &libsql::Row, idx: i32) -> Option<String> {
    row.get::<String>(idx).ok().filter(|s| !s.is_empty())
}

// ── Row mapping ─────────────────────────────────────────────────────

/// Column list for task SELECT queries (11 columns).
const TASK_COLUMNS: &str = "id, created_by, assigned_to, task_desc, status, priority, due_date, project_ref, staff_remarks, manager_remarks, created_at";

const ACTIVITY_COLUMNS: &str = "id, user_email, action, details, task_id, created_at";

fn row_to_task(row: &libsql::Row) -> Result<Task, DatabaseError> {
    let id: i64 = row.get(0).map_err(|e| DatabaseError::Query(format!("task.id: {e}")))?;
    let created_by: String = row
        .get(1)
        .map_err(|e| DatabaseError::Query(format!("task.created_by: {e}")))?;
    let assigned_to: String = row
        .get(2)
        .map_err(|e| DatabaseError::Query(format!("task.assigned_to: {e}")))?;
    let description: String = row
        .get(3)
        .map_err(|e| DatabaseError::Query(format!("task.task_desc: {e}")))?;

    let status_str: String = row
        .get(4)
        .map_err(|e| DatabaseError::Query(format!("task.status: {e}")))?;
    let status: TaskStatus = status_str
        .parse()
        .map_err(|e| DatabaseError::Serialization(format!("task {id}: {e}")))?;

    let priority = opt_column(row, 5).and_then(|s| s.parse().ok());
    let due_date = opt_column(row, 6).and_then(|s| NaiveDate::parse_from_str(&s, DATE_FORMAT).ok());
    let project_ref = opt_column(row, 7);
    let staff_remarks: String = row.get(8).unwrap_or_default();
    let manager_remarks: String = row.get(9).unwrap_or_default();
    let created_at_str: String = row.get(10).unwrap_or_default();

    Ok(Task {
        id,
        created_by,
        assigned_to,
        description,
        status,
        priority,
        due_date,
        project_ref,
        staff_remarks,
        manager_remarks,
        created_at: parse_datetime(&created_at_str),
    })
}

fn row_to_activity(row: &libsql::Row) -> Result<ActivityEntry, DatabaseError> {
    let id: i64 = row
        .get(0)
        .map_err(|e| DatabaseError::Query(format!("activity.id: {e}")))?;
    let actor: String = row
        .get(1)
        .map_err(|e| DatabaseError::Query(format!("activity.user_email: {e}")))?;
    let action: String = row
        .get(2)
        .map_err(|e| DatabaseError::Query(format!("activity.action: {e}")))?;
    let detail: String = row.get(3).unwrap_or_default();
    let task_id: Option<i64> = row.get::<i64>(4).ok();
    let created_at_str: String = row.get(5).unwrap_or_default();

    Ok(ActivityEntry {
        id,
        actor,
        action,
        detail,
        task_id,
        created_at: parse_datetime(&created_at_str),
    })
}

// ── Trait implementation ────────────────────────────────────────────

#[async_trait]
impl Database for LibSqlBackend {
    async fn init_schema(&self) -> Result<(), DatabaseError> {
        migrations::run_migrations(self.conn()).await
    }

    // ── Tasks ───────────────────────────────────────────────────────

    async fn insert_task(&self, task: &NewTask) -> Result<Task, DatabaseError> {
        let conn = self.conn();
        let mut rows = conn
            .query(
                &format!(
                    "INSERT INTO tasks (created_by, assigned_to, task_desc, status, priority, due_date, project_ref, staff_remarks, manager_remarks, created_at) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, '', '', ?8) \
                     RETURNING {TASK_COLUMNS}"
                ),
                params![
                    task.created_by.as_str(),
                    task.assigned_to.as_str(),
                    task.description.as_str(),
                    TaskStatus::Open.as_str(),
                    task.priority.map(|p| p.as_str()),
                    task.due_date.map(|d| d.format(DATE_FORMAT).to_string()),
                    task.project_ref.as_deref(),
                    Utc::now().to_rfc3339(),
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("insert_task: {e}")))?;

        let row = rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(format!("insert_task row: {e}")))?
            .ok_or_else(|| DatabaseError::Query("insert_task returned no row".into()))?;
        let stored = row_to_task(&row)?;
        debug!(id = stored.id, assignee = %stored.assigned_to, "Task inserted");
        Ok(stored)
    }

    async fn get_task(&self, id: i64) -> Result<Option<Task>, DatabaseError> {
        let conn = self.conn();
        let mut rows = conn
            .query(
                &format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1"),
                params![id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get_task: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_task(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("get_task row: {e}"))),
        }
    }

    async fn list_tasks(&self, assignee: Option<&str>) -> Result<Vec<Task>, DatabaseError> {
        let conn = self.conn();
        let mut rows = match assignee {
            Some(assignee) => {
                conn.query(
                    &format!(
                        "SELECT {TASK_COLUMNS} FROM tasks WHERE assigned_to = ?1 ORDER BY id DESC"
                    ),
                    params![assignee],
                )
                .await
            }
            None => {
                conn.query(
                    &format!("SELECT {TASK_COLUMNS} FROM tasks ORDER BY id DESC"),
                    (),
                )
                .await
            }
        }
        .map_err(|e| DatabaseError::Query(format!("list_tasks: {e}")))?;

        let mut tasks = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(format!("list_tasks row: {e}")))?
        {
            tasks.push(row_to_task(&row)?);
        }
        Ok(tasks)
    }

    async fn update_task(&self, id: i64, update: &TaskUpdate) -> Result<Option<Task>, DatabaseError> {
        let conn = self.conn();
        let mut rows = conn
            .query(
                &format!(
                    "UPDATE tasks SET status = ?1, \
                     staff_remarks = COALESCE(?2, staff_remarks), \
                     manager_remarks = COALESCE(?3, manager_remarks) \
                     WHERE id = ?4 \
                     RETURNING {TASK_COLUMNS}"
                ),
                params![
                    update.status.as_str(),
                    update.staff_remarks.as_deref(),
                    update.manager_remarks.as_deref(),
                    id,
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("update_task: {e}")))?;

        let row = rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(format!("update_task row: {e}")))?;
        row.map(|row| row_to_task(&row)).transpose()
    }

    // ── Activity ────────────────────────────────────────────────────

    async fn append_activity(&self, entry: &NewActivity) -> Result<(), DatabaseError> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO activity_logs (user_email, action, details, task_id, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                entry.actor.as_str(),
                entry.action.as_str(),
                entry.detail.as_str(),
                entry.task_id,
                Utc::now().to_rfc3339(),
            ],
        )
        .await
        .map_err(|e| DatabaseError::Query(format!("append_activity: {e}")))?;
        Ok(())
    }

    async fn recent_activity(&self, limit: usize) -> Result<Vec<ActivityEntry>, DatabaseError> {
        let conn = self.conn();
        let mut rows = conn
            .query(
                &format!("SELECT {ACTIVITY_COLUMNS} FROM activity_logs ORDER BY id DESC LIMIT ?1"),
                params![i64::try_from(limit).unwrap_or(i64::MAX)],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("recent_activity: {e}")))?;

        let mut entries = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(format!("recent_activity row: {e}")))?
        {
            entries.push(row_to_activity(&row)?);
        }
        Ok(entries)
    }

    // ── Projects ────────────────────────────────────────────────────

    async fn upsert_projects(&self, projects: &[Project]) -> Result<usize, DatabaseError> {
        let conn = self.conn();
        let now = Utc::now().to_rfc3339();
        let mut written = 0;
        for project in projects {
            conn.execute(
                "INSERT INTO projects (name, status, target_date, description, client, synced_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6) \
                 ON CONFLICT(name) DO UPDATE SET \
                   status = excluded.status, \
                   target_date = excluded.target_date, \
                   description = excluded.description, \
                   client = excluded.client, \
                   synced_at = excluded.synced_at",
                params![
                    project.name.as_str(),
                    project.stage.as_str(),
                    project.target_date.as_str(),
                    project.description.as_str(),
                    project.client.as_str(),
                    now.as_str(),
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("upsert_projects ({}): {e}", project.name)))?;
            written += 1;
        }
        Ok(written)
    }

    async fn list_project_names(&self) -> Result<Vec<String>, DatabaseError> {
        let conn = self.conn();
        let mut rows = conn
            .query("SELECT name FROM projects ORDER BY name ASC", ())
            .await
            .map_err(|e| DatabaseError::Query(format!("list_project_names: {e}")))?;

        let mut names = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(format!("list_project_names row: {e}")))?
        {
            let name: String = row.get(0).unwrap_or_default();
            names.push(name);
        }
        Ok(names)
    }
}
