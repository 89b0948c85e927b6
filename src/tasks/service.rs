//! Task operations: create, list, update, complete.
//!
//! Every successful mutation appends exactly one activity entry through
//! [`record_activity_best_effort`]. Persistence errors are returned once and
//! never retried.

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{info, warn};

use super::activity::{ActivityAction, ActivityEntry, NewActivity, record_activity_best_effort};
use super::model::{NewTask, Priority, Task, TaskStatus, TaskUpdate};
use super::parser::CommandParser;
use super::views::TaskView;
use crate::auth::{Capability, Session, authorize};
use crate::error::TaskError;
use crate::store::Database;

/// Upper bound on one activity feed read.
pub const MAX_ACTIVITY_WINDOW: usize = 100;

/// Optional fields shared by both ways of creating a task.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskOptions {
    pub priority: Option<Priority>,
    /// Defaults to today when absent.
    pub due_date: Option<NaiveDate>,
    pub project_ref: Option<String>,
}

/// Task store operations over a [`Database`].
#[derive(Clone)]
pub struct TaskService {
    db: Arc<dyn Database>,
    parser: Arc<CommandParser>,
}

impl TaskService {
    pub fn new(db: Arc<dyn Database>, parser: CommandParser) -> Self {
        Self {
            db,
            parser: Arc::new(parser),
        }
    }

    pub fn parser(&self) -> &CommandParser {
        &self.parser
    }

    /// Create a task. The description must not be blank.
    pub async fn create(
        &self,
        creator: &str,
        assignee: &str,
        description: &str,
        options: TaskOptions,
        today: NaiveDate,
    ) -> Result<Task, TaskError> {
        let description = description.trim();
        if description.is_empty() {
            return Err(TaskError::EmptyDescription);
        }

        let mut new = NewTask::new(creator, assignee, description)
            .with_due_date(options.due_date.unwrap_or(today));
        if let Some(priority) = options.priority {
            new = new.with_priority(priority);
        }
        if let Some(project) = options.project_ref.filter(|p| !p.trim().is_empty()) {
            new = new.with_project(project.trim());
        }

        let task = self.db.insert_task(&new).await.map_err(|e| {
            warn!(creator = %creator, error = %e, "Failed to create task");
            TaskError::from(e)
        })?;
        info!(id = task.id, creator = %task.created_by, assignee = %task.assigned_to, "Task created");

        let detail = if task.created_by == task.assigned_to {
            format!("created {}", task.label())
        } else {
            format!("created {} for {}", task.label(), task.assigned_to)
        };
        record_activity_best_effort(
            self.db.as_ref(),
            NewActivity::new(creator, ActivityAction::TaskCreated, detail).for_task(task.id),
        )
        .await;

        Ok(task)
    }

    /// Parse a free-text command to pick the assignee, then create the task.
    pub async fn create_from_command(
        &self,
        creator: &str,
        command: &str,
        options: TaskOptions,
        today: NaiveDate,
    ) -> Result<Task, TaskError> {
        if command.trim().is_empty() {
            return Err(TaskError::EmptyDescription);
        }
        let parsed = self.parser.parse(command, creator);
        self.create(creator, &parsed.assignee, &parsed.description, options, today)
            .await
    }

    /// Tasks visible to `viewer`, shaped by `view`. Without `can_view_all`
    /// only tasks assigned to the viewer are returned.
    pub async fn list(
        &self,
        viewer: &str,
        can_view_all: bool,
        view: TaskView,
        today: NaiveDate,
    ) -> Result<Vec<Task>, TaskError> {
        let scope = if can_view_all { None } else { Some(viewer) };
        let mut tasks = self.db.list_tasks(scope).await.map_err(|e| {
            warn!(viewer = %viewer, error = %e, "Failed to list tasks");
            TaskError::from(e)
        })?;
        view.apply(&mut tasks, today);
        Ok(tasks)
    }

    /// Tasks visible to the session's identity and role.
    pub async fn list_for(
        &self,
        session: &Session,
        view: TaskView,
        today: NaiveDate,
    ) -> Result<Vec<Task>, TaskError> {
        self.list(
            &session.identity,
            session.can(Capability::ViewAllTasks),
            view,
            today,
        )
        .await
    }

    /// Overwrite status and any supplied remarks. Any status may follow any
    /// other. Writing the reviewer remark needs [`Capability::WriteReviewerRemark`].
    pub async fn update(
        &self,
        actor: &Session,
        task_id: i64,
        update: TaskUpdate,
    ) -> Result<Task, TaskError> {
        if update.manager_remarks.is_some() {
            authorize(actor, Capability::WriteReviewerRemark)?;
        }
        self.apply_update(&actor.identity, task_id, update, ActivityAction::TaskUpdated)
            .await
    }

    /// Mark a task Completed without touching its remarks.
    pub async fn complete(&self, actor: &Session, task_id: i64) -> Result<Task, TaskError> {
        self.apply_update(
            &actor.identity,
            task_id,
            TaskUpdate::status(TaskStatus::Completed),
            ActivityAction::TaskCompleted,
        )
        .await
    }

    async fn apply_update(
        &self,
        actor: &str,
        task_id: i64,
        update: TaskUpdate,
        action: ActivityAction,
    ) -> Result<Task, TaskError> {
        let task = self
            .db
            .update_task(task_id, &update)
            .await
            .map_err(|e| {
                warn!(id = task_id, error = %e, "Failed to update task");
                TaskError::from(e)
            })?
            .ok_or(TaskError::NotFound { id: task_id })?;
        info!(id = task_id, actor = %actor, status = %task.status, "Task updated");

        record_activity_best_effort(
            self.db.as_ref(),
            NewActivity::new(actor, action, format!("{}: {}", task.label(), update.describe()))
                .for_task(task_id),
        )
        .await;

        Ok(task)
    }

    /// The most recent activity entries, newest first. At most
    /// [`MAX_ACTIVITY_WINDOW`] entries are returned whatever `limit` asks for.
    pub async fn recent_activity(&self, limit: usize) -> Result<Vec<ActivityEntry>, TaskError> {
        Ok(self
            .db
            .recent_activity(limit.min(MAX_ACTIVITY_WINDOW))
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use uuid::Uuid;

    use super::*;
    use crate::auth::Role;
    use crate::config::DEFAULT_TEAM;
    use crate::error::DatabaseError;
    use crate::projects::model::Project;
    use crate::store::LibSqlBackend;
    use crate::tasks::parser::NameMatching;
    use crate::tasks::views::DueFilter;

    /// Wraps the in-memory backend and fails selected calls.
    struct FaultyDb {
        inner: LibSqlBackend,
        fail_activity: bool,
        fail_tasks: bool,
        fail_lookup: bool,
    }

    impl FaultyDb {
        fn err(op: &str) -> DatabaseError {
            DatabaseError::Query(format!("{op}: connection reset"))
        }
    }

    #[async_trait]
    impl Database for FaultyDb {
        async fn init_schema(&self) -> Result<(), DatabaseError> {
            self.inner.init_schema().await
        }
        async fn insert_task(&self, task: &NewTask) -> Result<Task, DatabaseError> {
            if self.fail_tasks {
                return Err(Self::err("insert_task"));
            }
            self.inner.insert_task(task).await
        }
        async fn get_task(&self, id: i64) -> Result<Option<Task>, DatabaseError> {
            if self.fail_lookup {
                return Err(Self::err("get_task"));
            }
            self.inner.get_task(id).await
        }
        async fn list_tasks(&self, assignee: Option<&str>) -> Result<Vec<Task>, DatabaseError> {
            if self.fail_tasks {
                return Err(Self::err("list_tasks"));
            }
            self.inner.list_tasks(assignee).await
        }
        async fn update_task(
            &self,
            id: i64,
            update: &TaskUpdate,
        ) -> Result<Option<Task>, DatabaseError> {
            if self.fail_tasks {
                return Err(Self::err("update_task"));
            }
            self.inner.update_task(id, update).await
        }
        async fn append_activity(&self, entry: &NewActivity) -> Result<(), DatabaseError> {
            if self.fail_activity {
                return Err(Self::err("append_activity"));
            }
            self.inner.append_activity(entry).await
        }
        async fn recent_activity(&self, limit: usize) -> Result<Vec<ActivityEntry>, DatabaseError> {
            self.inner.recent_activity(limit).await
        }
        async fn upsert_projects(&self, projects: &[Project]) -> Result<usize, DatabaseError> {
            self.inner.upsert_projects(projects).await
        }
        async fn list_project_names(&self) -> Result<Vec<String>, DatabaseError> {
            self.inner.list_project_names().await
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 5, 10).unwrap()
    }

    fn parser() -> CommandParser {
        CommandParser::new(DEFAULT_TEAM, NameMatching::Substring)
    }

    async fn service() -> TaskService {
        let db: Arc<dyn Database> = Arc::new(LibSqlBackend::new_memory().await.unwrap());
        TaskService::new(db, parser())
    }

    async fn faulty_service(fail_activity: bool, fail_tasks: bool, fail_lookup: bool) -> TaskService {
        let db: Arc<dyn Database> = Arc::new(FaultyDb {
            inner: LibSqlBackend::new_memory().await.unwrap(),
            fail_activity,
            fail_tasks,
            fail_lookup,
        });
        TaskService::new(db, parser())
    }

    fn session(identity: &str, role: Role) -> Session {
        Session {
            token: Uuid::new_v4(),
            identity: identity.into(),
            role,
            filter: DueFilter::All,
        }
    }

    fn member(identity: &str) -> Session {
        session(identity, Role::Member)
    }

    fn admin() -> Session {
        session("msk@rbsgo.com", Role::Admin)
    }

    #[tokio::test]
    async fn create_sets_open_and_defaults_due_to_today() {
        let svc = service().await;
        let task = svc
            .create("arjun@rbsgo.com", "arjun@rbsgo.com", "  Fix API Error ", TaskOptions::default(), today())
            .await
            .unwrap();
        assert_eq!(task.status, TaskStatus::Open);
        assert_eq!(task.description, "Fix API Error");
        assert_eq!(task.due_date, Some(today()));
        assert!(task.staff_remarks.is_empty());
        assert!(task.manager_remarks.is_empty());
    }

    #[tokio::test]
    async fn create_rejects_blank_description() {
        let svc = service().await;
        let err = svc
            .create("a@rbsgo.com", "a@rbsgo.com", "   ", TaskOptions::default(), today())
            .await
            .unwrap_err();
        assert!(matches!(err, TaskError::EmptyDescription));
    }

    #[tokio::test]
    async fn create_keeps_options() {
        let svc = service().await;
        let due = NaiveDate::from_ymd_opt(2026, 6, 1).unwrap();
        let options = TaskOptions {
            priority: Some(Priority::High),
            due_date: Some(due),
            project_ref: Some(" Payments ".into()),
        };
        let task = svc
            .create("msk@rbsgo.com", "sarah@rbsgo.com", "Review", options, today())
            .await
            .unwrap();
        assert_eq!(task.priority, Some(Priority::High));
        assert_eq!(task.due_date, Some(due));
        assert_eq!(task.project_ref.as_deref(), Some("Payments"));
    }

    #[tokio::test]
    async fn command_assigns_named_teammate() {
        let svc = service().await;
        let task = svc
            .create_from_command(
                "msk@rbsgo.com",
                "Ask Praveen to prepare the EOD report",
                TaskOptions::default(),
                today(),
            )
            .await
            .unwrap();
        assert_eq!(task.created_by, "msk@rbsgo.com");
        assert_eq!(task.assigned_to, "praveen@rbsgo.com");
        assert_eq!(task.description, "prepare the EOD report");
    }

    #[tokio::test]
    async fn command_without_teammate_assigns_self() {
        let svc = service().await;
        let task = svc
            .create_from_command("arjun@rbsgo.com", "Fix API Error", TaskOptions::default(), today())
            .await
            .unwrap();
        assert_eq!(task.assigned_to, "arjun@rbsgo.com");
        assert_eq!(task.description, "Fix API Error");
    }

    #[tokio::test]
    async fn command_that_is_only_a_name_is_rejected() {
        let svc = service().await;
        let err = svc
            .create_from_command("msk@rbsgo.com", "ask sarah", TaskOptions::default(), today())
            .await
            .unwrap_err();
        assert!(matches!(err, TaskError::EmptyDescription));
    }

    #[tokio::test]
    async fn member_list_is_assignee_scoped() {
        let svc = service().await;
        let own = svc
            .create("arjun@rbsgo.com", "arjun@rbsgo.com", "Mine", TaskOptions::default(), today())
            .await
            .unwrap();
        svc.create("arjun@rbsgo.com", "sarah@rbsgo.com", "Hers", TaskOptions::default(), today())
            .await
            .unwrap();

        let arjun = svc
            .list_for(&member("arjun@rbsgo.com"), TaskView::Board, today())
            .await
            .unwrap();
        assert_eq!(arjun.len(), 1);
        assert_eq!(arjun[0].id, own.id);

        let everything = svc.list_for(&admin(), TaskView::Board, today()).await.unwrap();
        assert_eq!(everything.len(), 2);
    }

    #[tokio::test]
    async fn completed_leaves_active_view_but_not_board() {
        let svc = service().await;
        let task = svc
            .create("msk@rbsgo.com", "msk@rbsgo.com", "Close books", TaskOptions::default(), today())
            .await
            .unwrap();

        svc.update(&admin(), task.id, TaskUpdate::status(TaskStatus::Completed))
            .await
            .unwrap();

        let active = svc.list_for(&admin(), TaskView::Active, today()).await.unwrap();
        assert!(active.iter().all(|t| t.id != task.id));
        let diary = svc
            .list_for(&admin(), TaskView::Diary(DueFilter::All), today())
            .await
            .unwrap();
        assert!(diary.is_empty());
        let board = svc.list_for(&admin(), TaskView::Board, today()).await.unwrap();
        assert_eq!(board.iter().filter(|t| t.id == task.id).count(), 1);
    }

    #[tokio::test]
    async fn any_transition_is_allowed_and_each_is_logged() {
        let svc = service().await;
        let actor = member("arjun@rbsgo.com");
        let task = svc
            .create("arjun@rbsgo.com", "arjun@rbsgo.com", "Deploy", TaskOptions::default(), today())
            .await
            .unwrap();

        let done = svc
            .update(&actor, task.id, TaskUpdate::status(TaskStatus::Completed))
            .await
            .unwrap();
        assert_eq!(done.status, TaskStatus::Completed);
        let reopened = svc
            .update(&actor, task.id, TaskUpdate::status(TaskStatus::Open))
            .await
            .unwrap();
        assert_eq!(reopened.status, TaskStatus::Open);

        let activity = svc.recent_activity(10).await.unwrap();
        assert_eq!(activity.len(), 3);
        let mutations = activity
            .iter()
            .filter(|e| e.action != ActivityAction::TaskCreated.as_str())
            .count();
        assert_eq!(mutations, 2);
        assert!(activity.iter().all(|e| e.task_id == Some(task.id)));
    }

    #[tokio::test]
    async fn update_overwrites_supplied_remarks_only() {
        let svc = service().await;
        let task = svc
            .create("msk@rbsgo.com", "arjun@rbsgo.com", "Audit", TaskOptions::default(), today())
            .await
            .unwrap();

        svc.update(
            &admin(),
            task.id,
            TaskUpdate::status(TaskStatus::InProgress).with_manager_remarks("Priority for Friday"),
        )
        .await
        .unwrap();
        let updated = svc
            .update(
                &member("arjun@rbsgo.com"),
                task.id,
                TaskUpdate::status(TaskStatus::PendingInfo).with_staff_remarks("Need access"),
            )
            .await
            .unwrap();

        assert_eq!(updated.staff_remarks, "Need access");
        assert_eq!(updated.manager_remarks, "Priority for Friday");
        assert_eq!(updated.created_by, "msk@rbsgo.com");
    }

    #[tokio::test]
    async fn member_cannot_write_reviewer_remark() {
        let svc = service().await;
        let task = svc
            .create("arjun@rbsgo.com", "arjun@rbsgo.com", "Audit", TaskOptions::default(), today())
            .await
            .unwrap();

        let err = svc
            .update(
                &member("arjun@rbsgo.com"),
                task.id,
                TaskUpdate::status(TaskStatus::Open).with_manager_remarks("looks good"),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, TaskError::Auth(_)));

        let unchanged = svc.list_for(&admin(), TaskView::Board, today()).await.unwrap();
        assert_eq!(unchanged[0].manager_remarks, "");
        // Only the create entry.
        assert_eq!(svc.recent_activity(10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn complete_keeps_remarks() {
        let svc = service().await;
        let actor = member("sarah@rbsgo.com");
        let task = svc
            .create("sarah@rbsgo.com", "sarah@rbsgo.com", "Draft", TaskOptions::default(), today())
            .await
            .unwrap();
        svc.update(&actor, task.id, TaskUpdate::status(TaskStatus::InProgress).with_staff_remarks("half done"))
            .await
            .unwrap();

        let done = svc.complete(&actor, task.id).await.unwrap();
        assert_eq!(done.status, TaskStatus::Completed);
        assert_eq!(done.staff_remarks, "half done");

        let latest = &svc.recent_activity(1).await.unwrap()[0];
        assert_eq!(latest.action, "task_completed");
    }

    #[tokio::test]
    async fn unknown_task_is_not_found() {
        let svc = service().await;
        let err = svc.complete(&admin(), 404).await.unwrap_err();
        assert!(matches!(err, TaskError::NotFound { id: 404 }));
        assert!(svc.recent_activity(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn activity_failure_does_not_fail_mutation() {
        let svc = faulty_service(true, false, false).await;
        let task = svc
            .create("arjun@rbsgo.com", "arjun@rbsgo.com", "Fix API Error", TaskOptions::default(), today())
            .await
            .unwrap();
        let updated = svc
            .update(&member("arjun@rbsgo.com"), task.id, TaskUpdate::status(TaskStatus::InProgress))
            .await
            .unwrap();
        assert_eq!(updated.status, TaskStatus::InProgress);
        assert!(svc.recent_activity(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn write_failure_is_surfaced_without_activity() {
        let svc = faulty_service(false, true, false).await;
        let err = svc
            .create("arjun@rbsgo.com", "arjun@rbsgo.com", "Fix", TaskOptions::default(), today())
            .await
            .unwrap_err();
        assert!(matches!(err, TaskError::Database(_)));
        assert!(svc.recent_activity(10).await.unwrap().is_empty());

        let err = svc
            .list_for(&admin(), TaskView::Board, today())
            .await
            .unwrap_err();
        assert!(matches!(err, TaskError::Database(_)));
    }

    #[tokio::test]
    async fn update_does_not_depend_on_a_separate_read() {
        let svc = faulty_service(false, false, true).await;
        let actor = member("arjun@rbsgo.com");
        let task = svc
            .create("arjun@rbsgo.com", "arjun@rbsgo.com", "Rotate keys", TaskOptions::default(), today())
            .await
            .unwrap();

        let updated = svc
            .update(&actor, task.id, TaskUpdate::status(TaskStatus::InProgress).with_staff_remarks("halfway"))
            .await
            .unwrap();
        assert_eq!(updated.status, TaskStatus::InProgress);
        assert_eq!(updated.staff_remarks, "halfway");
        let done = svc.complete(&actor, task.id).await.unwrap();
        assert_eq!(done.status, TaskStatus::Completed);

        let actions: Vec<String> = svc
            .recent_activity(10)
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.action)
            .collect();
        assert_eq!(actions, vec!["task_completed", "task_updated", "task_created"]);
    }

    #[tokio::test]
    async fn activity_reads_are_capped() {
        let svc = service().await;
        for i in 0..MAX_ACTIVITY_WINDOW + 5 {
            svc.create("sarah@rbsgo.com", "sarah@rbsgo.com", &format!("task {i}"), TaskOptions::default(), today())
                .await
                .unwrap();
        }
        assert_eq!(svc.recent_activity(usize::MAX).await.unwrap().len(), MAX_ACTIVITY_WINDOW);
        assert_eq!(svc.recent_activity(3).await.unwrap().len(), 3);
    }
}
