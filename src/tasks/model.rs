//! Task data model: records, enums, and request payloads.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TaskError;

/// Lifecycle status. Any status may move to any other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskStatus {
    Open,
    #[serde(rename = "In Progress")]
    InProgress,
    #[serde(rename = "Pending Info")]
    PendingInfo,
    Completed,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 4] = [
        TaskStatus::Open,
        TaskStatus::InProgress,
        TaskStatus::PendingInfo,
        TaskStatus::Completed,
    ];

    /// Column value as stored in the `tasks` table.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "Open",
            Self::InProgress => "In Progress",
            Self::PendingInfo => "Pending Info",
            Self::Completed => "Completed",
        }
    }

    pub fn is_active(&self) -> bool {
        *self != Self::Completed
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = TaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| TaskError::UnknownStatus(s.to_string()))
    }
}

/// Task priority. Declaration order is sort order: `High` first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Low => "Low",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = TaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" => Ok(Self::High),
            "medium" => Ok(Self::Medium),
            "low" => Ok(Self::Low),
            _ => Err(TaskError::UnknownPriority(s.to_string())),
        }
    }
}

/// A persisted task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Database-assigned, increasing.
    pub id: i64,
    /// Who created the task. Never changes.
    pub created_by: String,
    /// Who is responsible for it.
    pub assigned_to: String,
    pub description: String,
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    /// Free-text project name; not checked against the project table.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_ref: Option<String>,
    pub staff_remarks: String,
    /// Reviewer remark, only the admin may write it.
    pub manager_remarks: String,
    pub created_at: DateTime<Utc>,
}

impl Task {
    /// Label used in the activity feed, e.g. `#12 "Fix API Error"`.
    pub fn label(&self) -> String {
        format!("#{} \"{}\"", self.id, self.description)
    }
}

/// Fields for inserting a new task. Status always starts at `Open`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTask {
    pub created_by: String,
    pub assigned_to: String,
    pub description: String,
    pub priority: Option<Priority>,
    pub due_date: Option<NaiveDate>,
    pub project_ref: Option<String>,
}

impl NewTask {
    pub fn new(
        created_by: impl Into<String>,
        assigned_to: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            created_by: created_by.into(),
            assigned_to: assigned_to.into(),
            description: description.into(),
            priority: None,
            due_date: None,
            project_ref: None,
        }
    }

    /// Builder: set priority.
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Builder: set due date.
    pub fn with_due_date(mut self, due: NaiveDate) -> Self {
        self.due_date = Some(due);
        self
    }

    /// Builder: set project reference.
    pub fn with_project(mut self, project: impl Into<String>) -> Self {
        self.project_ref = Some(project.into());
        self
    }
}

/// A field write against an existing task. `None` remarks are left alone.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskUpdate {
    pub status: TaskStatus,
    pub staff_remarks: Option<String>,
    pub manager_remarks: Option<String>,
}

impl TaskUpdate {
    pub fn status(status: TaskStatus) -> Self {
        Self {
            status,
            staff_remarks: None,
            manager_remarks: None,
        }
    }

    /// Builder: set the staff remark.
    pub fn with_staff_remarks(mut self, remarks: impl Into<String>) -> Self {
        self.staff_remarks = Some(remarks.into());
        self
    }

    /// Builder: set the reviewer remark.
    pub fn with_manager_remarks(mut self, remarks: impl Into<String>) -> Self {
        self.manager_remarks = Some(remarks.into());
        self
    }

    /// Human-readable summary for the activity log.
    pub fn describe(&self) -> String {
        let mut detail = format!("status → {}", self.status);
        if let Some(ref r) = self.staff_remarks {
            detail.push_str(&format!("; remark: {r}"));
        }
        if let Some(ref r) = self.manager_remarks {
            detail.push_str(&format!("; reviewer remark: {r}"));
        }
        detail
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_serde_uses_display_names() {
        let json = serde_json::to_string(&TaskStatus::InProgress).unwrap();
        assert_eq!(json, "\"In Progress\"");

        let parsed: TaskStatus = serde_json::from_str("\"Pending Info\"").unwrap();
        assert_eq!(parsed, TaskStatus::PendingInfo);
    }

    #[test]
    fn status_from_str_is_case_insensitive() {
        assert_eq!("completed".parse::<TaskStatus>().unwrap(), TaskStatus::Completed);
        assert_eq!(" in progress ".parse::<TaskStatus>().unwrap(), TaskStatus::InProgress);
        assert!(matches!(
            "Done".parse::<TaskStatus>(),
            Err(TaskError::UnknownStatus(_))
        ));
    }

    #[test]
    fn only_completed_is_inactive() {
        for status in TaskStatus::ALL {
            assert_eq!(status.is_active(), status != TaskStatus::Completed);
        }
    }

    #[test]
    fn priority_orders_high_first() {
        let mut p = vec![Priority::Low, Priority::High, Priority::Medium];
        p.sort();
        assert_eq!(p, vec![Priority::High, Priority::Medium, Priority::Low]);
        assert!(Some(Priority::Low) > None);
    }

    #[test]
    fn priority_from_str() {
        assert_eq!("HIGH".parse::<Priority>().unwrap(), Priority::High);
        assert!("urgent".parse::<Priority>().is_err());
    }

    #[test]
    fn new_task_builder() {
        let due = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let task = NewTask::new("a@rbsgo.com", "b@rbsgo.com", "Ship it")
            .with_priority(Priority::Medium)
            .with_due_date(due)
            .with_project("Billing API");
        assert_eq!(task.priority, Some(Priority::Medium));
        assert_eq!(task.due_date, Some(due));
        assert_eq!(task.project_ref.as_deref(), Some("Billing API"));
    }

    #[test]
    fn update_describe_lists_written_fields() {
        let update = TaskUpdate::status(TaskStatus::PendingInfo).with_staff_remarks("waiting on QA");
        assert_eq!(update.describe(), "status → Pending Info; remark: waiting on QA");

        let plain = TaskUpdate::status(TaskStatus::Open);
        assert_eq!(plain.describe(), "status → Open");
    }

    #[test]
    fn task_optional_fields_omitted() {
        let task = Task {
            id: 1,
            created_by: "a".into(),
            assigned_to: "a".into(),
            description: "T".into(),
            status: TaskStatus::Open,
            priority: None,
            due_date: None,
            project_ref: None,
            staff_remarks: String::new(),
            manager_remarks: String::new(),
            created_at: Utc::now(),
        };
        let json = serde_json::to_string(&task).unwrap();
        assert!(!json.contains("\"priority\""));
        assert!(!json.contains("\"due_date\""));
        assert!(!json.contains("\"project_ref\""));
        assert!(json.contains("\"status\":\"Open\""));
    }
}
