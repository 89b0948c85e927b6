//! Activity log — append-only record of task mutations.
//!
//! Entries are written after the task mutation they describe has already
//! succeeded. Writing one is best-effort: a failed append is logged and
//! dropped, and the caller never sees it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::store::Database;

/// What happened to a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityAction {
    TaskCreated,
    TaskUpdated,
    TaskCompleted,
}

impl ActivityAction {
    /// Get the action label (matches serde tag).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TaskCreated => "task_created",
            Self::TaskUpdated => "task_updated",
            Self::TaskCompleted => "task_completed",
        }
    }
}

/// A persisted activity entry. Never mutated after insert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub id: i64,
    pub actor: String,
    /// Action label, e.g. `task_updated`.
    pub action: String,
    pub detail: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

/// An entry waiting to be appended. The timestamp is assigned on insert.
#[derive(Debug, Clone, PartialEq)]
pub struct NewActivity {
    pub actor: String,
    pub action: ActivityAction,
    pub detail: String,
    pub task_id: Option<i64>,
}

impl NewActivity {
    pub fn new(actor: impl Into<String>, action: ActivityAction, detail: impl Into<String>) -> Self {
        Self {
            actor: actor.into(),
            action,
            detail: detail.into(),
            task_id: None,
        }
    }

    /// Builder: link to the task this entry describes.
    pub fn for_task(mut self, task_id: i64) -> Self {
        self.task_id = Some(task_id);
        self
    }
}

/// Append `entry`, swallowing any failure.
pub async fn record_activity_best_effort(db: &dyn Database, entry: NewActivity) {
    match db.append_activity(&entry).await {
        Ok(()) => {
            debug!(actor = %entry.actor, action = entry.action.as_str(), "Activity recorded");
        }
        Err(e) => {
            warn!(
                actor = %entry.actor,
                action = entry.action.as_str(),
                error = %e,
                "Failed to record activity, continuing"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_label_matches_serde() {
        for action in [
            ActivityAction::TaskCreated,
            ActivityAction::TaskUpdated,
            ActivityAction::TaskCompleted,
        ] {
            let json = serde_json::to_string(&action).unwrap();
            assert_eq!(json, format!("\"{}\"", action.as_str()));
        }
    }

    #[test]
    fn new_activity_builder() {
        let entry = NewActivity::new("msk@rbsgo.com", ActivityAction::TaskCreated, "created #4")
            .for_task(4);
        assert_eq!(entry.task_id, Some(4));
        assert_eq!(entry.action, ActivityAction::TaskCreated);
    }

    #[test]
    fn entry_without_task_omits_field() {
        let entry = ActivityEntry {
            id: 1,
            actor: "msk@rbsgo.com".into(),
            action: "task_updated".into(),
            detail: "status → Open".into(),
            task_id: None,
            created_at: Utc::now(),
        };
        let json = serde_json::to_string(&entry).unwrap();
        assert!(!json.contains("\"task_id\""));
        assert!(json.contains("\"action\":\"task_updated\""));
    }
}
