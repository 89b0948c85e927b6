//! Named task views: board, active list, and the due-date diary.

use std::cmp::Ordering;
use std::str::FromStr;

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use super::model::Task;

/// Due-date focus for the diary view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DueFilter {
    /// Every active task.
    #[default]
    All,
    Today,
    Tomorrow,
    /// Due strictly before today.
    Overdue,
}

impl DueFilter {
    /// Whether a task due on `due` passes this filter. Undated tasks only
    /// show up under `All`.
    pub fn admits(&self, due: Option<NaiveDate>, today: NaiveDate) -> bool {
        match (self, due) {
            (Self::All, _) => true,
            (_, None) => false,
            (Self::Today, Some(d)) => d == today,
            (Self::Tomorrow, Some(d)) => today.checked_add_days(Days::new(1)) == Some(d),
            (Self::Overdue, Some(d)) => d < today,
        }
    }
}

impl FromStr for DueFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" | "" => Ok(Self::All),
            "today" => Ok(Self::Today),
            "tomorrow" => Ok(Self::Tomorrow),
            "overdue" => Ok(Self::Overdue),
            other => Err(format!("unknown filter '{other}'")),
        }
    }
}

/// Presentation policy applied to a task listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskView {
    /// Everything, newest first.
    Board,
    /// Everything except Completed, newest first.
    Active,
    /// Active tasks matching the filter, soonest due first then by priority.
    Diary(DueFilter),
}

impl TaskView {
    /// Filter and order `tasks` in place.
    pub fn apply(&self, tasks: &mut Vec<Task>, today: NaiveDate) {
        match self {
            Self::Board => {
                tasks.sort_by(|a, b| b.id.cmp(&a.id));
            }
            Self::Active => {
                tasks.retain(|t| t.status.is_active());
                tasks.sort_by(|a, b| b.id.cmp(&a.id));
            }
            Self::Diary(filter) => {
                tasks.retain(|t| t.status.is_active() && filter.admits(t.due_date, today));
                tasks.sort_by(diary_order);
            }
        }
    }
}

/// Due date ascending, then priority ascending; missing values sort last.
fn diary_order(a: &Task, b: &Task) -> Ordering {
    none_last(a.due_date, b.due_date)
        .then_with(|| none_last(a.priority, b.priority))
        .then_with(|| a.id.cmp(&b.id))
}

fn none_last<T: Ord>(a: Option<T>, b: Option<T>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
