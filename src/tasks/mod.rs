//! Command parsing, task operations, and list views.

pub mod activity;
pub mod model;
pub mod parser;
pub mod service;
pub mod views;

pub use activity::{ActivityAction, ActivityEntry, NewActivity, record_activity_best_effort};
pub use model::{NewTask, Priority, Task, TaskStatus, TaskUpdate};
pub use parser::{CommandParser, NameMatching, ParsedCommand};
pub use service::{TaskOptions, TaskService};
pub use views::{DueFilter, TaskView};
