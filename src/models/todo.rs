//! Microsoft To Do lists and tasks as read back from Graph.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A To Do task list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskList {
    pub id: String,
    pub display_name: String,
}

/// A To Do task. `due_date_time` is `None` for tasks without a due date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoTask {
    pub id: String,
    pub title: String,
    pub status: String,
    pub due_date_time: Option<NaiveDateTime>,
}

impl TodoTask {
    pub fn has_due_date(&self) -> bool {
        self.due_date_time.is_some()
    }
}
