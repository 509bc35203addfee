//! Tasks (to-dos with a due date).

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::User;
use crate::types::{TaskId, TaskPriority, TaskStatus, UserId};

/// A to-do assigned to a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub description: Option<String>,
    pub due_date: NaiveDate,
    pub priority: TaskPriority,
    pub status: TaskStatus,
    /// Polymorphic link, e.g. `("deal", 12)`.
    pub related_to_type: Option<String>,
    pub related_to_id: Option<i64>,
    pub assigned_to: UserId,
    pub owner_id: UserId,
    pub reminder: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A task with the assigned user and owner attached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskView {
    #[serde(flatten)]
    pub task: Task,
    pub assignee: Option<User>,
    pub owner: Option<User>,
}
