//! Activities: calls, meetings, notes and emails logged against any record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::User;
use crate::types::{ActivityId, ActivityType, UserId};

/// A logged interaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct Activity {
    pub id: ActivityId,
    #[serde(rename = "type")]
    #[cfg_attr(feature = "postgres", sqlx(rename = "type"))]
    pub kind: ActivityType,
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    /// Duration in minutes.
    pub duration: Option<i32>,
    /// Free-form participant entries (names, emails or objects).
    #[cfg_attr(feature = "postgres", sqlx(json))]
    pub participants: Vec<serde_json::Value>,
    pub related_to_type: Option<String>,
    pub related_to_id: Option<i64>,
    pub owner_id: UserId,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An activity with its owner attached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityView {
    #[serde(flatten)]
    pub activity: Activity,
    pub owner: Option<User>,
}
