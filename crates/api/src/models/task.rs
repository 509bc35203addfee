use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crm_core::models::Task;
use crm_core::{TaskPriority, TaskStatus, UserId};

use super::InputDocument;
use crate::validation::Validator;

/// Writable task fields. `assigned_to` defaults to the caller on create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskInput {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub due_date: NaiveDate,
    #[serde(default)]
    pub priority: Option<TaskPriority>,
    #[serde(default)]
    pub status: Option<TaskStatus>,
    #[serde(default)]
    pub related_to_type: Option<String>,
    #[serde(default)]
    pub related_to_id: Option<i64>,
    #[serde(default)]
    pub assigned_to: Option<UserId>,
    #[serde(default)]
    pub reminder: Option<DateTime<Utc>>,
}

impl InputDocument for TaskInput {
    fn rules(v: &mut Validator) {
        v.field("title").required().string().max(255);
        v.field("description").string();
        v.field("due_date").required().date();
        v.field("priority").one_of(&TaskPriority::labels());
        v.field("status").one_of(&TaskStatus::labels());
        v.field("related_to_type").string().max(255);
        v.field("related_to_id").integer();
        v.field("assigned_to").integer();
        v.field("reminder").datetime();
    }
}

impl From<&Task> for TaskInput {
    fn from(task: &Task) -> Self {
        Self {
            title: task.title.clone(),
            description: task.description.clone(),
            due_date: task.due_date,
            priority: Some(task.priority),
            status: Some(task.status),
            related_to_type: task.related_to_type.clone(),
            related_to_id: task.related_to_id,
            assigned_to: Some(task.assigned_to),
            reminder: task.reminder,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::{Map, Value, json};

    use super::*;

    fn body(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_title_and_due_date_required() {
        let errors = TaskInput::from_body(body(json!({}))).unwrap_err();
        assert_eq!(errors.get("title").unwrap(), ["The title field is required."]);
        assert_eq!(
            errors.get("due_date").unwrap(),
            ["The due date field is required."]
        );
    }

    #[test]
    fn test_priority_label_set() {
        let errors = TaskInput::from_body(body(json!({
            "title": "Call back",
            "due_date": "2026-10-20",
            "priority": "urgent",
        })))
        .unwrap_err();
        assert_eq!(
            errors.get("priority").unwrap(),
            ["The selected priority is invalid."]
        );
    }

    #[test]
    fn test_full_task() {
        let input = TaskInput::from_body(body(json!({
            "title": "Send proposal",
            "due_date": "2026-10-20T09:00:00.000Z",
            "priority": "high",
            "status": "in_progress",
            "assigned_to": "3",
            "related_to_type": "deal",
            "related_to_id": 12,
            "reminder": "2026-10-20 08:00:00",
        })))
        .unwrap();

        assert_eq!(input.due_date, NaiveDate::from_ymd_opt(2026, 10, 20).unwrap());
        assert_eq!(input.priority, Some(TaskPriority::High));
        assert_eq!(input.status, Some(TaskStatus::InProgress));
        assert_eq!(input.assigned_to, Some(UserId::new(3)));
        assert!(input.reminder.is_some());
    }
}
