use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crm_core::ActivityType;

use super::{INT_MAX, InputDocument};
use crate::validation::Validator;

/// Writable activity fields. Activities are created and deleted, never updated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityInput {
    #[serde(rename = "type")]
    pub kind: ActivityType,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    /// Minutes.
    #[serde(default)]
    pub duration: Option<i32>,
    #[serde(default)]
    pub participants: Option<Vec<serde_json::Value>>,
    #[serde(default)]
    pub related_to_type: Option<String>,
    #[serde(default)]
    pub related_to_id: Option<i64>,
    #[serde(default)]
    pub completed: Option<bool>,
}

impl InputDocument for ActivityInput {
    fn rules(v: &mut Validator) {
        v.field("type").required().one_of(&ActivityType::labels());
        v.field("title").required().string().max(255);
        v.field("description").string();
        v.field("due_date").datetime();
        v.field("duration").integer().between(0, INT_MAX);
        v.field("participants").array();
        v.field("related_to_type").string().max(255);
        v.field("related_to_id").integer();
        v.field("completed").boolean();
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
    fn test_type_required_and_checked() {
        let errors = ActivityInput::from_body(body(json!({"title": "Intro"}))).unwrap_err();
        assert_eq!(errors.get("type").unwrap(), ["The type field is required."]);

        let errors = ActivityInput::from_body(body(json!({"type": "lunch", "title": "Intro"}))).unwrap_err();
        assert_eq!(errors.get("type").unwrap(), ["The selected type is invalid."]);
    }

    #[test]
    fn test_participants_must_be_array() {
        let errors = ActivityInput::from_body(body(json!({
            "type": "meeting",
            "title": "Kickoff",
            "participants": "everyone",
        })))
        .unwrap_err();
        assert!(errors.has("participants"));
    }

    #[test]
    fn test_valid_activity() {
        let input = ActivityInput::from_body(body(json!({
            "type": "call",
            "title": "Discovery call",
            "duration": "30",
            "participants": ["grace@example.com", {"name": "Ada"}],
            "related_to_type": "contact",
            "related_to_id": 5,
            "completed": 1,
        })))
        .unwrap();

        assert_eq!(input.kind, ActivityType::Call);
        assert_eq!(input.duration, Some(30));
        assert_eq!(input.participants.unwrap().len(), 2);
        assert_eq!(input.completed, Some(true));
    }
}
