use serde::{Deserialize, Serialize};

use crm_core::models::Contact;
use crm_core::{CompanyId, Email};

use super::InputDocument;
use crate::validation::Validator;

/// Writable contact fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactInput {
    pub first_name: String,
    pub last_name: String,
    pub email: Email,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub mobile: Option<String>,
    #[serde(default)]
    pub company_id: Option<CompanyId>,
    #[serde(default)]
    pub lead_status: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
}

impl InputDocument for ContactInput {
    fn rules(v: &mut Validator) {
        v.field("first_name").required().string().max(255);
        v.field("last_name").required().string().max(255);
        v.field("email").required().string().email().max(255);
        v.field("phone").string().max(255);
        v.field("mobile").string().max(255);
        v.field("company_id").integer();
        v.field("lead_status").string().max(255);
        v.field("source").string().max(255);
        v.field("avatar").string();
    }
}

impl From<&Contact> for ContactInput {
    fn from(contact: &Contact) -> Self {
        Self {
            first_name: contact.first_name.clone(),
            last_name: contact.last_name.clone(),
            email: contact.email.clone(),
            phone: contact.phone.clone(),
            mobile: contact.mobile.clone(),
            company_id: contact.company_id,
            lead_status: contact.lead_status.clone(),
            source: contact.source.clone(),
            avatar: contact.avatar.clone(),
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

    fn stored() -> ContactInput {
        ContactInput::from_body(body(json!({
            "first_name": "Grace",
            "last_name": "Hopper",
            "email": "grace@example.com",
            "phone": "555-0100",
            "company_id": 4,
        })))
        .unwrap()
    }

    #[test]
    fn test_missing_required_fields() {
        let errors = ContactInput::from_body(body(json!({"phone": "555"}))).unwrap_err();
        assert_eq!(
            errors.get("first_name").unwrap(),
            ["The first name field is required."]
        );
        assert!(errors.has("last_name"));
        assert!(errors.has("email"));
    }

    #[test]
    fn test_owner_id_is_ignored() {
        let input = ContactInput::from_body(body(json!({
            "first_name": "Grace",
            "last_name": "Hopper",
            "email": "grace@example.com",
            "owner_id": 999,
        })))
        .unwrap();
        let value = serde_json::to_value(&input).unwrap();
        assert!(value.get("owner_id").is_none());
    }

    #[test]
    fn test_merge_overlays_supplied_fields_only() {
        let merged = stored()
            .merge(body(json!({"phone": "555-0199", "owner_id": 2, "id": 7})))
            .unwrap();

        assert_eq!(merged.phone.as_deref(), Some("555-0199"));
        assert_eq!(merged.first_name, "Grace");
        assert_eq!(merged.company_id, Some(CompanyId::new(4)));
    }

    #[test]
    fn test_merge_revalidates() {
        let errors = stored().merge(body(json!({"email": "nope"}))).unwrap_err();
        assert!(errors.has("email"));
    }

    #[test]
    fn test_merge_can_clear_optional_field() {
        let merged = stored().merge(body(json!({"company_id": null}))).unwrap();
        assert_eq!(merged.company_id, None);
    }
}
