//! Login and registration bodies.

use serde::{Deserialize, Serialize};

use crm_core::Email;

use super::InputDocument;
use crate::validation::Validator;

/// `POST /auth/register`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterInput {
    pub name: String,
    pub email: Email,
    pub password: String,
}

impl InputDocument for RegisterInput {
    fn rules(v: &mut Validator) {
        v.field("name").required().string().max(255);
        v.field("email").required().string().email().max(255);
        v.field("password").required().string().min(6).confirmed();
    }
}

/// `POST /auth/login`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginInput {
    pub email: Email,
    pub password: String,
}

impl InputDocument for LoginInput {
    fn rules(v: &mut Validator) {
        v.field("email").required().string().email();
        v.field("password").required().string();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::{Value, json};

    use super::*;

    fn body(value: Value) -> serde_json::Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_register_requires_confirmation() {
        let errors = RegisterInput::from_body(body(json!({
            "name": "Ada",
            "email": "ada@example.com",
            "password": "secret1",
        })))
        .unwrap_err();

        assert_eq!(
            errors.get("password").unwrap(),
            ["The password field confirmation does not match."]
        );
    }

    #[test]
    fn test_register_short_password() {
        let errors = RegisterInput::from_body(body(json!({
            "name": "Ada",
            "email": "ada@example.com",
            "password": "abc",
            "password_confirmation": "abc",
        })))
        .unwrap_err();

        assert_eq!(
            errors.get("password").unwrap(),
            ["The password field must be at least 6 characters."]
        );
    }

    #[test]
    fn test_register_valid() {
        let input = RegisterInput::from_body(body(json!({
            "name": "Ada",
            "email": "ada@example.com",
            "password": "secret1",
            "password_confirmation": "secret1",
            "role": "admin",
        })))
        .unwrap();

        assert_eq!(input.email.as_str(), "ada@example.com");
    }

    #[test]
    fn test_login_malformed_email() {
        let errors = LoginInput::from_body(body(json!({
            "email": "not-an-email",
            "password": "x",
        })))
        .unwrap_err();

        assert_eq!(
            errors.get("email").unwrap(),
            ["The email field must be a valid email address."]
        );
    }
}
