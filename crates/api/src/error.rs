//! Unified error handling with Sentry integration.
//!
//! Every handler returns `Result<T, AppError>`. Errors render as the failure
//! envelope (`{"success": false, "message": ..., "errors": ...}`); server
//! errors are captured to Sentry first and never expose their details.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crm_core::{ApiResponse, FieldErrors};

use crate::db::RepositoryError;
use crate::services::auth::AuthError;
use crate::services::uploads::UploadError;
use crate::validation::ValidationErrors;

/// Application-level error type for the API.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Request body failed validation.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationErrors),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Photo upload failed.
    #[error("Upload error: {0}")]
    Upload(#[from] UploadError),

    /// Resource not found (message is shown to the client).
    #[error("{0}")]
    NotFound(String),

    /// Missing or invalid bearer token.
    #[error("Unauthenticated.")]
    Unauthenticated,

    /// Bad request from client.
    #[error("{0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// `404` with `"<entity> not found"`.
    #[must_use]
    pub fn not_found(entity: &str) -> Self {
        Self::NotFound(format!("{entity} not found"))
    }

    fn is_server_error(&self) -> bool {
        match self {
            Self::Database(err) => !err.is_client_error(),
            Self::Internal(_) => true,
            Self::Auth(err) => err.is_internal(),
            Self::Upload(err) => err.is_internal(),
            _ => false,
        }
    }

    fn status(&self) -> StatusCode {
        if self.is_server_error() {
            return StatusCode::INTERNAL_SERVER_ERROR;
        }
        match self {
            Self::Validation(_) | Self::Database(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Auth(AuthError::UserAlreadyExists) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Auth(_) | Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::Upload(err) if err.is_validation() => StatusCode::UNPROCESSABLE_ENTITY,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::BAD_REQUEST,
        }
    }

    /// Client-facing message and per-field errors.
    fn body(&self) -> (String, Option<FieldErrors>) {
        if self.is_server_error() {
            return ("Internal server error".to_string(), None);
        }
        match self {
            Self::Validation(errors) => (
                "Validation error".to_string(),
                Some(errors.clone().into_inner()),
            ),
            Self::Database(RepositoryError::Conflict(field)) => {
                let errors = ValidationErrors::single(field, taken_message(field));
                ("Validation error".to_string(), Some(errors.into_inner()))
            }
            Self::Database(RepositoryError::InvalidReference(field)) => {
                let message = format!("The selected {} is invalid.", field.replace('_', " "));
                let errors = ValidationErrors::single(field, message);
                ("Validation error".to_string(), Some(errors.into_inner()))
            }
            Self::Auth(AuthError::UserAlreadyExists) => {
                let errors = ValidationErrors::single("email", taken_message("email"));
                ("Validation error".to_string(), Some(errors.into_inner()))
            }
            Self::Auth(AuthError::InvalidCredentials) => ("Invalid credentials".to_string(), None),
            Self::Auth(_) | Self::Unauthenticated => ("Unauthenticated.".to_string(), None),
            Self::Upload(err) if err.is_validation() => {
                let errors = ValidationErrors::single("photo", err.to_string());
                ("Validation error".to_string(), Some(errors.into_inner()))
            }
            Self::Upload(err) => (err.to_string(), None),
            _ => (self.to_string(), None),
        }
    }
}

fn taken_message(field: &str) -> String {
    format!("The {} has already been taken.", field.replace('_', " "))
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if self.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let status = self.status();
        let (message, errors) = self.body();
        (status, Json(ApiResponse::failure(message, errors))).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context for the authenticated caller.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::to_bytes;
    use serde_json::{Value, json};

    use super::*;

    async fn render(err: AppError) -> (StatusCode, Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_validation_error_renders_field_messages() {
        let mut errors = ValidationErrors::new();
        errors.add("first_name", "The first name field is required.");
        let (status, body) = render(AppError::Validation(errors)).await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["success"], json!(false));
        assert_eq!(body["message"], json!("Validation error"));
        assert_eq!(
            body["errors"]["first_name"][0],
            json!("The first name field is required.")
        );
    }

    #[tokio::test]
    async fn test_not_found_message() {
        let (status, body) = render(AppError::not_found("Contact")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], json!("Contact not found"));
        assert!(body.get("errors").is_none());
    }

    #[tokio::test]
    async fn test_unauthenticated() {
        let (status, body) = render(AppError::Unauthenticated).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], json!("Unauthenticated."));
    }

    #[tokio::test]
    async fn test_invalid_credentials() {
        let (status, body) = render(AppError::Auth(AuthError::InvalidCredentials)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], json!("Invalid credentials"));
    }

    #[tokio::test]
    async fn test_duplicate_email_is_validation_error() {
        let (status, body) = render(AppError::Auth(AuthError::UserAlreadyExists)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            body["errors"]["email"][0],
            json!("The email has already been taken.")
        );
    }

    #[tokio::test]
    async fn test_conflict_maps_to_field() {
        let err = AppError::Database(RepositoryError::Conflict("quote_number".to_string()));
        let (status, body) = render(err).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            body["errors"]["quote_number"][0],
            json!("The quote number has already been taken.")
        );
    }

    #[tokio::test]
    async fn test_invalid_reference_maps_to_field() {
        let err = AppError::Database(RepositoryError::InvalidReference("contact_id".to_string()));
        let (status, body) = render(err).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            body["errors"]["contact_id"][0],
            json!("The selected contact id is invalid.")
        );
    }

    #[tokio::test]
    async fn test_internal_error_hides_details() {
        let err = AppError::Internal("disk on fire at /var/lib".to_string());
        let (status, body) = render(err).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], json!("Internal server error"));
    }

    #[tokio::test]
    async fn test_database_error_hides_details() {
        let err = AppError::Database(RepositoryError::DataCorruption("bad row".to_string()));
        let (status, body) = render(err).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], json!("Internal server error"));
    }

    #[tokio::test]
    async fn test_empty_upload_is_bad_request() {
        let (status, body) = render(AppError::Upload(UploadError::NoPhoto)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], json!("No photo uploaded"));
    }

    #[test]
    fn test_error_display() {
        let err = AppError::BadRequest("Invalid JSON".to_string());
        assert_eq!(err.to_string(), "Invalid JSON");

        let err = AppError::not_found("Deal");
        assert_eq!(err.to_string(), "Deal not found");
    }
}
