//! Client error type.

use crm_core::{ApiResponse, FieldErrors};
use reqwest::StatusCode;
use thiserror::Error;

/// Errors returned by [`crate::CrmClient`].
#[derive(Debug, Error)]
pub enum ClientError {
    /// HTTP request failed before a response arrived.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The base URL or an endpoint could not be built.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// The server answered with a failure envelope.
    ///
    /// `message` is the server's message, unchanged.
    #[error("{message}")]
    Api {
        status: u16,
        message: String,
        errors: Option<FieldErrors>,
    },

    /// A success response could not be decoded.
    #[error("Parse error: {0}")]
    Parse(String),

    /// A success envelope arrived without the `data` it should carry.
    #[error("Response carried no data")]
    MissingData,
}

impl ClientError {
    /// HTTP status of an API failure.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Validation messages for one field, empty unless this is a 422 naming it.
    #[must_use]
    pub fn field_errors(&self, field: &str) -> &[String] {
        match self {
            Self::Api {
                errors: Some(errors),
                ..
            } => errors.get(field).map_or(&[], Vec::as_slice),
            _ => &[],
        }
    }

    /// Whether the server rejected the bearer token.
    #[must_use]
    pub const fn is_unauthenticated(&self) -> bool {
        matches!(self, Self::Api { status: 401, .. })
    }
}

/// Turn a failed response body into [`ClientError::Api`].
///
/// Bodies that are not an envelope keep their text as the message, or the
/// status reason when empty.
pub(crate) fn decode_error(status: StatusCode, body: &str) -> ClientError {
    if let Ok(envelope) = serde_json::from_str::<ApiResponse<serde_json::Value>>(body)
        && let Some(message) = envelope.message
    {
        return ClientError::Api {
            status: status.as_u16(),
            message,
            errors: envelope.errors,
        };
    }

    let message = if body.trim().is_empty() {
        status
            .canonical_reason()
            .unwrap_or("Unknown error")
            .to_string()
    } else {
        body.trim().to_string()
    };

    ClientError::Api {
        status: status.as_u16(),
        message,
        errors: None,
    }
}
