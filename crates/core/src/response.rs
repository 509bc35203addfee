//! The JSON envelope every endpoint responds with.
//!
//! ```json
//! {"success": true, "message": "Contact created successfully", "data": {...}}
//! {"success": false, "message": "Validation error", "errors": {"email": ["..."]}}
//! ```
//!
//! List endpoints return a [`Page`], which is the same envelope with the
//! pagination counters next to `data`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Field name to validation messages, sorted by field.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// Uniform response wrapper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<FieldErrors>,
}

impl<T> ApiResponse<T> {
    /// Successful response carrying `data`.
    #[must_use]
    pub const fn data(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
            errors: None,
        }
    }

    /// Successful response carrying `data` and a human-readable message.
    #[must_use]
    pub fn with_message(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: Some(data),
            errors: None,
        }
    }
}

impl ApiResponse<()> {
    /// Successful response with only a message (e.g. deletes, logout).
    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: None,
            errors: None,
        }
    }

    /// Failed response.
    #[must_use]
    pub fn failure(message: impl Into<String>, errors: Option<FieldErrors>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            data: None,
            errors,
        }
    }
}

/// One page of a list endpoint.
///
/// Page numbers are 1-based. `from`/`to` are the 1-based positions of the
/// first and last row on the page and are absent for an empty page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub success: bool,
    pub data: Vec<T>,
    pub current_page: i64,
    pub per_page: i64,
    pub total: i64,
    pub last_page: i64,
    pub from: Option<i64>,
    pub to: Option<i64>,
}

impl<T> Page<T> {
    /// Assemble a page from the fetched rows and the total row count.
    #[must_use]
    pub fn new(data: Vec<T>, current_page: i64, per_page: i64, total: i64) -> Self {
        let per_page = per_page.max(1);
        let last_page = ((total + per_page - 1) / per_page).max(1);
        let len = i64::try_from(data.len()).unwrap_or(i64::MAX);
        let (from, to) = if len == 0 {
            (None, None)
        } else {
            let from = (current_page - 1) * per_page + 1;
            (Some(from), Some(from + len - 1))
        };

        Self {
            success: true,
            data,
            current_page,
            per_page,
            total,
            last_page,
            from,
            to,
        }
    }

    /// Transform every row while keeping the counters.
    #[must_use]
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            success: self.success,
            data: self.data.into_iter().map(f).collect(),
            current_page: self.current_page,
            per_page: self.per_page,
            total: self.total,
            last_page: self.last_page,
            from: self.from,
            to: self.to,
        }
    }
}
