//! User accounts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{Email, UserId, UserRole};

/// A user account. The password hash never leaves the database layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: Email,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Result of a successful login or registration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthPayload {
    pub user: User,
    /// Bearer token for the `Authorization` header.
    pub token: String,
}

/// Result of a photo upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedPhoto {
    /// Public URL of the stored file.
    pub url: String,
    /// Path relative to the upload root, e.g. `uploads/1704067200_face.png`.
    pub path: String,
}
