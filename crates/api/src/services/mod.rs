//! Business logic services for the CRM API.
//!
//! # Services
//!
//! - `auth` - Registration, login and bearer token verification
//! - `uploads` - Photo validation and local storage
//! - `views` - Relation loading for entity responses

pub mod auth;
pub mod uploads;
pub mod views;

pub use auth::{AuthError, AuthService, Authenticated};
pub use uploads::{PhotoUpload, UploadError, UploadService};
pub use views::RelationLoader;
