//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! # Public
//! POST /auth/login                 - Exchange credentials for a token
//! POST /auth/register              - Create an account and log in
//!
//! # Bearer-authenticated
//! POST /auth/logout                - Revoke the current token
//! GET  /auth/user                  - Current user
//! GET  /dashboard                  - Aggregated stats
//! GET  /users                      - Assignment candidates
//! POST /upload/photo               - Multipart photo upload
//!
//! GET|POST        /{resource}      - List / create
//! GET|PUT|DELETE  /{resource}/{id} - Show / update / delete
//!   for contacts, companies, deals, tasks, products, quotes, invoices
//! GET|POST /activities, DELETE /activities/{id}
//!
//! PUT  /deals/{id}/stage           - Stage-only update
//! PUT  /tasks/{id}/complete        - Mark completed
//! POST /invoices/{id}/payments     - Record a payment
//! ```

pub mod activities;
pub mod auth;
pub mod companies;
pub mod contacts;
pub mod dashboard;
pub mod deals;
pub mod invoices;
pub mod products;
pub mod quotes;
pub mod tasks;
pub mod upload;
pub mod users;

use axum::{Json, Router, http::StatusCode};

use crm_core::ApiResponse;

use crate::state::AppState;

/// Successful JSON envelope.
pub type Envelope<T> = Json<ApiResponse<T>>;

/// `201 Created` with a message and the new record.
pub(crate) fn created<T>(message: &str, data: T) -> (StatusCode, Envelope<T>) {
    (
        StatusCode::CREATED,
        Json(ApiResponse::with_message(message, data)),
    )
}

/// Build the complete API router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(auth::router())
        .merge(dashboard::router())
        .merge(contacts::router())
        .merge(companies::router())
        .merge(deals::router())
        .merge(tasks::router())
        .merge(activities::router())
        .merge(products::router())
        .merge(quotes::router())
        .merge(invoices::router())
        .merge(users::router())
        .merge(upload::router())
}
