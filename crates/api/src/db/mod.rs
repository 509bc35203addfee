//! Database operations for the CRM `PostgreSQL` schema.
//!
//! # Schema: `crm`
//!
//! ## Tables
//!
//! - `users` / `access_tokens` - Accounts and hashed bearer tokens
//! - `companies`, `contacts`, `deals` - The sales pipeline
//! - `tasks`, `activities` - Follow-ups and logged interactions
//! - `products` - Catalog referenced by quote and invoice lines
//! - `quotes` / `quote_items` - Offers and their lines
//! - `invoices` / `invoice_items` / `payments` - Billing
//!
//! Every top-level table carries `owner_id`. List queries always filter on
//! it; single-record lookups take an optional owner scope.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/api/migrations/` and run via:
//! ```bash
//! cargo run -p crm-cli -- migrate
//! ```

pub mod activities;
pub mod companies;
pub mod contacts;
pub mod dashboard;
pub mod deals;
pub mod invoices;
mod line_items;
pub mod products;
pub mod quotes;
pub mod tasks;
pub mod tokens;
pub mod users;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use activities::{ActivityFilter, ActivityRepository};
pub use companies::CompanyRepository;
pub use contacts::ContactRepository;
pub use dashboard::DashboardRepository;
pub use deals::{DealFilter, DealRepository};
pub use invoices::InvoiceRepository;
pub use products::ProductRepository;
pub use quotes::QuoteRepository;
pub use tasks::{TaskFilter, TaskRepository};
pub use tokens::TokenRepository;
pub use users::UserRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Unique constraint violation on the named field.
    #[error("constraint violation: {0}")]
    Conflict(String),

    /// Foreign key points at a row that does not exist.
    #[error("invalid reference: {0}")]
    InvalidReference(String),
}

impl RepositoryError {
    /// Whether the error was caused by the submitted data rather than the server.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(self, Self::Conflict(_) | Self::InvalidReference(_))
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// One page of a list query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// 1-based page number.
    pub page: i64,
    pub per_page: i64,
}

impl PageRequest {
    /// Build a page request; pages below 1 are treated as the first page.
    #[must_use]
    pub fn new(page: Option<i64>, per_page: i64) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            per_page: per_page.max(1),
        }
    }

    /// Rows to skip.
    #[must_use]
    pub const fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.per_page)
    }
}

/// `ILIKE` pattern matching `term` anywhere, with wildcards in `term` escaped.
#[must_use]
pub fn contains_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.trim().chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

/// Map constraint violations on insert/update to field-level errors.
///
/// `table` is the unqualified table name, used to recover the column from
/// Postgres' default foreign key names (`<table>_<column>_fkey`).
pub(crate) fn map_write_error(err: sqlx::Error, table: &str) -> RepositoryError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            let field = match db_err.constraint() {
                Some("idx_users_email") => "email",
                Some("idx_products_code") => "code",
                Some("idx_quotes_number") => "quote_number",
                Some("idx_invoices_number") => "invoice_number",
                _ => "id",
            };
            return RepositoryError::Conflict(field.to_string());
        }

        if db_err.is_foreign_key_violation() {
            let column = db_err
                .constraint()
                .and_then(|c| c.strip_prefix(table))
                .and_then(|c| c.strip_prefix('_'))
                .and_then(|c| c.strip_suffix("_fkey"));
            if let Some(column) = column {
                return RepositoryError::InvalidReference(column.to_string());
            }
        }
    }
    RepositoryError::Database(err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_request_offset() {
        assert_eq!(PageRequest::new(None, 20).offset(), 0);
        assert_eq!(PageRequest::new(Some(3), 20).offset(), 40);
    }

    #[test]
    fn test_page_request_clamps_page() {
        assert_eq!(PageRequest::new(Some(0), 20).page, 1);
        assert_eq!(PageRequest::new(Some(-4), 20).page, 1);
    }

    #[test]
    fn test_contains_pattern_escapes_wildcards() {
        assert_eq!(contains_pattern("ada"), "%ada%");
        assert_eq!(contains_pattern(" 50%_off "), "%50\\%\\_off%");
    }

    #[test]
    fn test_client_errors() {
        assert!(RepositoryError::Conflict("code".into()).is_client_error());
        assert!(RepositoryError::InvalidReference("contact_id".into()).is_client_error());
        assert!(!RepositoryError::DataCorruption("bad row".into()).is_client_error());
    }
}
