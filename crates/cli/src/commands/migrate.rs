//! Database migration commands.
//!
//! # Usage
//!
//! ```bash
//! crm-cli migrate
//! ```
//!
//! # Environment Variables
//!
//! - `CRM_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//!
//! # Migration Files
//!
//! Embedded from `crates/api/migrations/`:
//! ```text
//! migrations/
//! ├── 20260101000001_create_users.sql
//! ├── 20260101000002_create_crm_tables.sql
//! └── 20260101000003_create_sales_documents.sql
//! ```

use super::{CommandError, connect};

/// Apply every pending migration to the CRM schema.
///
/// # Errors
///
/// Returns an error if the database is unreachable or a migration fails.
pub async fn run() -> Result<(), CommandError> {
    let pool = connect().await?;

    tracing::info!("Running CRM migrations...");
    crm_api::MIGRATOR.run(&pool).await?;

    tracing::info!("CRM migrations complete!");
    Ok(())
}
