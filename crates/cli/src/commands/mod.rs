//! Subcommand implementations.

pub mod migrate;
pub mod seed;
pub mod user;

use secrecy::SecretString;
use sqlx::PgPool;
use thiserror::Error;

use crm_api::db::RepositoryError;
use crm_api::services::AuthError;

/// Errors shared by the CLI commands.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Configuration error: {0}")]
    Config(#[from] crm_api::config::ConfigError),

    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("{0}")]
    Auth(#[from] AuthError),

    #[error("Invalid role: {0}. Valid roles: admin, user")]
    InvalidRole(String),

    #[error("Invalid email: {0}")]
    InvalidEmail(#[from] crm_core::EmailError),

    #[error("Failed to read {path}: {source}")]
    ReadFile {
        path: String,
        source: std::io::Error,
    },

    #[error("Invalid seed file: {0}")]
    SeedFormat(#[from] serde_yaml::Error),

    /// A seed record failed the same validation the API applies.
    #[error("Invalid {section} #{index}: {message}")]
    SeedRecord {
        section: &'static str,
        index: usize,
        message: String,
    },

    #[error("No user with email: {0}")]
    UnknownOwner(String),
}

/// `CRM_DATABASE_URL`, falling back to `DATABASE_URL`.
fn database_url() -> Result<SecretString, CommandError> {
    dotenvy::dotenv().ok();

    std::env::var("CRM_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| CommandError::MissingEnvVar("CRM_DATABASE_URL"))
}

async fn connect() -> Result<PgPool, CommandError> {
    let url = database_url()?;
    tracing::info!("Connecting to database...");
    Ok(crm_api::db::create_pool(&url).await?)
}
