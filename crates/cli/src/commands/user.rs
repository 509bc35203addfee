//! User management commands.
//!
//! # Usage
//!
//! ```bash
//! crm-cli user create -n "Ada Lovelace" -e ada@example.com -p 'correct horse' -r admin
//! ```
//!
//! # Environment Variables
//!
//! Reads the same environment as the API server, since the password hash and
//! token settings come from it (`CRM_DATABASE_URL`, `CRM_TOKEN_SECRET`, ...).

use crm_api::config::ApiConfig;
use crm_api::services::AuthService;
use crm_core::{Email, UserId, UserRole};

use super::CommandError;

/// Create a user account.
///
/// # Errors
///
/// Returns an error if the role or email is invalid, the password is too
/// short, or the email is already registered.
pub async fn create(
    name: &str,
    email: &str,
    password: &str,
    role: &str,
) -> Result<UserId, CommandError> {
    let role: UserRole = role
        .parse()
        .map_err(|_| CommandError::InvalidRole(role.to_owned()))?;
    let email = Email::parse(email)?;

    let config = ApiConfig::from_env()?;
    let pool = crm_api::db::create_pool(&config.database_url).await?;

    tracing::info!("Creating user: {} ({})", email, role);
    let user = AuthService::new(&pool, &config)
        .create_user(name, &email, password, role)
        .await?;

    tracing::info!(
        "User created successfully! ID: {}, Email: {}, Role: {}",
        user.id,
        user.email,
        user.role
    );
    Ok(user.id)
}
