//! Personal access token storage.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crm_core::{AccessTokenId, UserId};

use super::RepositoryError;

/// A stored token. Only the HMAC of the secret part is kept.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StoredToken {
    pub id: AccessTokenId,
    pub user_id: UserId,
    pub token_hash: String,
    pub expires_at: Option<DateTime<Utc>>,
}

impl StoredToken {
    /// Whether the token has passed its expiry.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// Repository for access tokens.
pub struct TokenRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> TokenRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Store a new token hash.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(
        &self,
        user_id: UserId,
        name: &str,
        token_hash: &str,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<AccessTokenId, RepositoryError> {
        let id = sqlx::query_scalar::<_, AccessTokenId>(
            "INSERT INTO crm.access_tokens (user_id, name, token_hash, expires_at)
             VALUES ($1, $2, $3, $4)
             RETURNING id",
        )
        .bind(user_id)
        .bind(name)
        .bind(token_hash)
        .bind(expires_at)
        .fetch_one(self.pool)
        .await?;

        Ok(id)
    }

    /// Look up a token by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: AccessTokenId) -> Result<Option<StoredToken>, RepositoryError> {
        let token = sqlx::query_as::<_, StoredToken>(
            "SELECT id, user_id, token_hash, expires_at
             FROM crm.access_tokens
             WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(token)
    }

    /// Record that the token was just used.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn touch(&self, id: AccessTokenId) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE crm.access_tokens SET last_used_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(())
    }

    /// Revoke a token.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn delete(&self, id: AccessTokenId) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM crm.access_tokens WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(())
    }
}
