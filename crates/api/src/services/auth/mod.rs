//! Authentication service.
//!
//! Passwords are hashed with Argon2. Bearer tokens have the form
//! `<token id>|<40 alphanumeric characters>`; only an HMAC-SHA256 of the
//! random part (keyed by `CRM_TOKEN_SECRET`) is stored, so a database leak
//! does not leak usable tokens.

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::Utc;
use hmac::{Hmac, Mac};
use rand::Rng;
use rand::distr::Alphanumeric;
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use sqlx::PgPool;

use crm_core::models::{AuthPayload, User};
use crm_core::{AccessTokenId, Email, UserRole};

use crate::config::ApiConfig;
use crate::db::{RepositoryError, TokenRepository, UserRepository};
use crate::models::{LoginInput, RegisterInput};

/// Minimum password length.
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Length of the random part of a bearer token.
const TOKEN_SECRET_LENGTH: usize = 40;

/// Name recorded for tokens issued by login and registration.
const TOKEN_NAME: &str = "auth-token";

type HmacSha256 = Hmac<Sha256>;

/// The user behind an authenticated request.
#[derive(Debug, Clone)]
pub struct Authenticated {
    pub user: User,
    pub token_id: AccessTokenId,
}

/// Authentication service.
///
/// Handles registration, login, token issue and token verification.
pub struct AuthService<'a> {
    users: UserRepository<'a>,
    tokens: TokenRepository<'a>,
    config: &'a ApiConfig,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(pool: &'a PgPool, config: &'a ApiConfig) -> Self {
        Self {
            users: UserRepository::new(pool),
            tokens: TokenRepository::new(pool),
            config,
        }
    }

    // =========================================================================
    // Accounts
    // =========================================================================

    /// Register a `user`-role account and log it in.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserAlreadyExists` if the email is taken.
    pub async fn register(&self, input: &RegisterInput) -> Result<AuthPayload, AuthError> {
        let user = self
            .create_user(&input.name, &input.email, &input.password, UserRole::User)
            .await?;
        let token = self.issue_token(&user).await?;

        tracing::info!(user_id = %user.id, "User registered");
        Ok(AuthPayload { user, token })
    }

    /// Create an account with the given role.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::WeakPassword` if the password is too short.
    /// Returns `AuthError::UserAlreadyExists` if the email is taken.
    pub async fn create_user(
        &self,
        name: &str,
        email: &Email,
        password: &str,
        role: UserRole,
    ) -> Result<User, AuthError> {
        if password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(AuthError::WeakPassword(format!(
                "Password must be at least {MIN_PASSWORD_LENGTH} characters"
            )));
        }

        if self.users.get_by_email(email).await?.is_some() {
            return Err(AuthError::UserAlreadyExists);
        }

        let password_hash = hash_password(password)?;

        self.users
            .create(name, email, &password_hash, role)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })
    }

    /// Verify credentials and issue a token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email is unknown or the
    /// password does not match.
    pub async fn login(&self, input: &LoginInput) -> Result<AuthPayload, AuthError> {
        let (user, password_hash) = self
            .users
            .get_with_password_hash(&input.email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(&input.password, &password_hash)?;

        let token = self.issue_token(&user).await?;

        tracing::info!(user_id = %user.id, "User logged in");
        Ok(AuthPayload { user, token })
    }

    // =========================================================================
    // Tokens
    // =========================================================================

    /// Issue a new bearer token for `user`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Repository` if the token cannot be stored.
    pub async fn issue_token(&self, user: &User) -> Result<String, AuthError> {
        let secret = generate_token_secret();
        let token_hash = hash_token(&self.config.token_secret, &secret)?;
        let expires_at = self.config.token_ttl.map(|ttl| Utc::now() + ttl);

        let id = self
            .tokens
            .create(user.id, TOKEN_NAME, &token_hash, expires_at)
            .await?;

        Ok(format!("{id}|{secret}"))
    }

    /// Resolve a bearer token to its user, recording the use.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidToken` if the token is malformed, unknown,
    /// revoked or does not verify.
    /// Returns `AuthError::TokenExpired` if the token is past its expiry.
    pub async fn authenticate(&self, bearer: &str) -> Result<Authenticated, AuthError> {
        let (id, secret) = parse_token(bearer).ok_or(AuthError::InvalidToken)?;

        let stored = self.tokens.get(id).await?.ok_or(AuthError::InvalidToken)?;

        if !verify_token(&self.config.token_secret, secret, &stored.token_hash)? {
            return Err(AuthError::InvalidToken);
        }

        if stored.is_expired(Utc::now()) {
            return Err(AuthError::TokenExpired);
        }

        let user = self
            .users
            .get_by_id(stored.user_id)
            .await?
            .ok_or(AuthError::InvalidToken)?;

        self.tokens.touch(stored.id).await?;

        Ok(Authenticated {
            user,
            token_id: stored.id,
        })
    }

    /// Revoke one token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Repository` if the delete fails.
    pub async fn logout(&self, token_id: AccessTokenId) -> Result<(), AuthError> {
        self.tokens.delete(token_id).await?;
        Ok(())
    }
}

/// Hash a password using Argon2.
fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

fn generate_token_secret() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_SECRET_LENGTH)
        .map(char::from)
        .collect()
}

/// Split `<id>|<secret>`. Returns `None` for anything else.
fn parse_token(bearer: &str) -> Option<(AccessTokenId, &str)> {
    let (id, secret) = bearer.trim().split_once('|')?;
    let id = id.parse::<i64>().ok()?;
    if secret.len() != TOKEN_SECRET_LENGTH || !secret.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some((AccessTokenId::new(id), secret))
}

fn token_mac(key: &SecretString) -> Result<HmacSha256, AuthError> {
    HmacSha256::new_from_slice(key.expose_secret().as_bytes()).map_err(|_| AuthError::TokenHash)
}

/// Hex HMAC-SHA256 of the token's random part.
fn hash_token(key: &SecretString, secret: &str) -> Result<String, AuthError> {
    let mut mac = token_mac(key)?;
    mac.update(secret.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Constant-time comparison of a token against its stored MAC.
fn verify_token(key: &SecretString, secret: &str, stored_hex: &str) -> Result<bool, AuthError> {
    let Ok(expected) = hex::decode(stored_hex) else {
        return Ok(false);
    };
    let mut mac = token_mac(key)?;
    mac.update(secret.as_bytes());
    Ok(mac.verify_slice(&expected).is_ok())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn key() -> SecretString {
        SecretString::from("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6".to_string())
    }

    #[test]
    fn test_hash_and_verify_password() {
        let hash = hash_password("secret123").unwrap();
        assert!(verify_password("secret123", &hash).is_ok());
        assert!(matches!(
            verify_password("wrong", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_verify_password_rejects_garbage_hash() {
        assert!(matches!(
            verify_password("secret123", "not-a-hash"),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_token_secret_shape() {
        let secret = generate_token_secret();
        assert_eq!(secret.len(), TOKEN_SECRET_LENGTH);
        assert!(secret.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(secret, generate_token_secret());
    }

    #[test]
    fn test_parse_token() {
        let secret = "a".repeat(TOKEN_SECRET_LENGTH);
        let bearer = format!("17|{secret}");
        let (id, parsed) = parse_token(&bearer).unwrap();
        assert_eq!(id, AccessTokenId::new(17));
        assert_eq!(parsed, secret);
    }

    #[test]
    fn test_parse_token_rejects_malformed() {
        assert!(parse_token("").is_none());
        assert!(parse_token("abc").is_none());
        assert!(parse_token(&format!("x|{}", "a".repeat(40))).is_none());
        assert!(parse_token("1|short").is_none());
        assert!(parse_token(&format!("1|{}!", "a".repeat(39))).is_none());
    }

    #[test]
    fn test_token_hash_verifies() {
        let secret = generate_token_secret();
        let stored = hash_token(&key(), &secret).unwrap();
        assert_eq!(stored.len(), 64);
        assert!(verify_token(&key(), &secret, &stored).unwrap());
    }

    #[test]
    fn test_token_hash_rejects_other_secret_and_key() {
        let secret = generate_token_secret();
        let stored = hash_token(&key(), &secret).unwrap();

        let other = generate_token_secret();
        assert!(!verify_token(&key(), &other, &stored).unwrap());

        let other_key = SecretString::from("zZ9#yY8@xX7!wW6$vV5%uU4^tT3&sS2*".to_string());
        assert!(!verify_token(&other_key, &secret, &stored).unwrap());
    }

    #[test]
    fn test_verify_token_with_corrupt_hash() {
        assert!(!verify_token(&key(), "abc", "not-hex").unwrap());
    }

    #[test]
    fn test_internal_errors() {
        assert!(AuthError::PasswordHash.is_internal());
        assert!(!AuthError::InvalidCredentials.is_internal());
        assert!(!AuthError::UserAlreadyExists.is_internal());
    }
}
