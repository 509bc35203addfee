//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crm_core::UserId;

use crate::config::ApiConfig;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// the connection pool and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ApiConfig,
    pool: PgPool,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(config: ApiConfig, pool: PgPool) -> Self {
        Self {
            inner: Arc::new(AppStateInner { config, pool }),
        }
    }

    /// Get a reference to the configuration.
    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.inner.config
    }

    /// Get a reference to the database pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Owner filter for single-record reads and writes.
    ///
    /// `None` (any owner) unless strict ownership is enabled, in which case
    /// records owned by other users behave as if they did not exist.
    #[must_use]
    pub fn owner_scope(&self, user_id: UserId) -> Option<UserId> {
        self.inner.config.strict_ownership.then_some(user_id)
    }
}
