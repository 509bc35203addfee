//! Activity repository.

use sqlx::PgPool;
use sqlx::types::Json;

use crm_core::models::Activity;
use crm_core::{ActivityId, UserId};

use super::{PageRequest, RepositoryError, map_write_error};
use crate::models::ActivityInput;

pub(crate) const ACTIVITY_COLUMNS: &str = "id, type, title, description, due_date, duration, \
     participants, related_to_type, related_to_id, owner_id, completed, created_at, updated_at";

const LIST_FILTER: &str = "owner_id = $1
    AND ($2::text IS NULL OR type::text = $2)
    AND ($3::text IS NULL OR (related_to_type = $3 AND related_to_id = $4))";

/// List narrowing for activities.
#[derive(Debug, Clone, Default)]
pub struct ActivityFilter {
    /// Exact activity type label.
    pub kind: Option<String>,
    pub related_to_type: Option<String>,
    pub related_to_id: Option<i64>,
}

impl ActivityFilter {
    /// The related-record filter, applied only when both halves are present.
    fn related(&self) -> (Option<&str>, Option<i64>) {
        match (self.related_to_type.as_deref(), self.related_to_id) {
            (Some(kind), Some(id)) => (Some(kind), Some(id)),
            _ => (None, None),
        }
    }
}

/// Repository for activities.
pub struct ActivityRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ActivityRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List the owner's activities, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list(
        &self,
        owner: UserId,
        filter: &ActivityFilter,
        page: PageRequest,
    ) -> Result<(Vec<Activity>, i64), RepositoryError> {
        let (related_type, related_id) = filter.related();

        let total = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM crm.activities WHERE {LIST_FILTER}"
        ))
        .bind(owner)
        .bind(filter.kind.as_deref())
        .bind(related_type)
        .bind(related_id)
        .fetch_one(self.pool)
        .await?;

        let rows = sqlx::query_as::<_, Activity>(&format!(
            "SELECT {ACTIVITY_COLUMNS} FROM crm.activities
             WHERE {LIST_FILTER}
             ORDER BY created_at DESC, id DESC
             LIMIT $5 OFFSET $6"
        ))
        .bind(owner)
        .bind(filter.kind.as_deref())
        .bind(related_type)
        .bind(related_id)
        .bind(page.per_page)
        .bind(page.offset())
        .fetch_all(self.pool)
        .await?;

        Ok((rows, total))
    }

    /// Insert an activity owned by `owner`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(
        &self,
        owner: UserId,
        input: &ActivityInput,
    ) -> Result<Activity, RepositoryError> {
        let participants = input.participants.clone().unwrap_or_default();

        sqlx::query_as::<_, Activity>(&format!(
            "INSERT INTO crm.activities
                (type, title, description, due_date, duration, participants,
                 related_to_type, related_to_id, completed, owner_id)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, COALESCE($9, FALSE), $10)
             RETURNING {ACTIVITY_COLUMNS}"
        ))
        .bind(input.kind)
        .bind(&input.title)
        .bind(&input.description)
        .bind(input.due_date)
        .bind(input.duration)
        .bind(Json(participants))
        .bind(&input.related_to_type)
        .bind(input.related_to_id)
        .bind(input.completed)
        .bind(owner)
        .fetch_one(self.pool)
        .await
        .map_err(|e| map_write_error(e, "activities"))
    }

    /// Delete an activity. Returns `false` if nothing matched.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn delete(&self, id: ActivityId, scope: Option<UserId>) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "DELETE FROM crm.activities WHERE id = $1 AND ($2::bigint IS NULL OR owner_id = $2)",
        )
        .bind(id)
        .bind(scope)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_related_filter_requires_both_halves() {
        let only_type = ActivityFilter {
            related_to_type: Some("deal".into()),
            ..ActivityFilter::default()
        };
        assert_eq!(only_type.related(), (None, None));

        let both = ActivityFilter {
            related_to_type: Some("deal".into()),
            related_to_id: Some(4),
            ..ActivityFilter::default()
        };
        assert_eq!(both.related(), (Some("deal"), Some(4)));
    }
}
