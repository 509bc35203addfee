//! Task repository.

use sqlx::PgPool;

use crm_core::models::Task;
use crm_core::{TaskId, UserId};

use super::{PageRequest, RepositoryError, map_write_error};
use crate::models::TaskInput;

const TASK_COLUMNS: &str = "id, title, description, due_date, priority, status, \
     related_to_type, related_to_id, assigned_to, owner_id, reminder, created_at, updated_at";

const LIST_FILTER: &str = "owner_id = $1
    AND ($2::text IS NULL OR status::text = $2)
    AND ($3::bigint IS NULL OR assigned_to = $3)";

/// List narrowing for tasks.
#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    /// Exact status label.
    pub status: Option<String>,
    pub assigned_to: Option<UserId>,
}

/// Repository for tasks.
pub struct TaskRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> TaskRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List the owner's tasks, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list(
        &self,
        owner: UserId,
        filter: &TaskFilter,
        page: PageRequest,
    ) -> Result<(Vec<Task>, i64), RepositoryError> {
        let total = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM crm.tasks WHERE {LIST_FILTER}"
        ))
        .bind(owner)
        .bind(filter.status.as_deref())
        .bind(filter.assigned_to)
        .fetch_one(self.pool)
        .await?;

        let rows = sqlx::query_as::<_, Task>(&format!(
            "SELECT {TASK_COLUMNS} FROM crm.tasks
             WHERE {LIST_FILTER}
             ORDER BY created_at DESC, id DESC
             LIMIT $4 OFFSET $5"
        ))
        .bind(owner)
        .bind(filter.status.as_deref())
        .bind(filter.assigned_to)
        .bind(page.per_page)
        .bind(page.offset())
        .fetch_all(self.pool)
        .await?;

        Ok((rows, total))
    }

    /// Get one task. With `scope`, tasks of other owners are not found.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: TaskId, scope: Option<UserId>) -> Result<Option<Task>, RepositoryError> {
        let task = sqlx::query_as::<_, Task>(&format!(
            "SELECT {TASK_COLUMNS} FROM crm.tasks
             WHERE id = $1 AND ($2::bigint IS NULL OR owner_id = $2)"
        ))
        .bind(id)
        .bind(scope)
        .fetch_optional(self.pool)
        .await?;

        Ok(task)
    }

    /// Insert a task owned by `owner`, assigned to `owner` unless the input
    /// names someone else.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::InvalidReference` if `assigned_to` is not a user.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(&self, owner: UserId, input: &TaskInput) -> Result<Task, RepositoryError> {
        sqlx::query_as::<_, Task>(&format!(
            "INSERT INTO crm.tasks
                (title, description, due_date, priority, status, related_to_type,
                 related_to_id, assigned_to, reminder, owner_id)
             VALUES ($1, $2, $3, COALESCE($4, 'medium'::crm.task_priority),
                     COALESCE($5, 'pending'::crm.task_status), $6, $7, $8, $9, $10)
             RETURNING {TASK_COLUMNS}"
        ))
        .bind(&input.title)
        .bind(&input.description)
        .bind(input.due_date)
        .bind(input.priority)
        .bind(input.status)
        .bind(&input.related_to_type)
        .bind(input.related_to_id)
        .bind(input.assigned_to.unwrap_or(owner))
        .bind(input.reminder)
        .bind(owner)
        .fetch_one(self.pool)
        .await
        .map_err(|e| map_write_error(e, "tasks"))
    }

    /// Overwrite every writable column. A null `assigned_to`, `priority` or
    /// `status` keeps the stored value.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::InvalidReference` if `assigned_to` is not a user.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn update(&self, id: TaskId, input: &TaskInput) -> Result<Option<Task>, RepositoryError> {
        sqlx::query_as::<_, Task>(&format!(
            "UPDATE crm.tasks SET
                title = $2, description = $3, due_date = $4,
                priority = COALESCE($5, priority),
                status = COALESCE($6, status),
                related_to_type = $7, related_to_id = $8,
                assigned_to = COALESCE($9, assigned_to), reminder = $10,
                updated_at = NOW()
             WHERE id = $1
             RETURNING {TASK_COLUMNS}"
        ))
        .bind(id)
        .bind(&input.title)
        .bind(&input.description)
        .bind(input.due_date)
        .bind(input.priority)
        .bind(input.status)
        .bind(&input.related_to_type)
        .bind(input.related_to_id)
        .bind(input.assigned_to)
        .bind(input.reminder)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| map_write_error(e, "tasks"))
    }

    /// Mark a task completed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn complete(&self, id: TaskId) -> Result<Option<Task>, RepositoryError> {
        let task = sqlx::query_as::<_, Task>(&format!(
            "UPDATE crm.tasks SET status = 'completed', updated_at = NOW()
             WHERE id = $1
             RETURNING {TASK_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(task)
    }

    /// Delete a task. Returns `false` if nothing matched.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn delete(&self, id: TaskId, scope: Option<UserId>) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "DELETE FROM crm.tasks WHERE id = $1 AND ($2::bigint IS NULL OR owner_id = $2)",
        )
        .bind(id)
        .bind(scope)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
