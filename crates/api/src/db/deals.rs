//! Deal repository.

use sqlx::PgPool;

use crm_core::models::Deal;
use crm_core::{CompanyId, DealId, DealStage, UserId};

use super::{PageRequest, RepositoryError, contains_pattern, map_write_error};
use crate::models::DealInput;

const DEAL_COLUMNS: &str = "id, name, amount, currency, stage, probability, \
     expected_close_date, contact_id, company_id, owner_id, description, created_at, updated_at";

// Unknown stage labels match nothing rather than failing the request.
const LIST_FILTER: &str = "owner_id = $1
    AND ($2::text IS NULL OR name ILIKE $2)
    AND ($3::text IS NULL OR stage::text = $3)";

/// List narrowing for deals.
#[derive(Debug, Clone, Default)]
pub struct DealFilter {
    /// Substring of the deal name.
    pub search: Option<String>,
    /// Exact stage label.
    pub stage: Option<String>,
}

/// Repository for deals.
pub struct DealRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> DealRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List the owner's deals, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list(
        &self,
        owner: UserId,
        filter: &DealFilter,
        page: PageRequest,
    ) -> Result<(Vec<Deal>, i64), RepositoryError> {
        let pattern = filter.search.as_deref().map(contains_pattern);

        let total = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM crm.deals WHERE {LIST_FILTER}"
        ))
        .bind(owner)
        .bind(pattern.as_deref())
        .bind(filter.stage.as_deref())
        .fetch_one(self.pool)
        .await?;

        let rows = sqlx::query_as::<_, Deal>(&format!(
            "SELECT {DEAL_COLUMNS} FROM crm.deals
             WHERE {LIST_FILTER}
             ORDER BY created_at DESC, id DESC
             LIMIT $4 OFFSET $5"
        ))
        .bind(owner)
        .bind(pattern.as_deref())
        .bind(filter.stage.as_deref())
        .bind(page.per_page)
        .bind(page.offset())
        .fetch_all(self.pool)
        .await?;

        Ok((rows, total))
    }

    /// Get one deal. With `scope`, deals of other owners are not found.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: DealId, scope: Option<UserId>) -> Result<Option<Deal>, RepositoryError> {
        let deal = sqlx::query_as::<_, Deal>(&format!(
            "SELECT {DEAL_COLUMNS} FROM crm.deals
             WHERE id = $1 AND ($2::bigint IS NULL OR owner_id = $2)"
        ))
        .bind(id)
        .bind(scope)
        .fetch_optional(self.pool)
        .await?;

        Ok(deal)
    }

    /// Deals made with a company, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_by_company(&self, company: CompanyId) -> Result<Vec<Deal>, RepositoryError> {
        let rows = sqlx::query_as::<_, Deal>(&format!(
            "SELECT {DEAL_COLUMNS} FROM crm.deals
             WHERE company_id = $1
             ORDER BY created_at DESC, id DESC"
        ))
        .bind(company)
        .fetch_all(self.pool)
        .await?;

        Ok(rows)
    }

    /// Insert a deal owned by `owner`. Missing stage, probability and currency
    /// take their column defaults.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::InvalidReference` for unknown contact or company IDs.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(&self, owner: UserId, input: &DealInput) -> Result<Deal, RepositoryError> {
        sqlx::query_as::<_, Deal>(&format!(
            "INSERT INTO crm.deals
                (name, amount, currency, stage, probability, expected_close_date,
                 contact_id, company_id, description, owner_id)
             VALUES ($1, $2, COALESCE($3, 'USD'), COALESCE($4, 'New'::crm.deal_stage),
                     COALESCE($5, 10), $6, $7, $8, $9, $10)
             RETURNING {DEAL_COLUMNS}"
        ))
        .bind(&input.name)
        .bind(input.amount)
        .bind(&input.currency)
        .bind(input.stage)
        .bind(input.probability)
        .bind(input.expected_close_date)
        .bind(input.contact_id)
        .bind(input.company_id)
        .bind(&input.description)
        .bind(owner)
        .fetch_one(self.pool)
        .await
        .map_err(|e| map_write_error(e, "deals"))
    }

    /// Overwrite every writable column. Null for a column with a default
    /// keeps the stored value.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::InvalidReference` for unknown contact or company IDs.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn update(&self, id: DealId, input: &DealInput) -> Result<Option<Deal>, RepositoryError> {
        sqlx::query_as::<_, Deal>(&format!(
            "UPDATE crm.deals SET
                name = $2, amount = $3, currency = COALESCE($4, currency),
                stage = COALESCE($5, stage), probability = COALESCE($6, probability),
                expected_close_date = $7, contact_id = $8, company_id = $9,
                description = $10, updated_at = NOW()
             WHERE id = $1
             RETURNING {DEAL_COLUMNS}"
        ))
        .bind(id)
        .bind(&input.name)
        .bind(input.amount)
        .bind(&input.currency)
        .bind(input.stage)
        .bind(input.probability)
        .bind(input.expected_close_date)
        .bind(input.contact_id)
        .bind(input.company_id)
        .bind(&input.description)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| map_write_error(e, "deals"))
    }

    /// Move a deal to another pipeline stage.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn update_stage(
        &self,
        id: DealId,
        stage: DealStage,
    ) -> Result<Option<Deal>, RepositoryError> {
        let deal = sqlx::query_as::<_, Deal>(&format!(
            "UPDATE crm.deals SET stage = $2, updated_at = NOW()
             WHERE id = $1
             RETURNING {DEAL_COLUMNS}"
        ))
        .bind(id)
        .bind(stage)
        .fetch_optional(self.pool)
        .await?;

        Ok(deal)
    }

    /// Delete a deal. Returns `false` if nothing matched.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn delete(&self, id: DealId, scope: Option<UserId>) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "DELETE FROM crm.deals WHERE id = $1 AND ($2::bigint IS NULL OR owner_id = $2)",
        )
        .bind(id)
        .bind(scope)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
