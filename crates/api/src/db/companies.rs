//! Company repository.

use std::collections::HashMap;

use sqlx::PgPool;

use crm_core::models::Company;
use crm_core::{CompanyId, UserId};

use super::{PageRequest, RepositoryError, contains_pattern, map_write_error};
use crate::models::CompanyInput;

const COMPANY_COLUMNS: &str = "id, name, email, phone, mobile, website, industry, address, \
     city, state, country, zip_code, logo, owner_id, created_at, updated_at";

const LIST_FILTER: &str = "owner_id = $1 AND ($2::text IS NULL OR name ILIKE $2)";

/// Repository for companies.
pub struct CompanyRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CompanyRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List the owner's companies, newest first, optionally matching `search`
    /// against the name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list(
        &self,
        owner: UserId,
        search: Option<&str>,
        page: PageRequest,
    ) -> Result<(Vec<Company>, i64), RepositoryError> {
        let pattern = search.map(contains_pattern);

        let total = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM crm.companies WHERE {LIST_FILTER}"
        ))
        .bind(owner)
        .bind(pattern.as_deref())
        .fetch_one(self.pool)
        .await?;

        let rows = sqlx::query_as::<_, Company>(&format!(
            "SELECT {COMPANY_COLUMNS} FROM crm.companies
             WHERE {LIST_FILTER}
             ORDER BY created_at DESC, id DESC
             LIMIT $3 OFFSET $4"
        ))
        .bind(owner)
        .bind(pattern.as_deref())
        .bind(page.per_page)
        .bind(page.offset())
        .fetch_all(self.pool)
        .await?;

        Ok((rows, total))
    }

    /// Get one company. With `scope`, companies of other owners are not found.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(
        &self,
        id: CompanyId,
        scope: Option<UserId>,
    ) -> Result<Option<Company>, RepositoryError> {
        let company = sqlx::query_as::<_, Company>(&format!(
            "SELECT {COMPANY_COLUMNS} FROM crm.companies
             WHERE id = $1 AND ($2::bigint IS NULL OR owner_id = $2)"
        ))
        .bind(id)
        .bind(scope)
        .fetch_optional(self.pool)
        .await?;

        Ok(company)
    }

    /// Load companies by ID for relation attachment.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_many(
        &self,
        ids: &[CompanyId],
    ) -> Result<HashMap<CompanyId, Company>, RepositoryError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = sqlx::query_as::<_, Company>(&format!(
            "SELECT {COMPANY_COLUMNS} FROM crm.companies WHERE id = ANY($1)"
        ))
        .bind(ids)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(|c| (c.id, c)).collect())
    }

    /// Insert a company owned by `owner`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(
        &self,
        owner: UserId,
        input: &CompanyInput,
    ) -> Result<Company, RepositoryError> {
        sqlx::query_as::<_, Company>(&format!(
            "INSERT INTO crm.companies
                (name, email, phone, mobile, website, industry, address, city, state,
                 country, zip_code, logo, owner_id)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
             RETURNING {COMPANY_COLUMNS}"
        ))
        .bind(&input.name)
        .bind(&input.email)
        .bind(&input.phone)
        .bind(&input.mobile)
        .bind(&input.website)
        .bind(&input.industry)
        .bind(&input.address)
        .bind(&input.city)
        .bind(&input.state)
        .bind(&input.country)
        .bind(&input.zip_code)
        .bind(&input.logo)
        .bind(owner)
        .fetch_one(self.pool)
        .await
        .map_err(|e| map_write_error(e, "companies"))
    }

    /// Overwrite every writable column.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn update(
        &self,
        id: CompanyId,
        input: &CompanyInput,
    ) -> Result<Option<Company>, RepositoryError> {
        sqlx::query_as::<_, Company>(&format!(
            "UPDATE crm.companies SET
                name = $2, email = $3, phone = $4, mobile = $5, website = $6,
                industry = $7, address = $8, city = $9, state = $10, country = $11,
                zip_code = $12, logo = $13, updated_at = NOW()
             WHERE id = $1
             RETURNING {COMPANY_COLUMNS}"
        ))
        .bind(id)
        .bind(&input.name)
        .bind(&input.email)
        .bind(&input.phone)
        .bind(&input.mobile)
        .bind(&input.website)
        .bind(&input.industry)
        .bind(&input.address)
        .bind(&input.city)
        .bind(&input.state)
        .bind(&input.country)
        .bind(&input.zip_code)
        .bind(&input.logo)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| map_write_error(e, "companies"))
    }

    /// Point the company's logo at an uploaded file.
    ///
    /// Returns `false` if the company does not exist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn set_logo(&self, id: CompanyId, url: &str) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "UPDATE crm.companies SET logo = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(url)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete a company. Contacts and deals keep existing with `company_id`
    /// cleared. Returns `false` if nothing matched.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn delete(&self, id: CompanyId, scope: Option<UserId>) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "DELETE FROM crm.companies WHERE id = $1 AND ($2::bigint IS NULL OR owner_id = $2)",
        )
        .bind(id)
        .bind(scope)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
