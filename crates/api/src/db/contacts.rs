//! Contact repository.

use std::collections::HashMap;

use sqlx::PgPool;

use crm_core::models::Contact;
use crm_core::{CompanyId, ContactId, UserId};

use super::{PageRequest, RepositoryError, contains_pattern, map_write_error};
use crate::models::ContactInput;

const CONTACT_COLUMNS: &str = "id, first_name, last_name, email, phone, mobile, company_id, \
     owner_id, lead_status, source, avatar, created_at, updated_at";

const LIST_FILTER: &str = "owner_id = $1
    AND ($2::text IS NULL OR first_name ILIKE $2 OR last_name ILIKE $2 OR email ILIKE $2)";

/// Repository for contacts.
pub struct ContactRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ContactRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// List the owner's contacts, newest first, optionally matching `search`
    /// against first name, last name or email.
    ///
    /// Returns the page of rows and the total number of matches.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list(
        &self,
        owner: UserId,
        search: Option<&str>,
        page: PageRequest,
    ) -> Result<(Vec<Contact>, i64), RepositoryError> {
        let pattern = search.map(contains_pattern);

        let total = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM crm.contacts WHERE {LIST_FILTER}"
        ))
        .bind(owner)
        .bind(pattern.as_deref())
        .fetch_one(self.pool)
        .await?;

        let rows = sqlx::query_as::<_, Contact>(&format!(
            "SELECT {CONTACT_COLUMNS} FROM crm.contacts
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

    /// Get one contact. With `scope`, contacts of other owners are not found.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(
        &self,
        id: ContactId,
        scope: Option<UserId>,
    ) -> Result<Option<Contact>, RepositoryError> {
        let contact = sqlx::query_as::<_, Contact>(&format!(
            "SELECT {CONTACT_COLUMNS} FROM crm.contacts
             WHERE id = $1 AND ($2::bigint IS NULL OR owner_id = $2)"
        ))
        .bind(id)
        .bind(scope)
        .fetch_optional(self.pool)
        .await?;

        Ok(contact)
    }

    /// Contacts working at a company, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_by_company(&self, company: CompanyId) -> Result<Vec<Contact>, RepositoryError> {
        let rows = sqlx::query_as::<_, Contact>(&format!(
            "SELECT {CONTACT_COLUMNS} FROM crm.contacts
             WHERE company_id = $1
             ORDER BY created_at DESC, id DESC"
        ))
        .bind(company)
        .fetch_all(self.pool)
        .await?;

        Ok(rows)
    }

    /// Load contacts by ID for relation attachment.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_many(
        &self,
        ids: &[ContactId],
    ) -> Result<HashMap<ContactId, Contact>, RepositoryError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = sqlx::query_as::<_, Contact>(&format!(
            "SELECT {CONTACT_COLUMNS} FROM crm.contacts WHERE id = ANY($1)"
        ))
        .bind(ids)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(|c| (c.id, c)).collect())
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Insert a contact owned by `owner`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::InvalidReference` if `company_id` does not exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(
        &self,
        owner: UserId,
        input: &ContactInput,
    ) -> Result<Contact, RepositoryError> {
        sqlx::query_as::<_, Contact>(&format!(
            "INSERT INTO crm.contacts
                (first_name, last_name, email, phone, mobile, company_id,
                 lead_status, source, avatar, owner_id)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
             RETURNING {CONTACT_COLUMNS}"
        ))
        .bind(&input.first_name)
        .bind(&input.last_name)
        .bind(&input.email)
        .bind(&input.phone)
        .bind(&input.mobile)
        .bind(input.company_id)
        .bind(&input.lead_status)
        .bind(&input.source)
        .bind(&input.avatar)
        .bind(owner)
        .fetch_one(self.pool)
        .await
        .map_err(|e| map_write_error(e, "contacts"))
    }

    /// Overwrite every writable column.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::InvalidReference` if `company_id` does not exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn update(
        &self,
        id: ContactId,
        input: &ContactInput,
    ) -> Result<Option<Contact>, RepositoryError> {
        sqlx::query_as::<_, Contact>(&format!(
            "UPDATE crm.contacts SET
                first_name = $2, last_name = $3, email = $4, phone = $5, mobile = $6,
                company_id = $7, lead_status = $8, source = $9, avatar = $10,
                updated_at = NOW()
             WHERE id = $1
             RETURNING {CONTACT_COLUMNS}"
        ))
        .bind(id)
        .bind(&input.first_name)
        .bind(&input.last_name)
        .bind(&input.email)
        .bind(&input.phone)
        .bind(&input.mobile)
        .bind(input.company_id)
        .bind(&input.lead_status)
        .bind(&input.source)
        .bind(&input.avatar)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| map_write_error(e, "contacts"))
    }

    /// Point the contact's avatar at an uploaded file.
    ///
    /// Returns `false` if the contact does not exist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn set_avatar(&self, id: ContactId, url: &str) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "UPDATE crm.contacts SET avatar = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(url)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete a contact. Returns `false` if nothing matched.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn delete(&self, id: ContactId, scope: Option<UserId>) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "DELETE FROM crm.contacts WHERE id = $1 AND ($2::bigint IS NULL OR owner_id = $2)",
        )
        .bind(id)
        .bind(scope)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
