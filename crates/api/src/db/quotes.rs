//! Quote repository.

use sqlx::PgPool;

use crm_core::models::{Quote, QuoteItem};
use crm_core::{QuoteId, UserId};

use super::line_items::{self, LineTable};
use super::{PageRequest, RepositoryError, map_write_error};
use crate::models::QuoteInput;

const QUOTE_COLUMNS: &str = "id, quote_number, contact_id, company_id, deal_id, subject, \
     status, expiration_date, subtotal, tax_amount, discount_amount, total, currency, terms, \
     owner_id, created_at, updated_at";

const ITEM_COLUMNS: &str = "id, quote_id, product_id, name, description, quantity, \
     unit_price, discount, amount, created_at, updated_at";

const LIST_FILTER: &str = "owner_id = $1 AND ($2::text IS NULL OR status::text = $2)";

/// Repository for quotes and their lines.
pub struct QuoteRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> QuoteRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List the owner's quotes, newest first, optionally by exact status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list(
        &self,
        owner: UserId,
        status: Option<&str>,
        page: PageRequest,
    ) -> Result<(Vec<Quote>, i64), RepositoryError> {
        let total = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM crm.quotes WHERE {LIST_FILTER}"
        ))
        .bind(owner)
        .bind(status)
        .fetch_one(self.pool)
        .await?;

        let rows = sqlx::query_as::<_, Quote>(&format!(
            "SELECT {QUOTE_COLUMNS} FROM crm.quotes
             WHERE {LIST_FILTER}
             ORDER BY created_at DESC, id DESC
             LIMIT $3 OFFSET $4"
        ))
        .bind(owner)
        .bind(status)
        .bind(page.per_page)
        .bind(page.offset())
        .fetch_all(self.pool)
        .await?;

        Ok((rows, total))
    }

    /// Get one quote. With `scope`, quotes of other owners are not found.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: QuoteId, scope: Option<UserId>) -> Result<Option<Quote>, RepositoryError> {
        let quote = sqlx::query_as::<_, Quote>(&format!(
            "SELECT {QUOTE_COLUMNS} FROM crm.quotes
             WHERE id = $1 AND ($2::bigint IS NULL OR owner_id = $2)"
        ))
        .bind(id)
        .bind(scope)
        .fetch_optional(self.pool)
        .await?;

        Ok(quote)
    }

    /// Lines of a quote in insertion order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn items(&self, id: QuoteId) -> Result<Vec<QuoteItem>, RepositoryError> {
        let items = sqlx::query_as::<_, QuoteItem>(&format!(
            "SELECT {ITEM_COLUMNS} FROM crm.quote_items WHERE quote_id = $1 ORDER BY id"
        ))
        .bind(id)
        .fetch_all(self.pool)
        .await?;

        Ok(items)
    }

    /// Insert a quote and its lines in one transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict("quote_number")` if `number` is taken.
    /// Returns `RepositoryError::InvalidReference` for unknown contact, company,
    /// deal or product IDs.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(
        &self,
        owner: UserId,
        number: &str,
        input: &QuoteInput,
    ) -> Result<Quote, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let quote = sqlx::query_as::<_, Quote>(&format!(
            "INSERT INTO crm.quotes
                (quote_number, contact_id, company_id, deal_id, subject, status,
                 expiration_date, subtotal, tax_amount, discount_amount, total,
                 currency, terms, owner_id)
             VALUES ($1, $2, $3, $4, $5, COALESCE($6, 'draft'::crm.quote_status), $7,
                     COALESCE($8, 0), COALESCE($9, 0), COALESCE($10, 0), COALESCE($11, 0),
                     COALESCE($12, 'USD'), $13, $14)
             RETURNING {QUOTE_COLUMNS}"
        ))
        .bind(number)
        .bind(input.contact_id)
        .bind(input.company_id)
        .bind(input.deal_id)
        .bind(&input.subject)
        .bind(input.status)
        .bind(input.expiration_date)
        .bind(input.subtotal)
        .bind(input.tax_amount)
        .bind(input.discount_amount)
        .bind(input.total)
        .bind(&input.currency)
        .bind(&input.terms)
        .bind(owner)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_write_error(e, "quotes"))?;

        if let Some(items) = &input.items {
            line_items::replace(&mut *tx, LineTable::Quote, quote.id.as_i64(), items).await?;
        }

        tx.commit().await?;
        Ok(quote)
    }

    /// Overwrite every writable column; replace the lines when `items` is present.
    /// Null for a column with a default keeps the stored value.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::InvalidReference` for unknown contact, company,
    /// deal or product IDs.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn update(
        &self,
        id: QuoteId,
        input: &QuoteInput,
    ) -> Result<Option<Quote>, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let quote = sqlx::query_as::<_, Quote>(&format!(
            "UPDATE crm.quotes SET
                contact_id = $2, company_id = $3, deal_id = $4, subject = $5,
                status = COALESCE($6, status), expiration_date = $7,
                subtotal = COALESCE($8, subtotal), tax_amount = COALESCE($9, tax_amount),
                discount_amount = COALESCE($10, discount_amount), total = COALESCE($11, total),
                currency = COALESCE($12, currency), terms = $13, updated_at = NOW()
             WHERE id = $1
             RETURNING {QUOTE_COLUMNS}"
        ))
        .bind(id)
        .bind(input.contact_id)
        .bind(input.company_id)
        .bind(input.deal_id)
        .bind(&input.subject)
        .bind(input.status)
        .bind(input.expiration_date)
        .bind(input.subtotal)
        .bind(input.tax_amount)
        .bind(input.discount_amount)
        .bind(input.total)
        .bind(&input.currency)
        .bind(&input.terms)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| map_write_error(e, "quotes"))?;

        let Some(quote) = quote else {
            return Ok(None);
        };

        if let Some(items) = &input.items {
            line_items::replace(&mut *tx, LineTable::Quote, quote.id.as_i64(), items).await?;
        }

        tx.commit().await?;
        Ok(Some(quote))
    }

    /// Delete a quote and its lines. Returns `false` if nothing matched.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn delete(&self, id: QuoteId, scope: Option<UserId>) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "DELETE FROM crm.quotes WHERE id = $1 AND ($2::bigint IS NULL OR owner_id = $2)",
        )
        .bind(id)
        .bind(scope)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
