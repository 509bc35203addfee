//! Invoice repository, including lines and payments.

use sqlx::PgPool;

use crm_core::models::{Invoice, InvoiceItem, Payment};
use crm_core::{InvoiceId, UserId};

use super::line_items::{self, LineTable};
use super::{PageRequest, RepositoryError, map_write_error};
use crate::models::{InvoiceInput, PaymentInput};

const INVOICE_COLUMNS: &str = "id, invoice_number, quote_id, contact_id, company_id, subject, \
     status, invoice_date, due_date, subtotal, tax_amount, discount_amount, total, currency, \
     paid_amount, balance_due, terms, owner_id, created_at, updated_at";

const ITEM_COLUMNS: &str = "id, invoice_id, product_id, name, description, quantity, \
     unit_price, discount, amount, created_at, updated_at";

const PAYMENT_COLUMNS: &str = "id, invoice_id, amount, payment_date, payment_method, \
     reference, notes, created_at, updated_at";

const LIST_FILTER: &str = "owner_id = $1 AND ($2::text IS NULL OR status::text = $2)";

/// Repository for invoices, their lines and payments.
pub struct InvoiceRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> InvoiceRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    // Invoices
    // =========================================================================

    /// List the owner's invoices, newest first, optionally by exact status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list(
        &self,
        owner: UserId,
        status: Option<&str>,
        page: PageRequest,
    ) -> Result<(Vec<Invoice>, i64), RepositoryError> {
        let total = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM crm.invoices WHERE {LIST_FILTER}"
        ))
        .bind(owner)
        .bind(status)
        .fetch_one(self.pool)
        .await?;

        let rows = sqlx::query_as::<_, Invoice>(&format!(
            "SELECT {INVOICE_COLUMNS} FROM crm.invoices
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

    /// Get one invoice. With `scope`, invoices of other owners are not found.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(
        &self,
        id: InvoiceId,
        scope: Option<UserId>,
    ) -> Result<Option<Invoice>, RepositoryError> {
        let invoice = sqlx::query_as::<_, Invoice>(&format!(
            "SELECT {INVOICE_COLUMNS} FROM crm.invoices
             WHERE id = $1 AND ($2::bigint IS NULL OR owner_id = $2)"
        ))
        .bind(id)
        .bind(scope)
        .fetch_optional(self.pool)
        .await?;

        Ok(invoice)
    }

    /// Insert an invoice and its lines in one transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict("invoice_number")` if `number` is taken.
    /// Returns `RepositoryError::InvalidReference` for unknown quote, contact,
    /// company or product IDs.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(
        &self,
        owner: UserId,
        number: &str,
        input: &InvoiceInput,
    ) -> Result<Invoice, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let invoice = sqlx::query_as::<_, Invoice>(&format!(
            "INSERT INTO crm.invoices
                (invoice_number, quote_id, contact_id, company_id, subject, status,
                 invoice_date, due_date, subtotal, tax_amount, discount_amount, total,
                 currency, paid_amount, balance_due, terms, owner_id)
             VALUES ($1, $2, $3, $4, $5, COALESCE($6, 'draft'::crm.invoice_status), $7, $8,
                     COALESCE($9, 0), COALESCE($10, 0), COALESCE($11, 0), COALESCE($12, 0),
                     COALESCE($13, 'USD'), COALESCE($14, 0), COALESCE($15, 0), $16, $17)
             RETURNING {INVOICE_COLUMNS}"
        ))
        .bind(number)
        .bind(input.quote_id)
        .bind(input.contact_id)
        .bind(input.company_id)
        .bind(&input.subject)
        .bind(input.status)
        .bind(input.invoice_date)
        .bind(input.due_date)
        .bind(input.subtotal)
        .bind(input.tax_amount)
        .bind(input.discount_amount)
        .bind(input.total)
        .bind(&input.currency)
        .bind(input.paid_amount)
        .bind(input.balance_due)
        .bind(&input.terms)
        .bind(owner)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_write_error(e, "invoices"))?;

        if let Some(items) = &input.items {
            line_items::replace(&mut *tx, LineTable::Invoice, invoice.id.as_i64(), items).await?;
        }

        tx.commit().await?;
        Ok(invoice)
    }

    /// Overwrite every writable column; replace the lines when `items` is present.
    /// Null for a column with a default keeps the stored value.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::InvalidReference` for unknown quote, contact,
    /// company or product IDs.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn update(
        &self,
        id: InvoiceId,
        input: &InvoiceInput,
    ) -> Result<Option<Invoice>, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let invoice = sqlx::query_as::<_, Invoice>(&format!(
            "UPDATE crm.invoices SET
                quote_id = $2, contact_id = $3, company_id = $4, subject = $5,
                status = COALESCE($6, status),
                invoice_date = $7, due_date = $8,
                subtotal = COALESCE($9, subtotal), tax_amount = COALESCE($10, tax_amount),
                discount_amount = COALESCE($11, discount_amount), total = COALESCE($12, total),
                currency = COALESCE($13, currency), paid_amount = COALESCE($14, paid_amount),
                balance_due = COALESCE($15, balance_due), terms = $16, updated_at = NOW()
             WHERE id = $1
             RETURNING {INVOICE_COLUMNS}"
        ))
        .bind(id)
        .bind(input.quote_id)
        .bind(input.contact_id)
        .bind(input.company_id)
        .bind(&input.subject)
        .bind(input.status)
        .bind(input.invoice_date)
        .bind(input.due_date)
        .bind(input.subtotal)
        .bind(input.tax_amount)
        .bind(input.discount_amount)
        .bind(input.total)
        .bind(&input.currency)
        .bind(input.paid_amount)
        .bind(input.balance_due)
        .bind(&input.terms)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| map_write_error(e, "invoices"))?;

        let Some(invoice) = invoice else {
            return Ok(None);
        };

        if let Some(items) = &input.items {
            line_items::replace(&mut *tx, LineTable::Invoice, invoice.id.as_i64(), items).await?;
        }

        tx.commit().await?;
        Ok(Some(invoice))
    }

    /// Delete an invoice with its lines and payments. Returns `false` if
    /// nothing matched.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn delete(&self, id: InvoiceId, scope: Option<UserId>) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "DELETE FROM crm.invoices WHERE id = $1 AND ($2::bigint IS NULL OR owner_id = $2)",
        )
        .bind(id)
        .bind(scope)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    // =========================================================================
    // Lines and payments
    // =========================================================================

    /// Lines of an invoice in insertion order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn items(&self, id: InvoiceId) -> Result<Vec<InvoiceItem>, RepositoryError> {
        let items = sqlx::query_as::<_, InvoiceItem>(&format!(
            "SELECT {ITEM_COLUMNS} FROM crm.invoice_items WHERE invoice_id = $1 ORDER BY id"
        ))
        .bind(id)
        .fetch_all(self.pool)
        .await?;

        Ok(items)
    }

    /// Payments against an invoice, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn payments(&self, id: InvoiceId) -> Result<Vec<Payment>, RepositoryError> {
        let payments = sqlx::query_as::<_, Payment>(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM crm.payments
             WHERE invoice_id = $1
             ORDER BY payment_date, id"
        ))
        .bind(id)
        .fetch_all(self.pool)
        .await?;

        Ok(payments)
    }

    /// Record a payment. The invoice's `paid_amount` and `balance_due` are
    /// left as they are.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::InvalidReference` if the invoice does not exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn record_payment(
        &self,
        id: InvoiceId,
        input: &PaymentInput,
    ) -> Result<Payment, RepositoryError> {
        sqlx::query_as::<_, Payment>(&format!(
            "INSERT INTO crm.payments
                (invoice_id, amount, payment_date, payment_method, reference, notes)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {PAYMENT_COLUMNS}"
        ))
        .bind(id)
        .bind(input.amount)
        .bind(input.payment_date)
        .bind(&input.payment_method)
        .bind(&input.reference)
        .bind(&input.notes)
        .fetch_one(self.pool)
        .await
        .map_err(|e| map_write_error(e, "payments"))
    }
}
