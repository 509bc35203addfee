//! Product catalog repository.

use sqlx::PgPool;

use crm_core::models::Product;
use crm_core::{ProductId, UserId};

use super::{PageRequest, RepositoryError, contains_pattern, map_write_error};
use crate::models::ProductInput;

const PRODUCT_COLUMNS: &str = "id, name, code, description, unit_price, currency, unit, \
     quantity, owner_id, active, created_at, updated_at";

const LIST_FILTER: &str =
    "owner_id = $1 AND ($2::text IS NULL OR name ILIKE $2 OR code ILIKE $2)";

/// Repository for products.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List the owner's products, newest first, optionally matching `search`
    /// against name or code.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list(
        &self,
        owner: UserId,
        search: Option<&str>,
        page: PageRequest,
    ) -> Result<(Vec<Product>, i64), RepositoryError> {
        let pattern = search.map(contains_pattern);

        let total = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM crm.products WHERE {LIST_FILTER}"
        ))
        .bind(owner)
        .bind(pattern.as_deref())
        .fetch_one(self.pool)
        .await?;

        let rows = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM crm.products
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

    /// Get one product. With `scope`, products of other owners are not found.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(
        &self,
        id: ProductId,
        scope: Option<UserId>,
    ) -> Result<Option<Product>, RepositoryError> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM crm.products
             WHERE id = $1 AND ($2::bigint IS NULL OR owner_id = $2)"
        ))
        .bind(id)
        .bind(scope)
        .fetch_optional(self.pool)
        .await?;

        Ok(product)
    }

    /// Whether a product other than `except` already uses `code`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn code_taken(
        &self,
        code: &str,
        except: Option<ProductId>,
    ) -> Result<bool, RepositoryError> {
        let taken = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (
                SELECT 1 FROM crm.products
                WHERE code = $1 AND ($2::bigint IS NULL OR id <> $2)
             )",
        )
        .bind(code)
        .bind(except)
        .fetch_one(self.pool)
        .await?;

        Ok(taken)
    }

    /// Insert a product owned by `owner`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict("code")` if the code is taken.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(
        &self,
        owner: UserId,
        input: &ProductInput,
    ) -> Result<Product, RepositoryError> {
        sqlx::query_as::<_, Product>(&format!(
            "INSERT INTO crm.products
                (name, code, description, unit_price, currency, unit, quantity, active, owner_id)
             VALUES ($1, $2, $3, $4, COALESCE($5, 'USD'), $6, $7, COALESCE($8, TRUE), $9)
             RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(&input.name)
        .bind(&input.code)
        .bind(&input.description)
        .bind(input.unit_price)
        .bind(&input.currency)
        .bind(&input.unit)
        .bind(input.quantity)
        .bind(input.active)
        .bind(owner)
        .fetch_one(self.pool)
        .await
        .map_err(|e| map_write_error(e, "products"))
    }

    /// Overwrite every writable column. Null for a column with a default
    /// keeps the stored value.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict("code")` if the code is taken.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn update(
        &self,
        id: ProductId,
        input: &ProductInput,
    ) -> Result<Option<Product>, RepositoryError> {
        sqlx::query_as::<_, Product>(&format!(
            "UPDATE crm.products SET
                name = $2, code = $3, description = $4, unit_price = $5,
                currency = COALESCE($6, currency), unit = $7, quantity = $8,
                active = COALESCE($9, active), updated_at = NOW()
             WHERE id = $1
             RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(id)
        .bind(&input.name)
        .bind(&input.code)
        .bind(&input.description)
        .bind(input.unit_price)
        .bind(&input.currency)
        .bind(&input.unit)
        .bind(input.quantity)
        .bind(input.active)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| map_write_error(e, "products"))
    }

    /// Delete a product. Quote and invoice lines keep their copy of the name
    /// and price. Returns `false` if nothing matched.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn delete(&self, id: ProductId, scope: Option<UserId>) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "DELETE FROM crm.products WHERE id = $1 AND ($2::bigint IS NULL OR owner_id = $2)",
        )
        .bind(id)
        .bind(scope)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
