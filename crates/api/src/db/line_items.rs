//! Quote and invoice lines share one shape and one write path.

use sqlx::PgConnection;

use super::{RepositoryError, map_write_error};
use crate::models::LineItemInput;

/// Table holding one document kind's lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LineTable {
    Quote,
    Invoice,
}

impl LineTable {
    const fn table(self) -> &'static str {
        match self {
            Self::Quote => "quote_items",
            Self::Invoice => "invoice_items",
        }
    }

    const fn parent_column(self) -> &'static str {
        match self {
            Self::Quote => "quote_id",
            Self::Invoice => "invoice_id",
        }
    }
}

/// Replace every line of a document with `items`.
///
/// Runs on the caller's connection so it can share the document's transaction.
pub(crate) async fn replace(
    conn: &mut PgConnection,
    lines: LineTable,
    parent_id: i64,
    items: &[LineItemInput],
) -> Result<(), RepositoryError> {
    let table = lines.table();
    let parent = lines.parent_column();

    sqlx::query(&format!("DELETE FROM crm.{table} WHERE {parent} = $1"))
        .bind(parent_id)
        .execute(&mut *conn)
        .await?;

    for item in items {
        sqlx::query(&format!(
            "INSERT INTO crm.{table}
                ({parent}, product_id, name, description, quantity, unit_price, discount, amount)
             VALUES ($1, $2, $3, $4, $5, $6, COALESCE($7, 0), $8)"
        ))
        .bind(parent_id)
        .bind(item.product_id)
        .bind(&item.name)
        .bind(&item.description)
        .bind(item.quantity)
        .bind(item.unit_price)
        .bind(item.discount)
        .bind(item.amount)
        .execute(&mut *conn)
        .await
        .map_err(|e| map_write_error(e, table))?;
    }

    Ok(())
}
