//! Catalog products referenced by quote and invoice lines.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{ProductId, UserId};

/// A sellable product. `code` is unique across the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub code: String,
    pub description: Option<String>,
    #[serde(with = "rust_decimal::serde::float")]
    pub unit_price: Decimal,
    pub currency: String,
    pub unit: Option<String>,
    pub quantity: Option<i32>,
    pub owner_id: UserId,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
