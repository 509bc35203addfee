//! Quotes and their line items.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{Company, Contact, User};
use crate::types::{
    CompanyId, ContactId, DealId, ProductId, QuoteId, QuoteItemId, QuoteStatus, UserId,
};

/// A priced offer sent to a contact.
///
/// Totals are stored exactly as submitted; they are not derived from items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct Quote {
    pub id: QuoteId,
    /// `QT-<unix seconds>`, unique.
    pub quote_number: String,
    pub contact_id: ContactId,
    pub company_id: Option<CompanyId>,
    pub deal_id: Option<DealId>,
    pub subject: String,
    pub status: QuoteStatus,
    pub expiration_date: NaiveDate,
    #[serde(with = "rust_decimal::serde::float")]
    pub subtotal: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub tax_amount: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub discount_amount: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total: Decimal,
    pub currency: String,
    pub terms: Option<String>,
    pub owner_id: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One line of a quote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct QuoteItem {
    pub id: QuoteItemId,
    pub quote_id: QuoteId,
    pub product_id: Option<ProductId>,
    pub name: String,
    pub description: Option<String>,
    pub quantity: i32,
    #[serde(with = "rust_decimal::serde::float")]
    pub unit_price: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub discount: Decimal,
    /// Expected to equal `quantity * unit_price - discount`; not enforced.
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A quote with its contact, company and owner, plus items on the detail endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteView {
    #[serde(flatten)]
    pub quote: Quote,
    pub contact: Option<Contact>,
    pub company: Option<Company>,
    pub owner: Option<User>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<QuoteItem>>,
}
