//! Invoices, their line items and recorded payments.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{Company, Contact, User};
use crate::types::{
    CompanyId, ContactId, InvoiceId, InvoiceItemId, InvoiceStatus, PaymentId, ProductId,
    QuoteId, UserId,
};

/// A bill sent to a contact, optionally created from a quote.
///
/// `paid_amount` and `balance_due` are stored as submitted and are not
/// recomputed when payments are recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct Invoice {
    pub id: InvoiceId,
    /// `INV-<unix seconds>`, unique.
    pub invoice_number: String,
    pub quote_id: Option<QuoteId>,
    pub contact_id: ContactId,
    pub company_id: Option<CompanyId>,
    pub subject: String,
    pub status: InvoiceStatus,
    pub invoice_date: NaiveDate,
    pub due_date: NaiveDate,
    #[serde(with = "rust_decimal::serde::float")]
    pub subtotal: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub tax_amount: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub discount_amount: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total: Decimal,
    pub currency: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub paid_amount: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub balance_due: Decimal,
    pub terms: Option<String>,
    pub owner_id: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One line of an invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct InvoiceItem {
    pub id: InvoiceItemId,
    pub invoice_id: InvoiceId,
    pub product_id: Option<ProductId>,
    pub name: String,
    pub description: Option<String>,
    pub quantity: i32,
    #[serde(with = "rust_decimal::serde::float")]
    pub unit_price: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub discount: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Money received against an invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct Payment {
    pub id: PaymentId,
    pub invoice_id: InvoiceId,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub payment_date: NaiveDate,
    pub payment_method: String,
    pub reference: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An invoice with its contact, company and owner, plus items and payments on
/// the detail endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceView {
    #[serde(flatten)]
    pub invoice: Invoice,
    pub contact: Option<Contact>,
    pub company: Option<Company>,
    pub owner: Option<User>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<InvoiceItem>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payments: Option<Vec<Payment>>,
}
