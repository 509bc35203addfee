//! Deals (sales opportunities).

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{Company, Contact, User};
use crate::types::{CompanyId, ContactId, DealId, DealStage, UserId};

/// A sales opportunity moving through the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct Deal {
    pub id: DealId,
    pub name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub currency: String,
    pub stage: DealStage,
    /// Win likelihood in percent.
    pub probability: i32,
    pub expected_close_date: Option<NaiveDate>,
    pub contact_id: Option<ContactId>,
    pub company_id: Option<CompanyId>,
    pub owner_id: UserId,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A deal with its contact, company and owner attached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DealView {
    #[serde(flatten)]
    pub deal: Deal,
    pub contact: Option<Contact>,
    pub company: Option<Company>,
    pub owner: Option<User>,
}
