//! Companies (accounts).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Contact, Deal, User};
use crate::types::{CompanyId, UserId};

/// An organization contacts work for and deals are made with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct Company {
    pub id: CompanyId,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub mobile: Option<String>,
    pub website: Option<String>,
    pub industry: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub zip_code: Option<String>,
    /// Logo URL set by the upload endpoint.
    pub logo: Option<String>,
    pub owner_id: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A company with its owner and, on the detail endpoint, its contacts and deals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanyView {
    #[serde(flatten)]
    pub company: Company,
    pub owner: Option<User>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contacts: Option<Vec<Contact>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deals: Option<Vec<Deal>>,
}
