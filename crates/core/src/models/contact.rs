//! Contacts: people in the pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Company, User};
use crate::types::{CompanyId, ContactId, Email, UserId};

/// A person, optionally working at a [`Company`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct Contact {
    pub id: ContactId,
    pub first_name: String,
    pub last_name: String,
    pub email: Email,
    pub phone: Option<String>,
    pub mobile: Option<String>,
    pub company_id: Option<CompanyId>,
    pub owner_id: UserId,
    /// Free-form qualification label (e.g. "Contacted").
    pub lead_status: Option<String>,
    /// Where the lead came from (e.g. "Web").
    pub source: Option<String>,
    /// Photo URL set by the upload endpoint.
    pub avatar: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Contact {
    /// "First Last".
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// A contact with its company and owner attached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactView {
    #[serde(flatten)]
    pub contact: Contact,
    pub company: Option<Company>,
    pub owner: Option<User>,
}
