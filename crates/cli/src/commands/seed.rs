//! Seed the database with demo CRM data.
//!
//! Reads companies, contacts and deals from a YAML file and inserts them for
//! an existing user. Records run through the same validation as the API.
//! Contacts and deals refer to earlier records by `key`:
//!
//! ```yaml
//! companies:
//!   - key: acme
//!     name: Acme Corp
//! contacts:
//!   - key: ada
//!     company: acme
//!     first_name: Ada
//!     last_name: Lovelace
//!     email: ada@acme.test
//! deals:
//!   - name: Acme renewal
//!     amount: 12000
//!     company: acme
//!     contact: ada
//! ```

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::info;

use crm_api::db::{CompanyRepository, ContactRepository, DealRepository, UserRepository};
use crm_api::models::{CompanyInput, ContactInput, DealInput, InputDocument};
use crm_core::{CompanyId, ContactId, Email};

use super::{CommandError, connect};

/// Top-level layout of a seed file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeedFile {
    #[serde(default)]
    pub companies: Vec<SeedRecord>,
    #[serde(default)]
    pub contacts: Vec<SeedRecord>,
    #[serde(default)]
    pub deals: Vec<SeedRecord>,
}

/// One record: API fields plus the seed-only reference keys.
#[derive(Debug, Deserialize)]
pub struct SeedRecord {
    /// Handle later records use to refer to this one.
    #[serde(default)]
    pub key: Option<String>,
    /// `key` of a company in the same file.
    #[serde(default)]
    pub company: Option<String>,
    /// `key` of a contact in the same file.
    #[serde(default)]
    pub contact: Option<String>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

/// Counts of inserted rows.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedSummary {
    pub companies: usize,
    pub contacts: usize,
    pub deals: usize,
}

/// Ids assigned to keyed records so far.
#[derive(Debug, Default)]
struct Keys {
    companies: HashMap<String, CompanyId>,
    contacts: HashMap<String, ContactId>,
}

impl Keys {
    /// Placeholder ids for every declared key, for validating before insert.
    fn declared(seed: &SeedFile) -> Self {
        let mut keys = Self::default();
        for key in seed.companies.iter().filter_map(|r| r.key.clone()) {
            keys.companies.insert(key, CompanyId::new(0));
        }
        for key in seed.contacts.iter().filter_map(|r| r.key.clone()) {
            keys.contacts.insert(key, ContactId::new(0));
        }
        keys
    }
}

/// Build the validated input for one record, resolving its references.
fn input<T: InputDocument>(
    section: &'static str,
    index: usize,
    record: &SeedRecord,
    keys: &Keys,
) -> Result<T, CommandError> {
    let invalid = |message: String| CommandError::SeedRecord {
        section,
        index,
        message,
    };

    let mut fields = record.fields.clone();
    if let Some(key) = &record.company {
        let id = keys
            .companies
            .get(key)
            .ok_or_else(|| invalid(format!("unknown company key '{key}'")))?;
        fields.insert("company_id".to_string(), Value::from(id.as_i64()));
    }
    if let Some(key) = &record.contact {
        let id = keys
            .contacts
            .get(key)
            .ok_or_else(|| invalid(format!("unknown contact key '{key}'")))?;
        fields.insert("contact_id".to_string(), Value::from(id.as_i64()));
    }

    T::from_body(fields).map_err(|errors| invalid(errors.to_string()))
}

/// Check every record before anything is written.
fn validate(seed: &SeedFile) -> Result<(), CommandError> {
    let keys = Keys::declared(seed);

    for (index, record) in seed.companies.iter().enumerate() {
        input::<CompanyInput>("company", index, record, &keys)?;
    }
    for (index, record) in seed.contacts.iter().enumerate() {
        input::<ContactInput>("contact", index, record, &keys)?;
    }
    for (index, record) in seed.deals.iter().enumerate() {
        input::<DealInput>("deal", index, record, &keys)?;
    }
    Ok(())
}

/// Seed demo data from a YAML file, owned by the user with `owner_email`.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, a record is
/// invalid, the owner does not exist, or an insert fails. Nothing is written
/// when the file fails validation.
pub async fn run(file_path: &str, owner_email: &str) -> Result<SeedSummary, CommandError> {
    let owner_email = Email::parse(owner_email)?;

    let path = Path::new(file_path);
    info!(path = %file_path, "Loading seed data from file");
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| CommandError::ReadFile {
            path: file_path.to_string(),
            source,
        })?;
    let seed: SeedFile = serde_yaml::from_str(&content)?;

    info!(
        companies = seed.companies.len(),
        contacts = seed.contacts.len(),
        deals = seed.deals.len(),
        "Parsed seed file"
    );
    validate(&seed)?;

    let pool = connect().await?;
    let owner = UserRepository::new(&pool)
        .get_by_email(&owner_email)
        .await?
        .ok_or_else(|| CommandError::UnknownOwner(owner_email.to_string()))?;

    let mut keys = Keys::default();
    let mut summary = SeedSummary::default();

    let companies = CompanyRepository::new(&pool);
    for (index, record) in seed.companies.iter().enumerate() {
        let doc: CompanyInput = input("company", index, record, &keys)?;
        let company = companies.create(owner.id, &doc).await?;
        if let Some(key) = &record.key {
            keys.companies.insert(key.clone(), company.id);
        }
        summary.companies += 1;
    }

    let contacts = ContactRepository::new(&pool);
    for (index, record) in seed.contacts.iter().enumerate() {
        let doc: ContactInput = input("contact", index, record, &keys)?;
        let contact = contacts.create(owner.id, &doc).await?;
        if let Some(key) = &record.key {
            keys.contacts.insert(key.clone(), contact.id);
        }
        summary.contacts += 1;
    }

    let deals = DealRepository::new(&pool);
    for (index, record) in seed.deals.iter().enumerate() {
        let doc: DealInput = input("deal", index, record, &keys)?;
        deals.create(owner.id, &doc).await?;
        summary.deals += 1;
    }

    info!("Seeding complete!");
    info!("  Companies inserted: {}", summary.companies);
    info!("  Contacts inserted: {}", summary.contacts);
    info!("  Deals inserted: {}", summary.deals);

    Ok(summary)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const DEMO: &str = include_str!("../../seeds/demo.yaml");

    #[test]
    fn test_demo_file_is_valid() {
        let seed: SeedFile = serde_yaml::from_str(DEMO).unwrap();

        assert!(!seed.companies.is_empty());
        assert!(!seed.contacts.is_empty());
        assert!(!seed.deals.is_empty());
        validate(&seed).unwrap();
    }

    #[test]
    fn test_reference_keys_are_resolved() {
        let seed: SeedFile = serde_yaml::from_str(
            "
contacts:
  - key: ada
    company: acme
    first_name: Ada
    last_name: Lovelace
    email: ada@acme.test
",
        )
        .unwrap();
        let mut keys = Keys::default();
        keys.companies.insert("acme".to_string(), CompanyId::new(42));

        let record = seed.contacts.first().unwrap();
        let contact: ContactInput = input("contact", 0, record, &keys).unwrap();
        assert_eq!(contact.company_id, Some(CompanyId::new(42)));
        assert_eq!(contact.first_name, "Ada");
    }

    #[test]
    fn test_unknown_reference_is_rejected() {
        let seed: SeedFile = serde_yaml::from_str(
            "
deals:
  - name: Orphan
    amount: 100
    company: nowhere
",
        )
        .unwrap();

        let err = validate(&seed).unwrap_err();
        assert!(matches!(
            err,
            CommandError::SeedRecord {
                section: "deal",
                index: 0,
                ..
            }
        ));
        assert!(err.to_string().contains("unknown company key 'nowhere'"));
    }

    #[test]
    fn test_invalid_record_fails_validation() {
        let seed: SeedFile = serde_yaml::from_str(
            "
contacts:
  - first_name: Grace
    email: not-an-email
",
        )
        .unwrap();

        let err = validate(&seed).unwrap_err();
        assert!(err.to_string().starts_with("Invalid contact #0"));
    }

    #[test]
    fn test_unknown_section_is_rejected() {
        assert!(serde_yaml::from_str::<SeedFile>("leads: []").is_err());
    }
}
