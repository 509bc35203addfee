//! Attach related records to entity rows.
//!
//! Every loader works on a batch: it collects the foreign keys of all rows,
//! fetches each related table once and stitches the results in. Single
//! records go through the same path.

use std::collections::HashMap;

use sqlx::PgPool;

use crm_core::models::{
    Activity, ActivityView, Company, CompanyView, Contact, ContactView, Deal, DealView, Invoice,
    InvoiceView, Quote, QuoteView, Task, TaskView, User,
};
use crm_core::{CompanyId, ContactId, UserId};

use crate::db::{
    CompanyRepository, ContactRepository, DealRepository, InvoiceRepository, QuoteRepository,
    RepositoryError, UserRepository,
};

/// Loads relations for entity views.
pub struct RelationLoader<'a> {
    pool: &'a PgPool,
}

impl<'a> RelationLoader<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    async fn users(&self, ids: impl Iterator<Item = UserId>) -> Result<HashMap<UserId, User>, RepositoryError> {
        let ids = dedup(ids);
        UserRepository::new(self.pool).get_many(&ids).await
    }

    async fn companies(
        &self,
        ids: impl Iterator<Item = CompanyId>,
    ) -> Result<HashMap<CompanyId, Company>, RepositoryError> {
        let ids = dedup(ids);
        CompanyRepository::new(self.pool).get_many(&ids).await
    }

    async fn contacts_by_id(
        &self,
        ids: impl Iterator<Item = ContactId>,
    ) -> Result<HashMap<ContactId, Contact>, RepositoryError> {
        let ids = dedup(ids);
        ContactRepository::new(self.pool).get_many(&ids).await
    }

    // =========================================================================
    // Contacts and companies
    // =========================================================================

    /// Contacts with their company and owner.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a lookup fails.
    pub async fn contacts(&self, rows: Vec<Contact>) -> Result<Vec<ContactView>, RepositoryError> {
        let companies = self.companies(rows.iter().filter_map(|c| c.company_id)).await?;
        let owners = self.users(rows.iter().map(|c| c.owner_id)).await?;

        Ok(rows
            .into_iter()
            .map(|contact| ContactView {
                company: contact.company_id.and_then(|id| companies.get(&id).cloned()),
                owner: owners.get(&contact.owner_id).cloned(),
                contact,
            })
            .collect())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a lookup fails.
    pub async fn contact(&self, row: Contact) -> Result<ContactView, RepositoryError> {
        single(self.contacts(vec![row]).await?)
    }

    /// Companies with their owner.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a lookup fails.
    pub async fn companies_with_owner(
        &self,
        rows: Vec<Company>,
    ) -> Result<Vec<CompanyView>, RepositoryError> {
        let owners = self.users(rows.iter().map(|c| c.owner_id)).await?;

        Ok(rows
            .into_iter()
            .map(|company| CompanyView {
                owner: owners.get(&company.owner_id).cloned(),
                company,
                contacts: None,
                deals: None,
            })
            .collect())
    }

    /// A company with its owner.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a lookup fails.
    pub async fn company(&self, row: Company) -> Result<CompanyView, RepositoryError> {
        single(self.companies_with_owner(vec![row]).await?)
    }

    /// A company with its owner, contacts and deals.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a lookup fails.
    pub async fn company_detail(&self, row: Company) -> Result<CompanyView, RepositoryError> {
        let contacts = ContactRepository::new(self.pool).list_by_company(row.id).await?;
        let deals = DealRepository::new(self.pool).list_by_company(row.id).await?;

        let mut view = self.company(row).await?;
        view.contacts = Some(contacts);
        view.deals = Some(deals);
        Ok(view)
    }

    // =========================================================================
    // Pipeline
    // =========================================================================

    /// Deals with their contact, company and owner.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a lookup fails.
    pub async fn deals(&self, rows: Vec<Deal>) -> Result<Vec<DealView>, RepositoryError> {
        let contacts = self.contacts_by_id(rows.iter().filter_map(|d| d.contact_id)).await?;
        let companies = self.companies(rows.iter().filter_map(|d| d.company_id)).await?;
        let owners = self.users(rows.iter().map(|d| d.owner_id)).await?;

        Ok(rows
            .into_iter()
            .map(|deal| DealView {
                contact: deal.contact_id.and_then(|id| contacts.get(&id).cloned()),
                company: deal.company_id.and_then(|id| companies.get(&id).cloned()),
                owner: owners.get(&deal.owner_id).cloned(),
                deal,
            })
            .collect())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a lookup fails.
    pub async fn deal(&self, row: Deal) -> Result<DealView, RepositoryError> {
        single(self.deals(vec![row]).await?)
    }

    /// Tasks with their assignee and owner.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a lookup fails.
    pub async fn tasks(&self, rows: Vec<Task>) -> Result<Vec<TaskView>, RepositoryError> {
        let users = self
            .users(rows.iter().flat_map(|t| [t.assigned_to, t.owner_id]))
            .await?;

        Ok(rows
            .into_iter()
            .map(|task| TaskView {
                assignee: users.get(&task.assigned_to).cloned(),
                owner: users.get(&task.owner_id).cloned(),
                task,
            })
            .collect())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a lookup fails.
    pub async fn task(&self, row: Task) -> Result<TaskView, RepositoryError> {
        single(self.tasks(vec![row]).await?)
    }

    /// Activities with their owner.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a lookup fails.
    pub async fn activities(&self, rows: Vec<Activity>) -> Result<Vec<ActivityView>, RepositoryError> {
        let owners = self.users(rows.iter().map(|a| a.owner_id)).await?;

        Ok(rows
            .into_iter()
            .map(|activity| ActivityView {
                owner: owners.get(&activity.owner_id).cloned(),
                activity,
            })
            .collect())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a lookup fails.
    pub async fn activity(&self, row: Activity) -> Result<ActivityView, RepositoryError> {
        single(self.activities(vec![row]).await?)
    }

    // =========================================================================
    // Sales documents
    // =========================================================================

    /// Quotes with their contact, company and owner. Items are not loaded.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a lookup fails.
    pub async fn quotes(&self, rows: Vec<Quote>) -> Result<Vec<QuoteView>, RepositoryError> {
        let contacts = self.contacts_by_id(rows.iter().map(|q| q.contact_id)).await?;
        let companies = self.companies(rows.iter().filter_map(|q| q.company_id)).await?;
        let owners = self.users(rows.iter().map(|q| q.owner_id)).await?;

        Ok(rows
            .into_iter()
            .map(|quote| QuoteView {
                contact: contacts.get(&quote.contact_id).cloned(),
                company: quote.company_id.and_then(|id| companies.get(&id).cloned()),
                owner: owners.get(&quote.owner_id).cloned(),
                quote,
                items: None,
            })
            .collect())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a lookup fails.
    pub async fn quote(&self, row: Quote) -> Result<QuoteView, RepositoryError> {
        single(self.quotes(vec![row]).await?)
    }

    /// A quote with its relations and line items.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a lookup fails.
    pub async fn quote_detail(&self, row: Quote) -> Result<QuoteView, RepositoryError> {
        let items = QuoteRepository::new(self.pool).items(row.id).await?;
        let mut view = self.quote(row).await?;
        view.items = Some(items);
        Ok(view)
    }

    /// Invoices with their contact, company and owner. Items and payments
    /// are not loaded.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a lookup fails.
    pub async fn invoices(&self, rows: Vec<Invoice>) -> Result<Vec<InvoiceView>, RepositoryError> {
        let contacts = self.contacts_by_id(rows.iter().map(|i| i.contact_id)).await?;
        let companies = self.companies(rows.iter().filter_map(|i| i.company_id)).await?;
        let owners = self.users(rows.iter().map(|i| i.owner_id)).await?;

        Ok(rows
            .into_iter()
            .map(|invoice| InvoiceView {
                contact: contacts.get(&invoice.contact_id).cloned(),
                company: invoice.company_id.and_then(|id| companies.get(&id).cloned()),
                owner: owners.get(&invoice.owner_id).cloned(),
                invoice,
                items: None,
                payments: None,
            })
            .collect())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a lookup fails.
    pub async fn invoice(&self, row: Invoice) -> Result<InvoiceView, RepositoryError> {
        single(self.invoices(vec![row]).await?)
    }

    /// An invoice with its relations, line items and payments.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a lookup fails.
    pub async fn invoice_detail(&self, row: Invoice) -> Result<InvoiceView, RepositoryError> {
        let repo = InvoiceRepository::new(self.pool);
        let items = repo.items(row.id).await?;
        let payments = repo.payments(row.id).await?;

        let mut view = self.invoice(row).await?;
        view.items = Some(items);
        view.payments = Some(payments);
        Ok(view)
    }
}

/// Sorted, duplicate-free key list for an `ANY($1)` lookup.
fn dedup<T: Ord>(ids: impl Iterator<Item = T>) -> Vec<T> {
    let mut ids: Vec<T> = ids.collect();
    ids.sort_unstable();
    ids.dedup();
    ids
}

fn single<T>(mut views: Vec<T>) -> Result<T, RepositoryError> {
    views
        .pop()
        .ok_or_else(|| RepositoryError::DataCorruption("relation load dropped a row".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dedup_sorts_and_removes_repeats() {
        let ids = dedup([UserId::new(3), UserId::new(1), UserId::new(3)].into_iter());
        assert_eq!(ids, vec![UserId::new(1), UserId::new(3)]);
    }

    #[test]
    fn test_dedup_empty() {
        let ids: Vec<UserId> = dedup(std::iter::empty());
        assert!(ids.is_empty());
    }

    #[test]
    fn test_single_of_empty_is_corruption() {
        let result: Result<u8, _> = single(Vec::new());
        assert!(matches!(result, Err(RepositoryError::DataCorruption(_))));
    }
}
