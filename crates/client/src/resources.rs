//! Typed handles for the CRUD resources.
//!
//! ```rust,ignore
//! let contacts = client.contacts().list(&ListQuery::new().search("ada")).await?;
//! let deal = client.deals().update_stage(deal_id, DealStage::ClosedWon).await?;
//! ```

use std::fmt::Display;
use std::marker::PhantomData;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::json;

use crm_core::models::{
    ActivityView, CompanyView, ContactView, DealView, InvoiceView, Payment, Product, QuoteView,
    TaskView,
};
use crm_core::{
    ActivityId, CompanyId, ContactId, DealId, DealStage, InvoiceId, Page, ProductId, QuoteId,
    TaskId, UserId,
};

use crate::{ClientError, CrmClient};

/// A collection served at `/{PATH}`.
pub trait Resource {
    const PATH: &'static str;
    type Id: Display + Copy;
    type Record: DeserializeOwned;
}

/// A resource that can be shown and updated by id.
pub trait Addressable: Resource {}

macro_rules! resource {
    ($marker:ident, $path:literal, $id:ty, $record:ty) => {
        #[derive(Debug, Clone, Copy)]
        pub struct $marker;

        impl Resource for $marker {
            const PATH: &'static str = $path;
            type Id = $id;
            type Record = $record;
        }
    };
}

resource!(Contacts, "contacts", ContactId, ContactView);
resource!(Companies, "companies", CompanyId, CompanyView);
resource!(Deals, "deals", DealId, DealView);
resource!(Tasks, "tasks", TaskId, TaskView);
resource!(Activities, "activities", ActivityId, ActivityView);
resource!(Products, "products", ProductId, Product);
resource!(Quotes, "quotes", QuoteId, QuoteView);
resource!(Invoices, "invoices", InvoiceId, InvoiceView);

impl Addressable for Contacts {}
impl Addressable for Companies {}
impl Addressable for Deals {}
impl Addressable for Tasks {}
impl Addressable for Products {}
impl Addressable for Quotes {}
impl Addressable for Invoices {}

/// Filters and paging for a list call. Unset fields are not sent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    pub search: Option<String>,
    pub status: Option<String>,
    pub stage: Option<String>,
    /// Activity type (`call`, `email`, ...), sent as `type`.
    pub kind: Option<String>,
    pub assigned_to: Option<UserId>,
    pub related_to_type: Option<String>,
    pub related_to_id: Option<i64>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl ListQuery {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    #[must_use]
    pub fn status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    #[must_use]
    pub fn stage(mut self, stage: DealStage) -> Self {
        self.stage = Some(stage.as_str().to_string());
        self
    }

    #[must_use]
    pub fn kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    #[must_use]
    pub const fn assigned_to(mut self, user: UserId) -> Self {
        self.assigned_to = Some(user);
        self
    }

    #[must_use]
    pub fn related_to(mut self, kind: impl Into<String>, id: i64) -> Self {
        self.related_to_type = Some(kind.into());
        self.related_to_id = Some(id);
        self
    }

    #[must_use]
    pub const fn page(mut self, page: i64, per_page: i64) -> Self {
        self.page = Some(page);
        self.per_page = Some(per_page);
        self
    }

    /// Query-string pairs in a stable order.
    pub(crate) fn pairs(&self) -> Vec<(&'static str, String)> {
        let text = [
            ("search", &self.search),
            ("status", &self.status),
            ("stage", &self.stage),
            ("type", &self.kind),
            ("related_to_type", &self.related_to_type),
        ];
        let numbers = [
            ("assigned_to", self.assigned_to.map(|id| id.as_i64())),
            ("related_to_id", self.related_to_id),
            ("per_page", self.per_page),
            ("page", self.page),
        ];

        text.into_iter()
            .filter_map(|(key, value)| value.clone().map(|v| (key, v)))
            .chain(
                numbers
                    .into_iter()
                    .filter_map(|(key, value)| value.map(|v| (key, v.to_string()))),
            )
            .collect()
    }
}

/// Handle for one resource, borrowed from a [`CrmClient`].
#[derive(Debug)]
pub struct ResourceClient<'a, R> {
    client: &'a CrmClient,
    _resource: PhantomData<R>,
}

impl<'a, R: Resource> ResourceClient<'a, R> {
    pub(crate) const fn new(client: &'a CrmClient) -> Self {
        Self {
            client,
            _resource: PhantomData,
        }
    }

    fn item_path(id: R::Id) -> String {
        format!("{}/{id}", R::PATH)
    }

    /// # Errors
    ///
    /// Returns an error if the request fails or the server rejects it.
    pub async fn list(&self, query: &ListQuery) -> Result<Page<R::Record>, ClientError> {
        self.client.get_page(R::PATH, &query.pairs()).await
    }

    /// Create a record from a JSON document.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Api`] with field errors on 422.
    pub async fn create<B: Serialize + Sync>(&self, body: &B) -> Result<R::Record, ClientError> {
        self.client.post(R::PATH, body).await
    }

    /// # Errors
    ///
    /// Returns an error if the request fails or the record is not found.
    pub async fn delete(&self, id: R::Id) -> Result<(), ClientError> {
        self.client.delete(&Self::item_path(id)).await
    }
}

impl<R: Addressable> ResourceClient<'_, R> {
    /// # Errors
    ///
    /// Returns an error if the request fails or the record is not found.
    pub async fn get(&self, id: R::Id) -> Result<R::Record, ClientError> {
        self.client.get(&Self::item_path(id)).await
    }

    /// Update a record. Only the keys present in `body` change.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Api`] with field errors on 422.
    pub async fn update<B: Serialize + Sync>(
        &self,
        id: R::Id,
        body: &B,
    ) -> Result<R::Record, ClientError> {
        self.client.put(&Self::item_path(id), body).await
    }
}

impl ResourceClient<'_, Deals> {
    /// Move a deal to another pipeline stage.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the deal is not found.
    pub async fn update_stage(&self, id: DealId, stage: DealStage) -> Result<DealView, ClientError> {
        let path = format!("deals/{id}/stage");
        self.client.put(&path, &json!({ "stage": stage })).await
    }
}

impl ResourceClient<'_, Tasks> {
    /// Mark a task completed.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the task is not found.
    pub async fn complete(&self, id: TaskId) -> Result<TaskView, ClientError> {
        let path = format!("tasks/{id}/complete");
        self.client.put(&path, &json!({})).await
    }
}

impl ResourceClient<'_, Invoices> {
    /// Record a payment against an invoice.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Api`] with field errors on 422.
    pub async fn record_payment<B: Serialize + Sync>(
        &self,
        id: InvoiceId,
        body: &B,
    ) -> Result<Payment, ClientError> {
        let path = format!("invoices/{id}/payments");
        self.client.post(&path, body).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_query_pairs_skip_unset() {
        assert!(ListQuery::new().pairs().is_empty());

        let pairs = ListQuery::new()
            .search("ada")
            .kind("call")
            .related_to("deal", 9)
            .page(2, 25)
            .pairs();

        assert_eq!(
            pairs,
            vec![
                ("search", "ada".to_string()),
                ("type", "call".to_string()),
                ("related_to_type", "deal".to_string()),
                ("related_to_id", "9".to_string()),
                ("per_page", "25".to_string()),
                ("page", "2".to_string()),
            ]
        );
    }

    #[test]
    fn test_list_query_stage_uses_label() {
        let pairs = ListQuery::new().stage(DealStage::Proposal).pairs();
        assert_eq!(pairs, vec![("stage", "Proposal/Price Quote".to_string())]);
    }

    #[test]
    fn test_item_paths() {
        assert_eq!(
            ResourceClient::<Contacts>::item_path(ContactId::new(5)),
            "contacts/5"
        );
        assert_eq!(Activities::PATH, "activities");
        assert_eq!(Products::PATH, "products");
    }
}
