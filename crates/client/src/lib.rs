//! Typed HTTP client for the CRM API.
//!
//! Wraps the JSON envelope so callers get records back and failures as
//! [`ClientError::Api`] carrying the server's message and field errors.
//!
//! ```rust,ignore
//! let client = CrmClient::new("https://crm.example.com/api")?;
//! client.login("ada@example.com", "secret").await?;
//!
//! let stats = client.dashboard().await?;
//! let open = client.tasks().list(&ListQuery::new().status("pending")).await?;
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

mod error;
pub mod resources;

pub use error::ClientError;
pub use resources::{
    Activities, Addressable, Companies, Contacts, Deals, Invoices, ListQuery, Products, Quotes,
    Resource, ResourceClient, Tasks,
};

use std::sync::{Arc, PoisonError, RwLock};

use reqwest::header::{ACCEPT, HeaderValue};
use reqwest::{Method, RequestBuilder, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use url::Url;

use crm_core::models::{AuthPayload, DashboardStats, UploadedPhoto, User};
use crm_core::{ApiResponse, CompanyId, ContactId, Page};

use crate::error::decode_error;

/// CRM API client.
///
/// Cheap to clone; clones share the connection pool and the bearer token.
#[derive(Clone)]
pub struct CrmClient {
    inner: Arc<CrmClientInner>,
}

struct CrmClientInner {
    http: reqwest::Client,
    base_url: Url,
    token: RwLock<Option<SecretString>>,
}

/// A photo to upload.
#[derive(Debug, Clone)]
pub struct Photo {
    pub file_name: String,
    /// MIME type, e.g. `image/png`.
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// What an uploaded photo belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoTarget {
    pub entity_type: String,
    pub entity_id: Option<i64>,
}

impl PhotoTarget {
    /// Store the photo and set it as the contact's avatar.
    #[must_use]
    pub fn contact(id: ContactId) -> Self {
        Self {
            entity_type: "contact".to_string(),
            entity_id: Some(id.as_i64()),
        }
    }

    /// Store the photo and set it as the company's logo.
    #[must_use]
    pub fn company(id: CompanyId) -> Self {
        Self {
            entity_type: "company".to_string(),
            entity_id: Some(id.as_i64()),
        }
    }

    /// Store the photo without attaching it to a record.
    #[must_use]
    pub fn detached(entity_type: impl Into<String>) -> Self {
        Self {
            entity_type: entity_type.into(),
            entity_id: None,
        }
    }
}

impl CrmClient {
    /// Create a client for the API rooted at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns error if the URL is invalid or the HTTP client fails to build.
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("crm-client/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            inner: Arc::new(CrmClientInner {
                http,
                base_url: normalize_base(base_url)?,
                token: RwLock::new(None),
            }),
        })
    }

    /// Use an already issued bearer token.
    #[must_use]
    pub fn with_token(self, token: impl Into<String>) -> Self {
        self.set_token(Some(token.into()));
        self
    }

    /// Replace or clear the bearer token.
    pub fn set_token(&self, token: Option<String>) {
        let mut slot = self
            .inner
            .token
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        *slot = token.map(SecretString::from);
    }

    #[must_use]
    pub fn has_token(&self) -> bool {
        self.inner
            .token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    // -------------------------------------------------------------------------
    // Auth
    // -------------------------------------------------------------------------

    /// Log in and keep the issued token for later calls.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Api`] with `Invalid credentials` on 401.
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthPayload, ClientError> {
        let payload: AuthPayload = self
            .post("auth/login", &json!({ "email": email, "password": password }))
            .await?;
        self.set_token(Some(payload.token.clone()));
        tracing::debug!(user_id = %payload.user.id, "Logged in");
        Ok(payload)
    }

    /// Create an account and keep the issued token.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Api`] with field errors on 422.
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<AuthPayload, ClientError> {
        let body = json!({
            "name": name,
            "email": email,
            "password": password,
            "password_confirmation": password,
        });
        let payload: AuthPayload = self.post("auth/register", &body).await?;
        self.set_token(Some(payload.token.clone()));
        Ok(payload)
    }

    /// Revoke the current token and forget it.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the token was already invalid.
    pub async fn logout(&self) -> Result<(), ClientError> {
        let url = self.endpoint("auth/logout")?;
        let response = self.request(Method::POST, url).send().await?;
        Self::expect_success(response).await?;
        self.set_token(None);
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`ClientError::Api`] with status 401 without a valid token.
    pub async fn current_user(&self) -> Result<User, ClientError> {
        self.get("auth/user").await
    }

    // -------------------------------------------------------------------------
    // Resources
    // -------------------------------------------------------------------------

    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn dashboard(&self) -> Result<DashboardStats, ClientError> {
        self.get("dashboard").await
    }

    /// All users, for assignment pickers.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn users(&self) -> Result<Vec<User>, ClientError> {
        self.get("users").await
    }

    #[must_use]
    pub const fn contacts(&self) -> ResourceClient<'_, Contacts> {
        ResourceClient::new(self)
    }

    #[must_use]
    pub const fn companies(&self) -> ResourceClient<'_, Companies> {
        ResourceClient::new(self)
    }

    #[must_use]
    pub const fn deals(&self) -> ResourceClient<'_, Deals> {
        ResourceClient::new(self)
    }

    #[must_use]
    pub const fn tasks(&self) -> ResourceClient<'_, Tasks> {
        ResourceClient::new(self)
    }

    #[must_use]
    pub const fn activities(&self) -> ResourceClient<'_, Activities> {
        ResourceClient::new(self)
    }

    #[must_use]
    pub const fn products(&self) -> ResourceClient<'_, Products> {
        ResourceClient::new(self)
    }

    #[must_use]
    pub const fn quotes(&self) -> ResourceClient<'_, Quotes> {
        ResourceClient::new(self)
    }

    #[must_use]
    pub const fn invoices(&self) -> ResourceClient<'_, Invoices> {
        ResourceClient::new(self)
    }

    /// Upload a photo as `multipart/form-data`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Api`] with a `photo` field error for a wrong
    /// type or size.
    pub async fn upload_photo(
        &self,
        photo: Photo,
        target: PhotoTarget,
    ) -> Result<UploadedPhoto, ClientError> {
        let mut part = reqwest::multipart::Part::bytes(photo.bytes).file_name(photo.file_name);
        if let Some(content_type) = &photo.content_type {
            part = part.mime_str(content_type)?;
        }

        let mut form = reqwest::multipart::Form::new()
            .part("photo", part)
            .text("entity_type", target.entity_type);
        if let Some(id) = target.entity_id {
            form = form.text("entity_id", id.to_string());
        }

        let url = self.endpoint("upload/photo")?;
        let response = self.request(Method::POST, url).multipart(form).send().await?;
        Self::handle_response(response).await
    }

    // -------------------------------------------------------------------------
    // Transport
    // -------------------------------------------------------------------------

    fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        Ok(self.inner.base_url.join(path.trim_start_matches('/'))?)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self
            .inner
            .http
            .request(method, url)
            .header(ACCEPT, HeaderValue::from_static("application/json"));

        let token = self
            .inner
            .token
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        match token.as_ref() {
            Some(token) => builder.bearer_auth(token.expose_secret()),
            None => builder,
        }
    }

    /// GET an enveloped record.
    pub(crate) async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let url = self.endpoint(path)?;
        let response = self.request(Method::GET, url).send().await?;
        Self::handle_response(response).await
    }

    /// GET a list page.
    pub(crate) async fn get_page<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Page<T>, ClientError> {
        let mut url = self.endpoint(path)?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }

        let response = self.request(Method::GET, url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Self::parse_error(response).await);
        }

        response
            .json()
            .await
            .map_err(|e| ClientError::Parse(format!("Failed to parse page: {e}")))
    }

    pub(crate) async fn post<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        let url = self.endpoint(path)?;
        let response = self.request(Method::POST, url).json(body).send().await?;
        Self::handle_response(response).await
    }

    pub(crate) async fn put<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        let url = self.endpoint(path)?;
        let response = self.request(Method::PUT, url).json(body).send().await?;
        Self::handle_response(response).await
    }

    pub(crate) async fn delete(&self, path: &str) -> Result<(), ClientError> {
        let url = self.endpoint(path)?;
        let response = self.request(Method::DELETE, url).send().await?;
        Self::expect_success(response).await
    }

    /// Unwrap `data` from a success envelope.
    async fn handle_response<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
        if !response.status().is_success() {
            return Err(Self::parse_error(response).await);
        }

        let envelope: ApiResponse<T> = response
            .json()
            .await
            .map_err(|e| ClientError::Parse(format!("Failed to parse response: {e}")))?;
        envelope.data.ok_or(ClientError::MissingData)
    }

    async fn expect_success(response: Response) -> Result<(), ClientError> {
        if response.status().is_success() {
            return Ok(());
        }
        Err(Self::parse_error(response).await)
    }

    async fn parse_error(response: Response) -> ClientError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        tracing::debug!(status = status.as_u16(), "CRM API request failed");
        decode_error(status, &body)
    }
}

impl std::fmt::Debug for CrmClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrmClient")
            .field("base_url", &self.inner.base_url.as_str())
            .field("authenticated", &self.has_token())
            .finish_non_exhaustive()
    }
}

/// Parse the base URL so relative joins append to its path.
fn normalize_base(base_url: &str) -> Result<Url, ClientError> {
    let mut url = Url::parse(base_url.trim())?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}
