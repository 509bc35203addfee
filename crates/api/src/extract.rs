//! Request extractors that reject with the JSON envelope.
//!
//! axum's stock `Json`, `Query` and `Path` extractors answer malformed input
//! with plain-text bodies. These wrappers turn every rejection into an
//! [`AppError`] so clients always receive `{"success": false, ...}`.

use std::fmt::Display;
use std::str::FromStr;

use axum::{
    body::Bytes,
    extract::{FromRequest, FromRequestParts, Path, Query, Request},
    http::request::Parts,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

use crate::config::PaginationConfig;
use crate::db::PageRequest;
use crate::error::AppError;

/// A JSON object request body, kept untyped until validation.
///
/// An empty body is an empty object.
#[derive(Debug, Clone, Default)]
pub struct JsonBody(pub Map<String, Value>);

impl<S> FromRequest<S> for JsonBody
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;

        parse_object(&bytes).map(Self)
    }
}

fn parse_object(bytes: &[u8]) -> Result<Map<String, Value>, AppError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Map::new());
    }

    match serde_json::from_slice::<Value>(bytes) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(AppError::BadRequest(
            "Request body must be a JSON object".to_string(),
        )),
        Err(e) => Err(AppError::BadRequest(format!("Invalid JSON: {e}"))),
    }
}

/// Query string extractor with an envelope rejection.
#[derive(Debug, Clone, Default)]
pub struct QueryParams<T>(pub T);

impl<T, S> FromRequestParts<S> for QueryParams<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Query::<T>::try_from_uri(&parts.uri)
            .map(|Query(value)| Self(value))
            .map_err(|e| AppError::BadRequest(e.body_text()))
    }
}

/// A numeric `{id}` path segment converted to a typed ID.
#[derive(Debug, Clone, Copy)]
pub struct Id<T>(pub T);

impl<T, S> FromRequestParts<S> for Id<T>
where
    T: From<i64> + Send,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Path::<i64>::from_request_parts(parts, state)
            .await
            .map(|Path(id)| Self(T::from(id)))
            .map_err(|_| AppError::BadRequest("Invalid ID".to_string()))
    }
}

/// Query parameters accepted by list endpoints.
///
/// Each endpoint reads only the filters it supports. Blank values count as
/// absent.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListParams {
    #[serde(default, deserialize_with = "blank_as_none")]
    pub search: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub stage: Option<String>,
    #[serde(default, rename = "type", deserialize_with = "blank_as_none")]
    pub kind: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub assigned_to: Option<i64>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub related_to_type: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub related_to_id: Option<i64>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub per_page: Option<i64>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub page: Option<i64>,
}

impl ListParams {
    /// Page window with `per_page` clamped to the configured bounds.
    #[must_use]
    pub fn page_request(&self, pagination: &PaginationConfig) -> PageRequest {
        PageRequest::new(self.page, pagination.per_page(self.per_page))
    }
}

fn blank_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: Display,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::Uri;
    use serde_json::json;

    use super::*;

    fn params(query: &str) -> ListParams {
        let uri: Uri = format!("/contacts?{query}").parse().unwrap();
        let Query(params) = Query::<ListParams>::try_from_uri(&uri).unwrap();
        params
    }

    #[test]
    fn test_empty_body_is_empty_object() {
        assert!(parse_object(b"").unwrap().is_empty());
        assert!(parse_object(b"  \n").unwrap().is_empty());
    }

    #[test]
    fn test_object_body() {
        let map = parse_object(br#"{"name": "Acme", "amount": 5000}"#).unwrap();
        assert_eq!(map.get("name"), Some(&json!("Acme")));
    }

    #[test]
    fn test_non_object_body_rejected() {
        assert!(matches!(parse_object(b"[1, 2]"), Err(AppError::BadRequest(_))));
        assert!(matches!(parse_object(b"\"x\""), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn test_malformed_body_rejected() {
        let err = parse_object(b"{\"name\": ").unwrap_err();
        assert!(err.to_string().starts_with("Invalid JSON"));
    }

    #[test]
    fn test_list_params() {
        let p = params("search=acme&type=call&assigned_to=4&per_page=50&page=2");
        assert_eq!(p.search.as_deref(), Some("acme"));
        assert_eq!(p.kind.as_deref(), Some("call"));
        assert_eq!(p.assigned_to, Some(4));
        assert_eq!(p.per_page, Some(50));
        assert_eq!(p.page, Some(2));
        assert!(p.status.is_none());
    }

    #[test]
    fn test_blank_params_are_absent() {
        let p = params("search=&status=%20&assigned_to=&page=");
        assert!(p.search.is_none());
        assert!(p.status.is_none());
        assert!(p.assigned_to.is_none());
        assert!(p.page.is_none());
    }

    #[test]
    fn test_non_numeric_param_rejected() {
        let uri: Uri = "/tasks?assigned_to=me".parse().unwrap();
        assert!(Query::<ListParams>::try_from_uri(&uri).is_err());
    }

    #[test]
    fn test_page_request_uses_clamp() {
        let p = params("per_page=500&page=3");
        let page = p.page_request(&PaginationConfig::default());
        assert_eq!(page.per_page, 100);
        assert_eq!(page.page, 3);
        assert_eq!(page.offset(), 200);
    }
}
