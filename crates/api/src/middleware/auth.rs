//! Bearer token authentication extractor.

use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header::AUTHORIZATION, request::Parts},
};

use crm_core::AccessTokenId;
use crm_core::models::User;

use crate::error::{AppError, set_sentry_user};
use crate::services::{AuthService, Authenticated};
use crate::state::AppState;

/// The authenticated caller, resolved from `Authorization: Bearer <token>`.
///
/// Rejects with 401 `Unauthenticated.` when the header is missing or the
/// token is malformed, unknown, revoked or expired.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(caller: CurrentUser) -> impl IntoResponse {
///     format!("Hello, {}!", caller.user.name)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user: User,
    /// The token used for this request (revoked on logout).
    pub token_id: AccessTokenId,
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let bearer = bearer_token(&parts.headers).ok_or(AppError::Unauthenticated)?;

        let auth = AuthService::new(state.pool(), state.config());
        let Authenticated { user, token_id } = auth.authenticate(bearer).await.map_err(|e| {
            if e.is_internal() {
                AppError::Auth(e)
            } else {
                tracing::debug!(error = %e, "Bearer token rejected");
                AppError::Unauthenticated
            }
        })?;

        set_sentry_user(&user.id, Some(user.email.as_str()));

        Ok(Self { user, token_id })
    }
}

/// Token from an `Authorization: Bearer ...` header. The scheme is matched
/// case-insensitively.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap_or_else(|_| HeaderValue::from_static("")));
        headers
    }

    #[test]
    fn test_bearer_token() {
        assert_eq!(bearer_token(&headers("Bearer 1|abc")), Some("1|abc"));
        assert_eq!(bearer_token(&headers("bearer  1|abc ")), Some("1|abc"));
    }

    #[test]
    fn test_bearer_token_missing_or_wrong_scheme() {
        assert_eq!(bearer_token(&HeaderMap::new()), None);
        assert_eq!(bearer_token(&headers("Basic dXNlcjpwYXNz")), None);
        assert_eq!(bearer_token(&headers("Bearer ")), None);
        assert_eq!(bearer_token(&headers("Bearer")), None);
    }
}
