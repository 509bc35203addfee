//! Registration, login and session endpoints.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use tracing::instrument;

use crm_core::ApiResponse;
use crm_core::models::{AuthPayload, User};

use crate::error::{Result, clear_sentry_user};
use crate::extract::JsonBody;
use crate::middleware::CurrentUser;
use crate::models::{InputDocument, LoginInput, RegisterInput};
use crate::services::AuthService;
use crate::state::AppState;

/// Build the auth router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/register", post(register))
        .route("/auth/logout", post(logout))
        .route("/auth/user", get(current_user))
}

/// Exchange credentials for a bearer token.
///
/// # Errors
///
/// Returns 422 for a malformed body and 401 for wrong credentials.
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    JsonBody(body): JsonBody,
) -> Result<Json<ApiResponse<AuthPayload>>> {
    let input = LoginInput::from_body(body)?;
    let payload = AuthService::new(state.pool(), state.config())
        .login(&input)
        .await?;

    Ok(Json(ApiResponse::with_message("Login successful", payload)))
}

/// Create a `user`-role account and log it in.
///
/// # Errors
///
/// Returns 422 for invalid fields or an email that is already registered.
#[instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    JsonBody(body): JsonBody,
) -> Result<(StatusCode, Json<ApiResponse<AuthPayload>>)> {
    let input = RegisterInput::from_body(body)?;
    let payload = AuthService::new(state.pool(), state.config())
        .register(&input)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message("Registration successful", payload)),
    ))
}

/// Revoke the token used for this request.
///
/// # Errors
///
/// Returns 500 if the token cannot be deleted.
#[instrument(skip_all, fields(user_id = %caller.user.id))]
pub async fn logout(
    State(state): State<AppState>,
    caller: CurrentUser,
) -> Result<Json<ApiResponse<()>>> {
    AuthService::new(state.pool(), state.config())
        .logout(caller.token_id)
        .await?;
    clear_sentry_user();

    tracing::info!("User logged out");
    Ok(Json(ApiResponse::message("Logout successful")))
}

/// The authenticated user.
pub async fn current_user(caller: CurrentUser) -> Json<ApiResponse<User>> {
    Json(ApiResponse::data(caller.user))
}
