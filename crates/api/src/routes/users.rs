//! Assignment candidates.

use axum::{Json, Router, extract::State, routing::get};

use crm_core::ApiResponse;
use crm_core::models::User;

use crate::db::UserRepository;
use crate::error::Result;
use crate::middleware::CurrentUser;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/users", get(index))
}

/// Every user except the caller, by name.
///
/// # Errors
///
/// Returns 500 if the query fails.
pub async fn index(
    State(state): State<AppState>,
    caller: CurrentUser,
) -> Result<Json<ApiResponse<Vec<User>>>> {
    let users = UserRepository::new(state.pool())
        .list_except(caller.user.id)
        .await?;

    Ok(Json(ApiResponse::data(users)))
}
