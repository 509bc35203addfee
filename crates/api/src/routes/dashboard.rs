//! Dashboard route handler.

use axum::{Json, Router, extract::State, routing::get};
use chrono::Utc;
use tracing::instrument;

use crm_core::ApiResponse;
use crm_core::models::{DashboardStats, start_of_week};

use crate::db::DashboardRepository;
use crate::error::Result;
use crate::middleware::CurrentUser;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/dashboard", get(index))
}

/// Pipeline and workload summary for the caller.
///
/// # Errors
///
/// Returns 500 if an aggregate query fails.
#[instrument(skip_all, fields(user_id = %caller.user.id))]
pub async fn index(
    State(state): State<AppState>,
    caller: CurrentUser,
) -> Result<Json<ApiResponse<DashboardStats>>> {
    let now = Utc::now();
    let stats = DashboardRepository::new(state.pool())
        .stats(caller.user.id, now.date_naive(), start_of_week(now))
        .await?;

    Ok(Json(ApiResponse::data(stats)))
}
