//! Activity log endpoints. Activities are append-only: there is no update.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{delete, get},
};
use tracing::instrument;

use crm_core::models::ActivityView;
use crm_core::{ActivityId, ApiResponse, Page};

use super::{Envelope, created};
use crate::db::{ActivityFilter, ActivityRepository};
use crate::error::{AppError, Result};
use crate::extract::{Id, JsonBody, ListParams, QueryParams};
use crate::middleware::CurrentUser;
use crate::models::{ActivityInput, InputDocument};
use crate::services::RelationLoader;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/activities", get(index).post(create))
        .route("/activities/{id}", delete(destroy))
}

/// The caller's activities, filterable by type and by the record they are
/// attached to (`related_to_type` and `related_to_id` together).
///
/// # Errors
///
/// Returns 500 if a query fails.
#[instrument(skip_all, fields(user_id = %caller.user.id))]
pub async fn index(
    State(state): State<AppState>,
    caller: CurrentUser,
    QueryParams(params): QueryParams<ListParams>,
) -> Result<Json<Page<ActivityView>>> {
    let page = params.page_request(&state.config().pagination);
    let filter = ActivityFilter {
        kind: params.kind,
        related_to_type: params.related_to_type,
        related_to_id: params.related_to_id,
    };
    let (rows, total) = ActivityRepository::new(state.pool())
        .list(caller.user.id, &filter, page)
        .await?;
    let views = RelationLoader::new(state.pool()).activities(rows).await?;

    Ok(Json(Page::new(views, page.page, page.per_page, total)))
}

/// # Errors
///
/// Returns 422 if validation fails.
#[instrument(skip_all, fields(user_id = %caller.user.id))]
pub async fn create(
    State(state): State<AppState>,
    caller: CurrentUser,
    JsonBody(body): JsonBody,
) -> Result<(StatusCode, Envelope<ActivityView>)> {
    let input = ActivityInput::from_body(body)?;
    let activity = ActivityRepository::new(state.pool())
        .create(caller.user.id, &input)
        .await?;
    tracing::info!(activity_id = %activity.id, kind = %activity.kind, "Activity logged");

    let view = RelationLoader::new(state.pool()).activity(activity).await?;
    Ok(created("Activity created successfully", view))
}

/// # Errors
///
/// Returns 404 if the activity does not exist.
#[instrument(skip_all, fields(user_id = %caller.user.id, activity_id = %id))]
pub async fn destroy(
    State(state): State<AppState>,
    caller: CurrentUser,
    Id(id): Id<ActivityId>,
) -> Result<Envelope<()>> {
    let deleted = ActivityRepository::new(state.pool())
        .delete(id, state.owner_scope(caller.user.id))
        .await?;
    if !deleted {
        return Err(AppError::not_found("Activity"));
    }

    tracing::info!("Activity deleted");
    Ok(Json(ApiResponse::message("Activity deleted successfully")))
}
