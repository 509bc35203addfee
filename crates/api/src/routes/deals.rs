//! Deal endpoints, including the stage-only update used by the pipeline board.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, put},
};
use tracing::instrument;

use crm_core::models::{Deal, DealView};
use crm_core::{ApiResponse, DealId, Page};

use super::{Envelope, created};
use crate::db::{DealFilter, DealRepository};
use crate::error::{AppError, Result};
use crate::extract::{Id, JsonBody, ListParams, QueryParams};
use crate::middleware::CurrentUser;
use crate::models::{DealInput, InputDocument, StageInput};
use crate::services::RelationLoader;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/deals", get(index).post(create))
        .route("/deals/{id}", get(show).put(update).delete(destroy))
        .route("/deals/{id}/stage", put(update_stage))
}

async fn find(state: &AppState, caller: &CurrentUser, id: DealId) -> Result<Deal> {
    DealRepository::new(state.pool())
        .get(id, state.owner_scope(caller.user.id))
        .await?
        .ok_or_else(|| AppError::not_found("Deal"))
}

/// The caller's deals, searchable by name and filterable by stage label.
///
/// # Errors
///
/// Returns 500 if a query fails.
#[instrument(skip_all, fields(user_id = %caller.user.id))]
pub async fn index(
    State(state): State<AppState>,
    caller: CurrentUser,
    QueryParams(params): QueryParams<ListParams>,
) -> Result<Json<Page<DealView>>> {
    let page = params.page_request(&state.config().pagination);
    let filter = DealFilter {
        search: params.search,
        stage: params.stage,
    };
    let (rows, total) = DealRepository::new(state.pool())
        .list(caller.user.id, &filter, page)
        .await?;
    let views = RelationLoader::new(state.pool()).deals(rows).await?;

    Ok(Json(Page::new(views, page.page, page.per_page, total)))
}

/// # Errors
///
/// Returns 404 if the deal does not exist.
pub async fn show(
    State(state): State<AppState>,
    caller: CurrentUser,
    Id(id): Id<DealId>,
) -> Result<Envelope<DealView>> {
    let deal = find(&state, &caller, id).await?;
    let view = RelationLoader::new(state.pool()).deal(deal).await?;

    Ok(Json(ApiResponse::data(view)))
}

/// Create a deal. Stage defaults to `New`, probability to 10 and currency
/// to USD.
///
/// # Errors
///
/// Returns 422 if validation fails or a referenced contact/company is unknown.
#[instrument(skip_all, fields(user_id = %caller.user.id))]
pub async fn create(
    State(state): State<AppState>,
    caller: CurrentUser,
    JsonBody(body): JsonBody,
) -> Result<(StatusCode, Envelope<DealView>)> {
    let input = DealInput::from_body(body)?;
    let deal = DealRepository::new(state.pool())
        .create(caller.user.id, &input)
        .await?;
    tracing::info!(deal_id = %deal.id, amount = %deal.amount, "Deal created");

    let view = RelationLoader::new(state.pool()).deal(deal).await?;
    Ok(created("Deal created successfully", view))
}

/// # Errors
///
/// Returns 404 if the deal does not exist and 422 if the merged document
/// fails validation.
#[instrument(skip_all, fields(user_id = %caller.user.id, deal_id = %id))]
pub async fn update(
    State(state): State<AppState>,
    caller: CurrentUser,
    Id(id): Id<DealId>,
    JsonBody(body): JsonBody,
) -> Result<Envelope<DealView>> {
    let current = find(&state, &caller, id).await?;
    let input = DealInput::from(&current).merge(body)?;

    let deal = DealRepository::new(state.pool())
        .update(id, &input)
        .await?
        .ok_or_else(|| AppError::not_found("Deal"))?;

    let view = RelationLoader::new(state.pool()).deal(deal).await?;
    Ok(Json(ApiResponse::with_message("Deal updated successfully", view)))
}

/// Move a deal to another stage without touching other fields.
///
/// # Errors
///
/// Returns 404 if the deal does not exist and 422 for an unknown stage.
#[instrument(skip_all, fields(user_id = %caller.user.id, deal_id = %id))]
pub async fn update_stage(
    State(state): State<AppState>,
    caller: CurrentUser,
    Id(id): Id<DealId>,
    JsonBody(body): JsonBody,
) -> Result<Envelope<DealView>> {
    find(&state, &caller, id).await?;
    let StageInput { stage } = StageInput::from_body(body)?;

    let deal = DealRepository::new(state.pool())
        .update_stage(id, stage)
        .await?
        .ok_or_else(|| AppError::not_found("Deal"))?;
    tracing::info!(stage = %deal.stage, "Deal stage changed");

    let view = RelationLoader::new(state.pool()).deal(deal).await?;
    Ok(Json(ApiResponse::with_message(
        "Deal stage updated successfully",
        view,
    )))
}

/// # Errors
///
/// Returns 404 if the deal does not exist.
#[instrument(skip_all, fields(user_id = %caller.user.id, deal_id = %id))]
pub async fn destroy(
    State(state): State<AppState>,
    caller: CurrentUser,
    Id(id): Id<DealId>,
) -> Result<Envelope<()>> {
    let deleted = DealRepository::new(state.pool())
        .delete(id, state.owner_scope(caller.user.id))
        .await?;
    if !deleted {
        return Err(AppError::not_found("Deal"));
    }

    tracing::info!("Deal deleted");
    Ok(Json(ApiResponse::message("Deal deleted successfully")))
}
