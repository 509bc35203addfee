//! Company endpoints.

use axum::{Json, Router, extract::State, http::StatusCode, routing::get};
use tracing::instrument;

use crm_core::models::{Company, CompanyView};
use crm_core::{ApiResponse, CompanyId, Page};

use super::{Envelope, created};
use crate::db::CompanyRepository;
use crate::error::{AppError, Result};
use crate::extract::{Id, JsonBody, ListParams, QueryParams};
use crate::middleware::CurrentUser;
use crate::models::{CompanyInput, InputDocument};
use crate::services::RelationLoader;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/companies", get(index).post(create))
        .route("/companies/{id}", get(show).put(update).delete(destroy))
}

async fn find(state: &AppState, caller: &CurrentUser, id: CompanyId) -> Result<Company> {
    CompanyRepository::new(state.pool())
        .get(id, state.owner_scope(caller.user.id))
        .await?
        .ok_or_else(|| AppError::not_found("Company"))
}

/// The caller's companies, searchable by name.
///
/// # Errors
///
/// Returns 500 if a query fails.
#[instrument(skip_all, fields(user_id = %caller.user.id))]
pub async fn index(
    State(state): State<AppState>,
    caller: CurrentUser,
    QueryParams(params): QueryParams<ListParams>,
) -> Result<Json<Page<CompanyView>>> {
    let page = params.page_request(&state.config().pagination);
    let (rows, total) = CompanyRepository::new(state.pool())
        .list(caller.user.id, params.search.as_deref(), page)
        .await?;
    let views = RelationLoader::new(state.pool())
        .companies_with_owner(rows)
        .await?;

    Ok(Json(Page::new(views, page.page, page.per_page, total)))
}

/// A company with its owner, contacts and deals.
///
/// # Errors
///
/// Returns 404 if the company does not exist.
pub async fn show(
    State(state): State<AppState>,
    caller: CurrentUser,
    Id(id): Id<CompanyId>,
) -> Result<Envelope<CompanyView>> {
    let company = find(&state, &caller, id).await?;
    let view = RelationLoader::new(state.pool()).company_detail(company).await?;

    Ok(Json(ApiResponse::data(view)))
}

/// # Errors
///
/// Returns 422 if validation fails.
#[instrument(skip_all, fields(user_id = %caller.user.id))]
pub async fn create(
    State(state): State<AppState>,
    caller: CurrentUser,
    JsonBody(body): JsonBody,
) -> Result<(StatusCode, Envelope<CompanyView>)> {
    let input = CompanyInput::from_body(body)?;
    let company = CompanyRepository::new(state.pool())
        .create(caller.user.id, &input)
        .await?;
    tracing::info!(company_id = %company.id, "Company created");

    let view = RelationLoader::new(state.pool()).company(company).await?;
    Ok(created("Company created successfully", view))
}

/// # Errors
///
/// Returns 404 if the company does not exist and 422 if the merged document
/// fails validation.
#[instrument(skip_all, fields(user_id = %caller.user.id, company_id = %id))]
pub async fn update(
    State(state): State<AppState>,
    caller: CurrentUser,
    Id(id): Id<CompanyId>,
    JsonBody(body): JsonBody,
) -> Result<Envelope<CompanyView>> {
    let current = find(&state, &caller, id).await?;
    let input = CompanyInput::from(&current).merge(body)?;

    let company = CompanyRepository::new(state.pool())
        .update(id, &input)
        .await?
        .ok_or_else(|| AppError::not_found("Company"))?;

    let view = RelationLoader::new(state.pool()).company(company).await?;
    Ok(Json(ApiResponse::with_message("Company updated successfully", view)))
}

/// Delete a company. Its contacts and deals are kept with `company_id`
/// cleared.
///
/// # Errors
///
/// Returns 404 if the company does not exist.
#[instrument(skip_all, fields(user_id = %caller.user.id, company_id = %id))]
pub async fn destroy(
    State(state): State<AppState>,
    caller: CurrentUser,
    Id(id): Id<CompanyId>,
) -> Result<Envelope<()>> {
    let deleted = CompanyRepository::new(state.pool())
        .delete(id, state.owner_scope(caller.user.id))
        .await?;
    if !deleted {
        return Err(AppError::not_found("Company"));
    }

    tracing::info!("Company deleted");
    Ok(Json(ApiResponse::message("Company deleted successfully")))
}
