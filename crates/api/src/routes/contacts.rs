//! Contact endpoints.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::get,
};
use tracing::instrument;

use crm_core::models::{Contact, ContactView};
use crm_core::{ApiResponse, ContactId, Page};

use super::{Envelope, created};
use crate::db::ContactRepository;
use crate::error::{AppError, Result};
use crate::extract::{Id, JsonBody, ListParams, QueryParams};
use crate::middleware::CurrentUser;
use crate::models::{ContactInput, InputDocument};
use crate::services::RelationLoader;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/contacts", get(index).post(create))
        .route("/contacts/{id}", get(show).put(update).delete(destroy))
}

async fn find(state: &AppState, caller: &CurrentUser, id: ContactId) -> Result<Contact> {
    ContactRepository::new(state.pool())
        .get(id, state.owner_scope(caller.user.id))
        .await?
        .ok_or_else(|| AppError::not_found("Contact"))
}

/// The caller's contacts, searchable by name or email.
///
/// # Errors
///
/// Returns 500 if a query fails.
#[instrument(skip_all, fields(user_id = %caller.user.id))]
pub async fn index(
    State(state): State<AppState>,
    caller: CurrentUser,
    QueryParams(params): QueryParams<ListParams>,
) -> Result<Json<Page<ContactView>>> {
    let page = params.page_request(&state.config().pagination);
    let (rows, total) = ContactRepository::new(state.pool())
        .list(caller.user.id, params.search.as_deref(), page)
        .await?;
    let views = RelationLoader::new(state.pool()).contacts(rows).await?;

    Ok(Json(Page::new(views, page.page, page.per_page, total)))
}

/// # Errors
///
/// Returns 404 if the contact does not exist.
pub async fn show(
    State(state): State<AppState>,
    caller: CurrentUser,
    Id(id): Id<ContactId>,
) -> Result<Envelope<ContactView>> {
    let contact = find(&state, &caller, id).await?;
    let view = RelationLoader::new(state.pool()).contact(contact).await?;

    Ok(Json(ApiResponse::data(view)))
}

/// # Errors
///
/// Returns 422 if validation fails or `company_id` is unknown.
#[instrument(skip_all, fields(user_id = %caller.user.id))]
pub async fn create(
    State(state): State<AppState>,
    caller: CurrentUser,
    JsonBody(body): JsonBody,
) -> Result<(StatusCode, Envelope<ContactView>)> {
    let input = ContactInput::from_body(body)?;
    let contact = ContactRepository::new(state.pool())
        .create(caller.user.id, &input)
        .await?;
    tracing::info!(contact_id = %contact.id, "Contact created");

    let view = RelationLoader::new(state.pool()).contact(contact).await?;
    Ok(created("Contact created successfully", view))
}

/// # Errors
///
/// Returns 404 if the contact does not exist and 422 if the merged document
/// fails validation.
#[instrument(skip_all, fields(user_id = %caller.user.id, contact_id = %id))]
pub async fn update(
    State(state): State<AppState>,
    caller: CurrentUser,
    Id(id): Id<ContactId>,
    JsonBody(body): JsonBody,
) -> Result<Envelope<ContactView>> {
    let current = find(&state, &caller, id).await?;
    let input = ContactInput::from(&current).merge(body)?;

    let contact = ContactRepository::new(state.pool())
        .update(id, &input)
        .await?
        .ok_or_else(|| AppError::not_found("Contact"))?;

    let view = RelationLoader::new(state.pool()).contact(contact).await?;
    Ok(Json(ApiResponse::with_message("Contact updated successfully", view)))
}

/// # Errors
///
/// Returns 404 if the contact does not exist.
#[instrument(skip_all, fields(user_id = %caller.user.id, contact_id = %id))]
pub async fn destroy(
    State(state): State<AppState>,
    caller: CurrentUser,
    Id(id): Id<ContactId>,
) -> Result<Envelope<()>> {
    let deleted = ContactRepository::new(state.pool())
        .delete(id, state.owner_scope(caller.user.id))
        .await?;
    if !deleted {
        return Err(AppError::not_found("Contact"));
    }

    tracing::info!("Contact deleted");
    Ok(Json(ApiResponse::message("Contact deleted successfully")))
}
