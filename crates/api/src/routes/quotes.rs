//! Quote endpoints.

use axum::{Json, Router, extract::State, http::StatusCode, routing::get};
use chrono::Utc;
use tracing::instrument;

use crm_core::models::{Quote, QuoteView};
use crm_core::{ApiResponse, DocumentKind, Page, QuoteId};

use super::{Envelope, created};
use crate::db::QuoteRepository;
use crate::error::{AppError, Result};
use crate::extract::{Id, JsonBody, ListParams, QueryParams};
use crate::middleware::CurrentUser;
use crate::models::{InputDocument, QuoteInput};
use crate::services::RelationLoader;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/quotes", get(index).post(create))
        .route("/quotes/{id}", get(show).put(update).delete(destroy))
}

async fn find(state: &AppState, caller: &CurrentUser, id: QuoteId) -> Result<Quote> {
    QuoteRepository::new(state.pool())
        .get(id, state.owner_scope(caller.user.id))
        .await?
        .ok_or_else(|| AppError::not_found("Quote"))
}

/// The caller's quotes, filterable by status.
///
/// # Errors
///
/// Returns 500 if a query fails.
#[instrument(skip_all, fields(user_id = %caller.user.id))]
pub async fn index(
    State(state): State<AppState>,
    caller: CurrentUser,
    QueryParams(params): QueryParams<ListParams>,
) -> Result<Json<Page<QuoteView>>> {
    let page = params.page_request(&state.config().pagination);
    let (rows, total) = QuoteRepository::new(state.pool())
        .list(caller.user.id, params.status.as_deref(), page)
        .await?;
    let views = RelationLoader::new(state.pool()).quotes(rows).await?;

    Ok(Json(Page::new(views, page.page, page.per_page, total)))
}

/// A quote with its relations and line items.
///
/// # Errors
///
/// Returns 404 if the quote does not exist.
pub async fn show(
    State(state): State<AppState>,
    caller: CurrentUser,
    Id(id): Id<QuoteId>,
) -> Result<Envelope<QuoteView>> {
    let quote = find(&state, &caller, id).await?;
    let view = RelationLoader::new(state.pool()).quote_detail(quote).await?;

    Ok(Json(ApiResponse::data(view)))
}

/// Create a quote numbered `QT-<unix seconds>`.
///
/// Two quotes created within the same second get the same number; the second
/// is rejected with 422 on `quote_number`.
///
/// # Errors
///
/// Returns 422 if validation fails, a reference is unknown or the number is
/// already used.
#[instrument(skip_all, fields(user_id = %caller.user.id))]
pub async fn create(
    State(state): State<AppState>,
    caller: CurrentUser,
    JsonBody(body): JsonBody,
) -> Result<(StatusCode, Envelope<QuoteView>)> {
    let input = QuoteInput::from_body(body)?;
    let number = DocumentKind::Quote.number_at(Utc::now());

    let quote = QuoteRepository::new(state.pool())
        .create(caller.user.id, &number, &input)
        .await?;
    tracing::info!(quote_id = %quote.id, quote_number = %quote.quote_number, "Quote created");

    let view = RelationLoader::new(state.pool()).quote(quote).await?;
    Ok(created("Quote created successfully", view))
}

/// Update a quote. A submitted `items` array replaces the stored lines.
///
/// # Errors
///
/// Returns 404 if the quote does not exist and 422 if the merged document
/// fails validation.
#[instrument(skip_all, fields(user_id = %caller.user.id, quote_id = %id))]
pub async fn update(
    State(state): State<AppState>,
    caller: CurrentUser,
    Id(id): Id<QuoteId>,
    JsonBody(body): JsonBody,
) -> Result<Envelope<QuoteView>> {
    let current = find(&state, &caller, id).await?;
    let input = QuoteInput::from(&current).merge(body)?;

    let quote = QuoteRepository::new(state.pool())
        .update(id, &input)
        .await?
        .ok_or_else(|| AppError::not_found("Quote"))?;

    let view = RelationLoader::new(state.pool()).quote(quote).await?;
    Ok(Json(ApiResponse::with_message("Quote updated successfully", view)))
}

/// # Errors
///
/// Returns 404 if the quote does not exist.
#[instrument(skip_all, fields(user_id = %caller.user.id, quote_id = %id))]
pub async fn destroy(
    State(state): State<AppState>,
    caller: CurrentUser,
    Id(id): Id<QuoteId>,
) -> Result<Envelope<()>> {
    let deleted = QuoteRepository::new(state.pool())
        .delete(id, state.owner_scope(caller.user.id))
        .await?;
    if !deleted {
        return Err(AppError::not_found("Quote"));
    }

    tracing::info!("Quote deleted");
    Ok(Json(ApiResponse::message("Quote deleted successfully")))
}
