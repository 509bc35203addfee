//! Product catalog endpoints.

use axum::{Json, Router, extract::State, http::StatusCode, routing::get};
use tracing::instrument;

use crm_core::models::Product;
use crm_core::{ApiResponse, Page, ProductId};

use super::{Envelope, created};
use crate::db::ProductRepository;
use crate::error::{AppError, Result};
use crate::extract::{Id, JsonBody, ListParams, QueryParams};
use crate::middleware::CurrentUser;
use crate::models::{InputDocument, ProductInput};
use crate::state::AppState;
use crate::validation::ValidationErrors;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/products", get(index).post(create))
        .route("/products/{id}", get(show).put(update).delete(destroy))
}

async fn find(state: &AppState, caller: &CurrentUser, id: ProductId) -> Result<Product> {
    ProductRepository::new(state.pool())
        .get(id, state.owner_scope(caller.user.id))
        .await?
        .ok_or_else(|| AppError::not_found("Product"))
}

/// Reject a code used by another product.
async fn ensure_code_free(state: &AppState, code: &str, except: Option<ProductId>) -> Result<()> {
    if ProductRepository::new(state.pool())
        .code_taken(code, except)
        .await?
    {
        return Err(ValidationErrors::single("code", "The code has already been taken.").into());
    }
    Ok(())
}

/// The caller's products, searchable by name or code.
///
/// # Errors
///
/// Returns 500 if a query fails.
#[instrument(skip_all, fields(user_id = %caller.user.id))]
pub async fn index(
    State(state): State<AppState>,
    caller: CurrentUser,
    QueryParams(params): QueryParams<ListParams>,
) -> Result<Json<Page<Product>>> {
    let page = params.page_request(&state.config().pagination);
    let (rows, total) = ProductRepository::new(state.pool())
        .list(caller.user.id, params.search.as_deref(), page)
        .await?;

    Ok(Json(Page::new(rows, page.page, page.per_page, total)))
}

/// # Errors
///
/// Returns 404 if the product does not exist.
pub async fn show(
    State(state): State<AppState>,
    caller: CurrentUser,
    Id(id): Id<ProductId>,
) -> Result<Envelope<Product>> {
    let product = find(&state, &caller, id).await?;
    Ok(Json(ApiResponse::data(product)))
}

/// # Errors
///
/// Returns 422 if validation fails or the code is already used.
#[instrument(skip_all, fields(user_id = %caller.user.id))]
pub async fn create(
    State(state): State<AppState>,
    caller: CurrentUser,
    JsonBody(body): JsonBody,
) -> Result<(StatusCode, Envelope<Product>)> {
    let input = ProductInput::from_body(body)?;
    ensure_code_free(&state, &input.code, None).await?;

    let product = ProductRepository::new(state.pool())
        .create(caller.user.id, &input)
        .await?;
    tracing::info!(product_id = %product.id, code = %product.code, "Product created");

    Ok(created("Product created successfully", product))
}

/// # Errors
///
/// Returns 404 if the product does not exist and 422 if the merged document
/// fails validation or the new code is already used.
#[instrument(skip_all, fields(user_id = %caller.user.id, product_id = %id))]
pub async fn update(
    State(state): State<AppState>,
    caller: CurrentUser,
    Id(id): Id<ProductId>,
    JsonBody(body): JsonBody,
) -> Result<Envelope<Product>> {
    let current = find(&state, &caller, id).await?;
    let input = ProductInput::from(&current).merge(body)?;
    if input.code != current.code {
        ensure_code_free(&state, &input.code, Some(id)).await?;
    }

    let product = ProductRepository::new(state.pool())
        .update(id, &input)
        .await?
        .ok_or_else(|| AppError::not_found("Product"))?;

    Ok(Json(ApiResponse::with_message("Product updated successfully", product)))
}

/// # Errors
///
/// Returns 404 if the product does not exist.
#[instrument(skip_all, fields(user_id = %caller.user.id, product_id = %id))]
pub async fn destroy(
    State(state): State<AppState>,
    caller: CurrentUser,
    Id(id): Id<ProductId>,
) -> Result<Envelope<()>> {
    let deleted = ProductRepository::new(state.pool())
        .delete(id, state.owner_scope(caller.user.id))
        .await?;
    if !deleted {
        return Err(AppError::not_found("Product"));
    }

    tracing::info!("Product deleted");
    Ok(Json(ApiResponse::message("Product deleted successfully")))
}
