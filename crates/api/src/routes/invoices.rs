//! Invoice endpoints, including payment recording.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use chrono::Utc;
use tracing::instrument;

use crm_core::models::{Invoice, InvoiceView, Payment};
use crm_core::{ApiResponse, DocumentKind, InvoiceId, Page};

use super::{Envelope, created};
use crate::db::InvoiceRepository;
use crate::error::{AppError, Result};
use crate::extract::{Id, JsonBody, ListParams, QueryParams};
use crate::middleware::CurrentUser;
use crate::models::{InputDocument, InvoiceInput, PaymentInput};
use crate::services::RelationLoader;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/invoices", get(index).post(create))
        .route("/invoices/{id}", get(show).put(update).delete(destroy))
        .route("/invoices/{id}/payments", post(record_payment))
}

async fn find(state: &AppState, caller: &CurrentUser, id: InvoiceId) -> Result<Invoice> {
    InvoiceRepository::new(state.pool())
        .get(id, state.owner_scope(caller.user.id))
        .await?
        .ok_or_else(|| AppError::not_found("Invoice"))
}

/// The caller's invoices, filterable by status.
///
/// # Errors
///
/// Returns 500 if a query fails.
#[instrument(skip_all, fields(user_id = %caller.user.id))]
pub async fn index(
    State(state): State<AppState>,
    caller: CurrentUser,
    QueryParams(params): QueryParams<ListParams>,
) -> Result<Json<Page<InvoiceView>>> {
    let page = params.page_request(&state.config().pagination);
    let (rows, total) = InvoiceRepository::new(state.pool())
        .list(caller.user.id, params.status.as_deref(), page)
        .await?;
    let views = RelationLoader::new(state.pool()).invoices(rows).await?;

    Ok(Json(Page::new(views, page.page, page.per_page, total)))
}

/// An invoice with its relations, line items and payments.
///
/// # Errors
///
/// Returns 404 if the invoice does not exist.
pub async fn show(
    State(state): State<AppState>,
    caller: CurrentUser,
    Id(id): Id<InvoiceId>,
) -> Result<Envelope<InvoiceView>> {
    let invoice = find(&state, &caller, id).await?;
    let view = RelationLoader::new(state.pool()).invoice_detail(invoice).await?;

    Ok(Json(ApiResponse::data(view)))
}

/// Create an invoice numbered `INV-<unix seconds>`.
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
) -> Result<(StatusCode, Envelope<InvoiceView>)> {
    let input = InvoiceInput::from_body(body)?;
    let number = DocumentKind::Invoice.number_at(Utc::now());

    let invoice = InvoiceRepository::new(state.pool())
        .create(caller.user.id, &number, &input)
        .await?;
    tracing::info!(
        invoice_id = %invoice.id,
        invoice_number = %invoice.invoice_number,
        "Invoice created"
    );

    let view = RelationLoader::new(state.pool()).invoice(invoice).await?;
    Ok(created("Invoice created successfully", view))
}

/// Update an invoice. A submitted `items` array replaces the stored lines.
///
/// # Errors
///
/// Returns 404 if the invoice does not exist and 422 if the merged document
/// fails validation.
#[instrument(skip_all, fields(user_id = %caller.user.id, invoice_id = %id))]
pub async fn update(
    State(state): State<AppState>,
    caller: CurrentUser,
    Id(id): Id<InvoiceId>,
    JsonBody(body): JsonBody,
) -> Result<Envelope<InvoiceView>> {
    let current = find(&state, &caller, id).await?;
    let input = InvoiceInput::from(&current).merge(body)?;

    let invoice = InvoiceRepository::new(state.pool())
        .update(id, &input)
        .await?
        .ok_or_else(|| AppError::not_found("Invoice"))?;

    let view = RelationLoader::new(state.pool()).invoice(invoice).await?;
    Ok(Json(ApiResponse::with_message("Invoice updated successfully", view)))
}

/// Record a payment against an invoice. `paid_amount` and `balance_due` are
/// not recalculated.
///
/// # Errors
///
/// Returns 404 if the invoice does not exist and 422 if validation fails.
#[instrument(skip_all, fields(user_id = %caller.user.id, invoice_id = %id))]
pub async fn record_payment(
    State(state): State<AppState>,
    caller: CurrentUser,
    Id(id): Id<InvoiceId>,
    JsonBody(body): JsonBody,
) -> Result<(StatusCode, Envelope<Payment>)> {
    find(&state, &caller, id).await?;
    let input = PaymentInput::from_body(body)?;

    let payment = InvoiceRepository::new(state.pool())
        .record_payment(id, &input)
        .await?;
    tracing::info!(payment_id = %payment.id, amount = %payment.amount, "Payment recorded");

    Ok(created("Payment recorded successfully", payment))
}

/// # Errors
///
/// Returns 404 if the invoice does not exist.
#[instrument(skip_all, fields(user_id = %caller.user.id, invoice_id = %id))]
pub async fn destroy(
    State(state): State<AppState>,
    caller: CurrentUser,
    Id(id): Id<InvoiceId>,
) -> Result<Envelope<()>> {
    let deleted = InvoiceRepository::new(state.pool())
        .delete(id, state.owner_scope(caller.user.id))
        .await?;
    if !deleted {
        return Err(AppError::not_found("Invoice"));
    }

    tracing::info!("Invoice deleted");
    Ok(Json(ApiResponse::message("Invoice deleted successfully")))
}
