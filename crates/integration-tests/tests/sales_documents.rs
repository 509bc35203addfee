//! Integration tests for products, quotes, invoices and payments.
//!
//! Requires `CRM_TEST_DATABASE_URL`; run with `cargo test -- --ignored`.

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use serde_json::{Map, Value, json};
use uuid::Uuid;

use crm_api::db::{QuoteRepository, RepositoryError};
use crm_api::models::{InputDocument, QuoteInput};
use crm_client::{CrmClient, ListQuery};
use crm_core::{ContactId, DocumentKind, InvoiceStatus, QuoteStatus};
use crm_integration_tests::{TestContext, unique_email};

async fn create_contact(client: &CrmClient) -> ContactId {
    client
        .contacts()
        .create(&json!({
            "first_name": "Buyer",
            "last_name": "Person",
            "email": unique_email("buyer"),
        }))
        .await
        .expect("create contact")
        .contact
        .id
}

fn unique_code() -> String {
    format!("SKU-{}", Uuid::new_v4().simple())
}

#[tokio::test]
#[ignore = "Requires PostgreSQL"]
async fn test_product_codes_are_unique() {
    let ctx = TestContext::new().await;
    let (client, _) = ctx.register("Catalog").await;
    let code = unique_code();

    let product = client
        .products()
        .create(&json!({ "name": "Widget", "code": code, "unit_price": "19.99" }))
        .await
        .expect("create product");
    assert_eq!(product.unit_price, Decimal::new(1999, 2));
    assert!(product.active);

    let err = client
        .products()
        .create(&json!({ "name": "Widget copy", "code": code, "unit_price": 5 }))
        .await
        .unwrap_err();
    assert_eq!(
        err.field_errors("code"),
        ["The code has already been taken.".to_string()]
    );

    // Keeping its own code is not a conflict.
    let renamed = client
        .products()
        .update(product.id, &json!({ "name": "Widget Pro", "code": code }))
        .await
        .expect("update product");
    assert_eq!(renamed.name, "Widget Pro");

    let found = client
        .products()
        .list(&ListQuery::new().search(code.to_lowercase()))
        .await
        .expect("search by code");
    assert_eq!(found.total, 1);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL"]
async fn test_quote_items_are_replaced_on_update() {
    let ctx = TestContext::new().await;
    let (client, _) = ctx.register("Quoter").await;
    let contact_id = create_contact(&client).await;
    let expires = (Utc::now() + Duration::days(30)).date_naive();

    let quote = client
        .quotes()
        .create(&json!({
            "contact_id": contact_id,
            "subject": "Spring order",
            "expiration_date": expires.to_string(),
            "subtotal": 300,
            "tax_amount": 30,
            "total": 330,
            "items": [
                { "name": "Widget", "quantity": 2, "unit_price": 100, "amount": 200 },
                { "name": "Setup", "quantity": 1, "unit_price": 100, "amount": 100 },
            ],
        }))
        .await
        .expect("create quote");
    assert!(quote.quote.quote_number.starts_with("QT-"));
    assert_eq!(quote.quote.status, QuoteStatus::Draft);
    assert_eq!(quote.quote.total, Decimal::from(330));
    assert_eq!(quote.contact.as_ref().map(|c| c.id), Some(contact_id));

    let detail = client.quotes().get(quote.quote.id).await.expect("show");
    assert_eq!(detail.items.as_ref().map(Vec::len), Some(2));

    // Without `items` the stored lines stay.
    client
        .quotes()
        .update(quote.quote.id, &json!({ "status": "sent" }))
        .await
        .expect("update status");
    let detail = client.quotes().get(quote.quote.id).await.expect("show");
    assert_eq!(detail.quote.status, QuoteStatus::Sent);
    assert_eq!(detail.quote.subject, "Spring order");
    assert_eq!(detail.items.as_ref().map(Vec::len), Some(2));

    client
        .quotes()
        .update(
            quote.quote.id,
            &json!({
                "items": [{ "name": "Bundle", "quantity": 1, "unit_price": 250, "amount": 250 }],
            }),
        )
        .await
        .expect("replace items");
    let detail = client.quotes().get(quote.quote.id).await.expect("show");
    let items = detail.items.expect("items");
    assert_eq!(items.len(), 1);
    assert_eq!(items.first().map(|i| i.name.as_str()), Some("Bundle"));

    client
        .quotes()
        .delete(quote.quote.id)
        .await
        .expect("delete quote");
}

#[tokio::test]
#[ignore = "Requires PostgreSQL"]
async fn test_quote_item_validation() {
    let ctx = TestContext::new().await;
    let (client, _) = ctx.register("Sloppy").await;
    let contact_id = create_contact(&client).await;

    let err = client
        .quotes()
        .create(&json!({
            "contact_id": contact_id,
            "subject": "Broken",
            "expiration_date": "2026-13-45",
            "items": [{ "name": "No price", "quantity": 0 }],
        }))
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(422));
    assert!(!err.field_errors("expiration_date").is_empty());
    assert!(!err.field_errors("items.0.quantity").is_empty());
    assert!(!err.field_errors("items.0.unit_price").is_empty());
    assert!(!err.field_errors("items.0.amount").is_empty());
}

#[tokio::test]
#[ignore = "Requires PostgreSQL"]
async fn test_duplicate_quote_number_is_a_conflict() {
    let ctx = TestContext::new().await;
    let (client, auth) = ctx.register("Collider").await;
    let contact_id = create_contact(&client).await;

    let body: Map<String, Value> = json!({
        "contact_id": contact_id,
        "subject": "Same second",
        "expiration_date": "2030-01-01",
    })
    .as_object()
    .cloned()
    .expect("object");
    let input = QuoteInput::from_body(body).expect("valid input");

    // Two quotes created in the same second get the same number.
    let number = format!(
        "{}-{}",
        DocumentKind::Quote.number_at(Utc::now()),
        Uuid::new_v4().simple()
    );
    let quotes = QuoteRepository::new(&ctx.pool);
    quotes
        .create(auth.user.id, &number, &input)
        .await
        .expect("first quote");

    let err = quotes
        .create(auth.user.id, &number, &input)
        .await
        .unwrap_err();
    assert!(matches!(err, RepositoryError::Conflict(ref field) if field == "quote_number"));
}

#[tokio::test]
#[ignore = "Requires PostgreSQL"]
async fn test_invoice_with_payments() {
    let ctx = TestContext::new().await;
    let (client, _) = ctx.register("Biller").await;
    let contact_id = create_contact(&client).await;
    let today = Utc::now().date_naive();

    let invoice = client
        .invoices()
        .create(&json!({
            "contact_id": contact_id,
            "subject": "March services",
            "invoice_date": today.to_string(),
            "due_date": (today + Duration::days(14)).to_string(),
            "total": "1200.00",
            "balance_due": "1200.00",
            "items": [
                { "name": "Consulting", "quantity": 12, "unit_price": 100, "amount": 1200 },
            ],
        }))
        .await
        .expect("create invoice");
    assert!(invoice.invoice.invoice_number.starts_with("INV-"));
    assert_eq!(invoice.invoice.status, InvoiceStatus::Draft);
    assert_eq!(invoice.invoice.paid_amount, Decimal::ZERO);

    let payment = client
        .invoices()
        .record_payment(
            invoice.invoice.id,
            &json!({
                "amount": "500.00",
                "payment_date": today.to_string(),
                "payment_method": "bank_transfer",
                "reference": "TX-1",
            }),
        )
        .await
        .expect("record payment");
    assert_eq!(payment.invoice_id, invoice.invoice.id);
    assert_eq!(payment.amount, Decimal::from(500));

    let detail = client.invoices().get(invoice.invoice.id).await.expect("show");
    assert_eq!(detail.payments.as_ref().map(Vec::len), Some(1));
    assert_eq!(detail.items.as_ref().map(Vec::len), Some(1));
    // Payments do not touch the stored totals.
    assert_eq!(detail.invoice.paid_amount, Decimal::ZERO);
    assert_eq!(detail.invoice.balance_due, Decimal::from(1200));

    let err = client
        .invoices()
        .record_payment(invoice.invoice.id, &json!({ "amount": "ten" }))
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(422));
    assert!(!err.field_errors("payment_method").is_empty());

    let paid = client
        .invoices()
        .update(invoice.invoice.id, &json!({ "status": "paid" }))
        .await
        .expect("mark paid");
    assert_eq!(paid.invoice.status, InvoiceStatus::Paid);

    let page = client
        .invoices()
        .list(&ListQuery::new().status("paid"))
        .await
        .expect("filter by status");
    assert_eq!(page.total, 1);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL"]
async fn test_same_second_quotes_collide_over_http() {
    let ctx = TestContext::new().await;
    let (client, _) = ctx.register("Rapid").await;
    let contact_id = create_contact(&client).await;
    let body = json!({
        "contact_id": contact_id,
        "subject": "Back to back",
        "expiration_date": "2030-01-01",
    });

    // Start right after a second boundary so both requests land in one second.
    for _ in 0..3 {
        let into_second = Utc::now().timestamp_subsec_millis();
        let wait = 1_000_u32.saturating_sub(into_second);
        tokio::time::sleep(std::time::Duration::from_millis(u64::from(wait))).await;

        let first = client.quotes().create(&body).await.expect("first quote");
        match client.quotes().create(&body).await {
            Err(err) => {
                assert_eq!(err.status(), Some(422));
                assert_eq!(
                    err.field_errors("quote_number"),
                    ["The quote number has already been taken.".to_string()]
                );
                assert!(first.quote.quote_number.starts_with("QT-"));
                return;
            }
            Ok(second) => {
                assert_ne!(second.quote.quote_number, first.quote.quote_number);
            }
        }
    }
    panic!("no same-second collision in three attempts");
}

#[tokio::test]
#[ignore = "Requires PostgreSQL"]
async fn test_oversized_money_is_a_validation_error() {
    let ctx = TestContext::new().await;
    let (client, _) = ctx.register("Whale").await;

    let err = client
        .products()
        .create(&json!({ "name": "Island", "code": unique_code(), "unit_price": 1e14 }))
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(422));
    assert!(!err.field_errors("unit_price").is_empty());

    let err = client
        .deals()
        .create(&json!({ "name": "Huge", "amount": "10000000000000" }))
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(422));
    assert_eq!(
        err.field_errors("amount"),
        ["The amount field must be between -9999999999999.99 and 9999999999999.99.".to_string()]
    );
}
