//! Integration tests for photo uploads.
//!
//! Requires `CRM_TEST_DATABASE_URL`; run with `cargo test -- --ignored`.

use reqwest::StatusCode;
use reqwest::multipart::{Form, Part};
use serde_json::{Value, json};

use crm_client::{Photo, PhotoTarget};
use crm_integration_tests::{TestContext, unique_email};

/// Smallest valid PNG signature plus padding; content is never decoded.
const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

fn png(name: &str) -> Photo {
    Photo {
        file_name: name.to_string(),
        content_type: Some("image/png".to_string()),
        bytes: PNG_BYTES.to_vec(),
    }
}

#[tokio::test]
#[ignore = "Requires PostgreSQL"]
async fn test_upload_sets_contact_avatar() {
    let ctx = TestContext::new().await;
    let (client, _) = ctx.register("Photographer").await;

    let contact = client
        .contacts()
        .create(&json!({
            "first_name": "Face",
            "last_name": "Book",
            "email": unique_email("face"),
        }))
        .await
        .expect("create contact");

    let uploaded = client
        .upload_photo(png("my face.png"), PhotoTarget::contact(contact.contact.id))
        .await
        .expect("upload");
    assert!(uploaded.path.starts_with("uploads/"));
    assert!(uploaded.path.ends_with("_my_face.png"));
    assert!(uploaded.url.ends_with(&uploaded.path));

    let contact = client
        .contacts()
        .get(contact.contact.id)
        .await
        .expect("reload contact");
    assert_eq!(contact.contact.avatar.as_deref(), Some(uploaded.url.as_str()));

    // The stored file is served back.
    let resp = ctx
        .http
        .get(ctx.url(&format!("storage/{}", uploaded.path)))
        .send()
        .await
        .expect("fetch stored file");
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.bytes().await.expect("bytes").as_ref(), PNG_BYTES);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL"]
async fn test_upload_sets_company_logo() {
    let ctx = TestContext::new().await;
    let (client, _) = ctx.register("Brand").await;

    let company = client
        .companies()
        .create(&json!({ "name": "Logo Co" }))
        .await
        .expect("create company");

    let uploaded = client
        .upload_photo(png("logo.png"), PhotoTarget::company(company.company.id))
        .await
        .expect("upload");

    let company = client
        .companies()
        .get(company.company.id)
        .await
        .expect("reload company");
    assert_eq!(company.company.logo.as_deref(), Some(uploaded.url.as_str()));
}

#[tokio::test]
#[ignore = "Requires PostgreSQL"]
async fn test_upload_rejects_bad_files() {
    let ctx = TestContext::new().await;
    let (client, auth) = ctx.register("Careless").await;

    let err = client
        .upload_photo(
            Photo {
                file_name: "notes.txt".to_string(),
                content_type: Some("text/plain".to_string()),
                bytes: b"hello".to_vec(),
            },
            PhotoTarget::detached("contact"),
        )
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(422));
    assert_eq!(
        err.field_errors("photo"),
        ["The photo must be a file of type: jpeg, jpg, png, gif, svg.".to_string()]
    );

    let err = client
        .upload_photo(
            Photo {
                file_name: "empty.png".to_string(),
                content_type: Some("image/png".to_string()),
                bytes: Vec::new(),
            },
            PhotoTarget::detached("contact"),
        )
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(400));
    assert_eq!(err.to_string(), "No photo uploaded");

    // No photo and no entity type.
    let resp = ctx
        .http
        .post(ctx.url("upload/photo"))
        .bearer_auth(&auth.token)
        .multipart(Form::new().text("entity_id", "1"))
        .send()
        .await
        .expect("request");
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = resp.json().await.expect("json");
    assert_eq!(
        body["errors"]["photo"][0],
        json!("The photo field is required.")
    );
    assert!(body["errors"]["entity_type"].is_array());

    let oversized = Part::bytes(vec![0_u8; 5049 * 1024])
        .file_name("huge.png")
        .mime_str("image/png")
        .expect("mime");
    let resp = ctx
        .http
        .post(ctx.url("upload/photo"))
        .bearer_auth(&auth.token)
        .multipart(
            Form::new()
                .part("photo", oversized)
                .text("entity_type", "contact"),
        )
        .send()
        .await
        .expect("request");
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = resp.json().await.expect("json");
    assert_eq!(
        body["errors"]["photo"][0],
        json!("The photo must not be greater than 5048 kilobytes.")
    );
}
