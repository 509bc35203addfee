//! Photo upload endpoint.

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, State, multipart::MultipartError},
    http::StatusCode,
    routing::post,
};
use tracing::instrument;

use crm_core::models::UploadedPhoto;
use crm_core::{ApiResponse, CompanyId, ContactId};

use super::Envelope;
use crate::db::{CompanyRepository, ContactRepository};
use crate::error::Result;
use crate::middleware::CurrentUser;
use crate::services::uploads::MAX_PHOTO_KIB;
use crate::services::{PhotoUpload, UploadError, UploadService};
use crate::state::AppState;
use crate::validation::ValidationErrors;

/// Request body cap for uploads: the photo limit plus room for the other parts.
const UPLOAD_BODY_LIMIT: usize = (MAX_PHOTO_KIB + 64) * 1024;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/upload/photo", post(upload_photo))
        .layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT))
}

#[derive(Debug, Default)]
struct UploadForm {
    photo: Option<PhotoUpload>,
    entity_type: Option<String>,
    entity_id: Option<String>,
}

fn multipart_error(err: &MultipartError) -> UploadError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        UploadError::TooLarge
    } else {
        UploadError::Multipart(err.body_text())
    }
}

async fn read_form(multipart: &mut Multipart) -> std::result::Result<UploadForm, UploadError> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart.next_field().await.map_err(|e| multipart_error(&e))? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "photo" => {
                let file_name = field.file_name().map(String::from);
                let content_type = field.content_type().map(String::from);
                let bytes = field.bytes().await.map_err(|e| multipart_error(&e))?;
                form.photo = Some(PhotoUpload {
                    file_name,
                    content_type,
                    bytes: bytes.to_vec(),
                });
            }
            "entity_type" | "entity_id" => {
                let value = field.text().await.map_err(|e| multipart_error(&e))?;
                let value = Some(value.trim().to_string()).filter(|v| !v.is_empty());
                if name == "entity_type" {
                    form.entity_type = value;
                } else {
                    form.entity_id = value;
                }
            }
            _ => {}
        }
    }

    Ok(form)
}

/// Store a photo and, for a `contact` or `company` that exists, point its
/// avatar or logo at the stored file.
///
/// The file is kept even if the record patch does not happen.
///
/// # Errors
///
/// Returns 422 for a missing photo or `entity_type` and for a wrong type or
/// size, 400 for an empty file.
#[instrument(skip_all, fields(user_id = %caller.user.id))]
pub async fn upload_photo(
    State(state): State<AppState>,
    caller: CurrentUser,
    mut multipart: Multipart,
) -> Result<Envelope<UploadedPhoto>> {
    let form = read_form(&mut multipart).await?;

    let mut errors = ValidationErrors::new();
    if form.photo.is_none() {
        errors.add("photo", UploadError::MissingPhoto.to_string());
    }
    if form.entity_type.is_none() {
        errors.add("entity_type", "The entity type field is required.");
    }
    let (Some(photo), Some(entity_type)) = (form.photo, form.entity_type) else {
        return Err(errors.into());
    };

    let uploaded = UploadService::new(state.config()).store_photo(&photo).await?;

    if let Some(entity_id) = form.entity_id.and_then(|id| id.parse::<i64>().ok()) {
        attach(&state, &entity_type, entity_id, &uploaded.url).await?;
    }

    Ok(Json(ApiResponse::with_message(
        "Photo uploaded successfully",
        uploaded,
    )))
}

/// Patch the photo URL onto the target record. Unknown types and missing
/// records are ignored.
async fn attach(state: &AppState, entity_type: &str, entity_id: i64, url: &str) -> Result<()> {
    let patched = match entity_type {
        "contact" => {
            ContactRepository::new(state.pool())
                .set_avatar(ContactId::new(entity_id), url)
                .await?
        }
        "company" => {
            CompanyRepository::new(state.pool())
                .set_logo(CompanyId::new(entity_id), url)
                .await?
        }
        _ => false,
    };

    if patched {
        tracing::info!(entity_type, entity_id, "Photo attached");
    }
    Ok(())
}
