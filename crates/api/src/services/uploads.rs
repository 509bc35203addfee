//! Photo uploads stored on local disk.
//!
//! Files land in `<upload dir>/uploads/<unix seconds>_<sanitized name>` and
//! are served back by the `/storage` file service.

use std::path::{Path, PathBuf};

use chrono::Utc;
use thiserror::Error;

use crm_core::models::UploadedPhoto;

use crate::config::ApiConfig;

/// Largest accepted photo, in KiB.
pub const MAX_PHOTO_KIB: usize = 5048;

/// Accepted photo extensions.
pub const PHOTO_EXTENSIONS: &[&str] = &["jpeg", "jpg", "png", "gif", "svg"];

/// Directory under the upload root that holds photos.
const UPLOAD_SUBDIR: &str = "uploads";

/// Errors that can occur while storing a photo.
#[derive(Debug, Error)]
pub enum UploadError {
    /// The request carried no `photo` part.
    #[error("The photo field is required.")]
    MissingPhoto,

    /// The `photo` part was empty.
    #[error("No photo uploaded")]
    NoPhoto,

    /// Extension or content type outside the accepted image set.
    #[error("The photo must be a file of type: jpeg, jpg, png, gif, svg.")]
    UnsupportedType,

    /// File larger than `MAX_PHOTO_KIB`.
    #[error("The photo must not be greater than {MAX_PHOTO_KIB} kilobytes.")]
    TooLarge,

    /// The multipart stream could not be read.
    #[error("Invalid multipart body: {0}")]
    Multipart(String),

    /// Writing the file failed.
    #[error("failed to store upload: {0}")]
    Io(#[from] std::io::Error),
}

impl UploadError {
    /// Whether this is a server-side failure.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Io(_))
    }

    /// Whether this is reported as a field error on `photo`.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::MissingPhoto | Self::UnsupportedType | Self::TooLarge)
    }
}

/// A photo read from a multipart request.
#[derive(Debug, Clone, Default)]
pub struct PhotoUpload {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl PhotoUpload {
    /// Lowercased extension of the original file name.
    fn extension(&self) -> Option<String> {
        self.file_name
            .as_deref()
            .and_then(|name| Path::new(name).extension())
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
    }

    /// Check emptiness, type and size.
    ///
    /// The type is accepted when either the extension or the declared content
    /// type is in the image set.
    fn check(&self) -> Result<(), UploadError> {
        if self.bytes.is_empty() {
            return Err(UploadError::NoPhoto);
        }

        let extension_ok = self
            .extension()
            .is_some_and(|ext| PHOTO_EXTENSIONS.contains(&ext.as_str()));
        let content_type_ok = self
            .content_type
            .as_deref()
            .and_then(|ct| ct.strip_prefix("image/"))
            .map(|subtype| subtype.split(['+', ';']).next().unwrap_or(subtype))
            .is_some_and(|subtype| PHOTO_EXTENSIONS.contains(&subtype));
        if !extension_ok && !content_type_ok {
            return Err(UploadError::UnsupportedType);
        }

        if self.bytes.len() > MAX_PHOTO_KIB * 1024 {
            return Err(UploadError::TooLarge);
        }

        Ok(())
    }
}

/// Stores photos under the configured upload root.
pub struct UploadService<'a> {
    config: &'a ApiConfig,
}

impl<'a> UploadService<'a> {
    #[must_use]
    pub const fn new(config: &'a ApiConfig) -> Self {
        Self { config }
    }

    /// Validate and write a photo, returning its public URL and relative path.
    ///
    /// # Errors
    ///
    /// Returns `UploadError::NoPhoto` for an empty file, the validation
    /// variants for a bad type or size, and `UploadError::Io` if the write fails.
    pub async fn store_photo(&self, photo: &PhotoUpload) -> Result<UploadedPhoto, UploadError> {
        let relative = write_photo(&self.config.upload_dir, photo, Utc::now().timestamp()).await?;
        let url = self.config.storage_url(&relative);

        tracing::info!(path = %relative, bytes = photo.bytes.len(), "Photo stored");
        Ok(UploadedPhoto {
            url,
            path: relative,
        })
    }
}

/// Write `photo` below `root` and return its path relative to `root`.
async fn write_photo(root: &Path, photo: &PhotoUpload, timestamp: i64) -> Result<String, UploadError> {
    photo.check()?;

    let name = sanitize_file_name(photo.file_name.as_deref().unwrap_or("photo"));
    let file_name = format!("{timestamp}_{name}");

    let dir: PathBuf = root.join(UPLOAD_SUBDIR);
    tokio::fs::create_dir_all(&dir).await?;
    tokio::fs::write(dir.join(&file_name), &photo.bytes).await?;

    Ok(format!("{UPLOAD_SUBDIR}/{file_name}"))
}

/// Reduce a client-supplied file name to a safe single path component.
///
/// Directory parts are dropped and anything outside `[A-Za-z0-9._-]` becomes
/// `_`. Leading dots are stripped so the result is never hidden or `..`.
#[must_use]
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let trimmed = cleaned.trim_start_matches('.');

    if trimmed.is_empty() {
        "photo".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn png(bytes: Vec<u8>) -> PhotoUpload {
        PhotoUpload {
            file_name: Some("face.png".to_string()),
            content_type: Some("image/png".to_string()),
            bytes,
        }
    }

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("face.png"), "face.png");
        assert_eq!(sanitize_file_name("my photo (1).jpg"), "my_photo__1_.jpg");
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("C:\\Users\\me\\pic.gif"), "pic.gif");
        assert_eq!(sanitize_file_name(".."), "photo");
        assert_eq!(sanitize_file_name(".hidden.png"), "hidden.png");
        assert_eq!(sanitize_file_name(""), "photo");
    }

    #[test]
    fn test_empty_photo_rejected() {
        assert!(matches!(png(vec![]).check(), Err(UploadError::NoPhoto)));
    }

    #[test]
    fn test_unsupported_type_rejected() {
        let photo = PhotoUpload {
            file_name: Some("notes.pdf".to_string()),
            content_type: Some("application/pdf".to_string()),
            bytes: vec![1, 2, 3],
        };
        let err = photo.check().unwrap_err();
        assert!(matches!(err, UploadError::UnsupportedType));
        assert!(err.is_validation());
    }

    #[test]
    fn test_type_from_content_type_alone() {
        let photo = PhotoUpload {
            file_name: Some("blob".to_string()),
            content_type: Some("image/svg+xml".to_string()),
            bytes: vec![1],
        };
        assert!(photo.check().is_ok());
    }

    #[test]
    fn test_type_from_extension_alone() {
        let photo = PhotoUpload {
            file_name: Some("Scan.JPEG".to_string()),
            content_type: None,
            bytes: vec![1],
        };
        assert!(photo.check().is_ok());
    }

    #[test]
    fn test_size_limit() {
        assert!(png(vec![0; MAX_PHOTO_KIB * 1024]).check().is_ok());
        assert!(matches!(
            png(vec![0; MAX_PHOTO_KIB * 1024 + 1]).check(),
            Err(UploadError::TooLarge)
        ));
    }

    #[tokio::test]
    async fn test_write_photo() {
        let dir = tempfile::tempdir().unwrap();
        let relative = write_photo(dir.path(), &png(vec![137, 80, 78, 71]), 1_704_067_200)
            .await
            .unwrap();

        assert_eq!(relative, "uploads/1704067200_face.png");
        let stored = std::fs::read(dir.path().join(&relative)).unwrap();
        assert_eq!(stored, vec![137, 80, 78, 71]);
    }

    #[tokio::test]
    async fn test_write_photo_rejects_before_touching_disk() {
        let dir = tempfile::tempdir().unwrap();
        let result = write_photo(dir.path(), &png(vec![]), 1).await;

        assert!(matches!(result, Err(UploadError::NoPhoto)));
        assert!(!dir.path().join(UPLOAD_SUBDIR).exists());
    }

    #[test]
    fn test_error_classification() {
        assert!(!UploadError::NoPhoto.is_validation());
        assert!(UploadError::MissingPhoto.is_validation());
        assert!(UploadError::Io(std::io::Error::other("disk")).is_internal());
        assert!(!UploadError::TooLarge.is_internal());
    }
}
