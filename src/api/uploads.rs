//! Multipart image handling for payment proofs and listing photos.
//!
//! Files land under `<data_dir>/uploads/<kind>/` and are served read-only
//! at `/uploads/*`. The stored path is relative so the data directory can
//! move between hosts.

use axum::extract::multipart::Multipart;
use bytes::Bytes;
use std::path::Path;
use uuid::Uuid;

use super::error::ApiError;

/// Content types accepted for payment proofs
pub const PROOF_CONTENT_TYPES: &[&str] = &["image/jpeg", "image/jpg", "image/png"];

/// Content types accepted for property and room photos
pub const IMAGE_CONTENT_TYPES: &[&str] =
    &["image/jpeg", "image/jpg", "image/png", "image/webp"];

/// Map a content type to the stored file extension
fn ext_from_mime(content_type: &str) -> Option<&'static str> {
    match content_type {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        _ => None,
    }
}

/// Check the leading magic bytes against the claimed content type
fn matches_magic(content_type: &str, data: &[u8]) -> bool {
    match content_type {
        "image/jpeg" | "image/jpg" => data.starts_with(&[0xFF, 0xD8, 0xFF]),
        "image/png" => data.starts_with(&[0x89, 0x50, 0x4E, 0x47]),
        "image/webp" => {
            data.len() >= 12 && data.starts_with(b"RIFF") && &data[8..12] == b"WEBP"
        }
        _ => false,
    }
}

/// A file pulled out of a multipart request
pub struct UploadedFile {
    pub data: Bytes,
    pub content_type: String,
}

/// Read the `file` field from a multipart request.
///
/// Falls back to guessing the content type from the filename when the
/// part carries none.
pub async fn read_file_field(multipart: &mut Multipart) -> Result<UploadedFile, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid multipart request: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let content_type = match field.content_type() {
            Some(ct) => ct.to_string(),
            None => field
                .file_name()
                .map(|f| mime_guess::from_path(f).first_or_octet_stream().to_string())
                .unwrap_or_else(|| "application/octet-stream".to_string()),
        };

        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::bad_request(format!("Failed to read upload: {}", e)))?;

        return Ok(UploadedFile { data, content_type });
    }

    Err(ApiError::validation_field("file", "A file field is required"))
}

/// Validate an upload and write it under `<data_dir>/uploads/<kind>/`.
///
/// Returns the relative path stored in the database.
pub async fn save_image(
    data_dir: &Path,
    kind: &str,
    upload: &UploadedFile,
    allowed: &[&str],
    max_bytes: usize,
) -> Result<String, ApiError> {
    if !allowed.contains(&upload.content_type.as_str()) {
        return Err(ApiError::validation_field(
            "file",
            format!("Unsupported file type: {}", upload.content_type),
        ));
    }

    if upload.data.len() > max_bytes {
        return Err(ApiError::validation_field(
            "file",
            format!("File is too large (max {} bytes)", max_bytes),
        ));
    }

    if !matches_magic(&upload.content_type, &upload.data) {
        return Err(ApiError::validation_field(
            "file",
            "File content does not match its declared type",
        ));
    }

    let ext = ext_from_mime(&upload.content_type)
        .ok_or_else(|| ApiError::validation_field("file", "Unsupported file type"))?;
    let relative = format!("uploads/{}/{}.{}", kind, Uuid::new_v4(), ext);
    let absolute = data_dir.join(&relative);

    if let Some(parent) = absolute.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(|e| {
            tracing::error!(error = %e, "Failed to create upload directory");
            ApiError::internal("Failed to store upload")
        })?;
    }

    tokio::fs::write(&absolute, &upload.data).await.map_err(|e| {
        tracing::error!(error = %e, "Failed to write upload");
        ApiError::internal("Failed to store upload")
    })?;

    Ok(relative)
}

/// Delete a previously stored upload, ignoring files already gone
pub async fn remove_upload(data_dir: &Path, relative: &str) {
    // Stored paths are generated by save_image; refuse anything else
    if relative.contains("..") || !relative.starts_with("uploads/") {
        tracing::warn!(path = %relative, "Refusing to remove suspicious upload path");
        return;
    }

    if let Err(e) = tokio::fs::remove_file(data_dir.join(relative)).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!(error = %e, path = %relative, "Failed to remove upload");
        }
    }
}
