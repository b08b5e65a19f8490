//! HTTP handlers for the image ingestion endpoint.
//!
//! The session header is resolved before the multipart body is read, so an
//! unauthenticated request is rejected without touching its payload.

use crate::{
    errors::AppError,
    models::image::MAX_IMAGE_BYTES,
    services::{
        AppState,
        upload_service::{UploadForm, UploadedFile},
    },
};
use axum::{
    Json,
    extract::{
        Multipart, State,
        multipart::{Field, MultipartRejection},
    },
    http::HeaderMap,
    response::IntoResponse,
};
use bytes::{Bytes, BytesMut};
use serde::Serialize;
use tracing::debug;

/// Header carrying the opaque bearer session token.
pub const SESSION_HEADER: &str = "x-session-token";

#[derive(Debug, Serialize)]
pub struct UploadImageResponse {
    pub success: bool,
    pub image_url: String,
}

/// `POST /upload-image`
///
/// Multipart fields: `file`, `bucket_type`, `entity_id`, `image_type`.
pub async fn upload_image(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<impl IntoResponse, AppError> {
    let token = headers.get(SESSION_HEADER).and_then(|v| v.to_str().ok());
    let user_id = state.sessions.resolve(token).await?;

    let multipart = multipart.map_err(|e| AppError::new(e.status(), e.body_text()))?;
    let form = read_upload_form(multipart).await?;
    let uploaded = state.uploader.upload(&user_id, form).await?;
    debug!(bucket = %uploaded.bucket, key = %uploaded.key, "responding with public url");

    Ok(Json(UploadImageResponse {
        success: true,
        image_url: uploaded.image_url,
    }))
}

async fn read_upload_form(mut multipart: Multipart) -> Result<UploadForm, AppError> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::bad_request(format!("Failed to parse multipart data: {}", e)))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" => form.file = Some(read_file_field(field).await?),
            "bucket_type" => form.bucket_type = Some(read_text_field(field).await?),
            "entity_id" => form.entity_id = Some(read_text_field(field).await?),
            "image_type" => form.image_type = Some(read_text_field(field).await?),
            other => debug!(field = other, "ignoring unknown multipart field"),
        }
    }

    Ok(form)
}

async fn read_text_field(field: Field<'_>) -> Result<String, AppError> {
    field
        .text()
        .await
        .map_err(|e| AppError::bad_request(format!("Failed to read form field: {}", e)))
}

/// Stream the file part, keeping at most `MAX_IMAGE_BYTES` in memory.
///
/// Bytes past the limit are only counted so validation can report the size.
async fn read_file_field(mut field: Field<'_>) -> Result<UploadedFile, AppError> {
    let file_name = field.file_name().map(str::to_string);
    let content_type = field.content_type().map(str::to_string);

    let mut size = 0u64;
    let mut buf = BytesMut::new();
    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|e| AppError::bad_request(format!("Failed to read file chunk: {}", e)))?
    {
        size += chunk.len() as u64;
        if size <= MAX_IMAGE_BYTES {
            buf.extend_from_slice(&chunk);
        }
    }

    let data: Bytes = if size <= MAX_IMAGE_BYTES {
        buf.freeze()
    } else {
        Bytes::new()
    };

    Ok(UploadedFile {
        file_name,
        content_type,
        size,
        data,
    })
}
