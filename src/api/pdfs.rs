//! PDF handlers: metadata CRUD, file upload into object storage, and file
//! serving.

use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, ModelTrait, QueryFilter, QueryOrder, Set};
use serde::Deserialize;
use serde_json::json;
use sha2::{Digest, Sha256};

use super::{created, enforce_rate_limit, parse_id, success, AppState};
use crate::db::{
    entities::{pdf, subject},
    unix_now,
};
use crate::error::{Result, ServerError};
use crate::ratelimit::policies;
use crate::storage::StorageError;
use crate::validation::{validate_pdf, PdfPayload, MAX_FILE_SIZE};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub subject_id: Option<i32>,
}

/// GET /api/pdfs?subjectId=
pub async fn list(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<Response> {
    let mut select = pdf::Entity::find().order_by_desc(pdf::Column::UploadedAt);
    if let Some(subject_id) = query.subject_id {
        select = select.filter(pdf::Column::SubjectId.eq(subject_id));
    }
    let pdfs = select.all(&state.db).await?;
    Ok(success(&pdfs))
}

/// POST /api/pdfs - create a metadata record (file upload handled separately)
pub async fn create(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<PdfPayload>,
) -> Result<Response> {
    enforce_rate_limit(&state, &headers, "create", policies::CREATE)?;

    let input = validate_pdf(&payload).map_err(ServerError::Validation)?;

    subject::Entity::find_by_id(input.subject_id)
        .one(&state.db)
        .await?
        .ok_or(ServerError::NotFound("Subject"))?;

    let now = unix_now();
    let pdf = pdf::ActiveModel {
        subject_id: Set(input.subject_id),
        title: Set(input.title),
        description: Set(input.description),
        file_name: Set(input.file_name),
        file_url: Set(input.file_url),
        file_size: Set(input.file_size),
        storage_key: Set(input.storage_key),
        category: Set(input.category),
        uploaded_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    Ok(created(&pdf, "PDF metadata created successfully"))
}

/// GET /api/pdfs/:id
pub async fn get_one(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Result<Response> {
    let id = parse_id(&id, "PDF")?;

    let pdf = pdf::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or(ServerError::NotFound("PDF"))?;

    Ok(success(&pdf))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PdfUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub file_name: Option<String>,
    pub file_url: Option<String>,
    pub category: Option<String>,
}

/// PUT /api/pdfs/:id
pub async fn update(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<PdfUpdate>,
) -> Result<Response> {
    let id = parse_id(&id, "PDF")?;

    let pdf = pdf::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or(ServerError::NotFound("PDF"))?;

    let mut active: pdf::ActiveModel = pdf.into();
    if let Some(title) = body.title {
        active.title = Set(title);
    }
    if let Some(description) = body.description {
        active.description = Set(description);
    }
    if let Some(file_name) = body.file_name {
        active.file_name = Set(file_name);
    }
    if let Some(file_url) = body.file_url {
        active.file_url = Set(file_url);
    }
    if let Some(raw) = body.category {
        let category = pdf::PdfCategory::parse(&raw).ok_or_else(|| {
            ServerError::Validation(vec![
                "Category must be one of: notes, assignments, papers, other".to_string(),
            ])
        })?;
        active.category = Set(category);
    }
    active.updated_at = Set(unix_now());

    let updated = active.update(&state.db).await?;
    Ok(success(&updated))
}

/// DELETE /api/pdfs/:id - delete the record and release its stored file
pub async fn remove(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Result<Response> {
    let id = parse_id(&id, "PDF")?;

    let pdf = pdf::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or(ServerError::NotFound("PDF"))?;

    // Release the stored object first; a failure leaves an orphaned file
    // but never blocks the delete.
    if let Some(key) = &pdf.storage_key {
        match state.storage.delete(key).await {
            Ok(()) => tracing::debug!("Released stored file {}", key),
            Err(e) => tracing::error!("Failed to release stored file {}: {}", key, e),
        }
    }

    pdf.clone().delete(&state.db).await?;

    Ok(Json(json!({
        "success": true,
        "message": "PDF deleted successfully",
        "data": pdf,
    }))
    .into_response())
}

/// POST /api/pdfs/upload - multipart upload into object storage
pub async fn upload(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Response> {
    let decision = enforce_rate_limit(&state, &headers, "pdf-upload", policies::UPLOAD)?;

    let mut file_name = None;
    let mut data = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServerError::Validation(vec![format!("Malformed upload: {}", e)]))?
    {
        if field.name() == Some("file") {
            file_name = field.file_name().map(str::to_string);
            data = Some(field.bytes().await.map_err(|e| {
                ServerError::Validation(vec![format!("Failed to read upload: {}", e)])
            })?);
        }
    }

    let data = data.ok_or_else(|| ServerError::Validation(vec!["No file provided".to_string()]))?;
    let file_name = file_name.unwrap_or_else(|| "upload.pdf".to_string());

    let mut errors = Vec::new();
    if !file_name.to_lowercase().ends_with(".pdf") {
        errors.push("Only PDF files are allowed".to_string());
    }
    if file_name.chars().count() > 255 {
        errors.push("File name is too long".to_string());
    }
    if data.is_empty() {
        errors.push("File is empty".to_string());
    } else if data.len() as i64 > MAX_FILE_SIZE {
        errors.push("File size must be less than 100MB".to_string());
    }
    // PDF magic number
    if !data.is_empty() && !data.starts_with(b"%PDF") {
        errors.push("Invalid PDF file format".to_string());
    }
    if !errors.is_empty() {
        return Err(ServerError::Validation(errors));
    }

    let key = content_key(&data);
    state.storage.put(&key, data.clone()).await?;

    tracing::info!("Uploaded {} ({} bytes) as {}", file_name, data.len(), key);

    let mut response = Json(json!({
        "success": true,
        "data": {
            "url": format!("/files/{}", key),
            "key": key,
            "size": data.len(),
            "fileName": file_name,
        },
        "message": "File uploaded successfully",
    }))
    .into_response();

    if let Ok(value) = header::HeaderValue::from_str(&decision.remaining.to_string()) {
        response.headers_mut().insert("X-RateLimit-Remaining", value);
    }

    Ok(response)
}

/// GET /files/:key - serve a stored PDF
pub async fn serve_file(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> Result<Response> {
    // Keys are hex digests; reject anything else before touching the
    // filesystem.
    if key.is_empty() || !key.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ServerError::InvalidIdentifier("file"));
    }

    let data = match state.storage.get(&key).await {
        Ok(data) => data,
        Err(StorageError::NotFound(_)) => return Err(ServerError::NotFound("File")),
        Err(e) => return Err(e.into()),
    };

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/pdf")],
        data,
    )
        .into_response())
}

/// Content-addressed storage key: hex SHA-256 of the file bytes.
fn content_key(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::content_key;

    #[test]
    fn test_content_key_is_stable_hex() {
        let key = content_key(b"%PDF-1.4 test");
        assert_eq!(key, content_key(b"%PDF-1.4 test"));
        assert_ne!(key, content_key(b"%PDF-1.4 other"));
        assert_eq!(key.len(), 64);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
