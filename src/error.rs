use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::DbErr;
use serde_json::json;
use thiserror::Error;

use crate::storage::StorageError;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Invalid {0} ID format")]
    InvalidIdentifier(&'static str),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Validation failed")]
    Validation(Vec<String>),

    #[error("Too many requests. Please wait before trying again.")]
    RateLimited { reset_at_ms: u64 },

    #[error("Invalid credentials")]
    AuthFailed,

    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("AI service error: {0}")]
    Upstream(String),
}

impl ServerError {
    fn code(&self) -> &'static str {
        match self {
            ServerError::InvalidIdentifier(_) => "INVALID_ID",
            ServerError::NotFound(_) => "NOT_FOUND",
            ServerError::Validation(_) => "VALIDATION_ERROR",
            ServerError::RateLimited { .. } => "RATE_LIMIT_EXCEEDED",
            ServerError::AuthFailed => "UNAUTHORIZED",
            ServerError::Database(_) => "DATABASE_ERROR",
            ServerError::Storage(_) => "STORAGE_ERROR",
            ServerError::Upstream(_) => "UPSTREAM_ERROR",
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ServerError::InvalidIdentifier(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            ServerError::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            ServerError::Validation(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            ServerError::RateLimited { .. } => (StatusCode::TOO_MANY_REQUESTS, self.to_string()),
            ServerError::AuthFailed => (StatusCode::UNAUTHORIZED, self.to_string()),
            ServerError::Database(e) => {
                tracing::error!("Database error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "A server error occurred. Please try again later".to_string(),
                )
            }
            ServerError::Storage(e) => {
                tracing::error!("Storage error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "A server error occurred. Please try again later".to_string(),
                )
            }
            ServerError::Upstream(_) => (StatusCode::BAD_GATEWAY, self.to_string()),
        };

        let mut body = json!({
            "success": false,
            "error": message,
            "code": self.code(),
        });

        if let ServerError::Validation(details) = &self {
            body["details"] = json!(details);
        }

        let mut response = (status, Json(body)).into_response();

        if let ServerError::RateLimited { reset_at_ms } = &self {
            let headers = response.headers_mut();
            headers.insert("X-RateLimit-Remaining", header::HeaderValue::from_static("0"));
            if let Ok(value) = header::HeaderValue::from_str(&reset_at_ms.to_string()) {
                headers.insert("X-RateLimit-Reset", value);
            }
        }

        response
    }
}

pub type Result<T> = std::result::Result<T, ServerError>;
