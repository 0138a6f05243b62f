//! HTTP API: routing, shared state, and the JSON response envelope.

pub mod ai;
pub mod auth;
pub mod courses;
pub mod pdfs;
pub mod semesters;
pub mod subjects;
pub mod universities;

use std::sync::Arc;

use axum::{
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use sea_orm::DatabaseConnection;
use serde::Serialize;
use serde_json::json;

use crate::ai::AiClient;
use crate::cascade::{CascadeCoordinator, DeleteSummary};
use crate::error::{Result, ServerError};
use crate::ratelimit::{Policy, RateLimiter};
use crate::storage::StorageBackend;

pub use auth::AdminCredentials;

/// Application state shared across handlers
pub struct AppState {
    pub db: DatabaseConnection,
    pub storage: Arc<dyn StorageBackend>,
    pub cascade: CascadeCoordinator,
    pub limiter: Arc<RateLimiter>,
    pub admin: AdminCredentials,
    pub ai: AiClient,
}

/// Build the full application router
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        // Health check
        .route("/health", get(health))
        // Auth
        .route("/api/auth/login", post(auth::login))
        // Universities
        .route(
            "/api/universities",
            get(universities::list).post(universities::create),
        )
        .route(
            "/api/universities/:id",
            get(universities::get_one)
                .put(universities::update)
                .delete(universities::remove),
        )
        // Courses
        .route("/api/courses", get(courses::list).post(courses::create))
        .route(
            "/api/courses/:id",
            get(courses::get_one).put(courses::update).delete(courses::remove),
        )
        // Semesters
        .route("/api/semesters", get(semesters::list).post(semesters::create))
        .route("/api/semesters/:id", get(semesters::get_one))
        // Subjects
        .route("/api/subjects", get(subjects::list).post(subjects::create))
        .route(
            "/api/subjects/:id",
            get(subjects::get_one).put(subjects::update).delete(subjects::remove),
        )
        // PDFs
        .route("/api/pdfs", get(pdfs::list).post(pdfs::create))
        .route(
            "/api/pdfs/:id",
            get(pdfs::get_one).put(pdfs::update).delete(pdfs::remove),
        )
        .route("/api/pdfs/upload", post(pdfs::upload))
        .route("/files/:key", get(pdfs::serve_file))
        // AI proxy
        .route("/api/ai/chat", get(ai::status).post(ai::chat))
}

async fn health() -> Response {
    Json(json!({ "status": "ok" })).into_response()
}

/// 200 envelope with data
pub(crate) fn success<T: Serialize>(data: &T) -> Response {
    Json(json!({ "success": true, "data": data })).into_response()
}

/// 201 envelope with data and a message
pub(crate) fn created<T: Serialize>(data: &T, message: impl Into<String>) -> Response {
    (
        StatusCode::CREATED,
        Json(json!({ "success": true, "data": data, "message": message.into() })),
    )
        .into_response()
}

/// 200 envelope for a completed cascade delete
pub(crate) fn cascade_deleted<T: Serialize>(
    resource: &str,
    data: &T,
    summary: DeleteSummary,
) -> Response {
    Json(json!({
        "success": true,
        "message": format!(
            "{} and all related data deleted successfully ({} of {} stored files released)",
            resource, summary.external_released, summary.external_attempted
        ),
        "data": data,
        "summary": summary,
    }))
    .into_response()
}

/// Parse a numeric path identifier, or fail with `InvalidIdentifier`.
pub(crate) fn parse_id(raw: &str, resource: &'static str) -> Result<i32> {
    raw.parse::<i32>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or(ServerError::InvalidIdentifier(resource))
}

/// Client IP for rate limiting, from proxy headers with a fallback.
pub(crate) fn client_ip(headers: &HeaderMap) -> String {
    if let Some(forwarded) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }

    if let Some(real_ip) = headers.get("x-real-ip").and_then(|v| v.to_str().ok()) {
        return real_ip.trim().to_string();
    }

    "unknown".to_string()
}

/// Count this request against the limiter; deny with 429 once the window is exhausted.
pub(crate) fn enforce_rate_limit(
    state: &AppState,
    headers: &HeaderMap,
    scope: &str,
    policy: Policy,
) -> Result<crate::ratelimit::Decision> {
    let identifier = format!("{}-{}", scope, client_ip(headers));
    let decision = state.limiter.check(&identifier, policy);
    if !decision.allowed {
        return Err(ServerError::RateLimited {
            reset_at_ms: decision.reset_at_ms,
        });
    }
    Ok(decision)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_parse_id() {
        assert_eq!(parse_id("42", "course").unwrap(), 42);
        assert!(parse_id("abc", "course").is_err());
        assert!(parse_id("-1", "course").is_err());
        assert!(parse_id("0", "course").is_err());
    }

    #[test]
    fn test_client_ip_prefers_forwarded_for() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("1.2.3.4, 5.6.7.8"));
        headers.insert("x-real-ip", HeaderValue::from_static("9.9.9.9"));
        assert_eq!(client_ip(&headers), "1.2.3.4");
    }

    #[test]
    fn test_client_ip_fallbacks() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("9.9.9.9"));
        assert_eq!(client_ip(&headers), "9.9.9.9");

        assert_eq!(client_ip(&HeaderMap::new()), "unknown");
    }
}
