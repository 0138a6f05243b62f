//! Admin authentication: a static credential check behind the AUTH rate
//! limit. There are no user accounts; the admin panel is gated by a single
//! credential pair from the environment.

use std::sync::Arc;

use axum::{
    extract::State,
    http::HeaderMap,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use sha2::{Digest, Sha256};

use super::{enforce_rate_limit, AppState};
use crate::error::{Result, ServerError};
use crate::ratelimit::policies;

/// The static admin credential. Only the password hash is held in memory.
pub struct AdminCredentials {
    username: String,
    password_hash: String,
}

impl AdminCredentials {
    /// Read `ADMIN_USERNAME` / `ADMIN_PASSWORD` from the environment, with
    /// development defaults.
    pub fn from_env() -> Self {
        let username = std::env::var("ADMIN_USERNAME").unwrap_or_else(|_| "admin".to_string());
        let password = std::env::var("ADMIN_PASSWORD").unwrap_or_else(|_| "admin123".to_string());
        Self::new(username, &password)
    }

    pub fn new(username: String, password: &str) -> Self {
        Self {
            username,
            password_hash: hash_password(password),
        }
    }

    pub fn verify(&self, username: &str, password: &str) -> bool {
        username == self.username && hash_password(password) == self.password_hash
    }
}

/// Hash a password with salt
fn hash_password(password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(b"student-power-salt:");
    hasher.update(password.as_bytes());
    let result = hasher.finalize();
    result.iter().map(|b| format!("{:02x}", b)).collect()
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<LoginRequest>,
) -> Result<Response> {
    enforce_rate_limit(&state, &headers, "auth", policies::AUTH)?;

    if state.admin.verify(&body.username, &body.password) {
        Ok(Json(json!({ "success": true, "message": "Login successful" })).into_response())
    } else {
        Err(ServerError::AuthFailed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_hash() {
        let hash1 = hash_password("test123");
        let hash2 = hash_password("test123");
        let hash3 = hash_password("different");

        assert_eq!(hash1, hash2);
        assert_ne!(hash1, hash3);
    }

    #[test]
    fn test_verify() {
        let admin = AdminCredentials::new("admin".to_string(), "secret");
        assert!(admin.verify("admin", "secret"));
        assert!(!admin.verify("admin", "wrong"));
        assert!(!admin.verify("other", "secret"));
    }
}
