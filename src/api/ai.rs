//! AI chat proxy handlers. The browser-side PDF viewer extracts document
//! text and posts it here; replies come from the external completion API.

use std::sync::Arc;

use axum::{
    extract::State,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;

use super::AppState;
use crate::ai::{ChatAction, ChatMessage};
use crate::error::{Result, ServerError};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub action: ChatAction,
    pub pdf_text: Option<String>,
    pub question: Option<String>,
    pub message: Option<String>,
    #[serde(default)]
    pub conversation_history: Vec<ChatMessage>,
}

/// POST /api/ai/chat
pub async fn chat(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ChatRequest>,
) -> Result<Response> {
    let pdf_text = body.pdf_text.as_deref().unwrap_or("").trim();
    if pdf_text.is_empty() {
        return Err(ServerError::Validation(vec![
            "No PDF content provided".to_string(),
        ]));
    }

    let question = body.question.as_deref().map(str::trim).filter(|q| !q.is_empty());
    let message = body.message.as_deref().map(str::trim).filter(|m| !m.is_empty());

    if body.action == ChatAction::Answer && question.is_none() {
        return Err(ServerError::Validation(vec![
            "No question provided".to_string(),
        ]));
    }
    if body.action == ChatAction::Chat && message.is_none() {
        return Err(ServerError::Validation(vec![
            "No message provided".to_string(),
        ]));
    }

    let reply = state
        .ai
        .complete(
            body.action,
            pdf_text,
            question,
            message,
            &body.conversation_history,
        )
        .await?;

    Ok(Json(json!({
        "success": true,
        "response": reply,
        "action": body.action.as_str(),
    }))
    .into_response())
}

/// GET /api/ai/chat - proxy configuration status
pub async fn status(State(state): State<Arc<AppState>>) -> Response {
    let configured = state.ai.is_configured();
    Json(json!({
        "status": if configured { "ok" } else { "error" },
        "message": if configured {
            "AI chat proxy is running and configured"
        } else {
            "API key is not configured"
        },
        "model": state.ai.model(),
        "apiKeyConfigured": configured,
    }))
    .into_response()
}
