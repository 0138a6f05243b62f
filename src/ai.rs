//! Client for the external completion API backing the AI-assisted PDF viewer.
//!
//! The browser extracts text from the open PDF and posts it here together
//! with an action; this module builds the prompt, forwards it to the
//! completion API, and returns the assistant's reply.

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::{Result, ServerError};

const DEFAULT_API_URL: &str = "https://api.perplexity.ai/chat/completions";
const DEFAULT_MODEL: &str = "sonar";

/// Document text beyond this many characters is truncated before prompting.
const MAX_DOCUMENT_CHARS: usize = 10_000;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatAction {
    Summarize,
    GenerateQuestions,
    Answer,
    Chat,
}

impl ChatAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatAction::Summarize => "summarize",
            ChatAction::GenerateQuestions => "generate_questions",
            ChatAction::Answer => "answer",
            ChatAction::Chat => "chat",
        }
    }

    fn max_tokens(&self) -> u32 {
        match self {
            ChatAction::Summarize => 800,
            ChatAction::GenerateQuestions => 1000,
            ChatAction::Answer | ChatAction::Chat => 600,
        }
    }

    fn temperature(&self) -> f32 {
        match self {
            ChatAction::Summarize => 0.3,
            ChatAction::GenerateQuestions => 0.4,
            ChatAction::Answer => 0.2,
            ChatAction::Chat => 0.5,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

pub struct AiClient {
    http: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
}

impl AiClient {
    /// Build a client from `AI_API_KEY` / `AI_API_URL` / `AI_MODEL`. An empty
    /// key leaves the client unconfigured; requests then fail cleanly.
    pub fn from_env() -> Self {
        Self {
            http: reqwest::Client::new(),
            api_url: std::env::var("AI_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string()),
            api_key: std::env::var("AI_API_KEY").unwrap_or_default(),
            model: std::env::var("AI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Forward one request to the completion API and return the reply text.
    pub async fn complete(
        &self,
        action: ChatAction,
        pdf_text: &str,
        question: Option<&str>,
        message: Option<&str>,
        history: &[ChatMessage],
    ) -> Result<String> {
        if !self.is_configured() {
            return Err(ServerError::Upstream(
                "AI API key is not configured".to_string(),
            ));
        }

        let text = truncate_document(pdf_text);
        let messages = build_messages(action, &text, question, message, history);

        let body = json!({
            "model": self.model,
            "messages": messages,
            "max_tokens": action.max_tokens(),
            "temperature": action.temperature(),
            "top_p": 0.9,
            "stream": false,
        });

        tracing::debug!("Sending {} request to completion API", action.as_str());

        let response = self
            .http
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ServerError::Upstream(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            tracing::error!("Completion API error {}: {}", status, detail);
            return Err(ServerError::Upstream(format!(
                "completion API returned {}",
                status
            )));
        }

        let payload: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ServerError::Upstream(e.to_string()))?;

        payload["choices"][0]["message"]["content"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| ServerError::Upstream("API returned empty choices".to_string()))
    }
}

fn truncate_document(text: &str) -> String {
    if text.chars().count() > MAX_DOCUMENT_CHARS {
        let truncated: String = text.chars().take(MAX_DOCUMENT_CHARS).collect();
        format!("{}...", truncated)
    } else {
        text.to_string()
    }
}

/// Best-effort topic for prompt headers: the first reasonably long line of
/// the document.
fn guess_topic(text: &str) -> &str {
    text.lines()
        .map(str::trim)
        .find(|line| line.len() >= 10 && line.len() <= 120)
        .unwrap_or("Document Content")
}

fn build_messages(
    action: ChatAction,
    text: &str,
    question: Option<&str>,
    message: Option<&str>,
    history: &[ChatMessage],
) -> Vec<ChatMessage> {
    match action {
        ChatAction::Summarize => {
            let topic = guess_topic(text);
            vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: "You are an expert academic assistant specialized in creating \
                              well-structured, hierarchical summaries of educational documents. \
                              Use markdown formatting with proper heading levels. Focus on key \
                              concepts, definitions, explanations, and relationships between \
                              ideas."
                        .to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: format!(
                        "Please create a comprehensive academic summary of the following \
                         document content, titled \"Summary of {}\", organized into 2-3 major \
                         sections with subsections where appropriate.\n\nDocument Content:\n{}",
                        topic, text
                    ),
                },
            ]
        }
        ChatAction::GenerateQuestions => {
            let topic = guess_topic(text);
            vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: "You are an expert academic assistant specialized in generating \
                              important conceptual and applied questions from educational \
                              documents. Questions should test understanding, application, and \
                              critical thinking."
                        .to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: format!(
                        "Based on the provided document content, generate 10-12 important \
                         questions related to \"{}\". Make questions diverse: conceptual, \
                         application, comparison, and analytical.\n\nDocument Content:\n{}",
                        topic, text
                    ),
                },
            ]
        }
        ChatAction::Answer => vec![
            ChatMessage {
                role: "system".to_string(),
                content: "You are a helpful AI assistant that answers questions based on the \
                          provided document content. Provide accurate, detailed answers based \
                          primarily on the information in the document. If the answer requires \
                          information beyond the document, clearly indicate this."
                    .to_string(),
            },
            ChatMessage {
                role: "user".to_string(),
                content: format!(
                    "Document content:\n{}\n\nQuestion: {}\n\nPlease provide a comprehensive \
                     answer based on the document content above.",
                    text,
                    question.unwrap_or_default()
                ),
            },
        ],
        ChatAction::Chat => {
            let mut messages = vec![ChatMessage {
                role: "system".to_string(),
                content: format!(
                    "You are a helpful AI assistant discussing the content of a document. Here \
                     is the document content:\n\n{}\n\nAnswer questions and discuss topics \
                     based on this document.",
                    text
                ),
            }];
            messages.extend(history.iter().cloned());
            messages.push(ChatMessage {
                role: "user".to_string(),
                content: message.unwrap_or_default().to_string(),
            });
            messages
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_document() {
        let short = "short text";
        assert_eq!(truncate_document(short), short);

        let long = "x".repeat(MAX_DOCUMENT_CHARS + 50);
        let truncated = truncate_document(&long);
        assert_eq!(truncated.chars().count(), MAX_DOCUMENT_CHARS + 3);
        assert!(truncated.ends_with("..."));
    }

    #[test]
    fn test_guess_topic() {
        assert_eq!(guess_topic("Chapter 1: Operating Systems\nmore text"), "Chapter 1: Operating Systems");
        assert_eq!(guess_topic("x\ny"), "Document Content");
    }

    #[test]
    fn test_chat_messages_include_history() {
        let history = vec![
            ChatMessage {
                role: "user".to_string(),
                content: "earlier question".to_string(),
            },
            ChatMessage {
                role: "assistant".to_string(),
                content: "earlier answer".to_string(),
            },
        ];
        let messages = build_messages(
            ChatAction::Chat,
            "doc text",
            None,
            Some("follow-up"),
            &history,
        );
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0].role, "system");
        assert_eq!(messages[3].content, "follow-up");
    }

    #[test]
    fn test_unconfigured_client() {
        let client = AiClient {
            http: reqwest::Client::new(),
            api_url: DEFAULT_API_URL.to_string(),
            api_key: String::new(),
            model: DEFAULT_MODEL.to_string(),
        };
        assert!(!client.is_configured());
    }
}
