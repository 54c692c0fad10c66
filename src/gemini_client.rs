use std::time::Duration;

use async_trait::async_trait;
use eyre::Result;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, error};

use crate::cli::chat::conversation::{Message, Role};

const GEMINI_URL: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent";

const REQUEST_TIMEOUT_SECS: u64 = 30;

/// How many trailing history messages are replayed to the model per request.
const HISTORY_WINDOW: usize = 6;

const MENTAL_HEALTH_PROMPT: &str = "You are a compassionate mental health support chatbot. Your role is to:
- Provide emotional support and active listening
- Offer evidence-based coping strategies and techniques
- Encourage professional help when appropriate
- Be empathetic, non-judgmental, and supportive
- Never provide medical diagnoses or replace professional therapy
- Recognize crisis situations and provide appropriate resources
- Keep responses concise but meaningful (2-3 paragraphs maximum)

Please respond in a caring, supportive manner while maintaining professional boundaries.";

const PERSONA_ACK: &str = "I understand. I'm here to provide compassionate mental health support while maintaining appropriate boundaries. How can I help you today?";

pub const MISSING_KEY_TEXT: &str = "Please configure your Gemini API key first.";

const EMPTY_REPLY_TEXT: &str =
    "I'm sorry, I couldn't generate a response. Please try again or rephrase your message.";

/// Everything that can go wrong between building the request and extracting
/// the reply text. Each variant maps to one fixed user-facing string; callers
/// never see these as hard failures.
#[derive(Debug, Error)]
enum ReplyError {
    #[error("{0}")]
    Transport(#[from] reqwest::Error),

    #[error("response contained no candidates")]
    NoCandidates,

    #[error("{0}")]
    Malformed(String),
}

impl ReplyError {
    fn into_user_text(self) -> String {
        match self {
            ReplyError::Transport(e) => format!(
                "Connection error: Please check your internet connection and API key. Error: {}",
                e
            ),
            ReplyError::NoCandidates => EMPTY_REPLY_TEXT.to_string(),
            ReplyError::Malformed(detail) => {
                format!("An error occurred: {}. Please try again.", detail)
            }
        }
    }
}

/// A source of assistant replies. The conversation manager talks to this seam
/// so it can be driven by a stub in tests.
#[async_trait]
pub trait ReplyProvider {
    async fn generate_reply(&self, message: &str, history: &[Message], api_key: &str) -> String;
}

pub struct GeminiClient {
    client: reqwest::Client,
}

impl GeminiClient {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self { client })
    }

    async fn request_reply(
        &self,
        message: &str,
        history: &[Message],
        api_key: &str,
    ) -> Result<String, ReplyError> {
        let request_body = build_request_body(message, history);

        debug!("Sending request to Gemini API: {}", request_body);

        let response = self
            .client
            .post(GEMINI_URL)
            .header("Content-Type", "application/json")
            .header("X-goog-api-key", api_key)
            .json(&request_body)
            .send()
            .await?;

        if let Err(e) = response.error_for_status_ref() {
            let error_text = response.text().await.unwrap_or_default();
            error!("API request failed with response: {}", error_text);
            return Err(ReplyError::Transport(e));
        }

        let body = response.text().await?;
        let response_json: Value =
            serde_json::from_str(&body).map_err(|e| ReplyError::Malformed(e.to_string()))?;

        debug!("Received response from Gemini API: {}", response_json);

        extract_reply_text(&response_json)
    }
}

#[async_trait]
impl ReplyProvider for GeminiClient {
    /// Ask Gemini for a reply to `message`, replaying the trailing window of
    /// `history` for context. Never fails: configuration, transport and parse
    /// problems all come back as user-facing reply text.
    async fn generate_reply(&self, message: &str, history: &[Message], api_key: &str) -> String {
        if api_key.is_empty() {
            return MISSING_KEY_TEXT.to_string();
        }

        match self.request_reply(message, history, api_key).await {
            Ok(text) => text,
            Err(e) => e.into_user_text(),
        }
    }
}

/// Build the ordered turn list for one request: the persona instruction and
/// its fixed acknowledgment, the trailing window of history, then the new
/// user message.
pub fn build_contents(message: &str, history: &[Message]) -> Vec<Value> {
    let mut contents = Vec::new();

    contents.push(json!({
        "role": "user",
        "parts": [{ "text": MENTAL_HEALTH_PROMPT }]
    }));
    contents.push(json!({
        "role": "model",
        "parts": [{ "text": PERSONA_ACK }]
    }));

    let window_start = history.len().saturating_sub(HISTORY_WINDOW);
    for msg in &history[window_start..] {
        let role = match msg.role {
            Role::User => "user",
            Role::Assistant => "model",
        };
        contents.push(json!({
            "role": role,
            "parts": [{ "text": msg.content }]
        }));
    }

    contents.push(json!({
        "role": "user",
        "parts": [{ "text": message }]
    }));

    contents
}

pub fn build_request_body(message: &str, history: &[Message]) -> Value {
    json!({
        "contents": build_contents(message, history),
        "generationConfig": {
            "temperature": 0.7,
            "maxOutputTokens": 800,
            "topP": 0.8,
            "topK": 40
        },
        "safetySettings": [
            { "category": "HARM_CATEGORY_HARASSMENT", "threshold": "BLOCK_MEDIUM_AND_ABOVE" },
            { "category": "HARM_CATEGORY_HATE_SPEECH", "threshold": "BLOCK_MEDIUM_AND_ABOVE" },
            { "category": "HARM_CATEGORY_SEXUALLY_EXPLICIT", "threshold": "BLOCK_MEDIUM_AND_ABOVE" },
            { "category": "HARM_CATEGORY_DANGEROUS_CONTENT", "threshold": "BLOCK_MEDIUM_AND_ABOVE" }
        ]
    })
}

/// Pull the first candidate's text out of a generateContent response. An
/// empty candidate list (e.g. everything blocked by a safety filter) is not
/// malformed, it just has nothing to say.
fn extract_reply_text(response_json: &Value) -> Result<String, ReplyError> {
    let candidates = response_json
        .get("candidates")
        .and_then(|c| c.as_array())
        .ok_or(ReplyError::NoCandidates)?;

    let first_candidate = candidates.first().ok_or(ReplyError::NoCandidates)?;

    first_candidate
        .get("content")
        .and_then(|c| c.get("parts"))
        .and_then(|p| p.as_array())
        .and_then(|parts| parts.first())
        .and_then(|part| part.get("text"))
        .and_then(|t| t.as_str())
        .map(|t| t.to_string())
        .ok_or_else(|| ReplyError::Malformed("candidate is missing text content".to_string()))
}
