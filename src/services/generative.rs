//! Generative-AI text backend
//!
//! The [`GenerativeModel`] trait covers the two things the service needs from
//! a model: plain prompt completion (dataset enrichment) and a tool-calling
//! conversation turn (chat). [`GeminiClient`] implements it against the
//! Gemini `generateContent` REST endpoint.

use reqwest::{Client as HttpClient, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;

use crate::error::{AppError, AppResult};

const REQUEST_TIMEOUT_SECS: u64 = 60;

/// One entry of a conversation history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Turn {
    /// Standing instructions; sent as `systemInstruction`, not as a content turn
    System { text: String },
    User { text: String },
    Model { text: String },
    /// The model asked for a tool invocation
    ToolCall { name: String, args: Value },
    /// Result of a tool invocation, fed back to the model
    ToolResult { name: String, response: Value },
}

/// A function the model may call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    /// JSON-schema (OpenAPI subset) describing the arguments object
    pub parameters: Value,
}

/// What the model produced for a conversation turn
#[derive(Debug, Clone, PartialEq)]
pub enum ModelReply {
    Text(String),
    ToolCall { name: String, args: Value },
}

#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait GenerativeModel: Send + Sync {
    /// Completes a single prompt into free text
    async fn generate_text(&self, prompt: &str) -> AppResult<String>;

    /// Continues a conversation, optionally answering with a tool call
    async fn converse(&self, history: &[Turn], tools: &[ToolSpec]) -> AppResult<ModelReply>;

    /// Model name for logging and debugging
    fn name(&self) -> &'static str;
}

#[derive(Clone)]
pub struct GeminiClient {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
    model: String,
}

impl GeminiClient {
    pub fn new(api_key: String, api_url: String, model: String) -> AppResult<Self> {
        if api_key.trim().is_empty() {
            return Err(AppError::InvalidInput(
                "Gemini API key cannot be empty".to_string(),
            ));
        }

        let http_client = HttpClient::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            http_client,
            api_key,
            api_url: api_url.trim_end_matches('/').to_string(),
            model,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.api_url, self.model)
    }

    async fn generate_content(&self, body: Value) -> AppResult<GenerateContentResponse> {
        let response = self
            .http_client
            .post(self.endpoint())
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::RateLimited(format!(
                "Gemini API rate limit exceeded: {}",
                body
            )));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalApi(format!(
                "Gemini API returned status {}: {}",
                status, body
            )));
        }

        let response_text = response.text().await?;
        serde_json::from_str(&response_text).map_err(|e| {
            tracing::error!(error = %e, response = %response_text, "Failed to deserialize Gemini response");
            AppError::ExternalApi(format!("Failed to parse Gemini response: {}", e))
        })
    }
}

#[async_trait::async_trait]
impl GenerativeModel for GeminiClient {
    async fn generate_text(&self, prompt: &str) -> AppResult<String> {
        let body = json!({
            "contents": [{"role": "user", "parts": [{"text": prompt}]}]
        });

        let response = self.generate_content(body).await?;
        match response.into_reply()? {
            ModelReply::Text(text) => Ok(text),
            ModelReply::ToolCall { name, .. } => Err(AppError::ExternalApi(format!(
                "Gemini answered a plain prompt with tool call '{}'",
                name
            ))),
        }
    }

    async fn converse(&self, history: &[Turn], tools: &[ToolSpec]) -> AppResult<ModelReply> {
        let body = conversation_body(history, tools);
        let reply = self.generate_content(body).await?.into_reply()?;

        tracing::debug!(
            model = %self.model,
            turns = history.len(),
            tool_call = matches!(reply, ModelReply::ToolCall { .. }),
            "Gemini conversation turn completed"
        );

        Ok(reply)
    }

    fn name(&self) -> &'static str {
        "gemini"
    }
}

/// Request body for a conversation in Gemini's `contents` format
fn conversation_body(history: &[Turn], tools: &[ToolSpec]) -> Value {
    let system: Vec<Value> = history
        .iter()
        .filter_map(|turn| match turn {
            Turn::System { text } => Some(json!({"text": text})),
            _ => None,
        })
        .collect();

    let contents: Vec<Value> = history
        .iter()
        .filter_map(|turn| match turn {
            Turn::System { .. } => None,
            Turn::User { text } => Some(json!({"role": "user", "parts": [{"text": text}]})),
            Turn::Model { text } => Some(json!({"role": "model", "parts": [{"text": text}]})),
            Turn::ToolCall { name, args } => Some(json!({
                "role": "model",
                "parts": [{"functionCall": {"name": name, "args": args}}]
            })),
            Turn::ToolResult { name, response } => Some(json!({
                "role": "function",
                "parts": [{"functionResponse": {"name": name, "response": response}}]
            })),
        })
        .collect();

    let mut body = json!({ "contents": contents });
    if !system.is_empty() {
        body["systemInstruction"] = json!({ "parts": system });
    }
    if !tools.is_empty() {
        body["tools"] = json!([{ "functionDeclarations": tools }]);
    }
    body
}

// ============================================================================
// Gemini API Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    function_call: Option<FunctionCall>,
}

#[derive(Debug, Deserialize)]
struct FunctionCall {
    name: String,
    #[serde(default)]
    args: Value,
}

impl GenerateContentResponse {
    /// First function call wins; otherwise all text parts are joined
    fn into_reply(self) -> AppResult<ModelReply> {
        let parts = self
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts)
            .unwrap_or_default();

        let mut text = String::new();
        for part in parts {
            if let Some(call) = part.function_call {
                return Ok(ModelReply::ToolCall {
                    name: call.name,
                    args: call.args,
                });
            }
            if let Some(t) = part.text {
                text.push_str(&t);
            }
        }

        let text = text.trim().to_string();
        if text.is_empty() {
            return Err(AppError::ExternalApi(
                "Gemini returned no content".to_string(),
            ));
        }
        Ok(ModelReply::Text(text))
    }
}
