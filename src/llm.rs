//! Chat-completion client for the hosted language model.

use crate::config::AssistantConfig;
use crate::errors::{AssistantError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// One chat message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }

    pub fn is_user(&self) -> bool {
        self.role == "user"
    }
}

/// A single chat-completion request
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
}

impl ChatRequest {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            temperature: 0.7,
            max_tokens: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Content of the system message, if any
    pub fn system_prompt(&self) -> Option<&str> {
        self.messages
            .iter()
            .find(|m| m.role == "system")
            .map(|m| m.content.as_str())
    }
}

/// Anything that turns a chat request into reply text
#[async_trait]
pub trait ChatProvider: Send + Sync {
    fn model(&self) -> &str;

    async fn complete(&self, request: &ChatRequest) -> Result<String>;
}

/// OpenAI-compatible `/chat/completions` provider
pub struct OpenAiChat {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiChat {
    pub fn new(client: reqwest::Client, base_url: &str, api_key: &str, model: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        }
    }

    pub fn from_config(client: reqwest::Client, config: &AssistantConfig) -> Self {
        Self::new(client, &config.base_url, &config.api_key, &config.chat_model)
    }

    fn url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    /// Request body sent to the endpoint
    pub fn payload(&self, request: &ChatRequest) -> Value {
        let mut payload = json!({
            "model": self.model,
            "messages": request.messages,
            "temperature": request.temperature,
        });
        if let Some(max_tokens) = request.max_tokens {
            payload["max_tokens"] = json!(max_tokens);
        }
        payload
    }
}

#[async_trait]
impl ChatProvider for OpenAiChat {
    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: &ChatRequest) -> Result<String> {
        log::debug!(
            "chat completion: model={} messages={}",
            self.model,
            request.messages.len()
        );
        let body = post_json(&self.client, &self.url(), &self.api_key, &self.payload(request)).await?;
        parse_chat_response(&body)
    }
}

/// POST a JSON body with bearer auth and return the raw response text,
/// mapping non-success statuses to `HttpError` with the API's message.
pub(crate) async fn post_json(
    client: &reqwest::Client,
    url: &str,
    api_key: &str,
    payload: &Value,
) -> Result<String> {
    let response = client
        .post(url)
        .bearer_auth(api_key)
        .json(payload)
        .send()
        .await?;

    let status = response.status();
    let text = response.text().await?;

    if !status.is_success() {
        return Err(AssistantError::HttpError {
            status: Some(status.as_u16()),
            message: extract_error_message(&text).unwrap_or(text),
        });
    }
    Ok(text)
}

fn extract_error_message(body: &str) -> Option<String> {
    serde_json::from_str::<Value>(body)
        .ok()?
        .get("error")?
        .get("message")?
        .as_str()
        .map(|s| s.to_string())
}

/// Pull `choices[0].message.content` out of a chat-completions response
pub fn parse_chat_response(body: &str) -> Result<String> {
    let v: Value = serde_json::from_str(body)?;

    if let Some(err) = v.get("error") {
        let msg = err["message"].as_str().unwrap_or("Unknown error");
        return Err(crate::api_error!(msg));
    }

    v["choices"][0]["message"]["content"]
        .as_str()
        .map(|s| s.to_string())
        .ok_or_else(|| crate::api_error!("response contained no message content"))
}
