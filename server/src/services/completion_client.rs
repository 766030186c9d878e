// server/src/services/completion_client.rs

//! Outbound chat-completion calls (OpenAI-compatible endpoint, Groq by default).

use crate::config::ChatConfig;
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, instrument, warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
  pub role: String,
  pub content: String,
}

impl ChatMessage {
  pub fn system(content: impl Into<String>) -> Self {
    ChatMessage {
      role: "system".to_string(),
      content: content.into(),
    }
  }

  pub fn user(content: impl Into<String>) -> Self {
    ChatMessage {
      role: "user".to_string(),
      content: content.into(),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionRequest {
  pub model: String,
  pub messages: Vec<ChatMessage>,
  pub temperature: f32,
  pub max_tokens: u32,
}

/// Produces the assistant text for a request. `Ok(None)` means the model
/// answered without any content.
#[async_trait]
pub trait CompletionClient: Send + Sync {
  async fn complete(&self, request: &CompletionRequest) -> Result<Option<String>>;
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
  #[serde(default)]
  choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
  message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
  content: Option<String>,
}

pub struct GroqClient {
  http: Client,
  api_url: String,
  api_key: String,
}

impl GroqClient {
  pub fn new(config: &ChatConfig, api_key: &str) -> Result<Self> {
    let http = Client::builder()
      .timeout(Duration::from_secs(config.timeout_secs))
      .build()
      .map_err(|e| AppError::Config(format!("Could not build HTTP client: {}", e)))?;
    Ok(GroqClient {
      http,
      api_url: config.api_url.clone(),
      api_key: api_key.to_string(),
    })
  }
}

/// Upstream status codes the assistant surfaces as something other than a plain 500.
fn map_upstream_status(status: StatusCode) -> AppError {
  match status {
    StatusCode::TOO_MANY_REQUESTS => {
      AppError::TooManyRequests("Too many requests. Please try again in a few seconds.".to_string())
    }
    StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
      AppError::Internal("Assistant is not configured correctly, contact administrator.".to_string())
    }
    other => AppError::Internal(format!("Assistant request failed with status {}", other)),
  }
}

#[async_trait]
impl CompletionClient for GroqClient {
  #[instrument(name = "completion_client::complete", skip_all, fields(model = %request.model, messages = request.messages.len()), err(Display))]
  async fn complete(&self, request: &CompletionRequest) -> Result<Option<String>> {
    let response = self
      .http
      .post(&self.api_url)
      .bearer_auth(&self.api_key)
      .json(request)
      .send()
      .await
      .map_err(|e| {
        if e.is_timeout() {
          warn!("Completion request timed out.");
          AppError::Internal("Assistant did not answer in time".to_string())
        } else {
          error!(error = %e, "Completion request failed.");
          AppError::Internal(format!("Assistant request failed: {}", e))
        }
      })?;

    let status = response.status();
    if !status.is_success() {
      warn!(%status, "Completion API returned an error status.");
      return Err(map_upstream_status(status));
    }

    let body: CompletionResponse = response
      .json()
      .await
      .map_err(|e| AppError::Internal(format!("Unreadable assistant response: {}", e)))?;
    debug!(choices = body.choices.len(), "Completion received.");

    Ok(
      body
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message)
        .and_then(|message| message.content)
        .filter(|content| !content.trim().is_empty()),
    )
  }
}
