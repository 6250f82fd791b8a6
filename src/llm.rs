use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::LlmConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    #[serde(default)]
    pub content: Option<String>,
}

impl ChatMessage {
    pub fn system(content: &str) -> Self {
        Self {
            role: "system".to_string(),
            content: Some(content.to_string()),
        }
    }

    pub fn user(content: &str) -> Self {
        Self {
            role: "user".to_string(),
            content: Some(content.to_string()),
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChatMessage,
}

/// Turns a prompt into generated text.
#[async_trait]
pub trait Completion: Send + Sync {
    /// Returns the first choice's content, or `None` when the provider produced none.
    async fn complete(&self, prompt: &str) -> Result<Option<String>>;
}

pub struct LlmClient {
    client: reqwest::Client,
    config: LlmConfig,
}

impl LlmClient {
    pub fn new(config: LlmConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    fn build_request(&self, prompt: &str) -> ChatRequest {
        ChatRequest {
            model: self.config.model.clone(),
            messages: vec![
                ChatMessage::system(&self.config.system_prompt),
                ChatMessage::user(prompt),
            ],
            max_tokens: self.config.max_tokens,
        }
    }
}

#[async_trait]
impl Completion for LlmClient {
    async fn complete(&self, prompt: &str) -> Result<Option<String>> {
        let request = self.build_request(prompt);
        let url = format!("{}/chat/completions", self.config.effective_base_url());

        debug!(
            "Sending completion request to {} ({}): {}",
            self.config.provider, url, request.model
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .with_context(|| format!("Failed to send request to {}", self.config.provider))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            anyhow::bail!("{} API error ({}): {}", self.config.provider, status, error_body);
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .with_context(|| format!("Failed to parse {} response", self.config.provider))?;

        Ok(first_content(chat_response))
    }
}

fn first_content(response: ChatResponse) -> Option<String> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
}
