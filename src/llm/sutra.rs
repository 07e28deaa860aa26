use super::{ChatCompletion, ChatMessage, ChatRole, LlmError};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone)]
pub struct SutraConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
}

impl SutraConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: "https://api.two.ai/v2".to_string(),
            model: "sutra-v2".to_string(),
            temperature: 0.7,
        }
    }
}

/// OpenAI-compatible chat-completions client for the Sutra endpoint.
#[derive(Debug, Clone)]
pub struct SutraClient {
    config: SutraConfig,
    client: Client,
}

impl SutraClient {
    pub fn new(config: SutraConfig) -> Self {
        Self {
            config,
            client: Client::new(),
        }
    }
}

#[derive(Serialize)]
struct SutraRequest {
    model: String,
    messages: Vec<SutraMessage>,
    temperature: f32,
}

#[derive(Serialize, Deserialize)]
struct SutraMessage {
    role: ChatRole,
    content: String,
}

#[derive(Deserialize)]
struct SutraResponse {
    choices: Vec<SutraChoice>,
}

#[derive(Deserialize)]
struct SutraChoice {
    message: SutraMessage,
}

#[async_trait]
impl ChatCompletion for SutraClient {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, LlmError> {
        let body = SutraRequest {
            model: self.config.model.clone(),
            messages: messages
                .iter()
                .map(|m| SutraMessage {
                    role: m.role,
                    content: m.content.clone(),
                })
                .collect(),
            temperature: self.config.temperature,
        };

        let mut req = self
            .client
            .post(format!("{}/chat/completions", self.config.base_url))
            .header("Content-Type", "application/json")
            .json(&body);

        if !self.config.api_key.is_empty() {
            req = req.header("Authorization", format!("Bearer {}", self.config.api_key));
        }

        let resp = req.send().await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let text = resp.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status,
                message: text,
            });
        }

        let data: SutraResponse = resp.json().await?;
        data.choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| LlmError::Parse("completion contained no choices".to_string()))
    }
}
