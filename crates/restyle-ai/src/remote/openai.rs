use anyhow::{Context, Result};
use async_trait::async_trait;
use restyle_core::config::RemoteConfig;
use restyle_core::{ChatPrompt, GenerationBackend, GenerationError};

use super::types::{ChatCompletionRequest, ChatCompletionResponse, Message, Role};

/// Hosted chat-completion backend. One request per call, no retries; sampling
/// parameters come from config and never from the caller.
pub struct RemoteBackend {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    config: RemoteConfig,
}

impl RemoteBackend {
    pub fn new(config: RemoteConfig, api_key: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .context("Failed to build HTTP client")?;
        let endpoint = format!("{}/chat/completions", config.api_base.trim_end_matches('/'));
        Ok(Self {
            client,
            endpoint,
            api_key,
            config,
        })
    }

    /// Construct with the key read from `config.api_key_env`.
    pub fn from_env(config: RemoteConfig) -> Result<Self> {
        let key = config.api_key()?;
        Self::new(config, key)
    }

    /// Exactly one system and one user message.
    pub fn build_request<'a>(&'a self, prompt: &ChatPrompt) -> ChatCompletionRequest<'a> {
        ChatCompletionRequest {
            model: &self.config.model,
            messages: vec![
                Message {
                    role: Role::System,
                    content: prompt.system.clone(),
                },
                Message {
                    role: Role::User,
                    content: prompt.user.clone(),
                },
            ],
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
            top_p: self.config.top_p,
            frequency_penalty: self.config.frequency_penalty,
            presence_penalty: self.config.presence_penalty,
        }
    }

    async fn complete(&self, prompt: &ChatPrompt) -> Result<String> {
        let body = self.build_request(prompt);
        tracing::debug!("POST {} (model {})", self.endpoint, body.model);

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .context("chat completion request failed")?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            anyhow::bail!("chat completion returned {status}: {detail}");
        }

        let parsed: ChatCompletionResponse = response
            .json()
            .await
            .context("malformed chat completion response")?;
        parsed
            .first_content()
            .ok_or_else(|| anyhow::anyhow!("chat completion response has no content"))
    }
}

#[async_trait]
impl GenerationBackend for RemoteBackend {
    fn name(&self) -> &'static str {
        "remote"
    }

    async fn generate(&self, prompt: &ChatPrompt) -> Result<String, GenerationError> {
        self.complete(prompt).await.map_err(|e| {
            tracing::error!("Remote generation failed: {e:#}");
            GenerationError::from(e)
        })
    }
}
