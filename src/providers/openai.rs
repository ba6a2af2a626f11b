use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::errors::ProviderError;
use super::{ensure_success, http_client, http_error, Provider, ProviderRequest};

/// Client for the OpenAI chat completions API and compatible servers
#[derive(Debug)]
pub struct OpenAI {
    /// HTTP client for API requests
    client: Client,
    /// Bearer token
    api_key: String,
    /// Base endpoint, e.g. https://api.openai.com/v1
    endpoint: String,
    /// Model to request
    model: String,
    /// Name used in logs; compatible servers override it
    display_name: String,
    timeout_secs: u64,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    top_p: f32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

impl OpenAI {
    pub fn new(
        api_key: impl Into<String>,
        endpoint: impl Into<String>,
        model: impl Into<String>,
        timeout_secs: u64,
    ) -> Self {
        Self {
            client: http_client(timeout_secs),
            api_key: api_key.into(),
            endpoint: endpoint.into(),
            model: model.into(),
            display_name: "OpenAI".to_string(),
            timeout_secs,
        }
    }

    /// Override the name reported in logs
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.display_name = name.into();
        self
    }

    fn completions_url(&self) -> String {
        let base = if self.endpoint.is_empty() {
            "https://api.openai.com/v1"
        } else {
            self.endpoint.trim_end_matches('/')
        };
        format!("{}/chat/completions", base)
    }
}

#[async_trait]
impl Provider for OpenAI {
    fn name(&self) -> &str {
        &self.display_name
    }

    async fn complete(&self, request: ProviderRequest) -> Result<String, ProviderError> {
        let body = ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage { role: "system".to_string(), content: Some(request.instructions) },
                ChatMessage { role: "user".to_string(), content: Some(request.content) },
            ],
            temperature: request.temperature,
            top_p: request.top_p,
        };

        debug!("Sending request to {} model {}", self.display_name, self.model);
        let response = self.client.post(self.completions_url())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| http_error(e, self.timeout_secs))?;

        let response = ensure_success(response).await?;
        let parsed = response.json::<ChatCompletionResponse>().await
            .map_err(|e| http_error(e, self.timeout_secs))?;
        parsed.choices.into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| ProviderError::ParseError(format!("{} returned no message content", self.display_name)))
    }
}
