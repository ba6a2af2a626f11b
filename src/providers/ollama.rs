use async_trait::async_trait;
use log::{debug, error};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::errors::ProviderError;
use super::{ensure_success, http_client, http_error, Provider, ProviderRequest};

/// Ollama client for interacting with Ollama API
#[derive(Debug)]
pub struct Ollama {
    /// Base URL of the Ollama API
    base_url: String,
    /// HTTP client for making requests
    client: Client,
    /// Model name to use for generation
    model: String,
    timeout_secs: u64,
}

/// Chat message object
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ChatMessage {
    /// Role of the message sender (system, user, assistant, or tool)
    role: String,
    /// Content of the message
    #[serde(default)]
    content: String,
}

/// Additional model parameters
#[derive(Debug, Serialize)]
struct GenerationOptions {
    temperature: f32,
    top_p: f32,
}

/// Chat request for the Ollama API
#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    options: GenerationOptions,
    stream: bool,
}

/// Chat response from the Ollama API
#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: ChatMessage,
}

impl Ollama {
    /// Create a new Ollama client from a base URL such as http://localhost:11434
    pub fn new(url: impl Into<String>, model: impl Into<String>, timeout_secs: u64) -> Self {
        let url = url.into();
        let base_url = if url.starts_with("http://") || url.starts_with("https://") {
            url.trim_end_matches('/').to_string()
        } else {
            format!("http://{}", url.trim_end_matches('/'))
        };

        Self {
            base_url,
            client: http_client(timeout_secs),
            model: model.into(),
            timeout_secs,
        }
    }

    /// Parse a chat body, falling back to concatenating streamed JSONL chunks
    fn parse_chat_body(body: &str) -> Result<String, ProviderError> {
        if let Ok(response) = serde_json::from_str::<ChatResponse>(body) {
            return Ok(response.message.content);
        }

        // The server may stream even when asked not to
        let mut content = String::new();
        let mut parsed_any = false;
        for line in body.lines().filter(|l| !l.trim().is_empty()) {
            if let Ok(value) = serde_json::from_str::<serde_json::Value>(line) {
                parsed_any = true;
                if let Some(part) = value.pointer("/message/content").and_then(|v| v.as_str()) {
                    content.push_str(part);
                }
            }
        }

        if parsed_any {
            Ok(content)
        } else {
            let preview: String = body.chars().take(500).collect();
            error!("Failed to parse Ollama chat response: {}", preview);
            Err(ProviderError::ParseError("Unrecognized Ollama chat response".to_string()))
        }
    }

    /// Get the Ollama API version
    pub async fn version(&self) -> Result<String, ProviderError> {
        let url = format!("{}/api/version", self.base_url);
        let response = self.client.get(&url)
            .send()
            .await
            .map_err(|e| http_error(e, self.timeout_secs))?;
        let value: serde_json::Value = ensure_success(response).await?.json().await
            .map_err(|e| http_error(e, self.timeout_secs))?;

        value["version"].as_str()
            .map(str::to_string)
            .ok_or_else(|| ProviderError::ParseError("Invalid version format in response".to_string()))
    }
}

#[async_trait]
impl Provider for Ollama {
    fn name(&self) -> &str {
        "Ollama"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<String, ProviderError> {
        let body = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage { role: "system".to_string(), content: request.instructions },
                ChatMessage { role: "user".to_string(), content: request.content },
            ],
            options: GenerationOptions {
                temperature: request.temperature,
                top_p: request.top_p,
            },
            stream: false,
        };

        let url = format!("{}/api/chat", self.base_url);
        debug!("Sending chat request to Ollama model {}", self.model);
        let response = self.client.post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| http_error(e, self.timeout_secs))?;

        let text = ensure_success(response).await?.text().await
            .map_err(|e| http_error(e, self.timeout_secs))?;
        Self::parse_chat_body(&text)
    }

    async fn test_connection(&self) -> Result<(), ProviderError> {
        let version = self.version().await?;
        debug!("Connected to Ollama {}", version);
        Ok(())
    }
}
