use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::errors::ProviderError;
use super::{ensure_success, http_client, http_error, Provider, ProviderRequest};

/// Gemini client for the Generative Language API
#[derive(Debug)]
pub struct Gemini {
    /// HTTP client for API requests
    client: Client,
    /// API key, sent as the `key` query parameter
    api_key: String,
    /// Base endpoint, e.g. https://generativelanguage.googleapis.com/v1beta
    endpoint: String,
    /// Model name, e.g. gemini-2.0-flash
    model: String,
    timeout_secs: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    system_instruction: GeminiContent,
    contents: Vec<GeminiContent>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_p: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

impl Gemini {
    /// Create a new Gemini client
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
            timeout_secs,
        }
    }

    fn generate_url(&self) -> Result<Url, ProviderError> {
        let base = self.endpoint.trim_end_matches('/');
        let raw = format!("{}/models/{}:generateContent", base, self.model);
        Url::parse_with_params(&raw, &[("key", self.api_key.as_str())])
            .map_err(|e| ProviderError::RequestFailed(format!("Invalid Gemini endpoint {}: {}", raw, e)))
    }

    fn extract_text(response: GenerateContentResponse) -> Result<String, ProviderError> {
        let text: String = response.candidates.into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .map(|content| content.parts.into_iter().map(|part| part.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(ProviderError::ParseError("Gemini returned no candidate text".to_string()));
        }
        Ok(text)
    }
}

#[async_trait]
impl Provider for Gemini {
    fn name(&self) -> &str {
        "Gemini"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<String, ProviderError> {
        let body = GenerateContentRequest {
            system_instruction: GeminiContent {
                role: None,
                parts: vec![GeminiPart { text: request.instructions }],
            },
            contents: vec![GeminiContent {
                role: Some("user".to_string()),
                parts: vec![GeminiPart { text: request.content }],
            }],
            generation_config: GenerationConfig {
                temperature: request.temperature,
                top_p: request.top_p,
            },
        };

        debug!("Sending request to Gemini model {}", self.model);
        let response = self.client.post(self.generate_url()?)
            .json(&body)
            .send()
            .await
            .map_err(|e| http_error(e, self.timeout_secs))?;

        let response = ensure_success(response).await?;
        let parsed = response.json::<GenerateContentResponse>().await
            .map_err(|e| http_error(e, self.timeout_secs))?;
        Self::extract_text(parsed)
    }
}
