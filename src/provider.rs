//! Model Provider Abstraction
//!
//! Unified interface over the LLM providers that back document generation
//! (OpenAI, Anthropic, local models via Ollama, custom OpenAI-compatible servers).
//! Provider failures are reported as `GenerationError` so the orchestrator can
//! apply its fallback policy without knowing which provider was used.

use crate::error::{ApiError, GenerationError};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderType {
    OpenAI,
    Anthropic,
    Ollama,
    LocalCustom,
}

impl ProviderType {
    pub fn as_str(self) -> &'static str {
        match self {
            ProviderType::OpenAI => "openai",
            ProviderType::Anthropic => "anthropic",
            ProviderType::Ollama => "ollama",
            ProviderType::LocalCustom => "localcustom",
        }
    }

    fn requires_api_key(self) -> bool {
        matches!(self, ProviderType::OpenAI | ProviderType::Anthropic)
    }
}

/// Completion options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionOptions {
    pub temperature: Option<f32>, // 0.0-2.0
    pub max_tokens: Option<u32>,
    pub top_p: Option<f32>,
    pub stop: Option<Vec<String>>,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            temperature: Some(0.4),
            max_tokens: Some(4096),
            top_p: None,
            stop: None,
        }
    }
}

/// Provider settings as loaded from configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub provider_type: ProviderType,
    pub model: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub default_options: CompletionOptions,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            provider_type: ProviderType::Ollama,
            model: "llama3.1".to_string(),
            api_key: None,
            endpoint: None,
            default_options: CompletionOptions::default(),
        }
    }
}

impl ProviderConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.model.trim().is_empty() {
            return Err("Model name cannot be empty".to_string());
        }
        if let Some(endpoint) = &self.endpoint {
            if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
                return Err(format!(
                    "Endpoint '{}' must start with http:// or https://",
                    endpoint
                ));
            }
        }
        if self.provider_type == ProviderType::LocalCustom && self.endpoint.is_none() {
            return Err("Custom local providers require an endpoint".to_string());
        }
        if self.provider_type.requires_api_key()
            && self.api_key.as_deref().map_or(true, |k| k.trim().is_empty())
        {
            return Err(format!(
                "Provider type '{}' requires an api_key",
                self.provider_type.as_str()
            ));
        }
        if let Some(temperature) = self.default_options.temperature {
            if !(0.0..=2.0).contains(&temperature) {
                return Err(format!(
                    "Temperature {} is outside the range 0.0-2.0",
                    temperature
                ));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResponse {
    pub content: String,
    pub model: String,
    pub usage: TokenUsage,
    pub finish_reason: Option<String>,
}

/// Model provider client trait
#[async_trait]
pub trait ModelProviderClient: Send + Sync {
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        options: CompletionOptions,
    ) -> Result<CompletionResponse, GenerationError>;

    fn provider_name(&self) -> &str;

    fn model_name(&self) -> &str;
}

const PROVIDER_HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const PROVIDER_HTTP_REQUEST_TIMEOUT: Duration = Duration::from_secs(180);

fn build_provider_http_client() -> Result<Client, ApiError> {
    Client::builder()
        .connect_timeout(PROVIDER_HTTP_CONNECT_TIMEOUT)
        .timeout(PROVIDER_HTTP_REQUEST_TIMEOUT)
        .build()
        .map_err(|e| ApiError::ProviderError(format!("Failed to create HTTP client: {}", e)))
}

fn map_http_error(error: reqwest::Error) -> GenerationError {
    if error.is_timeout() {
        GenerationError::RequestFailed(format!("Request timeout: {}", error))
    } else if error.is_connect() {
        GenerationError::RequestFailed(format!("Connection error: {}", error))
    } else {
        GenerationError::Provider(format!("HTTP error: {}", error))
    }
}

fn map_status_error(status: StatusCode, body: String) -> GenerationError {
    match status.as_u16() {
        401 | 403 => GenerationError::AuthFailed(body),
        429 => GenerationError::RateLimited(body),
        500..=599 => GenerationError::RequestFailed(format!("status {}: {}", status, body)),
        _ => GenerationError::Provider(format!("status {}: {}", status, body)),
    }
}

fn role_to_string(role: MessageRole) -> &'static str {
    match role {
        MessageRole::System => "system",
        MessageRole::User => "user",
        MessageRole::Assistant => "assistant",
    }
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop: Option<Vec<String>>,
    stream: bool,
}

#[derive(Serialize, Deserialize)]
struct WireMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    model: String,
    choices: Vec<Choice>,
    usage: Option<TokenUsage>,
}

#[derive(Deserialize)]
struct Choice {
    message: WireMessage,
    finish_reason: Option<String>,
}

/// Client for any OpenAI-compatible chat completions endpoint.
///
/// Covers OpenAI itself, Ollama's `/v1` surface and self-hosted servers.
pub struct OpenAICompatibleClient {
    client: Client,
    provider_name: &'static str,
    model: String,
    api_key: Option<String>,
    completions_url: String,
}

impl OpenAICompatibleClient {
    pub fn openai(model: String, api_key: String, base_url: Option<String>) -> Result<Self, ApiError> {
        let base_url = base_url.unwrap_or_else(|| "https://api.openai.com/v1".to_string());
        Self::build("openai", model, Some(api_key), format!("{}/chat/completions", base_url.trim_end_matches('/')))
    }

    pub fn ollama(model: String, base_url: Option<String>) -> Result<Self, ApiError> {
        let base_url = base_url.unwrap_or_else(|| "http://localhost:11434".to_string());
        Self::build("ollama", model, None, format!("{}/v1/chat/completions", base_url.trim_end_matches('/')))
    }

    pub fn local(model: String, endpoint: String, api_key: Option<String>) -> Result<Self, ApiError> {
        Self::build("local", model, api_key, format!("{}/chat/completions", endpoint.trim_end_matches('/')))
    }

    fn build(
        provider_name: &'static str,
        model: String,
        api_key: Option<String>,
        completions_url: String,
    ) -> Result<Self, ApiError> {
        Ok(Self {
            client: build_provider_http_client()?,
            provider_name,
            model,
            api_key,
            completions_url,
        })
    }
}

#[async_trait]
impl ModelProviderClient for OpenAICompatibleClient {
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        options: CompletionOptions,
    ) -> Result<CompletionResponse, GenerationError> {
        let request = ChatCompletionRequest {
            model: &self.model,
            messages: messages
                .into_iter()
                .map(|msg| WireMessage {
                    role: role_to_string(msg.role).to_string(),
                    content: msg.content,
                })
                .collect(),
            temperature: options.temperature,
            max_tokens: options.max_tokens,
            top_p: options.top_p,
            stop: options.stop,
            stream: false,
        };

        let mut builder = self.client.post(&self.completions_url).json(&request);
        if let Some(api_key) = &self.api_key {
            builder = builder.bearer_auth(api_key);
        }
        let response = builder.send().await.map_err(map_http_error)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(map_status_error(status, body));
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::InvalidResponse(format!("Failed to parse response: {}", e)))?;
        let choice = completion
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| GenerationError::InvalidResponse("No choices in response".to_string()))?;

        Ok(CompletionResponse {
            content: choice.message.content,
            model: completion.model,
            usage: completion.usage.unwrap_or_default(),
            finish_reason: choice.finish_reason,
        })
    }

    fn provider_name(&self) -> &str {
        self.provider_name
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Anthropic Messages API client
pub struct AnthropicClient {
    client: Client,
    model: String,
    api_key: String,
    endpoint: String,
}

impl AnthropicClient {
    pub fn new(model: String, api_key: String, endpoint: Option<String>) -> Result<Self, ApiError> {
        Ok(Self {
            client: build_provider_http_client()?,
            model,
            api_key,
            endpoint: endpoint.unwrap_or_else(|| "https://api.anthropic.com/v1/messages".to_string()),
        })
    }
}

#[async_trait]
impl ModelProviderClient for AnthropicClient {
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        options: CompletionOptions,
    ) -> Result<CompletionResponse, GenerationError> {
        let system: Vec<&str> = messages
            .iter()
            .filter(|m| m.role == MessageRole::System)
            .map(|m| m.content.as_str())
            .collect();
        let turns: Vec<_> = messages
            .iter()
            .filter(|m| m.role != MessageRole::System)
            .map(|m| json!({ "role": role_to_string(m.role), "content": m.content }))
            .collect();

        let mut body = json!({
            "model": self.model,
            "max_tokens": options.max_tokens.unwrap_or(4096),
            "messages": turns,
        });
        if !system.is_empty() {
            body["system"] = json!(system.join("\n\n"));
        }
        if let Some(temperature) = options.temperature {
            body["temperature"] = json!(temperature);
        }
        if let Some(stop) = options.stop {
            body["stop_sequences"] = json!(stop);
        }

        let response = self
            .client
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .json(&body)
            .send()
            .await
            .map_err(map_http_error)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(map_status_error(status, body));
        }

        #[derive(Deserialize)]
        struct AnthropicResponse {
            content: Vec<AnthropicContent>,
            model: String,
            usage: Option<AnthropicUsage>,
            stop_reason: Option<String>,
        }

        #[derive(Deserialize)]
        struct AnthropicContent {
            #[serde(default)]
            text: String,
        }

        #[derive(Deserialize)]
        struct AnthropicUsage {
            input_tokens: u32,
            output_tokens: u32,
        }

        let completion: AnthropicResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::InvalidResponse(format!("Failed to parse response: {}", e)))?;
        let content = completion
            .content
            .into_iter()
            .map(|c| c.text)
            .collect::<Vec<_>>()
            .join("");
        let usage = completion
            .usage
            .map(|u| TokenUsage {
                prompt_tokens: u.input_tokens,
                completion_tokens: u.output_tokens,
                total_tokens: u.input_tokens + u.output_tokens,
            })
            .unwrap_or_default();

        Ok(CompletionResponse {
            content,
            model: completion.model,
            usage,
            finish_reason: completion.stop_reason,
        })
    }

    fn provider_name(&self) -> &str {
        "anthropic"
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Provider factory for creating provider clients
pub struct ProviderFactory;

impl ProviderFactory {
    pub fn create_client(config: &ProviderConfig) -> Result<Arc<dyn ModelProviderClient>, ApiError> {
        config.validate().map_err(ApiError::ConfigError)?;
        let api_key = config.api_key.clone();
        let client: Arc<dyn ModelProviderClient> = match config.provider_type {
            ProviderType::OpenAI => Arc::new(OpenAICompatibleClient::openai(
                config.model.clone(),
                api_key.unwrap_or_default(),
                config.endpoint.clone(),
            )?),
            ProviderType::Anthropic => Arc::new(AnthropicClient::new(
                config.model.clone(),
                api_key.unwrap_or_default(),
                config.endpoint.clone(),
            )?),
            ProviderType::Ollama => Arc::new(OpenAICompatibleClient::ollama(
                config.model.clone(),
                config.endpoint.clone(),
            )?),
            ProviderType::LocalCustom => Arc::new(OpenAICompatibleClient::local(
                config.model.clone(),
                config.endpoint.clone().unwrap_or_default(),
                api_key,
            )?),
        };
        Ok(client)
    }
}

#[cfg(test)]
pub struct MockProvider {
    responses: parking_lot::Mutex<std::collections::VecDeque<Result<String, GenerationError>>>,
    pub received: parking_lot::Mutex<Vec<Vec<ChatMessage>>>,
}

#[cfg(test)]
impl MockProvider {
    pub fn new(responses: Vec<Result<String, GenerationError>>) -> Self {
        Self {
            responses: parking_lot::Mutex::new(responses.into()),
            received: parking_lot::Mutex::new(Vec::new()),
        }
    }
}

#[cfg(test)]
#[async_trait]
impl ModelProviderClient for MockProvider {
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        _options: CompletionOptions,
    ) -> Result<CompletionResponse, GenerationError> {
        self.received.lock().push(messages);
        let content = self
            .responses
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(GenerationError::Provider("no scripted response".to_string())))?;
        Ok(CompletionResponse {
            content,
            model: "mock-model".to_string(),
            usage: TokenUsage::default(),
            finish_reason: Some("stop".to_string()),
        })
    }

    fn provider_name(&self) -> &str {
        "mock"
    }

    fn model_name(&self) -> &str {
        "mock-model"
    }
}
