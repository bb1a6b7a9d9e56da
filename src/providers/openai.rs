//! OpenAI API client for text and image generation.
//!
//! One client covers both the chat completions endpoint (concept and
//! script generation) and the image generation endpoint (per-segment
//! visuals). Each endpoint has its own rate limiter because OpenAI
//! accounts for them separately, and every call goes through the shared
//! retry layer.

use std::env;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;
use crate::limit::{RateLimitConfig, RateLimiter};
use crate::providers::{ImageProvider, TextGenerator};
use crate::retry::{call_with_retry, RetryPolicy};

const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
const DEFAULT_TEXT_MODEL: &str = "gpt-4o";
const DEFAULT_IMAGE_MODEL: &str = "dall-e-3";
const DEFAULT_IMAGE_SIZE: &str = "1024x1792";

/// Client for the OpenAI chat completions and image generation APIs.
pub struct OpenAiClient {
    /// Base URL for the API.
    api_base: String,
    /// API key sent as a bearer token.
    api_key: String,
    /// Model used for chat completions.
    text_model: String,
    /// Model used for image generation.
    image_model: String,
    /// Portrait-orientation size passed to the image endpoint.
    image_size: String,
    /// HTTP client for making API requests.
    http_client: Client,
    /// Limiter for chat completion calls.
    text_limiter: RateLimiter,
    /// Limiter for image generation calls.
    image_limiter: RateLimiter,
    /// Backoff policy applied to every call.
    retry_policy: RetryPolicy,
}

impl OpenAiClient {
    /// Creates a client with default models and rate limits.
    pub fn new(api_key: impl Into<String>) -> Result<Self, ProviderError> {
        Self::with_options(
            api_key,
            DEFAULT_API_BASE,
            DEFAULT_TEXT_MODEL,
            DEFAULT_IMAGE_MODEL,
            RateLimitConfig::per_minute(60),
            RateLimitConfig::per_minute(20),
            RetryPolicy::default(),
        )
    }

    /// Creates a fully configured client.
    #[allow(clippy::too_many_arguments)]
    pub fn with_options(
        api_key: impl Into<String>,
        api_base: impl Into<String>,
        text_model: impl Into<String>,
        image_model: impl Into<String>,
        text_limit: RateLimitConfig,
        image_limit: RateLimitConfig,
        retry_policy: RetryPolicy,
    ) -> Result<Self, ProviderError> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| ProviderError::RequestFailed(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            api_base: api_base.into(),
            api_key: api_key.into(),
            text_model: text_model.into(),
            image_model: image_model.into(),
            image_size: DEFAULT_IMAGE_SIZE.to_string(),
            http_client,
            text_limiter: RateLimiter::new(text_limit),
            image_limiter: RateLimiter::new(image_limit),
            retry_policy,
        })
    }

    /// Creates a client from environment variables.
    ///
    /// Reads `OPENAI_API_KEY` (required), `OPENAI_API_BASE`,
    /// `OPENAI_TEXT_MODEL`, and `OPENAI_IMAGE_MODEL` (all optional).
    pub fn from_env() -> Result<Self, ProviderError> {
        let api_key = env::var("OPENAI_API_KEY").map_err(|_| {
            ProviderError::RequestFailed("OPENAI_API_KEY environment variable is not set".to_string())
        })?;
        let api_base = env::var("OPENAI_API_BASE").unwrap_or_else(|_| DEFAULT_API_BASE.to_string());
        let text_model =
            env::var("OPENAI_TEXT_MODEL").unwrap_or_else(|_| DEFAULT_TEXT_MODEL.to_string());
        let image_model =
            env::var("OPENAI_IMAGE_MODEL").unwrap_or_else(|_| DEFAULT_IMAGE_MODEL.to_string());

        Self::with_options(
            api_key,
            api_base,
            text_model,
            image_model,
            RateLimitConfig::per_minute(60),
            RateLimitConfig::per_minute(20),
            RetryPolicy::default(),
        )
    }

    /// Get the API base URL.
    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// Get the chat completion model.
    pub fn text_model(&self) -> &str {
        &self.text_model
    }

    /// Get the image generation model.
    pub fn image_model(&self) -> &str {
        &self.image_model
    }

    /// Single chat completion call against the API, no retry wrapping.
    async fn chat_completion(&self, request: &ChatRequest) -> Result<String, ProviderError> {
        let url = format!("{}/chat/completions", self.api_base);

        let http_response = self
            .http_client
            .post(&url)
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(request)
            .send()
            .await
            .map_err(|e| ProviderError::RequestFailed(e.to_string()))?;

        let status = http_response.status();
        if !status.is_success() {
            return Err(api_error(status.as_u16(), http_response.text().await.ok()));
        }

        let response: ChatResponse = http_response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(format!("Failed to parse API response: {}", e)))?;

        response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .filter(|content| !content.is_empty())
            .ok_or(ProviderError::EmptyResponse)
    }

    /// Single image generation call, returning the hosted image URL.
    async fn request_image_url(&self, request: &ImageRequest) -> Result<String, ProviderError> {
        let url = format!("{}/images/generations", self.api_base);

        let http_response = self
            .http_client
            .post(&url)
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(request)
            .send()
            .await
            .map_err(|e| ProviderError::RequestFailed(e.to_string()))?;

        let status = http_response.status();
        if !status.is_success() {
            return Err(api_error(status.as_u16(), http_response.text().await.ok()));
        }

        let response: ImageResponse = http_response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(format!("Failed to parse API response: {}", e)))?;

        response
            .data
            .into_iter()
            .next()
            .map(|item| item.url)
            .ok_or(ProviderError::EmptyResponse)
    }

    /// Downloads generated image bytes from the URL the API returned.
    async fn download_image(&self, image_url: &str) -> Result<Vec<u8>, ProviderError> {
        let http_response = self
            .http_client
            .get(image_url)
            .send()
            .await
            .map_err(|e| ProviderError::RequestFailed(e.to_string()))?;

        let status = http_response.status();
        if !status.is_success() {
            return Err(ProviderError::RequestFailed(format!(
                "Image download failed with status {}",
                status.as_u16()
            )));
        }

        let bytes = http_response
            .bytes()
            .await
            .map_err(|e| ProviderError::RequestFailed(e.to_string()))?;

        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl TextGenerator for OpenAiClient {
    async fn generate_text(&self, system: &str, user: &str) -> Result<String, ProviderError> {
        let request = ChatRequest {
            model: self.text_model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: system.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: user.to_string(),
                },
            ],
            temperature: Some(0.7),
            max_tokens: Some(4096),
        };

        call_with_retry(self.retry_policy, &self.text_limiter, "chat_completion", |_| {
            let request = request.clone();
            async move { self.chat_completion(&request).await }
        })
        .await
    }
}

#[async_trait]
impl ImageProvider for OpenAiClient {
    async fn generate(&self, prompt: &str) -> Result<Vec<u8>, ProviderError> {
        let request = ImageRequest {
            model: self.image_model.clone(),
            prompt: prompt.to_string(),
            n: 1,
            size: self.image_size.clone(),
            quality: "standard".to_string(),
        };

        let image_url = call_with_retry(
            self.retry_policy,
            &self.image_limiter,
            "image_generation",
            |_| {
                let request = request.clone();
                async move { self.request_image_url(&request).await }
            },
        )
        .await?;

        // The hosted URL is short-lived, so the download happens right away
        // and is not separately retried.
        self.download_image(&image_url).await
    }
}

/// Maps a non-success HTTP status to a provider error, parsing the
/// structured error body when the API sends one.
fn api_error(status_code: u16, body: Option<String>) -> ProviderError {
    let body = body.unwrap_or_else(|| "Failed to read error response".to_string());

    if let Ok(error_response) = serde_json::from_str::<ApiErrorResponse>(&body) {
        if status_code == 429 {
            return ProviderError::RateLimited(error_response.error.message);
        }
        return ProviderError::ApiError {
            code: status_code,
            message: error_response.error.message,
        };
    }

    if status_code == 429 {
        return ProviderError::RateLimited(body);
    }

    ProviderError::ApiError {
        code: status_code,
        message: body,
    }
}

/// A message in a chat completion request.
#[derive(Debug, Clone, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

/// Internal request structure for the chat completions endpoint.
#[derive(Debug, Clone, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

/// Internal response structure from the chat completions endpoint.
#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: String,
}

/// Internal request structure for the image generation endpoint.
#[derive(Debug, Clone, Serialize)]
struct ImageRequest {
    model: String,
    prompt: String,
    n: u32,
    size: String,
    quality: String,
}

/// Internal response structure from the image generation endpoint.
#[derive(Debug, Deserialize)]
struct ImageResponse {
    data: Vec<ImageData>,
}

#[derive(Debug, Deserialize)]
struct ImageData {
    url: String,
}

/// Error response from the API.
#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
#[allow(dead_code)] // Fields kept for complete API error deserialization
struct ApiErrorDetail {
    message: String,
    #[serde(rename = "type")]
    error_type: Option<String>,
    code: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_client() -> OpenAiClient {
        OpenAiClient::with_options(
            "test-key",
            "http://localhost:65535",
            "gpt-4o",
            "dall-e-3",
            RateLimitConfig::per_minute(60),
            RateLimitConfig::per_minute(20),
            RetryPolicy::new(1, Duration::from_millis(1), Duration::from_millis(1)),
        )
        .expect("client should build")
    }

    #[test]
    fn test_client_accessors() {
        let client = test_client();
        assert_eq!(client.api_base(), "http://localhost:65535");
        assert_eq!(client.text_model(), "gpt-4o");
        assert_eq!(client.image_model(), "dall-e-3");
    }

    #[test]
    fn test_chat_request_serialization() {
        let request = ChatRequest {
            model: "gpt-4o".to_string(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: "hello".to_string(),
            }],
            temperature: Some(0.7),
            max_tokens: None,
        };

        let json = serde_json::to_string(&request).expect("serialization should succeed");
        assert!(json.contains("\"model\":\"gpt-4o\""));
        assert!(json.contains("\"temperature\":0.7"));
        assert!(!json.contains("max_tokens"));
    }

    #[test]
    fn test_api_error_rate_limited() {
        let body = r#"{"error": {"message": "Rate limit reached", "type": "requests", "code": "rate_limit_exceeded"}}"#;
        let err = api_error(429, Some(body.to_string()));
        assert!(matches!(err, ProviderError::RateLimited(_)));
    }

    #[test]
    fn test_api_error_structured() {
        let body = r#"{"error": {"message": "Invalid API key", "type": "auth", "code": null}}"#;
        let err = api_error(401, Some(body.to_string()));
        match err {
            ProviderError::ApiError { code, message } => {
                assert_eq!(code, 401);
                assert_eq!(message, "Invalid API key");
            }
            other => panic!("Expected ApiError, got {:?}", other),
        }
    }

    #[test]
    fn test_api_error_unstructured_body() {
        let err = api_error(500, Some("internal error".to_string()));
        match err {
            ProviderError::ApiError { code, message } => {
                assert_eq!(code, 500);
                assert_eq!(message, "internal error");
            }
            other => panic!("Expected ApiError, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_generate_text_connection_error() {
        let client = test_client();
        let result = client.generate_text("system", "user").await;

        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, ProviderError::RetriesExhausted { .. }));
    }
}
