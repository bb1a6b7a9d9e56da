//! ElevenLabs text-to-speech client.
//!
//! Posts to the text-to-speech endpoint and returns the raw audio bytes
//! (MP3). Calls share a single rate limiter and go through the retry
//! layer like every other provider call.

use std::env;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use crate::error::ProviderError;
use crate::limit::{RateLimitConfig, RateLimiter};
use crate::providers::SpeechProvider;
use crate::retry::{call_with_retry, RetryPolicy};

const DEFAULT_API_BASE: &str = "https://api.elevenlabs.io/v1";
const DEFAULT_VOICE_ID: &str = "21m00Tcm4TlvDq8ikWAM";
const DEFAULT_MODEL_ID: &str = "eleven_turbo_v2_5";

/// Client for the ElevenLabs text-to-speech API.
pub struct ElevenLabsClient {
    /// Base URL for the API.
    api_base: String,
    /// API key sent in the `xi-api-key` header.
    api_key: String,
    /// Voice used for synthesis.
    voice_id: String,
    /// Model used for synthesis.
    model_id: String,
    /// HTTP client for making API requests.
    http_client: Client,
    /// Limiter for synthesis calls.
    limiter: RateLimiter,
    /// Backoff policy applied to every call.
    retry_policy: RetryPolicy,
}

impl ElevenLabsClient {
    /// Creates a client with the default voice, model, and rate limit.
    pub fn new(api_key: impl Into<String>) -> Result<Self, ProviderError> {
        Self::with_options(
            api_key,
            DEFAULT_API_BASE,
            DEFAULT_VOICE_ID,
            DEFAULT_MODEL_ID,
            RateLimitConfig::per_minute(30),
            RetryPolicy::default(),
        )
    }

    /// Creates a fully configured client.
    pub fn with_options(
        api_key: impl Into<String>,
        api_base: impl Into<String>,
        voice_id: impl Into<String>,
        model_id: impl Into<String>,
        limit: RateLimitConfig,
        retry_policy: RetryPolicy,
    ) -> Result<Self, ProviderError> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| ProviderError::RequestFailed(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            api_base: api_base.into(),
            api_key: api_key.into(),
            voice_id: voice_id.into(),
            model_id: model_id.into(),
            http_client,
            limiter: RateLimiter::new(limit),
            retry_policy,
        })
    }

    /// Creates a client from environment variables.
    ///
    /// Reads `ELEVENLABS_API_KEY` (required), `ELEVENLABS_VOICE_ID`, and
    /// `ELEVENLABS_MODEL_ID` (both optional).
    pub fn from_env() -> Result<Self, ProviderError> {
        let api_key = env::var("ELEVENLABS_API_KEY").map_err(|_| {
            ProviderError::RequestFailed(
                "ELEVENLABS_API_KEY environment variable is not set".to_string(),
            )
        })?;
        let voice_id =
            env::var("ELEVENLABS_VOICE_ID").unwrap_or_else(|_| DEFAULT_VOICE_ID.to_string());
        let model_id =
            env::var("ELEVENLABS_MODEL_ID").unwrap_or_else(|_| DEFAULT_MODEL_ID.to_string());

        Self::with_options(
            api_key,
            DEFAULT_API_BASE,
            voice_id,
            model_id,
            RateLimitConfig::per_minute(30),
            RetryPolicy::default(),
        )
    }

    /// Get the configured voice id.
    pub fn voice_id(&self) -> &str {
        &self.voice_id
    }

    /// Get the configured model id.
    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    /// Single synthesis call against the API, no retry wrapping.
    async fn synthesize(&self, request: &SpeechRequest) -> Result<Vec<u8>, ProviderError> {
        let url = format!("{}/text-to-speech/{}", self.api_base, self.voice_id);

        let http_response = self
            .http_client
            .post(&url)
            .header("Content-Type", "application/json")
            .header("xi-api-key", &self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| ProviderError::RequestFailed(e.to_string()))?;

        let status = http_response.status();
        if !status.is_success() {
            let status_code = status.as_u16();
            let body = http_response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error response".to_string());

            if status_code == 429 {
                return Err(ProviderError::RateLimited(body));
            }
            return Err(ProviderError::ApiError {
                code: status_code,
                message: body,
            });
        }

        let bytes = http_response
            .bytes()
            .await
            .map_err(|e| ProviderError::RequestFailed(e.to_string()))?;

        if bytes.is_empty() {
            return Err(ProviderError::EmptyResponse);
        }

        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl SpeechProvider for ElevenLabsClient {
    async fn generate(&self, text: &str) -> Result<Vec<u8>, ProviderError> {
        let request = SpeechRequest {
            text: text.to_string(),
            model_id: self.model_id.clone(),
        };

        call_with_retry(self.retry_policy, &self.limiter, "text_to_speech", |_| {
            let request = request.clone();
            async move { self.synthesize(&request).await }
        })
        .await
    }
}

/// Internal request structure for the text-to-speech endpoint.
#[derive(Debug, Clone, Serialize)]
struct SpeechRequest {
    text: String,
    model_id: String,
}
