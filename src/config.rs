//! Workflow configuration.
//!
//! Configuration comes from defaults overridden by `REELFORGE_*`
//! environment variables. Provider credentials (`OPENAI_API_KEY`,
//! `ELEVENLABS_API_KEY`) are read by the clients themselves.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;

/// Configuration for the workflow orchestrator.
#[derive(Debug, Clone)]
pub struct WorkflowConfig {
    // Content settings
    /// Target video length in seconds.
    pub target_duration: f64,

    // Provider settings
    /// Model used for concept and script generation.
    pub text_model: String,
    /// Model used for image generation.
    pub image_model: String,
    /// Chat completion calls allowed per minute.
    pub text_requests_per_minute: usize,
    /// Image generation calls allowed per minute.
    pub image_requests_per_minute: usize,
    /// Speech synthesis calls allowed per minute.
    pub speech_requests_per_minute: usize,

    // Retry settings
    /// Attempts per provider call, including the first.
    pub max_attempts: u32,
    /// Delay before the second attempt.
    pub base_delay: Duration,
    /// Upper bound on any single backoff delay.
    pub max_delay: Duration,

    // Storage settings
    /// Directory for workflow state files.
    pub state_dir: PathBuf,
    /// Directory for generated media artifacts.
    pub output_dir: PathBuf,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            target_duration: 30.0,

            text_model: "gpt-4o".to_string(),
            image_model: "dall-e-3".to_string(),
            text_requests_per_minute: 60,
            image_requests_per_minute: 20,
            speech_requests_per_minute: 30,

            max_attempts: 3,
            base_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(10),

            state_dir: PathBuf::from("./state"),
            output_dir: PathBuf::from("./output"),
        }
    }
}

impl WorkflowConfig {
    /// Creates a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `REELFORGE_TARGET_DURATION`: target video length in seconds (default: 30)
    /// - `REELFORGE_TEXT_MODEL`: chat completion model (default: gpt-4o)
    /// - `REELFORGE_IMAGE_MODEL`: image generation model (default: dall-e-3)
    /// - `REELFORGE_TEXT_RPM`: chat completion calls per minute (default: 60)
    /// - `REELFORGE_IMAGE_RPM`: image calls per minute (default: 20)
    /// - `REELFORGE_SPEECH_RPM`: speech calls per minute (default: 30)
    /// - `REELFORGE_MAX_ATTEMPTS`: retry attempts per call (default: 3)
    /// - `REELFORGE_BASE_DELAY_SECS`: initial backoff delay (default: 2)
    /// - `REELFORGE_MAX_DELAY_SECS`: backoff delay cap (default: 10)
    /// - `REELFORGE_STATE_DIR`: workflow state directory (default: ./state)
    /// - `REELFORGE_OUTPUT_DIR`: media output directory (default: ./output)
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("REELFORGE_TARGET_DURATION") {
            config.target_duration = parse_env_value(&val, "REELFORGE_TARGET_DURATION")?;
        }

        if let Ok(val) = std::env::var("REELFORGE_TEXT_MODEL") {
            config.text_model = val;
        }

        if let Ok(val) = std::env::var("REELFORGE_IMAGE_MODEL") {
            config.image_model = val;
        }

        if let Ok(val) = std::env::var("REELFORGE_TEXT_RPM") {
            config.text_requests_per_minute = parse_env_value(&val, "REELFORGE_TEXT_RPM")?;
        }

        if let Ok(val) = std::env::var("REELFORGE_IMAGE_RPM") {
            config.image_requests_per_minute = parse_env_value(&val, "REELFORGE_IMAGE_RPM")?;
        }

        if let Ok(val) = std::env::var("REELFORGE_SPEECH_RPM") {
            config.speech_requests_per_minute = parse_env_value(&val, "REELFORGE_SPEECH_RPM")?;
        }

        if let Ok(val) = std::env::var("REELFORGE_MAX_ATTEMPTS") {
            config.max_attempts = parse_env_value(&val, "REELFORGE_MAX_ATTEMPTS")?;
        }

        if let Ok(val) = std::env::var("REELFORGE_BASE_DELAY_SECS") {
            let secs: u64 = parse_env_value(&val, "REELFORGE_BASE_DELAY_SECS")?;
            config.base_delay = Duration::from_secs(secs);
        }

        if let Ok(val) = std::env::var("REELFORGE_MAX_DELAY_SECS") {
            let secs: u64 = parse_env_value(&val, "REELFORGE_MAX_DELAY_SECS")?;
            config.max_delay = Duration::from_secs(secs);
        }

        if let Ok(val) = std::env::var("REELFORGE_STATE_DIR") {
            config.state_dir = PathBuf::from(val);
        }

        if let Ok(val) = std::env::var("REELFORGE_OUTPUT_DIR") {
            config.output_dir = PathBuf::from(val);
        }

        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.target_duration <= 0.0 {
            return Err(ConfigError::ValidationFailed(
                "target_duration must be greater than 0".to_string(),
            ));
        }

        if self.text_model.is_empty() || self.image_model.is_empty() {
            return Err(ConfigError::ValidationFailed(
                "model names cannot be empty".to_string(),
            ));
        }

        if self.text_requests_per_minute == 0
            || self.image_requests_per_minute == 0
            || self.speech_requests_per_minute == 0
        {
            return Err(ConfigError::ValidationFailed(
                "rate limits must be greater than 0".to_string(),
            ));
        }

        if self.max_attempts == 0 {
            return Err(ConfigError::ValidationFailed(
                "max_attempts must be greater than 0".to_string(),
            ));
        }

        if self.base_delay > self.max_delay {
            return Err(ConfigError::ValidationFailed(
                "base_delay cannot exceed max_delay".to_string(),
            ));
        }

        Ok(())
    }
}

/// Parses an environment variable value into the target type.
fn parse_env_value<T: std::str::FromStr>(value: &str, key: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    value.parse().map_err(|e: T::Err| ConfigError::InvalidValue {
        key: key.to_string(),
        message: e.to_string(),
    })
}
