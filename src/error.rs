//! Error types for reelforge operations.
//!
//! Defines error types for the major subsystems:
//! - Workflow preconditions and state transitions
//! - Provider calls (chat, image, speech) and structured-output parsing
//! - Fan-out batch generation
//! - Video rendering
//! - Durable workflow state storage

use thiserror::Error;

/// Errors raised directly to callers of the orchestrator.
///
/// These are precondition violations: everything that happens *inside* a
/// stage is recorded on the persisted record instead of being thrown.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("Workflow '{0}' not found")]
    NotFound(String),

    #[error("Selected concept index {index} is out of range (workflow has {available} concepts)")]
    SelectionOutOfRange { index: usize, available: usize },

    #[error("Workflow is in state '{actual}', expected '{expected}'")]
    InvalidState { expected: String, actual: String },

    #[error("Concept selection already made for this workflow")]
    SelectionAlreadyMade,

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Errors that can occur when calling a remote generative provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    #[error("API error ({code}): {message}")]
    ApiError { code: u16, message: String },

    #[error("Rate limited by provider: {0}")]
    RateLimited(String),

    #[error("Failed to parse provider response: {0}")]
    Parse(String),

    #[error("Operation failed after {attempts} attempts: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },

    #[error("Empty response from provider")]
    EmptyResponse,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// All requests in a fan-out batch failed.
///
/// Carries the per-index error messages so the stage failure can report
/// what went wrong for each request.
#[derive(Debug, Error)]
#[error("BatchEmptyError: all {total} requests failed (first error: {first_error})")]
pub struct BatchEmptyError {
    /// Number of requests in the batch.
    pub total: usize,
    /// Error message of the first failed request.
    pub first_error: String,
    /// Per-index error messages for every failed request.
    pub failures: Vec<(usize, String)>,
}

/// Errors that can occur during video rendering.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Cannot render video: no images provided")]
    NoImages,

    #[error("Input file missing: {0}")]
    MissingInput(String),

    #[error("Image count ({images}) does not match duration count ({durations})")]
    DurationMismatch { images: usize, durations: usize },

    #[error("ffmpeg exited with status {code}: {stderr}")]
    FfmpegFailed { code: i32, stderr: String },

    #[error("Output file was not created: {0}")]
    OutputMissing(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that can occur during workflow state storage operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Workflow record not found: {0}")]
    NotFound(String),

    #[error("Failed to create storage directory: {0}")]
    DirectoryCreationFailed(String),
}

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workflow_error_display() {
        let err = WorkflowError::NotFound("abc-123".to_string());
        assert!(err.to_string().contains("abc-123"));

        let err = WorkflowError::SelectionOutOfRange {
            index: 5,
            available: 3,
        };
        assert!(err.to_string().contains('5'));
        assert!(err.to_string().contains('3'));
    }

    #[test]
    fn test_batch_empty_error_display() {
        let err = BatchEmptyError {
            total: 4,
            first_error: "connection refused".to_string(),
            failures: vec![(0, "connection refused".to_string())],
        };
        let msg = err.to_string();
        assert!(msg.contains("BatchEmptyError"));
        assert!(msg.contains("all 4 requests failed"));
        assert!(msg.contains("connection refused"));
    }

    #[test]
    fn test_provider_error_retries_exhausted() {
        let err = ProviderError::RetriesExhausted {
            attempts: 3,
            last_error: "API error (500): upstream".to_string(),
        };
        assert!(err.to_string().contains("3 attempts"));
        assert!(err.to_string().contains("upstream"));
    }
}
