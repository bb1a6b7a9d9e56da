//! Provider traits and API clients.
//!
//! Each external capability sits behind an async trait so the workflow
//! can be driven by real API clients in production and by stubs in
//! tests. Clients own their rate limiter and route every call through
//! the shared retry layer.

pub mod elevenlabs;
pub mod openai;
pub mod parse;

use async_trait::async_trait;

use crate::error::ProviderError;
use crate::workflow::record::{Concept, Script};

/// Chat-style text generation against a language model.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Sends a system/user prompt pair and returns the raw completion text.
    async fn generate_text(&self, system: &str, user: &str) -> Result<String, ProviderError>;
}

/// Produces candidate video concepts for a niche.
#[async_trait]
pub trait ConceptProvider: Send + Sync {
    async fn generate(&self, niche: &str, keywords: &str) -> Result<Vec<Concept>, ProviderError>;
}

/// Produces a segmented script for a selected concept.
#[async_trait]
pub trait ScriptProvider: Send + Sync {
    async fn generate(
        &self,
        concept: &Concept,
        target_duration: f64,
    ) -> Result<Script, ProviderError>;
}

/// Generates a single image from a text prompt, returning raw bytes.
#[async_trait]
pub trait ImageProvider: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<Vec<u8>, ProviderError>;
}

/// Synthesizes speech audio from text, returning raw bytes.
#[async_trait]
pub trait SpeechProvider: Send + Sync {
    async fn generate(&self, text: &str) -> Result<Vec<u8>, ProviderError>;
}

pub use elevenlabs::ElevenLabsClient;
pub use openai::OpenAiClient;
