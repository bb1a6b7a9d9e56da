//! reelforge: multi-stage short-form video generation pipeline.
//!
//! This library drives a niche through concept generation, concept
//! selection, script generation, image generation, and final video
//! assembly, with durable per-workflow state and resumption.

// Core modules
pub mod agents;
pub mod cli;
pub mod config;
pub mod error;
pub mod fanout;
pub mod limit;
pub mod providers;
pub mod render;
pub mod retry;
pub mod store;
pub mod workflow;

// Re-export commonly used error types
pub use error::{
    BatchEmptyError, ConfigError, ProviderError, RenderError, StoreError, WorkflowError,
};
