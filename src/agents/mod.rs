//! Prompt-driven agents built on top of the text generation provider.
//!
//! Agents own their prompts and output validation. Each one makes a
//! single structured call and allows itself exactly one stricter
//! re-prompt when the first response fails the strict decode.

pub mod concept_strategist;
pub mod scriptwriter;

pub use concept_strategist::ConceptStrategist;
pub use scriptwriter::Scriptwriter;
