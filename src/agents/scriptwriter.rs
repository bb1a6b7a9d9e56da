//! Script generation agent.
//!
//! Turns a selected concept into a segmented script with one image
//! prompt per segment. Segment indexes from the model are normalized to
//! a contiguous zero-based run so downstream media generation can rely
//! on them.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::ProviderError;
use crate::providers::parse::decode_response;
use crate::providers::{ScriptProvider, TextGenerator};
use crate::workflow::record::{Concept, Script};

const SYSTEM_PROMPT: &str = "You are an expert short-form video scriptwriter. Your scripts start \
with a strong hook in the first three seconds, stay engaging through humor and positivity, read \
naturally when spoken aloud, and match the target duration. Keep the tone light and joyful, \
never negative or dramatic. Image prompts must be simple, pleasant, and clean, use soft natural \
lighting, and be composed for vertical 9:16 format with visual continuity between segments.";

/// Writes a segmented script for a selected concept.
pub struct Scriptwriter {
    model: Arc<dyn TextGenerator>,
}

impl Scriptwriter {
    pub fn new(model: Arc<dyn TextGenerator>) -> Self {
        Self { model }
    }

    fn build_prompt(concept: &Concept, target_duration: f64) -> String {
        format!(
            r#"Create a complete short vertical video script based on this concept:

Title: {title}
Hook: {hook}
Value Proposition: {value_proposition}
Visual Style: {visual_style}
Target Audience: {target_audience}
Engagement Strategy: {engagement_strategy}

Requirements:
- Target duration: {target_duration} seconds
- Format: vertical 9:16
- Break the script into 4-8 segments, each with its own visual
- Keep the tone funny, joyful, and positive

Respond with ONLY a JSON object in this exact shape, no markdown and no other text:
{{
    "full_transcript": "Complete spoken transcript...",
    "hook_enhancement": "Enhanced hook for the first 3 seconds...",
    "pacing_notes": "Notes on pacing and delivery...",
    "total_duration": {target_duration},
    "segments": [
        {{
            "index": 1,
            "text": "Spoken text for this segment...",
            "image_prompt": "Detailed image generation prompt...",
            "duration": 3.5,
            "visual_description": "What should be shown..."
        }}
    ]
}}"#,
            title = concept.title,
            hook = concept.hook,
            value_proposition = concept.value_proposition,
            visual_style = concept.visual_style,
            target_audience = concept.target_audience,
            engagement_strategy = concept.engagement_strategy,
        )
    }

    fn reprompt(original: &str) -> String {
        format!(
            "{original}\n\nYour previous reply was not valid JSON. Respond again with ONLY the \
JSON object described above. The first character of your reply must be '{{' and the last must \
be '}}'. Do not include any other text."
        )
    }
}

#[async_trait]
impl ScriptProvider for Scriptwriter {
    async fn generate(
        &self,
        concept: &Concept,
        target_duration: f64,
    ) -> Result<Script, ProviderError> {
        let prompt = Self::build_prompt(concept, target_duration);
        let response = self.model.generate_text(SYSTEM_PROMPT, &prompt).await?;

        let mut script = match decode_response::<Script>(&response) {
            Ok(script) => script,
            Err(first_error) => {
                tracing::warn!(error = %first_error, "Script response failed to decode, re-prompting once");
                let response = self
                    .model
                    .generate_text(SYSTEM_PROMPT, &Self::reprompt(&prompt))
                    .await?;
                decode_response::<Script>(&response)?
            }
        };

        if script.segments.is_empty() {
            return Err(ProviderError::Parse(
                "Model returned a script with no segments".to_string(),
            ));
        }

        // Models occasionally number segments from 0 or skip an index.
        if !script.has_contiguous_segments() {
            tracing::warn!("Renumbering non-contiguous script segments");
            for (i, segment) in script.segments.iter_mut().enumerate() {
                segment.index = i as u32 + 1;
            }
        }

        Ok(script)
    }
}
