//! Concept generation agent.
//!
//! Asks the text model for three distinct short-video concepts for a
//! niche and decodes them strictly. A malformed response earns one
//! re-prompt with a firmer format instruction; a second failure is
//! surfaced as a parse error.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::ProviderError;
use crate::providers::parse::decode_response;
use crate::providers::{ConceptProvider, TextGenerator};
use crate::workflow::record::Concept;

const EXPECTED_CONCEPTS: usize = 3;

const SYSTEM_PROMPT: &str = "You are an expert short-form video strategist with deep knowledge of \
viral content patterns, engagement psychology, and visual storytelling. You create concepts that \
maximize viewer retention and interaction. Each concept must have a strong hook for the first \
three seconds, provide clear value or entertainment, carry a distinct visual style, and include \
an engagement strategy. Make each concept unique and different from the others.";

/// Generates candidate video concepts from a niche and keywords.
pub struct ConceptStrategist {
    model: Arc<dyn TextGenerator>,
}

impl ConceptStrategist {
    pub fn new(model: Arc<dyn TextGenerator>) -> Self {
        Self { model }
    }

    fn build_prompt(niche: &str, keywords: &str) -> String {
        let keywords = if keywords.is_empty() {
            "None provided"
        } else {
            keywords
        };

        format!(
            r#"Generate {EXPECTED_CONCEPTS} distinct, high-engagement short vertical video concepts for the niche: "{niche}"

Keywords: {keywords}

For each concept provide:
- title: a catchy, searchable title
- hook: an attention-grabbing opening for the first 3 seconds
- value_proposition: what value, insight, or entertainment the video provides
- visual_style: the visual aesthetic, colors, composition, and style
- target_audience: who this video is designed for
- engagement_strategy: how to maximize engagement (questions, CTAs, trending elements)

Each concept must be distinct from the others and optimized for vertical 9:16 format.

Respond with ONLY a JSON array of exactly {EXPECTED_CONCEPTS} objects with those six string fields. No explanations, no markdown."#
        )
    }

    fn reprompt(original: &str) -> String {
        format!(
            "{original}\n\nYour previous reply was not valid JSON. Respond again with ONLY the \
JSON array described above. The first character of your reply must be '[' and the last must \
be ']'. Do not include any other text."
        )
    }
}

#[async_trait]
impl ConceptProvider for ConceptStrategist {
    async fn generate(&self, niche: &str, keywords: &str) -> Result<Vec<Concept>, ProviderError> {
        let prompt = Self::build_prompt(niche, keywords);
        let response = self.model.generate_text(SYSTEM_PROMPT, &prompt).await?;

        let decoded = match decode_response::<Vec<Concept>>(&response) {
            Ok(concepts) => concepts,
            Err(first_error) => {
                tracing::warn!(error = %first_error, "Concept response failed to decode, re-prompting once");
                let response = self
                    .model
                    .generate_text(SYSTEM_PROMPT, &Self::reprompt(&prompt))
                    .await?;
                decode_response::<Vec<Concept>>(&response)?
            }
        };

        let total = decoded.len();
        let mut concepts: Vec<Concept> = decoded.into_iter().filter(Concept::is_valid).collect();
        if concepts.len() < total {
            tracing::warn!(
                dropped = total - concepts.len(),
                "Dropped concepts with empty titles"
            );
        }

        if concepts.is_empty() {
            return Err(ProviderError::Parse(
                "Model returned no usable concepts".to_string(),
            ));
        }

        if concepts.len() < EXPECTED_CONCEPTS {
            tracing::warn!(
                returned = concepts.len(),
                expected = EXPECTED_CONCEPTS,
                "Model returned fewer concepts than requested"
            );
        } else if concepts.len() > EXPECTED_CONCEPTS {
            tracing::warn!(
                returned = concepts.len(),
                expected = EXPECTED_CONCEPTS,
                "Model returned extra concepts, keeping the first {EXPECTED_CONCEPTS}"
            );
            concepts.truncate(EXPECTED_CONCEPTS);
        }

        Ok(concepts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Text generator that replays canned responses in order.
    struct ScriptedModel {
        responses: Vec<String>,
        calls: AtomicUsize,
    }

    impl ScriptedModel {
        fn new(responses: Vec<&str>) -> Self {
            Self {
                responses: responses.into_iter().map(String::from).collect(),
                calls: AtomicUsize::new(0),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TextGenerator for ScriptedModel {
        async fn generate_text(&self, _system: &str, _user: &str) -> Result<String, ProviderError> {
            let index = self.calls.fetch_add(1, Ordering::SeqCst);
            self.responses
                .get(index)
                .cloned()
                .ok_or(ProviderError::EmptyResponse)
        }
    }

    fn concept_json(title: &str) -> String {
        format!(
            r#"{{"title": "{title}", "hook": "h", "value_proposition": "v", "visual_style": "s", "target_audience": "a", "engagement_strategy": "e"}}"#
        )
    }

    fn three_concepts() -> String {
        format!(
            "[{}, {}, {}]",
            concept_json("One"),
            concept_json("Two"),
            concept_json("Three")
        )
    }

    #[tokio::test]
    async fn test_generates_three_concepts() {
        let response = three_concepts();
        let model = Arc::new(ScriptedModel::new(vec![response.as_str()]));
        let strategist = ConceptStrategist::new(model.clone());

        let concepts = strategist
            .generate("cooking", "pasta")
            .await
            .expect("generation should succeed");

        assert_eq!(concepts.len(), 3);
        assert_eq!(concepts[0].title, "One");
        assert_eq!(model.call_count(), 1);
    }

    #[tokio::test]
    async fn test_reprompts_once_on_malformed_response() {
        let retry_response = three_concepts();
        let model = Arc::new(ScriptedModel::new(vec![
            "I'd be happy to help! Here are some ideas...",
            retry_response.as_str(),
        ]));
        let strategist = ConceptStrategist::new(model.clone());

        let concepts = strategist
            .generate("fitness", "")
            .await
            .expect("re-prompt should succeed");

        assert_eq!(concepts.len(), 3);
        assert_eq!(model.call_count(), 2);
    }

    #[tokio::test]
    async fn test_second_malformed_response_is_a_parse_error() {
        let model = Arc::new(ScriptedModel::new(vec!["not json", "still not json"]));
        let strategist = ConceptStrategist::new(model.clone());

        let result = strategist.generate("tech", "").await;
        assert!(matches!(result, Err(ProviderError::Parse(_))));
        assert_eq!(model.call_count(), 2);
    }

    #[tokio::test]
    async fn test_accepts_fewer_than_three_concepts() {
        let response = format!("[{}]", concept_json("Solo"));
        let model = Arc::new(ScriptedModel::new(vec![response.as_str()]));
        let strategist = ConceptStrategist::new(model);

        let concepts = strategist
            .generate("travel", "")
            .await
            .expect("single concept should be accepted");
        assert_eq!(concepts.len(), 1);
    }

    #[tokio::test]
    async fn test_truncates_extra_concepts() {
        let response = format!(
            "[{}, {}, {}, {}]",
            concept_json("A"),
            concept_json("B"),
            concept_json("C"),
            concept_json("D")
        );
        let model = Arc::new(ScriptedModel::new(vec![response.as_str()]));
        let strategist = ConceptStrategist::new(model);

        let concepts = strategist
            .generate("music", "")
            .await
            .expect("generation should succeed");
        assert_eq!(concepts.len(), 3);
    }

    #[tokio::test]
    async fn test_all_invalid_concepts_is_an_error() {
        let response = format!("[{}]", concept_json(""));
        let model = Arc::new(ScriptedModel::new(vec![response.as_str()]));
        let strategist = ConceptStrategist::new(model);

        let result = strategist.generate("music", "").await;
        assert!(matches!(result, Err(ProviderError::Parse(_))));
    }

    #[tokio::test]
    async fn test_provider_error_propagates() {
        let model = Arc::new(ScriptedModel::new(vec![]));
        let strategist = ConceptStrategist::new(model);

        let result = strategist.generate("music", "").await;
        assert!(matches!(result, Err(ProviderError::EmptyResponse)));
    }
}
