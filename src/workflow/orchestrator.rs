//! Stage-by-stage workflow orchestration.
//!
//! The orchestrator drives one workflow record through concept
//! generation, concept selection, script generation, media generation,
//! and video assembly, persisting the record after every transition.
//! Stage-internal failures are recorded on the record (`status = failed`
//! plus a stage-prefixed error message) instead of being returned;
//! callers only see an `Err` for precondition violations such as an
//! unknown id or an out-of-range selection.

use std::path::PathBuf;
use std::sync::Arc;

use crate::config::WorkflowConfig;
use crate::error::{StoreError, WorkflowError};
use crate::fanout::fan_out;
use crate::providers::{ConceptProvider, ImageProvider, ScriptProvider, SpeechProvider};
use crate::render::{RenderRequest, Renderer};
use crate::store::StateStore;
use crate::workflow::record::{Script, Stage, Status, WorkflowRecord, WorkflowSummary};

/// Drives workflows through the generation pipeline.
pub struct PipelineOrchestrator {
    config: WorkflowConfig,
    store: StateStore,
    concepts: Arc<dyn ConceptProvider>,
    scripts: Arc<dyn ScriptProvider>,
    images: Arc<dyn ImageProvider>,
    speech: Arc<dyn SpeechProvider>,
    renderer: Arc<dyn Renderer>,
}

impl PipelineOrchestrator {
    pub fn new(
        config: WorkflowConfig,
        concepts: Arc<dyn ConceptProvider>,
        scripts: Arc<dyn ScriptProvider>,
        images: Arc<dyn ImageProvider>,
        speech: Arc<dyn SpeechProvider>,
        renderer: Arc<dyn Renderer>,
    ) -> Self {
        let store = StateStore::new(config.state_dir.clone());
        Self {
            config,
            store,
            concepts,
            scripts,
            images,
            speech,
            renderer,
        }
    }

    /// Creates a new workflow and runs concept generation.
    ///
    /// Returns the persisted record, which ends in `waiting_for_selection`
    /// on success or `failed` when concept generation fails.
    pub async fn start(
        &self,
        niche: &str,
        keywords: &str,
    ) -> Result<WorkflowRecord, WorkflowError> {
        let mut record = WorkflowRecord::new(niche, keywords);
        tracing::info!(id = %record.id, niche, "Starting workflow");

        self.run_concept_stage(&mut record).await?;
        Ok(record)
    }

    /// Selects a concept and runs the remaining stages in sequence.
    ///
    /// Valid only while the workflow is waiting for selection; violations
    /// return an error without touching persisted state.
    pub async fn select(&self, id: &str, index: usize) -> Result<WorkflowRecord, WorkflowError> {
        let mut record = self.get(id).await?;

        if record.status != Status::WaitingForSelection {
            return Err(WorkflowError::InvalidState {
                expected: Status::WaitingForSelection.to_string(),
                actual: record.status.to_string(),
            });
        }
        if record.selected_concept_index.is_some() {
            return Err(WorkflowError::SelectionAlreadyMade);
        }
        if index >= record.concepts.len() {
            return Err(WorkflowError::SelectionOutOfRange {
                index,
                available: record.concepts.len(),
            });
        }

        record.selected_concept_index = Some(index);
        // Written in the same put as the index: a crash before the next
        // stage persist must not leave a waiting_for_selection record that
        // resume() would return untouched.
        record.status = Status::InProgress;
        self.store.put(&mut record).await?;
        tracing::info!(id = %record.id, index, "Concept selected");

        self.run_from_script(&mut record).await?;
        Ok(record)
    }

    /// Resumes a workflow from its first incomplete stage.
    ///
    /// Completed and waiting-for-selection records are returned as-is.
    /// Failed or interrupted records replay their saved concepts, script,
    /// and artifacts and regenerate only what is missing.
    pub async fn resume(&self, id: &str) -> Result<WorkflowRecord, WorkflowError> {
        let mut record = self.get(id).await?;

        match record.status {
            Status::Completed | Status::WaitingForSelection => return Ok(record),
            Status::InProgress | Status::Failed => {}
        }

        tracing::info!(id = %record.id, stage = %record.current_stage, "Resuming workflow");

        if record.concepts.is_empty() {
            self.run_concept_stage(&mut record).await?;
            return Ok(record);
        }

        if record.selected_concept_index.is_none() {
            // Concepts survived the failure; hand the choice back to the
            // operator instead of regenerating.
            record.current_stage = Stage::WaitingForSelection;
            record.status = Status::WaitingForSelection;
            record.error_message = None;
            self.store.put(&mut record).await?;
            return Ok(record);
        }

        if record.script.is_none() {
            self.run_from_script(&mut record).await?;
            return Ok(record);
        }

        if record.media_artifact_paths.is_empty() {
            self.run_media_stage(&mut record).await?;
            if record.status != Status::Failed {
                self.run_assembly_stage(&mut record).await?;
            }
            return Ok(record);
        }

        if record.video_artifact_path.is_none() {
            self.run_assembly_stage(&mut record).await?;
        }

        Ok(record)
    }

    /// Loads a workflow record.
    pub async fn get(&self, id: &str) -> Result<WorkflowRecord, WorkflowError> {
        match self.store.get(id).await {
            Ok(record) => Ok(record),
            Err(StoreError::NotFound(id)) => Err(WorkflowError::NotFound(id)),
            Err(e) => Err(WorkflowError::Store(e)),
        }
    }

    /// Lists all stored workflows, newest first.
    pub async fn list(&self) -> Result<Vec<WorkflowSummary>, WorkflowError> {
        Ok(self.store.list().await?)
    }

    /// Deletes a workflow record; missing ids are a no-op.
    pub async fn delete(&self, id: &str) -> Result<(), WorkflowError> {
        Ok(self.store.delete(id).await?)
    }

    async fn run_concept_stage(&self, record: &mut WorkflowRecord) -> Result<(), WorkflowError> {
        record.current_stage = Stage::ConceptGeneration;
        record.status = Status::InProgress;
        record.error_message = None;
        self.store.put(record).await?;

        match self
            .concepts
            .generate(&record.niche, &record.keywords)
            .await
        {
            Ok(concepts) => {
                tracing::info!(id = %record.id, count = concepts.len(), "Concepts generated");
                record.concepts = concepts;
                record.current_stage = Stage::WaitingForSelection;
                record.status = Status::WaitingForSelection;
            }
            Err(e) => {
                tracing::error!(id = %record.id, error = %e, "Concept generation failed");
                record.fail(Stage::ConceptGeneration, format!("concept_generation: {e}"));
            }
        }

        self.store.put(record).await?;
        Ok(())
    }

    /// Runs script generation, media generation, and video assembly in
    /// strict sequence, halting at the first failed stage.
    async fn run_from_script(&self, record: &mut WorkflowRecord) -> Result<(), WorkflowError> {
        self.run_script_stage(record).await?;
        if record.status == Status::Failed {
            return Ok(());
        }
        self.run_media_stage(record).await?;
        if record.status == Status::Failed {
            return Ok(());
        }
        self.run_assembly_stage(record).await?;
        Ok(())
    }

    async fn run_script_stage(&self, record: &mut WorkflowRecord) -> Result<(), WorkflowError> {
        record.current_stage = Stage::ScriptGeneration;
        record.status = Status::InProgress;
        record.error_message = None;
        self.store.put(record).await?;

        let concept = match record.selected_concept() {
            Some(concept) => concept.clone(),
            None => {
                record.fail(
                    Stage::ScriptGeneration,
                    "script_generation: no concept selected",
                );
                self.store.put(record).await?;
                return Ok(());
            }
        };

        match self
            .scripts
            .generate(&concept, self.config.target_duration)
            .await
        {
            Ok(script) => {
                tracing::info!(id = %record.id, segments = script.segments.len(), "Script generated");
                record.script = Some(script);
            }
            Err(e) => {
                tracing::error!(id = %record.id, error = %e, "Script generation failed");
                record.fail(Stage::ScriptGeneration, format!("script_generation: {e}"));
            }
        }

        self.store.put(record).await?;
        Ok(())
    }

    async fn run_media_stage(&self, record: &mut WorkflowRecord) -> Result<(), WorkflowError> {
        record.current_stage = Stage::MediaGeneration;
        record.status = Status::InProgress;
        record.error_message = None;
        self.store.put(record).await?;

        match self.generate_media(record).await {
            Ok(paths) => {
                tracing::info!(id = %record.id, images = paths.len(), "Media generated");
                record.media_artifact_paths = paths;
            }
            Err(message) => {
                tracing::error!(id = %record.id, error = %message, "Media generation failed");
                record.fail(Stage::MediaGeneration, format!("media_generation: {message}"));
            }
        }

        self.store.put(record).await?;
        Ok(())
    }

    /// Fans out one image request per segment and writes the results in
    /// segment order. Partial failure is degraded success; only an empty
    /// batch or a filesystem error fails the stage.
    async fn generate_media(&self, record: &WorkflowRecord) -> Result<Vec<PathBuf>, String> {
        let script = record
            .script
            .as_ref()
            .ok_or_else(|| "no script available".to_string())?;

        let prompts = script.image_prompts();
        let requests: Vec<_> = prompts
            .into_iter()
            .map(|prompt| {
                let images = Arc::clone(&self.images);
                async move { images.generate(&prompt).await }
            })
            .collect();

        let outcome = fan_out(requests).await.map_err(|e| e.to_string())?;
        if outcome.is_degraded() {
            tracing::warn!(
                id = %record.id,
                failed = outcome.failures.len(),
                total = outcome.total,
                "Some images failed, continuing with the rest"
            );
        }

        let images_dir = self.workflow_dir(&record.id).join("images");
        tokio::fs::create_dir_all(&images_dir)
            .await
            .map_err(|e| format!("failed to create {}: {}", images_dir.display(), e))?;

        let mut paths = Vec::with_capacity(outcome.items.len());
        for (index, bytes) in &outcome.items {
            let path = images_dir.join(format!("image_{:02}.png", index));
            tokio::fs::write(&path, bytes)
                .await
                .map_err(|e| format!("failed to write {}: {}", path.display(), e))?;
            paths.push(path);
        }

        Ok(paths)
    }

    async fn run_assembly_stage(&self, record: &mut WorkflowRecord) -> Result<(), WorkflowError> {
        record.current_stage = Stage::VideoAssembly;
        record.status = Status::InProgress;
        record.error_message = None;
        self.store.put(record).await?;

        match self.assemble_video(record).await {
            Ok((audio_path, video_path)) => {
                tracing::info!(id = %record.id, video = %video_path.display(), "Video assembled");
                record.audio_artifact_path = Some(audio_path);
                record.video_artifact_path = Some(video_path);
                record.status = Status::Completed;
            }
            Err(message) => {
                tracing::error!(id = %record.id, error = %message, "Video assembly failed");
                record.fail(Stage::VideoAssembly, format!("video_assembly: {message}"));
            }
        }

        self.store.put(record).await?;
        Ok(())
    }

    /// Synthesizes the voiceover, then renders the final video on the
    /// blocking pool.
    async fn assemble_video(
        &self,
        record: &WorkflowRecord,
    ) -> Result<(PathBuf, PathBuf), String> {
        let script = record
            .script
            .as_ref()
            .ok_or_else(|| "no script available".to_string())?;

        if record.media_artifact_paths.is_empty() {
            return Err("no media artifacts available".to_string());
        }

        let workflow_dir = self.workflow_dir(&record.id);
        tokio::fs::create_dir_all(&workflow_dir)
            .await
            .map_err(|e| format!("failed to create {}: {}", workflow_dir.display(), e))?;

        let audio_bytes = self
            .speech
            .generate(&script.full_transcript)
            .await
            .map_err(|e| e.to_string())?;

        let audio_path = workflow_dir.join("voiceover.mp3");
        tokio::fs::write(&audio_path, &audio_bytes)
            .await
            .map_err(|e| format!("failed to write {}: {}", audio_path.display(), e))?;

        let request = RenderRequest {
            image_paths: record.media_artifact_paths.clone(),
            durations: image_durations(script, record.media_artifact_paths.len()),
            audio_path: audio_path.clone(),
            output_path: workflow_dir.join("final_video.mp4"),
        };

        let renderer = Arc::clone(&self.renderer);
        let video_path = tokio::task::spawn_blocking(move || renderer.render(&request))
            .await
            .map_err(|e| format!("render task failed: {e}"))?
            .map_err(|e| e.to_string())?;

        Ok((audio_path, video_path))
    }

    fn workflow_dir(&self, id: &str) -> PathBuf {
        self.config.output_dir.join(id)
    }
}

/// Per-image display durations for the renderer.
///
/// Segment estimates are used when every segment produced an image;
/// otherwise the total duration is spread evenly over the images that
/// survived media generation.
fn image_durations(script: &Script, image_count: usize) -> Vec<f64> {
    let durations = script.segment_durations();
    if durations.len() == image_count {
        return durations;
    }
    let per_image = script.total_duration / image_count.max(1) as f64;
    vec![per_image; image_count]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::record::ScriptSegment;

    fn test_script(segments: usize) -> Script {
        Script {
            full_transcript: "transcript".to_string(),
            segments: (0..segments)
                .map(|i| ScriptSegment {
                    index: i as u32 + 1,
                    text: format!("segment {i}"),
                    image_prompt: format!("prompt {i}"),
                    duration: 5.0,
                    visual_description: format!("visual {i}"),
                })
                .collect(),
            total_duration: segments as f64 * 5.0,
            hook_enhancement: "hook".to_string(),
            pacing_notes: "pacing".to_string(),
        }
    }

    #[test]
    fn test_image_durations_match_segments() {
        let script = test_script(4);
        let durations = image_durations(&script, 4);
        assert_eq!(durations, vec![5.0; 4]);
    }

    #[test]
    fn test_image_durations_spread_evenly_when_degraded() {
        let script = test_script(4);
        let durations = image_durations(&script, 2);
        assert_eq!(durations, vec![10.0, 10.0]);
    }

    #[test]
    fn test_image_durations_zero_images() {
        let script = test_script(4);
        assert!(image_durations(&script, 0).is_empty());
    }
}
