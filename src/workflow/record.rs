//! Workflow record types: the durable state of one pipeline run.
//!
//! A [`WorkflowRecord`] is created when a workflow starts, mutated exactly
//! once per stage by the orchestrator, and persisted after every stage
//! transition including failures. Records are serialized as human-readable
//! JSON; unknown fields are ignored on read so older binaries can load
//! records written by newer ones.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One step of the generation pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Generating candidate concepts from niche and keywords.
    ConceptGeneration,
    /// Concepts generated, paused for a human selection.
    WaitingForSelection,
    /// Generating the script for the selected concept.
    ScriptGeneration,
    /// Generating one image per script segment.
    MediaGeneration,
    /// Synthesizing the voiceover and rendering the final video.
    VideoAssembly,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::ConceptGeneration => "concept_generation",
            Stage::WaitingForSelection => "waiting_for_selection",
            Stage::ScriptGeneration => "script_generation",
            Stage::MediaGeneration => "media_generation",
            Stage::VideoAssembly => "video_assembly",
        };
        write!(f, "{}", name)
    }
}

/// Overall status of a workflow run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// A stage is currently running (or was interrupted mid-run).
    InProgress,
    /// Paused for a human concept selection.
    WaitingForSelection,
    /// The final video was produced.
    Completed,
    /// A stage failed; `error_message` describes why.
    Failed,
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Status::InProgress => "in_progress",
            Status::WaitingForSelection => "waiting_for_selection",
            Status::Completed => "completed",
            Status::Failed => "failed",
        };
        write!(f, "{}", name)
    }
}

/// A candidate video concept produced by the concept stage.
///
/// All fields are opaque text; only the title is validated for presence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Concept {
    /// Catchy, searchable title.
    pub title: String,
    /// Opening hook for the first seconds.
    pub hook: String,
    /// What value or insight the video provides.
    pub value_proposition: String,
    /// Description of the visual aesthetic.
    pub visual_style: String,
    /// Who the video is designed for.
    pub target_audience: String,
    /// How to maximize engagement (CTA, questions, etc.).
    pub engagement_strategy: String,
}

impl Concept {
    /// Returns true if the concept has a non-empty title.
    pub fn is_valid(&self) -> bool {
        !self.title.trim().is_empty()
    }
}

/// One segment of a script with its matching visual prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptSegment {
    /// Position of this segment in the script, contiguous from 1.
    pub index: u32,
    /// Text spoken during this segment.
    pub text: String,
    /// Image-generation prompt for the segment's visual.
    pub image_prompt: String,
    /// Estimated duration of this segment in seconds.
    pub duration: f64,
    /// Description of what should be shown.
    pub visual_description: String,
}

/// Complete script for the selected concept.
///
/// The sum of segment durations need not equal `total_duration` exactly;
/// the renderer rescales per-image durations to the voiceover length.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Script {
    /// Complete spoken transcript.
    pub full_transcript: String,
    /// Ordered segments with visual prompts.
    pub segments: Vec<ScriptSegment>,
    /// Total estimated duration in seconds.
    pub total_duration: f64,
    /// Enhanced hook for the opening seconds.
    pub hook_enhancement: String,
    /// Notes on pacing and timing.
    pub pacing_notes: String,
}

impl Script {
    /// Returns the ordered image prompts, one per segment.
    pub fn image_prompts(&self) -> Vec<String> {
        self.segments.iter().map(|s| s.image_prompt.clone()).collect()
    }

    /// Returns the per-segment duration estimates in segment order.
    pub fn segment_durations(&self) -> Vec<f64> {
        self.segments.iter().map(|s| s.duration).collect()
    }

    /// Checks that segment indices are contiguous starting from 1.
    pub fn has_contiguous_segments(&self) -> bool {
        self.segments
            .iter()
            .enumerate()
            .all(|(i, s)| s.index == (i as u32) + 1)
    }
}

/// The durable state of one workflow run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowRecord {
    /// Unique identifier for this workflow.
    pub id: String,
    /// When the workflow was created.
    pub created_at: DateTime<Utc>,
    /// When the record was last persisted.
    pub updated_at: DateTime<Utc>,

    /// The main niche or topic.
    pub niche: String,
    /// Additional keywords guiding concept generation.
    pub keywords: String,
    /// Candidate concepts, 0 to 3 entries in generation order.
    #[serde(default)]
    pub concepts: Vec<Concept>,
    /// Index of the human-selected concept. Write-once.
    #[serde(default)]
    pub selected_concept_index: Option<usize>,

    /// Script generated for the selected concept.
    #[serde(default)]
    pub script: Option<Script>,

    /// Paths to generated images, in segment order.
    #[serde(default)]
    pub media_artifact_paths: Vec<PathBuf>,
    /// Path to the synthesized voiceover.
    #[serde(default)]
    pub audio_artifact_path: Option<PathBuf>,
    /// Path to the rendered video.
    #[serde(default)]
    pub video_artifact_path: Option<PathBuf>,

    /// Stage the workflow is currently in (or failed in).
    pub current_stage: Stage,
    /// Overall status.
    pub status: Status,
    /// Why the workflow failed, when `status` is `Failed`.
    #[serde(default)]
    pub error_message: Option<String>,
}

impl WorkflowRecord {
    /// Creates a new record at the start of concept generation.
    pub fn new(niche: impl Into<String>, keywords: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            created_at: now,
            updated_at: now,
            niche: niche.into(),
            keywords: keywords.into(),
            concepts: Vec::new(),
            selected_concept_index: None,
            script: None,
            media_artifact_paths: Vec::new(),
            audio_artifact_path: None,
            video_artifact_path: None,
            current_stage: Stage::ConceptGeneration,
            status: Status::InProgress,
            error_message: None,
        }
    }

    /// Returns the selected concept, if a selection was made.
    pub fn selected_concept(&self) -> Option<&Concept> {
        self.selected_concept_index
            .and_then(|i| self.concepts.get(i))
    }

    /// Marks the record as failed in the given stage.
    ///
    /// Already-produced artifacts are preserved; only stage, status and
    /// error message change.
    pub fn fail(&mut self, stage: Stage, message: impl Into<String>) {
        self.current_stage = stage;
        self.status = Status::Failed;
        self.error_message = Some(message.into());
    }

    /// Builds the list-view summary of this record.
    pub fn summary(&self) -> WorkflowSummary {
        WorkflowSummary {
            id: self.id.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
            niche: self.niche.clone(),
            current_stage: self.current_stage,
            status: self.status,
        }
    }
}

/// Compact list entry for a stored workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowSummary {
    /// Unique identifier for the workflow.
    pub id: String,
    /// When the workflow was created.
    pub created_at: DateTime<Utc>,
    /// When the record was last persisted.
    pub updated_at: DateTime<Utc>,
    /// The main niche or topic.
    pub niche: String,
    /// Stage the workflow is currently in.
    pub current_stage: Stage,
    /// Overall status.
    pub status: Status,
}
