//! Workflow state model and orchestration.

pub mod orchestrator;
pub mod record;

pub use orchestrator::PipelineOrchestrator;
pub use record::{
    Concept, Script, ScriptSegment, Stage, Status, WorkflowRecord, WorkflowSummary,
};
