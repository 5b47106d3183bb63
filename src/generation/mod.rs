//! Batch generation: request lifecycle, per-item orchestration and the submission boundary.

pub mod fallback;
pub mod orchestrator;
pub mod submit;
pub mod tracker;

pub use fallback::fallback_artifact;
pub use orchestrator::{BatchOrchestrator, BatchSummary, ItemState, OrchestratorSettings};
pub use submit::{BatchSubmission, GenerationService};
pub use tracker::{RequestTracker, RunGuard};
