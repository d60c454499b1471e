//! End-to-end run orchestration.
//!
//! A run moves through [`RunState`]s, keeps its intermediate files in a
//! [`RunScratch`] directory and finishes with a [`FinalArtifact`].

pub mod artifact;
pub mod orchestrator;
pub mod scratch;
pub mod state;
pub mod stitch;

pub use artifact::{FinalArtifact, SplitResponse};
pub use orchestrator::{PipelineOrchestrator, PipelineSettings, RunReport, RunRequest};
pub use scratch::RunScratch;
pub use state::{RunState, RunTracker};
pub use stitch::{download_all, stitch};
