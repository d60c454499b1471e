//! reelsplice - narration-driven video segmentation and assembly
//!
//! Splits synthesized narration at natural word boundaries, generates one
//! clip per segment and stitches the clips back together losslessly.

// Enforce error handling discipline
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

pub mod audio;
pub mod collab;
pub mod config;
pub mod defaults;
pub mod error;
pub mod media;
pub mod pipeline;
pub mod timing;

#[cfg(feature = "cli")]
pub mod app;
#[cfg(feature = "cli")]
pub mod cli;
pub mod logging;
#[cfg(feature = "relay")]
pub mod relay;

// Core traits (synthesize → segment → slice → generate → fetch → join)
pub use audio::AudioSlicer;
pub use collab::{SpeechSynthesizer, VideoGenerator};
pub use media::{CommandExecutor, MediaConcatenator, MediaFetcher, SystemCommandExecutor};

// Boundary planning
pub use timing::{SplitPlan, WordTimestamp, plan};

// Pipeline
pub use pipeline::{FinalArtifact, PipelineOrchestrator, PipelineSettings, RunReport, RunRequest};

// Error handling
pub use error::{ErrorKind, ReelError, Result};

// Config
pub use config::{Config, Credentials};

/// Crate version, suffixed with `+<short git hash>` when built from a checkout.
pub fn version_string() -> String {
    let version = env!("CARGO_PKG_VERSION");
    match option_env!("GIT_HASH").filter(|hash| !hash.is_empty()) {
        Some(hash) => format!("{version}+{hash}"),
        None => version.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_string_has_package_version_prefix() {
        let (version, build) = match version_string().split_once('+') {
            Some((v, b)) => (v.to_string(), Some(b.to_string())),
            None => (version_string(), None),
        };
        assert_eq!(version, env!("CARGO_PKG_VERSION"));
        if let Some(build) = build {
            assert_eq!(build.len(), 7, "short hash expected, got {build}");
        }
    }
}
