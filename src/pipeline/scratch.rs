//! Per-run scratch directory.
//!
//! Every intermediate file of a run (narration WAV, audio segments, downloaded
//! clips, concat list, joined output) lives under one uniquely named directory
//! that is removed when the run ends, on success and on failure.

use crate::error::Result;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const PREFIX: &str = "reelsplice-run-";

#[derive(Debug)]
pub struct RunScratch {
    dir: TempDir,
}

impl RunScratch {
    /// Create a fresh directory under `root`, creating `root` if needed.
    pub fn create_in(root: &Path) -> Result<Self> {
        std::fs::create_dir_all(root)?;
        let dir = tempfile::Builder::new().prefix(PREFIX).tempdir_in(root)?;
        tracing::debug!(path = %dir.path().display(), "created run scratch directory");
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Path for a file inside the scratch directory.
    pub fn file(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Where the downloaded clip for `index` goes.
    pub fn clip_path(&self, index: usize) -> PathBuf {
        self.file(&format!("clip_{index:03}.mp4"))
    }

    /// Remove the directory and everything in it.
    ///
    /// Failure to remove is logged, not returned: the run's outcome is already
    /// decided by the time cleanup happens.
    pub fn close(self) {
        let path = self.dir.path().to_path_buf();
        match self.dir.close() {
            Ok(()) => tracing::debug!(path = %path.display(), "removed run scratch directory"),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to remove run scratch directory")
            }
        }
    }
}
