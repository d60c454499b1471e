//! Lossless joining of ordered clips with the ffmpeg concat demuxer.

use crate::defaults::FFMPEG;
use crate::error::{ReelError, Result};
use crate::media::command::CommandExecutor;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Joins media files in order into one file without re-encoding.
#[async_trait]
pub trait MediaConcatenator: Send + Sync {
    /// Concatenate `inputs` in the given order into `output`.
    ///
    /// Returns the path of the joined file. A single input is returned as-is.
    ///
    /// # Errors
    ///
    /// `ReelError::Input` when `inputs` is empty, `ReelError::IncompatibleMedia`
    /// when the inputs cannot be stream-copied together.
    async fn concatenate(&self, inputs: &[PathBuf], output: &Path) -> Result<PathBuf>;

    fn name(&self) -> &str;
}

/// Concatenation via `ffmpeg -f concat -safe 0 ... -c copy`.
#[derive(Debug, Clone)]
pub struct FfmpegConcatenator<E> {
    executor: E,
    program: String,
}

impl<E: CommandExecutor> FfmpegConcatenator<E> {
    pub fn new(executor: E) -> Self {
        Self {
            executor,
            program: FFMPEG.to_string(),
        }
    }

    /// Use a different ffmpeg binary.
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }
}

#[async_trait]
impl<E: CommandExecutor> MediaConcatenator for FfmpegConcatenator<E> {
    async fn concatenate(&self, inputs: &[PathBuf], output: &Path) -> Result<PathBuf> {
        match inputs {
            [] => return Err(ReelError::input("nothing to concatenate")),
            [only] => {
                tracing::debug!(path = %only.display(), "single clip, skipping concatenation");
                return Ok(only.clone());
            }
            _ => {}
        }

        let list_path = list_path_for(output);
        tokio::fs::write(&list_path, concat_list(inputs)).await?;

        let args = concat_args(&list_path, output);
        let result = self.executor.execute(&self.program, &args).await;

        if let Err(e) = tokio::fs::remove_file(&list_path).await {
            tracing::warn!(path = %list_path.display(), error = %e, "failed to remove concat list");
        }

        match result {
            Ok(_) => {
                tracing::info!(clips = inputs.len(), output = %output.display(), "clips concatenated");
                Ok(output.to_path_buf())
            }
            Err(ReelError::Process { message }) if is_incompatibility(&message) => {
                Err(ReelError::IncompatibleMedia { message })
            }
            Err(e) => Err(e),
        }
    }

    fn name(&self) -> &str {
        "ffmpeg-concat"
    }
}

/// Concat demuxer list: one `file '<path>'` line per input.
pub fn concat_list(inputs: &[PathBuf]) -> String {
    inputs
        .iter()
        .map(|p| format!("file '{}'\n", escape_single_quotes(&p.to_string_lossy())))
        .collect()
}

fn escape_single_quotes(path: &str) -> String {
    path.replace('\'', r"'\''")
}

fn list_path_for(output: &Path) -> PathBuf {
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    output.with_file_name(format!("{stem}.concat.txt"))
}

fn concat_args(list: &Path, output: &Path) -> Vec<String> {
    [
        "-y",
        "-hide_banner",
        "-loglevel",
        "error",
        "-nostdin",
        "-f",
        "concat",
        "-safe",
        "0",
        "-i",
    ]
    .iter()
    .map(|s| s.to_string())
    .chain([
        list.to_string_lossy().into_owned(),
        "-c".to_string(),
        "copy".to_string(),
        output.to_string_lossy().into_owned(),
    ])
    .collect()
}

/// Whether ffmpeg's complaint is about mismatched streams rather than I/O.
fn is_incompatibility(message: &str) -> bool {
    let lower = message.to_lowercase();
    [
        "codec parameters",
        "do not match",
        "does not match",
        "incompatible",
        "not currently supported in container",
    ]
    .iter()
    .any(|needle| lower.contains(needle))
}
