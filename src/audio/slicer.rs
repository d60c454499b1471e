//! Lossless time-range slicing of a WAV narration.
//!
//! A plan of `n` boundaries yields `n + 1` segments covering `[0, total)`.
//! An empty plan yields one segment holding the input unchanged. Any failure
//! fails the whole call; callers never see a partial segment list.

use crate::audio::AudioSegment;
use crate::audio::wav;
use crate::defaults::FFMPEG;
use crate::error::{ReelError, Result};
use crate::media::command::CommandExecutor;
use crate::timing::SplitPlan;
use async_trait::async_trait;
use std::path::Path;

/// Cuts a WAV container into independent WAV segments.
#[async_trait]
pub trait AudioSlicer: Send + Sync {
    /// Slice `container` at every boundary in `plan`.
    ///
    /// `workdir` is the run's scratch directory; implementations that need
    /// intermediate files create them there and nowhere else.
    async fn slice(
        &self,
        container: &[u8],
        plan: &SplitPlan,
        workdir: &Path,
    ) -> Result<Vec<AudioSegment>>;

    /// Short name for logs.
    fn name(&self) -> &str;
}

/// Check the plan against the container and handle the no-split case.
///
/// Returns the total duration, plus the single whole-input segment when the
/// plan is empty.
fn prepare(container: &[u8], plan: &SplitPlan) -> Result<(f64, Option<AudioSegment>)> {
    let total = wav::duration(container)?;
    if plan.is_empty() {
        return Ok((
            total,
            Some(AudioSegment {
                index: 0,
                start_time: 0.0,
                end_time: total,
                samples: container.to_vec(),
            }),
        ));
    }
    if !plan.is_valid_for(total) {
        return Err(ReelError::input(format!(
            "split boundaries {:?} must be strictly increasing and inside (0, {total:.3})",
            plan.boundaries()
        )));
    }
    Ok((total, None))
}

/// Extract `[start, end)` seconds of a WAV container as a new WAV container.
///
/// Frame positions are rounded to the nearest sample; the payload is copied
/// byte for byte.
pub fn cut_range(container: &[u8], start: f64, end: f64) -> Result<Vec<u8>> {
    let decoded = wav::decode(container)?;
    let rate = f64::from(decoded.format.sample_rate);
    let frames = decoded.frames();
    let first = ((start * rate).round().max(0.0) as usize).min(frames);
    let last = ((end * rate).round().max(0.0) as usize).clamp(first, frames);
    let align = decoded.format.block_align();
    wav::encode(&decoded.payload[first * align..last * align], decoded.format)
}

/// In-process slicer: decodes once with hound and copies sample ranges.
#[derive(Debug, Clone, Copy, Default)]
pub struct WavSlicer;

impl WavSlicer {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AudioSlicer for WavSlicer {
    async fn slice(
        &self,
        container: &[u8],
        plan: &SplitPlan,
        _workdir: &Path,
    ) -> Result<Vec<AudioSegment>> {
        let (total, whole) = prepare(container, plan)?;
        if let Some(segment) = whole {
            return Ok(vec![segment]);
        }

        let decoded = wav::decode(container)?;
        let rate = f64::from(decoded.format.sample_rate);
        let align = decoded.format.block_align();
        let frames = decoded.frames();

        plan.intervals(total)
            .into_iter()
            .enumerate()
            .map(|(index, (start, end))| -> Result<AudioSegment> {
                let first = ((start * rate).round() as usize).min(frames);
                let last = ((end * rate).round() as usize).clamp(first, frames);
                let samples =
                    wav::encode(&decoded.payload[first * align..last * align], decoded.format)?;
                Ok(AudioSegment {
                    index,
                    start_time: start,
                    end_time: end,
                    samples,
                })
            })
            .collect()
    }

    fn name(&self) -> &str {
        "native"
    }
}

/// Slicer that runs one ffmpeg stream-copy per interval.
pub struct FfmpegSlicer<E: CommandExecutor> {
    executor: E,
}

impl<E: CommandExecutor> FfmpegSlicer<E> {
    pub fn new(executor: E) -> Self {
        Self { executor }
    }

    /// Arguments for extracting `[start, end)` from `input` into `output`.
    ///
    /// The last interval runs to the end of the input, so it has no duration.
    pub fn extract_args(input: &Path, output: &Path, start: f64, end: Option<f64>) -> Vec<String> {
        let mut args = vec![
            "-y".to_string(),
            "-hide_banner".to_string(),
            "-loglevel".to_string(),
            "error".to_string(),
            "-nostdin".to_string(),
            "-i".to_string(),
            input.display().to_string(),
            "-ss".to_string(),
            format!("{start:.6}"),
        ];
        if let Some(end) = end {
            args.push("-t".to_string());
            args.push(format!("{:.6}", end - start));
        }
        args.extend([
            "-c".to_string(),
            "copy".to_string(),
            output.display().to_string(),
        ]);
        args
    }
}

#[async_trait]
impl<E: CommandExecutor> AudioSlicer for FfmpegSlicer<E> {
    async fn slice(
        &self,
        container: &[u8],
        plan: &SplitPlan,
        workdir: &Path,
    ) -> Result<Vec<AudioSegment>> {
        let (total, whole) = prepare(container, plan)?;
        if let Some(segment) = whole {
            return Ok(vec![segment]);
        }

        let input = workdir.join("narration.wav");
        tokio::fs::write(&input, container).await?;

        let intervals = plan.intervals(total);
        let last = intervals.len() - 1;
        let mut segments = Vec::with_capacity(intervals.len());

        for (index, (start, end)) in intervals.into_iter().enumerate() {
            let output = workdir.join(format!("audio_segment_{index:03}.wav"));
            let bounded_end = (index < last).then_some(end);
            let args = Self::extract_args(&input, &output, start, bounded_end);

            self.executor.execute(FFMPEG, &args).await.map_err(|e| {
                tracing::warn!(segment = index, error = %e, "audio slice failed");
                e
            })?;

            let samples = tokio::fs::read(&output).await?;
            tracing::debug!(
                segment = index,
                start,
                end,
                bytes = samples.len(),
                "audio segment extracted"
            );
            segments.push(AudioSegment {
                index,
                start_time: start,
                end_time: end,
                samples,
            });
        }

        Ok(segments)
    }

    fn name(&self) -> &str {
        "ffmpeg"
    }
}
