//! Command handlers behind the CLI.
//!
//! Each handler wires production collaborators from the configuration and
//! prints its result to stdout; progress and summaries go to stderr.

use crate::audio::{AudioSlicer, FfmpegSlicer, WavSlicer, wav};
use crate::config::{Config, SlicerKind};
use crate::error::{ReelError, Result};
use crate::media::{FfmpegConcatenator, HttpFetcher, SystemCommandExecutor};
use crate::pipeline::artifact::{FinalArtifact, SplitResponse};
use crate::pipeline::scratch::RunScratch;
use crate::pipeline::stitch;
use crate::timing::{self, SplitPlan, WordTimestamp};
use owo_colors::OwoColorize;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::time::Duration;

fn read_timestamps(path: &Path) -> Result<Vec<WordTimestamp>> {
    let text = std::fs::read_to_string(path)?;
    timing::from_json(&text)
}

/// Plan split points from a timestamp file.
pub fn run_plan(config: &Config, timestamps: &Path, target: Option<f64>) -> Result<()> {
    let words = read_timestamps(timestamps)?;
    let target = target.unwrap_or(config.pipeline.target_duration_secs);
    let total = timing::total_duration(&words);
    let plan = timing::plan(&words, target)?.normalized(total);

    let report = json!({
        "target_duration": target,
        "total_duration": total,
        "split_points": plan.boundaries(),
        "segment_count": plan.segment_count(),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// Wrap raw PCM in a WAV container.
pub fn run_wrap(
    config: &Config,
    input: &Path,
    output: &Path,
    sample_rate: Option<u32>,
    channels: Option<u16>,
    bit_depth: Option<u16>,
    quiet: bool,
) -> Result<()> {
    let samples = std::fs::read(input)?;
    let container = wav::wrap(
        &samples,
        sample_rate.unwrap_or(config.synthesis.sample_rate),
        channels.unwrap_or(config.synthesis.channels),
        bit_depth.unwrap_or(config.synthesis.bit_depth),
    )?;
    std::fs::write(output, &container)?;

    if !quiet {
        eprintln!(
            "{} {} ({:.2}s)",
            "Wrote".green(),
            output.display(),
            wav::duration(&container)?
        );
    }
    Ok(())
}

fn slicer_for(config: &Config, native: bool) -> Box<dyn AudioSlicer> {
    if native || config.pipeline.slicer == SlicerKind::Native {
        Box::new(WavSlicer::new())
    } else {
        let executor =
            SystemCommandExecutor::new(Duration::from_secs(config.network.process_timeout_secs));
        Box::new(FfmpegSlicer::new(executor))
    }
}

/// Options for [`run_split`].
#[derive(Debug, Clone)]
pub struct SplitArgs {
    pub audio: PathBuf,
    pub timestamps: PathBuf,
    pub out_dir: PathBuf,
    pub target: Option<f64>,
    pub native: bool,
    pub json: bool,
    pub quiet: bool,
}

/// Slice a narration WAV into segment files.
pub async fn run_split(config: &Config, args: &SplitArgs) -> Result<()> {
    let container = tokio::fs::read(&args.audio).await?;
    let words = read_timestamps(&args.timestamps)?;
    let target = args.target.unwrap_or(config.pipeline.target_duration_secs);
    let total = wav::duration(&container)?;
    let plan: SplitPlan = timing::plan(&words, target)?.normalized(total);

    let slicer = slicer_for(config, args.native);
    let scratch = RunScratch::create_in(&config.pipeline.resolved_temp_root())?;
    let sliced = slicer.slice(&container, &plan, scratch.path()).await;
    scratch.close();
    let segments = sliced?;

    tokio::fs::create_dir_all(&args.out_dir).await?;
    for segment in &segments {
        let path = args.out_dir.join(format!("segment_{:03}.wav", segment.index));
        tokio::fs::write(&path, &segment.samples).await?;
        if !args.quiet && !args.json {
            eprintln!(
                "  {} {:>8.3}s - {:>8.3}s",
                path.display().cyan(),
                segment.start_time,
                segment.end_time
            );
        }
    }

    if args.json {
        let response = SplitResponse::new(&segments, plan.boundaries());
        println!("{}", serde_json::to_string(&response)?);
    } else {
        println!("{}", serde_json::to_string(plan.boundaries())?);
        if !args.quiet {
            eprintln!(
                "{} {} segment(s) with {}",
                "Split".green(),
                segments.len(),
                slicer.name()
            );
        }
    }
    Ok(())
}

/// Download clips and join them into `output`.
///
/// With a single URL nothing is downloaded; the URL is printed back.
pub async fn run_stitch(config: &Config, output: &Path, urls: &[String], quiet: bool) -> Result<()> {
    let fetcher = HttpFetcher::new(
        Duration::from_secs(config.network.connect_timeout_secs),
        Duration::from_secs(config.network.request_timeout_secs),
    )?
    .with_progress(!quiet);
    let executor =
        SystemCommandExecutor::new(Duration::from_secs(config.network.process_timeout_secs));
    let concatenator = FfmpegConcatenator::new(executor);

    let artifact = stitch::stitch(
        urls,
        &fetcher,
        &concatenator,
        &config.pipeline.resolved_temp_root(),
        config.pipeline.max_concurrency,
    )
    .await?;

    match artifact {
        FinalArtifact::RemoteUrl { url } => println!("{url}"),
        FinalArtifact::Video { bytes } => {
            tokio::fs::write(output, &bytes).await?;
            if !quiet {
                eprintln!(
                    "{} {} clips into {} ({} bytes)",
                    "Stitched".green(),
                    urls.len(),
                    output.display(),
                    bytes.len()
                );
            }
            println!("{}", output.display());
        }
    }
    Ok(())
}

/// Serve the relay until interrupted.
#[cfg(feature = "relay")]
pub async fn run_relay(config: &Config, listen: Option<String>) -> Result<()> {
    use crate::config::Credentials;
    use crate::relay::{HttpUpstream, Relay, RelaySettings};
    use std::sync::Arc;

    let settings = RelaySettings::from_config(&config.relay)?;
    let credentials = Credentials::from_env();
    if credentials.video_api_key().is_err() {
        tracing::warn!("FAL_KEY is not set; every relayed request will be refused with 401");
    }
    let upstream = HttpUpstream::new(settings.timeout)?;
    let relay = Relay::new(settings, credentials, Arc::new(upstream));
    let listen = listen.unwrap_or_else(|| config.relay.listen.clone());

    tokio::select! {
        served = crate::relay::serve(&listen, relay) => served,
        signal = tokio::signal::ctrl_c() => {
            signal.map_err(ReelError::from)?;
            tracing::info!("relay shutting down");
            Ok(())
        }
    }
}
