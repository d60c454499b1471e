//! Run driver: script in, final video out.
//!
//! A run synthesizes the narration, plans split points, slices the audio,
//! generates one clip per slice, downloads the clips and joins them. Clip
//! generation and downloads run concurrently up to `max_concurrency`; results
//! are always reassembled by segment index, never by arrival order.

use crate::audio::{AudioSegment, AudioSlicer, wav};
use crate::collab::speech::{self, SpeechRequest, SpeechSynthesizer, Voice};
use crate::collab::video::{VideoGenerator, VideoRequest};
use crate::config::Config;
use crate::defaults;
use crate::error::{ReelError, Result};
use crate::media::{MediaConcatenator, MediaFetcher};
use crate::pipeline::artifact::FinalArtifact;
use crate::pipeline::scratch::RunScratch;
use crate::pipeline::state::{RunState, RunTracker};
use crate::pipeline::stitch;
use crate::timing::{self, SplitPlan};
use futures_util::{StreamExt, TryStreamExt, stream};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Tunables for a run.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSettings {
    /// Desired segment length in seconds.
    pub target_duration: f64,
    /// Parallel generation requests and downloads.
    pub max_concurrency: usize,
    /// Parent directory for per-run scratch directories.
    pub temp_root: PathBuf,
    pub aspect_ratio: String,
    /// How long to wait for the synthesis stream to finish.
    pub synthesis_timeout: Duration,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            target_duration: defaults::TARGET_DURATION_SECS,
            max_concurrency: defaults::MAX_CONCURRENCY,
            temp_root: std::env::temp_dir(),
            aspect_ratio: defaults::ASPECT_RATIO.to_string(),
            synthesis_timeout: Duration::from_secs(defaults::SYNTHESIS_SAFETY_TIMEOUT_SECS),
        }
    }
}

impl From<&Config> for PipelineSettings {
    fn from(config: &Config) -> Self {
        Self {
            target_duration: config.pipeline.target_duration_secs,
            max_concurrency: config.pipeline.max_concurrency,
            temp_root: config.pipeline.resolved_temp_root(),
            aspect_ratio: config.pipeline.resolved_aspect_ratio(),
            synthesis_timeout: Duration::from_secs(config.synthesis.safety_timeout_secs),
        }
    }
}

/// What to produce.
#[derive(Debug, Clone, PartialEq)]
pub struct RunRequest {
    /// Narration text.
    pub script: String,
    pub language: String,
    pub voice: Voice,
    /// Visual description sent with every clip.
    pub prompt: String,
    pub image_url: Option<String>,
}

impl RunRequest {
    pub fn new(script: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            script: script.into(),
            language: defaults::LANGUAGE.to_string(),
            voice: Voice::default(),
            prompt: prompt.into(),
            image_url: None,
        }
    }

    /// Request using the configured narration language and voice.
    pub fn from_config(config: &Config, script: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self::new(script, prompt)
            .with_language(config.synthesis.language.clone())
            .with_voice(Voice::parse(&config.synthesis.voice))
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn with_voice(mut self, voice: Voice) -> Self {
        self.voice = voice;
        self
    }

    pub fn with_image_url(mut self, url: impl Into<String>) -> Self {
        self.image_url = Some(url.into());
        self
    }
}

/// Outcome of a successful run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub artifact: FinalArtifact,
    /// Split points actually used, in seconds.
    pub boundaries: Vec<f64>,
    pub segment_count: usize,
    /// States visited, from `Start` to `Done`.
    pub states: Vec<RunState>,
}

/// Work products carried between stages.
struct Produced {
    artifact: FinalArtifact,
    plan: SplitPlan,
    segment_count: usize,
}

/// Sequences one run across the external collaborators.
pub struct PipelineOrchestrator {
    settings: PipelineSettings,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    slicer: Arc<dyn AudioSlicer>,
    generator: Arc<dyn VideoGenerator>,
    fetcher: Arc<dyn MediaFetcher>,
    concatenator: Arc<dyn MediaConcatenator>,
}

impl PipelineOrchestrator {
    pub fn new(
        settings: PipelineSettings,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        slicer: Arc<dyn AudioSlicer>,
        generator: Arc<dyn VideoGenerator>,
        fetcher: Arc<dyn MediaFetcher>,
        concatenator: Arc<dyn MediaConcatenator>,
    ) -> Self {
        Self {
            settings,
            synthesizer,
            slicer,
            generator,
            fetcher,
            concatenator,
        }
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Execute one run.
    ///
    /// # Errors
    ///
    /// `ReelError::StageFailed` naming the stage that failed. Input problems
    /// are reported before any collaborator is called or any file is created.
    /// The run's scratch directory is gone by the time this returns, whatever
    /// the outcome.
    pub async fn run(&self, request: &RunRequest) -> Result<RunReport> {
        let started = Instant::now();
        let mut tracker = RunTracker::new();

        if let Err(e) = self.validate(request) {
            tracker.fail();
            return Err(e.at_stage(RunState::Start));
        }

        let mut scratch: Option<RunScratch> = None;
        let outcome = self.execute(request, &mut tracker, &mut scratch).await;

        if let Some(scratch) = scratch {
            scratch.close();
        }

        match outcome {
            Ok(produced) => {
                tracing::info!(
                    segments = produced.segment_count,
                    boundaries = ?produced.plan.boundaries(),
                    artifact = %produced.artifact.describe(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "run complete"
                );
                Ok(RunReport {
                    artifact: produced.artifact,
                    boundaries: produced.plan.boundaries().to_vec(),
                    segment_count: produced.segment_count,
                    states: tracker.states(),
                })
            }
            Err(e) => {
                let stage = tracker.current();
                tracker.fail();
                let error = e.at_stage(stage);
                tracing::error!(stage = %stage, error = %error, "run failed");
                Err(error)
            }
        }
    }

    fn validate(&self, request: &RunRequest) -> Result<()> {
        if request.script.trim().is_empty() {
            return Err(ReelError::input("script is empty"));
        }
        let target = self.settings.target_duration;
        if !target.is_finite() || target <= 0.0 {
            return Err(ReelError::input(format!(
                "target duration must be a positive number of seconds, got {target}"
            )));
        }
        if self.settings.max_concurrency == 0 {
            return Err(ReelError::input("max concurrency must be at least 1"));
        }
        Ok(())
    }

    async fn execute(
        &self,
        request: &RunRequest,
        tracker: &mut RunTracker,
        scratch_slot: &mut Option<RunScratch>,
    ) -> Result<Produced> {
        tracker.advance(RunState::Synthesizing);
        let (container, timestamps) = self.synthesize(request).await?;

        tracker.advance(RunState::Segmenting);
        let total = wav::duration(&container)?;
        let plan = timing::plan(&timestamps, self.settings.target_duration)?.normalized(total);
        tracing::info!(
            words = timestamps.len(),
            total_secs = total,
            boundaries = ?plan.boundaries(),
            "split plan ready"
        );

        tracker.advance(RunState::Slicing);
        let scratch = scratch_slot.insert(RunScratch::create_in(&self.settings.temp_root)?);
        let segments = self.slicer.slice(&container, &plan, scratch.path()).await?;
        if segments.len() != plan.segment_count() {
            return Err(ReelError::process(format!(
                "slicer {} returned {} segments, expected {}",
                self.slicer.name(),
                segments.len(),
                plan.segment_count()
            )));
        }

        tracker.advance(RunState::GeneratingVideo);
        let urls = self.generate_clips(request, &segments).await?;

        if let [url] = urls.as_slice() {
            tracker.advance(RunState::Done);
            return Ok(Produced {
                artifact: FinalArtifact::remote(url.clone()),
                plan,
                segment_count: 1,
            });
        }

        tracker.advance(RunState::Downloading);
        let clips = stitch::download_all(
            self.fetcher.as_ref(),
            &urls,
            scratch,
            self.settings.max_concurrency,
        )
        .await?;

        tracker.advance(RunState::Concatenating);
        let output = scratch.file("final.mp4");
        let joined = self.concatenator.concatenate(&clips, &output).await?;
        let bytes = tokio::fs::read(&joined).await?;

        tracker.advance(RunState::Done);
        Ok(Produced {
            artifact: FinalArtifact::video(bytes),
            plan,
            segment_count: segments.len(),
        })
    }

    /// Synthesize narration and wrap it in a WAV container.
    async fn synthesize(
        &self,
        request: &RunRequest,
    ) -> Result<(Vec<u8>, Vec<timing::WordTimestamp>)> {
        let speech_request = SpeechRequest::new(request.script.clone())
            .with_language(request.language.clone())
            .with_voice(request.voice.clone());

        let rx = self.synthesizer.synthesize(&speech_request).await?;
        let result = speech::collect(rx, self.settings.synthesis_timeout).await;
        if result.samples.is_empty() {
            return Err(ReelError::input("speech synthesis produced no audio"));
        }

        let format = self.synthesizer.format();
        // A stream cut off by the safety window can end mid-frame.
        let whole = result.samples.len() - result.samples.len() % format.block_align();
        if whole == 0 {
            return Err(ReelError::input("speech synthesis produced no audio"));
        }
        let container = wav::encode(&result.samples[..whole], format)?;

        tracing::debug!(
            bytes = whole,
            words = result.timestamps.len(),
            completed = result.completed,
            "narration synthesized"
        );
        Ok((container, result.timestamps))
    }

    /// One clip per segment, returned in segment order.
    async fn generate_clips(
        &self,
        request: &RunRequest,
        segments: &[AudioSegment],
    ) -> Result<Vec<String>> {
        let generator = &self.generator;
        let requests = segments.iter().map(|segment| VideoRequest {
            segment_index: segment.index,
            prompt: request.prompt.clone(),
            duration_seconds: VideoRequest::duration_for(segment.duration()),
            aspect_ratio: self.settings.aspect_ratio.clone(),
            audio: Some(segment.samples.clone()),
            image_url: request.image_url.clone(),
        });

        let mut generated: Vec<(usize, String)> = stream::iter(requests)
            .map(|video_request| async move {
                let url = generator.generate(&video_request).await?;
                tracing::debug!(segment = video_request.segment_index, url = %url, "clip generated");
                Ok::<_, ReelError>((video_request.segment_index, url))
            })
            .buffer_unordered(self.settings.max_concurrency)
            .try_collect()
            .await?;

        if generated.len() != segments.len() {
            return Err(ReelError::network(format!(
                "generated {} clips for {} segments",
                generated.len(),
                segments.len()
            )));
        }
        generated.sort_by_key(|(index, _)| *index);
        Ok(generated.into_iter().map(|(_, url)| url).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{PcmFormat, WavSlicer};
    use crate::collab::{MockSynthesizer, MockVideoGenerator};
    use crate::media::command::{CommandOutput, MockCommandExecutor};
    use crate::media::{FfmpegConcatenator, MockFetcher};
    use crate::timing::WordTimestamp;

    const RATE: u32 = 1000;

    fn format() -> PcmFormat {
        PcmFormat::new(RATE, 1, 16).unwrap()
    }

    /// `secs` of 16-bit mono silence at 1 kHz.
    fn pcm(secs: f64) -> Vec<u8> {
        vec![0u8; (secs * f64::from(RATE)) as usize * 2]
    }

    fn words(entries: &[(&str, f64, f64)]) -> Vec<WordTimestamp> {
        entries.iter()
            .map(|(w, s, e)| WordTimestamp::new(*w, *s, *e))
            .collect()
    }

    struct Harness {
        root: tempfile::TempDir,
        synthesizer: MockSynthesizer,
        generator: MockVideoGenerator,
        fetcher: MockFetcher,
        executor: MockCommandExecutor,
    }

    impl Harness {
        fn new(synthesizer: MockSynthesizer) -> Self {
            // Concatenation writes the list contents as the joined output.
            let executor = MockCommandExecutor::with_handler(|_, args| {
                let list = &args[args.iter().position(|a| a == "-i").unwrap() + 1];
                let output = args.last().unwrap();
                std::fs::copy(list, output).unwrap();
                Ok(CommandOutput::default())
            });
            Self {
                root: tempfile::tempdir().unwrap(),
                synthesizer,
                generator: MockVideoGenerator::new("https://cdn.test"),
                fetcher: MockFetcher::new(),
                executor,
            }
        }

        fn orchestrator(&self, target: f64) -> PipelineOrchestrator {
            let settings = PipelineSettings {
                target_duration: target,
                temp_root: self.root.path().to_path_buf(),
                synthesis_timeout: Duration::from_millis(500),
                ..PipelineSettings::default()
            };
            PipelineOrchestrator::new(
                settings,
                Arc::new(self.synthesizer.clone()),
                Arc::new(WavSlicer::new()),
                Arc::new(self.generator.clone()),
                Arc::new(self.fetcher.clone()),
                Arc::new(FfmpegConcatenator::new(self.executor.clone())),
            )
        }

        fn temp_root_is_empty(&self) -> bool {
            std::fs::read_dir(self.root.path()).unwrap().count() == 0
        }
    }

    #[tokio::test]
    async fn empty_script_fails_before_any_call() {
        let harness = Harness::new(MockSynthesizer::new(format()).with_samples(pcm(1.0)));
        let result = harness
            .orchestrator(10.0)
            .run(&RunRequest::new("   ", "presenter"))
            .await;

        let err = result.unwrap_err();
        assert_eq!(err.stage(), Some(RunState::Start));
        assert_eq!(err.kind(), crate::error::ErrorKind::Input);
        assert!(harness.synthesizer.requests().is_empty());
        assert!(harness.temp_root_is_empty());
    }

    #[tokio::test]
    async fn silent_synthesis_is_an_input_error() {
        let harness = Harness::new(MockSynthesizer::new(format()));
        let err = harness
            .orchestrator(10.0)
            .run(&RunRequest::new("hello", "presenter"))
            .await
            .unwrap_err();
        assert_eq!(err.stage(), Some(RunState::Synthesizing));
        assert_eq!(err.kind(), crate::error::ErrorKind::Input);
        assert_eq!(harness.generator.call_count(), 0);
        assert!(harness.temp_root_is_empty());
    }

    #[tokio::test]
    async fn short_narration_yields_remote_url() {
        let synth = MockSynthesizer::new(format())
            .with_samples(pcm(3.0))
            .with_timestamps(words(&[("Hi", 0.0, 1.0), ("there.", 1.2, 3.0)]));
        let harness = Harness::new(synth);

        let report = harness
            .orchestrator(10.0)
            .run(&RunRequest::new("Hi there.", "presenter"))
            .await
            .unwrap();

        assert_eq!(report.segment_count, 1);
        assert!(report.boundaries.is_empty());
        assert_eq!(
            report.artifact,
            FinalArtifact::remote("https://cdn.test/segment_0.mp4")
        );
        assert_eq!(*report.states.last().unwrap(), RunState::Done);
        assert!(!report.states.contains(&RunState::Downloading));
        assert_eq!(harness.executor.call_count(), 0);
        assert!(harness.temp_root_is_empty());
    }

    #[tokio::test]
    async fn multi_segment_run_joins_clips_in_index_order() {
        let synth = MockSynthesizer::new(format())
            .with_samples(pcm(6.0))
            .with_timestamps(words(&[
                ("One", 0.0, 1.0),
                ("two.", 1.0, 2.0),
                ("Three", 2.5, 3.5),
                ("four.", 3.5, 4.0),
                ("Five", 4.5, 6.0),
            ]));
        let harness = Harness::new(synth);

        let report = harness
            .orchestrator(2.0)
            .run(&RunRequest::new("One two. Three four. Five", "presenter"))
            .await
            .unwrap();

        assert_eq!(report.boundaries, vec![2.0, 4.0]);
        assert_eq!(report.segment_count, 3);

        let FinalArtifact::Video { bytes } = &report.artifact else {
            panic!("expected joined video, got {:?}", report.artifact);
        };
        let list = String::from_utf8(bytes.clone()).unwrap();
        let order: Vec<&str> = list
            .lines()
            .map(|l| l.rsplit('/').next().unwrap().trim_end_matches('\''))
            .collect();
        assert_eq!(order, vec!["clip_000.mp4", "clip_001.mp4", "clip_002.mp4"]);

        let durations: Vec<u32> = {
            let mut requests = harness.generator.requests();
            requests.sort_by_key(|r| r.segment_index);
            requests.iter().map(|r| r.duration_seconds).collect()
        };
        assert_eq!(durations, vec![2, 2, 2]);
        assert!(harness.temp_root_is_empty());
    }

    #[tokio::test]
    async fn generation_failure_names_stage_and_cleans_up() {
        let synth = MockSynthesizer::new(format())
            .with_samples(pcm(6.0))
            .with_timestamps(words(&[
                ("One", 0.0, 1.0),
                ("two.", 1.0, 2.0),
                ("Three", 2.5, 6.0),
            ]));
        let mut harness = Harness::new(synth);
        harness.generator = MockVideoGenerator::new("https://cdn.test").with_failure_at(1);

        let err = harness
            .orchestrator(2.0)
            .run(&RunRequest::new("One two. Three", "presenter"))
            .await
            .unwrap_err();

        assert_eq!(err.stage(), Some(RunState::GeneratingVideo));
        assert_eq!(err.kind(), crate::error::ErrorKind::Network);
        assert!(harness.temp_root_is_empty());
    }

    #[test]
    fn settings_from_config() {
        let mut config = Config::default();
        config.pipeline.target_duration_secs = 8.0;
        config.pipeline.max_concurrency = 2;
        let settings = PipelineSettings::from(&config);
        assert_eq!(settings.target_duration, 8.0);
        assert_eq!(settings.max_concurrency, 2);
        assert_eq!(
            settings.synthesis_timeout,
            Duration::from_secs(defaults::SYNTHESIS_SAFETY_TIMEOUT_SECS)
        );
        assert_eq!(settings.aspect_ratio, "9:16");

        config.pipeline.resolution = Some("1080p".to_string());
        assert_eq!(PipelineSettings::from(&config).aspect_ratio, "16:9");
    }

    #[test]
    fn request_from_config_uses_configured_language_and_voice() {
        let mut config = Config::default();
        config.synthesis.language = "hinglish".to_string();
        config.synthesis.voice = "male".to_string();

        let request = RunRequest::from_config(&config, "Namaste.", "presenter");
        assert_eq!(request.language, "hinglish");
        assert_eq!(request.voice, Voice::Male);
        assert_eq!(request.script, "Namaste.");

        config.synthesis.voice = "cloned-42".to_string();
        let request = RunRequest::from_config(&config, "Hi.", "presenter");
        assert_eq!(request.voice, Voice::Custom("cloned-42".to_string()));
    }
}
