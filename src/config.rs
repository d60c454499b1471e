use crate::audio::PcmFormat;
use crate::collab::aspect_ratio_for;
use crate::defaults;
use crate::error::{ReelError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub pipeline: PipelineConfig,
    pub synthesis: SynthesisConfig,
    pub network: NetworkConfig,
    pub relay: RelayConfig,
}

/// Segmentation and run-level configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    pub target_duration_secs: f64,
    pub max_concurrency: usize,
    /// Parent of per-run scratch directories. System temp dir when unset.
    pub temp_root: Option<PathBuf>,
    pub slicer: SlicerKind,
    pub aspect_ratio: String,
    /// Output preset such as `720p`. Overrides `aspect_ratio` when set.
    pub resolution: Option<String>,
}

/// Which audio slicer implementation to use
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SlicerKind {
    /// Stream-copy with the ffmpeg binary
    #[default]
    Ffmpeg,
    /// In-process WAV cutting
    Native,
}

/// Speech synthesis output configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SynthesisConfig {
    pub language: String,
    /// `female`, `male`, or an explicit voice id
    pub voice: String,
    pub sample_rate: u32,
    pub channels: u16,
    pub bit_depth: u16,
    pub safety_timeout_secs: u64,
}

/// Outbound network and process timeouts
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NetworkConfig {
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub process_timeout_secs: u64,
}

/// Authenticated relay configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RelayConfig {
    pub listen: String,
    pub target_header: String,
    pub allowed_host_pattern: String,
    pub timeout_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            target_duration_secs: defaults::TARGET_DURATION_SECS,
            max_concurrency: defaults::MAX_CONCURRENCY,
            temp_root: None,
            slicer: SlicerKind::default(),
            aspect_ratio: defaults::ASPECT_RATIO.to_string(),
            resolution: None,
        }
    }
}

impl PipelineConfig {
    pub fn resolved_temp_root(&self) -> PathBuf {
        self.temp_root.clone().unwrap_or_else(std::env::temp_dir)
    }

    /// Aspect ratio implied by `resolution`, else the explicit `aspect_ratio`.
    pub fn resolved_aspect_ratio(&self) -> String {
        match self.resolution.as_deref() {
            Some(resolution) => aspect_ratio_for(resolution).to_string(),
            None => self.aspect_ratio.clone(),
        }
    }
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            language: defaults::LANGUAGE.to_string(),
            voice: "female".to_string(),
            sample_rate: defaults::SAMPLE_RATE,
            channels: defaults::CHANNELS,
            bit_depth: defaults::BIT_DEPTH,
            safety_timeout_secs: defaults::SYNTHESIS_SAFETY_TIMEOUT_SECS,
        }
    }
}

impl SynthesisConfig {
    pub fn format(&self) -> Result<PcmFormat> {
        PcmFormat::new(self.sample_rate, self.channels, self.bit_depth)
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: defaults::CONNECT_TIMEOUT_SECS,
            request_timeout_secs: defaults::REQUEST_TIMEOUT_SECS,
            process_timeout_secs: defaults::PROCESS_TIMEOUT_SECS,
        }
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            listen: defaults::RELAY_LISTEN.to_string(),
            target_header: defaults::RELAY_TARGET_HEADER.to_string(),
            allowed_host_pattern: defaults::RELAY_ALLOWED_HOST_PATTERN.to_string(),
            timeout_secs: defaults::RELAY_TIMEOUT_SECS,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Returns an error if the file contains invalid TOML.
    /// Missing fields will use default values.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from a file or return defaults if file doesn't exist
    ///
    /// Only a missing file falls back to defaults; invalid TOML is an error.
    pub fn load_or_default(path: &Path) -> anyhow::Result<Self> {
        match Self::load(path) {
            Ok(config) => Ok(config),
            Err(e)
                if e.downcast_ref::<std::io::Error>()
                    .is_some_and(|io_err| io_err.kind() == std::io::ErrorKind::NotFound) =>
            {
                tracing::debug!(path = %path.display(), "no config file, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(e.context(format!("Failed to load config from {}", path.display()))),
        }
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - REELSPLICE_TARGET_DURATION → pipeline.target_duration_secs
    /// - REELSPLICE_TEMP_ROOT → pipeline.temp_root
    ///
    /// Unparseable values are ignored with a warning.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(target) = std::env::var("REELSPLICE_TARGET_DURATION")
            && !target.is_empty()
        {
            match target.parse::<f64>() {
                Ok(secs) => self.pipeline.target_duration_secs = secs,
                Err(e) => tracing::warn!(value = %target, error = %e, "ignoring REELSPLICE_TARGET_DURATION"),
            }
        }

        if let Ok(root) = std::env::var("REELSPLICE_TEMP_ROOT")
            && !root.is_empty()
        {
            self.pipeline.temp_root = Some(PathBuf::from(root));
        }

        self
    }

    /// Check values that parse fine but cannot work.
    pub fn validate(&self) -> Result<()> {
        let target = self.pipeline.target_duration_secs;
        if !target.is_finite() || target <= 0.0 {
            return Err(invalid(
                "pipeline.target_duration_secs",
                format!("must be a positive number, got {target}"),
            ));
        }
        if self.pipeline.max_concurrency == 0 {
            return Err(invalid("pipeline.max_concurrency", "must be at least 1"));
        }
        if let Err(e) = self.synthesis.format() {
            return Err(invalid("synthesis", e.to_string()));
        }
        for (key, value) in [
            ("synthesis.safety_timeout_secs", self.synthesis.safety_timeout_secs),
            ("network.connect_timeout_secs", self.network.connect_timeout_secs),
            ("network.request_timeout_secs", self.network.request_timeout_secs),
            ("network.process_timeout_secs", self.network.process_timeout_secs),
            ("relay.timeout_secs", self.relay.timeout_secs),
        ] {
            if value == 0 {
                return Err(invalid(key, "must be greater than zero"));
            }
        }
        if let Err(e) = regex::Regex::new(&self.relay.allowed_host_pattern) {
            return Err(invalid("relay.allowed_host_pattern", e.to_string()));
        }
        Ok(())
    }

    /// Get the default configuration file path
    ///
    /// Returns ~/.config/reelsplice/config.toml on Linux
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("reelsplice")
            .join("config.toml")
    }
}

fn invalid(key: &str, message: impl Into<String>) -> ReelError {
    ReelError::ConfigInvalidValue {
        key: key.to_string(),
        message: message.into(),
    }
}

/// Vendor API keys, read once at startup.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    video_api_key: Option<String>,
}

impl Credentials {
    pub fn new(video_api_key: Option<String>) -> Self {
        Self {
            video_api_key: video_api_key.filter(|k| !k.is_empty()),
        }
    }

    /// Read `FAL_KEY`.
    pub fn from_env() -> Self {
        Self::new(std::env::var(defaults::VIDEO_API_KEY_ENV).ok())
    }

    pub fn video_api_key(&self) -> Result<&str> {
        self.video_api_key
            .as_deref()
            .ok_or_else(|| ReelError::MissingCredential {
                name: defaults::VIDEO_API_KEY_ENV.to_string(),
            })
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = if self.video_api_key.is_some() { "<set>" } else { "<unset>" };
        f.debug_struct("Credentials")
            .field("video_api_key", &redact)
            .finish()
    }
}
