//! Default configuration constants for reelsplice.
//!
//! Shared by the config layer, the CLI, and the pipeline so the same numbers
//! are used everywhere.

/// Default segment length in seconds.
///
/// Matches the longest single clip the video generator produces.
pub const TARGET_DURATION_SECS: f64 = 10.0;

/// Gap between two words, in seconds, that marks a natural pause.
pub const PAUSE_THRESHOLD_SECS: f64 = 0.3;

/// Tolerance band for preferring a sentence-end word over a closer one.
pub const SENTENCE_END_TOLERANCE: f64 = 1.5;

/// Most cut targets a single plan may contain.
pub const MAX_SPLIT_TARGETS: usize = 10_000;

/// Sample rate of the synthesized narration, in Hz.
pub const SAMPLE_RATE: u32 = 44100;

/// Channel count of the synthesized narration.
pub const CHANNELS: u16 = 1;

/// Bit depth of the synthesized narration (32-bit IEEE float).
pub const BIT_DEPTH: u16 = 32;

/// How long to wait for the synthesis stream before proceeding with what arrived.
pub const SYNTHESIS_SAFETY_TIMEOUT_SECS: u64 = 15;

/// TCP connect timeout for every outbound HTTP request.
pub const CONNECT_TIMEOUT_SECS: u64 = 60;

/// Whole-request timeout for segment downloads.
pub const REQUEST_TIMEOUT_SECS: u64 = 300;

/// Upper bound for a single slicing or concatenation process.
pub const PROCESS_TIMEOUT_SECS: u64 = 120;

/// Parallel video-generation requests and downloads per run.
pub const MAX_CONCURRENCY: usize = 4;

/// Default aspect ratio requested from the video generator.
pub const ASPECT_RATIO: &str = "9:16";

/// Default narration language.
pub const LANGUAGE: &str = "en";

/// Voice used when the caller asks for a female narrator.
pub const FEMALE_VOICE_ID: &str = "3b554273-4299-48b9-9aaf-eefd438e3941";

/// Voice used when the caller asks for a male narrator.
pub const MALE_VOICE_ID: &str = "6303e5fb-a0a7-48f9-bb1a-dd42c216dc5d";

/// Media toolkit binary used for slicing and concatenation.
pub const FFMPEG: &str = "ffmpeg";

/// Header carrying the relay's forwarding target.
pub const RELAY_TARGET_HEADER: &str = "x-fal-target-url";

/// Prefix of caller headers the relay forwards upstream.
pub const RELAY_HEADER_PREFIX: &str = "x-fal-";

/// Hosts the relay may forward to.
pub const RELAY_ALLOWED_HOST_PATTERN: &str = r"(\.|^)fal\.(run|ai)$";

/// Relay upstream request timeout.
pub const RELAY_TIMEOUT_SECS: u64 = 60;

/// Relay listen address.
pub const RELAY_LISTEN: &str = "127.0.0.1:3001";

/// Environment variable holding the video vendor API key.
pub const VIDEO_API_KEY_ENV: &str = "FAL_KEY";
