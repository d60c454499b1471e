//! Video generation collaborator.

use crate::error::{ReelError, Result};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

/// One clip to generate, lip-synced to its audio segment when present.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoRequest {
    /// Position of the clip in the final video.
    pub segment_index: usize,
    pub prompt: String,
    /// Whole seconds, at least 1.
    pub duration_seconds: u32,
    pub aspect_ratio: String,
    /// WAV container bytes for the segment.
    pub audio: Option<Vec<u8>>,
    /// Reference image the clip starts from.
    pub image_url: Option<String>,
}

impl VideoRequest {
    /// Whole-second clip length covering `segment_secs`, never less than 1.
    pub fn duration_for(segment_secs: f64) -> u32 {
        if !segment_secs.is_finite() || segment_secs <= 1.0 {
            return 1;
        }
        // Saturating float-to-int cast; segment lengths are far below u32::MAX.
        segment_secs.ceil() as u32
    }
}

/// Aspect ratio to request for a resolution label.
///
/// The portrait presets (`720p`, `480p`) are vertical reels; anything else is
/// landscape.
pub fn aspect_ratio_for(resolution: &str) -> &'static str {
    match resolution {
        "720p" | "480p" => "9:16",
        _ => "16:9",
    }
}

/// Trait for remote video generation.
#[async_trait]
pub trait VideoGenerator: Send + Sync {
    /// Generate one clip and return its remote URL.
    ///
    /// # Errors
    ///
    /// `ReelError::Network` carrying the vendor status on failure.
    async fn generate(&self, request: &VideoRequest) -> Result<String>;
}

#[async_trait]
impl<T: VideoGenerator + ?Sized> VideoGenerator for Arc<T> {
    async fn generate(&self, request: &VideoRequest) -> Result<String> {
        (**self).generate(request).await
    }
}

/// Mock generator for testing.
///
/// Returns `{base_url}/segment_{index}.mp4` and records every request.
#[derive(Debug, Clone)]
pub struct MockVideoGenerator {
    base_url: String,
    failing: HashSet<usize>,
    requests: Arc<Mutex<Vec<VideoRequest>>>,
}

impl MockVideoGenerator {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            failing: HashSet::new(),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Fail generation of the clip at `index` with a vendor 500.
    pub fn with_failure_at(mut self, index: usize) -> Self {
        self.failing.insert(index);
        self
    }

    /// URL this mock returns for `index`.
    pub fn url_for(&self, index: usize) -> String {
        format!("{}/segment_{index}.mp4", self.base_url)
    }

    pub fn requests(&self) -> Vec<VideoRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or(0)
    }
}

#[async_trait]
impl VideoGenerator for MockVideoGenerator {
    async fn generate(&self, request: &VideoRequest) -> Result<String> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }
        if self.failing.contains(&request.segment_index) {
            return Err(ReelError::Network {
                message: format!("video generation failed for segment {}", request.segment_index),
                status: Some(500),
            });
        }
        Ok(self.url_for(request.segment_index))
    }
}
