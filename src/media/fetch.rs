//! Remote clip download.
//!
//! Streams an HTTP(S) response body to a local path. A failed download never
//! leaves a truncated file behind: the destination is removed before the error
//! is returned.

use crate::defaults::{CONNECT_TIMEOUT_SECS, REQUEST_TIMEOUT_SECS};
use crate::error::{ReelError, Result};
use async_trait::async_trait;
use futures_util::StreamExt;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::AsyncWriteExt;

/// Downloads a remote file to local storage.
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    /// Fetch `url` into `destination`, overwriting it.
    ///
    /// # Errors
    ///
    /// `ReelError::Network` on connection failure, timeout, or non-2xx status.
    async fn fetch(&self, url: &str, destination: &Path) -> Result<()>;
}

#[async_trait]
impl<T: MediaFetcher + ?Sized> MediaFetcher for Arc<T> {
    async fn fetch(&self, url: &str, destination: &Path) -> Result<()> {
        (**self).fetch(url, destination).await
    }
}

/// reqwest-backed fetcher with explicit connect and request timeouts.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    /// Concurrent downloads draw their bars here together.
    progress: Option<MultiProgress>,
}

impl HttpFetcher {
    /// Build a fetcher.
    ///
    /// `connect_timeout` bounds connection setup; `request_timeout` bounds the
    /// whole transfer including the body.
    pub fn new(connect_timeout: Duration, request_timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(request_timeout)
            .build()?;
        Ok(Self {
            client,
            progress: None,
        })
    }

    /// Show a terminal progress bar per download on stderr.
    pub fn with_progress(self, progress: bool) -> Self {
        if progress {
            self.with_progress_display(MultiProgress::new())
        } else {
            Self {
                progress: None,
                ..self
            }
        }
    }

    /// Draw per-download bars into `display`.
    pub fn with_progress_display(mut self, display: MultiProgress) -> Self {
        self.progress = Some(display);
        self
    }

    async fn download(&self, url: &str, destination: &Path) -> Result<()> {
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ReelError::Network {
                message: format!("download of {url} failed with status: {status}"),
                status: Some(status.as_u16()),
            });
        }

        let total_size = response.content_length().unwrap_or(0);
        let pb = self
            .progress
            .as_ref()
            .map(|display| display.add(progress_bar(total_size)));

        let mut file = tokio::fs::File::create(destination).await?;
        let mut stream = response.bytes_stream();
        let mut written: u64 = 0;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
            if let Some(ref pb) = pb {
                pb.inc(chunk.len() as u64);
            }
        }
        file.flush().await?;

        if let Some(pb) = pb {
            pb.finish_and_clear();
        }

        tracing::debug!(url, path = %destination.display(), bytes = written, "download complete");
        Ok(())
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "falling back to default HTTP client");
                reqwest::Client::new()
            });
        Self {
            client,
            progress: None,
        }
    }
}

#[async_trait]
impl MediaFetcher for HttpFetcher {
    async fn fetch(&self, url: &str, destination: &Path) -> Result<()> {
        check_scheme(url)?;
        let result = self.download(url, destination).await;
        if result.is_err() {
            remove_partial(destination).await;
        }
        result
    }
}

/// Only plain HTTP(S) GETs are supported.
fn check_scheme(url: &str) -> Result<()> {
    let parsed = reqwest::Url::parse(url)
        .map_err(|e| ReelError::input(format!("invalid download URL {url:?}: {e}")))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(ReelError::input(format!(
            "unsupported URL scheme {other:?} in {url}"
        ))),
    }
}

/// Delete a partially written download; a missing file is fine.
pub async fn remove_partial(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => tracing::debug!(path = %path.display(), "removed partial download"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(path = %path.display(), error = %e, "failed to remove partial download"),
    }
}

fn progress_bar(total_size: u64) -> ProgressBar {
    let pb = ProgressBar::new(total_size);
    // SAFETY: hardcoded template string, always valid
    #[allow(clippy::expect_used)]
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")
            .expect("hardcoded progress bar template")
            .progress_chars("#>-"),
    );
    pb
}

/// Mock fetcher for testing.
///
/// Serves canned bodies per URL, can fail chosen URLs, and can delay
/// individual URLs to simulate out-of-order completion.
#[derive(Debug, Clone, Default)]
pub struct MockFetcher {
    bodies: HashMap<String, Vec<u8>>,
    failures: Vec<String>,
    delays: HashMap<String, Duration>,
    fetched: Arc<Mutex<Vec<String>>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` for `url`. Unknown URLs serve the URL text itself.
    pub fn with_body(mut self, url: &str, body: &[u8]) -> Self {
        self.bodies.insert(url.to_string(), body.to_vec());
        self
    }

    /// Fail every fetch of `url` with a network error after writing a partial file.
    pub fn with_failure(mut self, url: &str) -> Self {
        self.failures.push(url.to_string());
        self
    }

    /// Delay completion of `url`.
    pub fn with_delay(mut self, url: &str, delay: Duration) -> Self {
        self.delays.insert(url.to_string(), delay);
        self
    }

    /// URLs whose fetch completed successfully, in completion order.
    pub fn completed(&self) -> Vec<String> {
        self.fetched.lock().map(|f| f.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl MediaFetcher for MockFetcher {
    async fn fetch(&self, url: &str, destination: &Path) -> Result<()> {
        if let Some(delay) = self.delays.get(url) {
            tokio::time::sleep(*delay).await;
        }

        if self.failures.iter().any(|u| u == url) {
            // Leave a truncated file like a dropped connection would, then clean up.
            tokio::fs::write(destination, b"partial").await?;
            remove_partial(destination).await;
            return Err(ReelError::network(format!("connection reset while fetching {url}")));
        }

        let body = self
            .bodies
            .get(url)
            .cloned()
            .unwrap_or_else(|| url.as_bytes().to_vec());
        tokio::fs::write(destination, body).await?;

        if let Ok(mut fetched) = self.fetched.lock() {
            fetched.push(url.to_string());
        }
        Ok(())
    }
}
