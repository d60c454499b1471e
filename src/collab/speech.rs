//! Speech synthesis collaborator.
//!
//! The synthesizer streams raw PCM chunks and word timestamps over a channel.
//! [`collect`] drains that channel with a bounded wait: it stops at `Done`, at
//! channel close, or when the safety window elapses, and keeps whatever
//! arrived.

use crate::audio::PcmFormat;
use crate::defaults;
use crate::error::{ReelError, Result};
use crate::timing::WordTimestamp;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

/// Audio layout the synthesizer emits.
pub type SpeechFormat = PcmFormat;

/// Narrator voice.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Voice {
    #[default]
    Female,
    Male,
    /// Explicit vendor voice id, e.g. a cloned voice.
    Custom(String),
}

impl Voice {
    /// Vendor voice id for this voice.
    pub fn id(&self) -> &str {
        match self {
            Voice::Female => defaults::FEMALE_VOICE_ID,
            Voice::Male => defaults::MALE_VOICE_ID,
            Voice::Custom(id) => id,
        }
    }

    /// Parse `female`, `male`, or treat anything else as a voice id.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "female" | "" => Voice::Female,
            "male" => Voice::Male,
            _ => Voice::Custom(value.trim().to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpeechRequest {
    pub text: String,
    pub language: String,
    pub voice: Voice,
}

impl SpeechRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            language: defaults::LANGUAGE.to_string(),
            voice: Voice::default(),
        }
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn with_voice(mut self, voice: Voice) -> Self {
        self.voice = voice;
        self
    }

    /// Language code sent to the vendor. Hinglish is synthesized as Hindi.
    pub fn vendor_language(&self) -> &str {
        if self.language.eq_ignore_ascii_case("hinglish") {
            "hi"
        } else {
            &self.language
        }
    }
}

/// One item of the synthesis stream.
#[derive(Debug, Clone, PartialEq)]
pub enum SynthesisEvent {
    /// Raw headerless PCM in the synthesizer's [`SpeechFormat`].
    Audio(Vec<u8>),
    Timestamps(Vec<WordTimestamp>),
    Done,
}

/// Trait for text-to-speech synthesis with word timing.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Start synthesis and return the event stream.
    ///
    /// # Errors
    ///
    /// `ReelError::Network` when the request cannot be started.
    async fn synthesize(&self, request: &SpeechRequest) -> Result<mpsc::Receiver<SynthesisEvent>>;

    /// Layout of the PCM in `SynthesisEvent::Audio`.
    fn format(&self) -> SpeechFormat;
}

#[async_trait]
impl<T: SpeechSynthesizer + ?Sized> SpeechSynthesizer for Arc<T> {
    async fn synthesize(&self, request: &SpeechRequest) -> Result<mpsc::Receiver<SynthesisEvent>> {
        (**self).synthesize(request).await
    }

    fn format(&self) -> SpeechFormat {
        (**self).format()
    }
}

/// Everything buffered from one synthesis stream.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SynthesisResult {
    pub samples: Vec<u8>,
    pub timestamps: Vec<WordTimestamp>,
    /// Whether the stream ended with `Done` rather than the safety window.
    pub completed: bool,
}

/// Drain `rx` until `Done`, channel close, or `timeout`.
///
/// Audio chunks are appended in arrival order.
pub async fn collect(mut rx: mpsc::Receiver<SynthesisEvent>, timeout: Duration) -> SynthesisResult {
    let mut result = SynthesisResult::default();
    let deadline = tokio::time::Instant::now() + timeout;

    loop {
        match tokio::time::timeout_at(deadline, rx.recv()).await {
            Ok(Some(SynthesisEvent::Audio(chunk))) => result.samples.extend_from_slice(&chunk),
            Ok(Some(SynthesisEvent::Timestamps(words))) => result.timestamps.extend(words),
            Ok(Some(SynthesisEvent::Done)) => {
                result.completed = true;
                break;
            }
            Ok(None) => break,
            Err(_) => {
                tracing::warn!(
                    timeout_secs = timeout.as_secs_f64(),
                    bytes = result.samples.len(),
                    words = result.timestamps.len(),
                    "synthesis stream did not finish in time, proceeding with buffered audio"
                );
                break;
            }
        }
    }

    result
}

/// Mock synthesizer for testing.
///
/// Emits the configured audio in fixed-size chunks, then the timestamps, then
/// `Done` unless told to stall.
#[derive(Debug, Clone)]
pub struct MockSynthesizer {
    format: SpeechFormat,
    samples: Vec<u8>,
    timestamps: Vec<WordTimestamp>,
    chunk_size: usize,
    send_done: bool,
    should_fail: bool,
    requests: Arc<Mutex<Vec<SpeechRequest>>>,
}

impl MockSynthesizer {
    pub fn new(format: SpeechFormat) -> Self {
        Self {
            format,
            samples: Vec::new(),
            timestamps: Vec::new(),
            chunk_size: 4096,
            send_done: true,
            should_fail: false,
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_samples(mut self, samples: Vec<u8>) -> Self {
        self.samples = samples;
        self
    }

    pub fn with_timestamps(mut self, timestamps: Vec<WordTimestamp>) -> Self {
        self.timestamps = timestamps;
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Keep the stream open after the last event instead of sending `Done`.
    pub fn without_done(mut self) -> Self {
        self.send_done = false;
        self
    }

    pub fn with_failure(mut self) -> Self {
        self.should_fail = true;
        self
    }

    pub fn requests(&self) -> Vec<SpeechRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl SpeechSynthesizer for MockSynthesizer {
    async fn synthesize(&self, request: &SpeechRequest) -> Result<mpsc::Receiver<SynthesisEvent>> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }
        if self.should_fail {
            return Err(ReelError::Network {
                message: "mock synthesis failure".to_string(),
                status: Some(503),
            });
        }

        let (tx, rx) = mpsc::channel(16);
        let samples = self.samples.clone();
        let timestamps = self.timestamps.clone();
        let chunk_size = self.chunk_size;
        let send_done = self.send_done;

        tokio::spawn(async move {
            for chunk in samples.chunks(chunk_size) {
                if tx.send(SynthesisEvent::Audio(chunk.to_vec())).await.is_err() {
                    return;
                }
            }
            if !timestamps.is_empty()
                && tx.send(SynthesisEvent::Timestamps(timestamps)).await.is_err()
            {
                return;
            }
            if send_done {
                if tx.send(SynthesisEvent::Done).await.is_err() {
                    tracing::debug!("synthesis receiver dropped before done");
                }
            } else {
                // Hold the sender so the receiver only stops on its deadline.
                tx.closed().await;
            }
        });

        Ok(rx)
    }

    fn format(&self) -> SpeechFormat {
        self.format
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn float_mono() -> SpeechFormat {
        PcmFormat::new(44100, 1, 32).unwrap()
    }

    #[test]
    fn voice_ids_by_gender() {
        assert_eq!(Voice::Female.id(), defaults::FEMALE_VOICE_ID);
        assert_eq!(Voice::Male.id(), defaults::MALE_VOICE_ID);
        assert_eq!(Voice::Custom("abc".into()).id(), "abc");
    }

    #[test]
    fn voice_parse() {
        assert_eq!(Voice::parse("Male"), Voice::Male);
        assert_eq!(Voice::parse("female"), Voice::Female);
        assert_eq!(Voice::parse("cloned-123"), Voice::Custom("cloned-123".into()));
    }

    #[test]
    fn hinglish_is_sent_as_hindi() {
        let request = SpeechRequest::new("namaste").with_language("hinglish");
        assert_eq!(request.vendor_language(), "hi");
        let request = SpeechRequest::new("hello").with_language("ta");
        assert_eq!(request.vendor_language(), "ta");
    }

    #[tokio::test]
    async fn collect_concatenates_chunks_in_order() {
        let samples: Vec<u8> = (0..=255).collect();
        let words = vec![WordTimestamp::new("hi", 0.0, 0.5)];
        let synth = MockSynthesizer::new(float_mono())
            .with_samples(samples.clone())
            .with_timestamps(words.clone())
            .with_chunk_size(10);

        let rx = synth.synthesize(&SpeechRequest::new("hi")).await.unwrap();
        let result = collect(rx, Duration::from_secs(5)).await;

        assert_eq!(result.samples, samples);
        assert_eq!(result.timestamps, words);
        assert!(result.completed);
    }

    #[tokio::test]
    async fn collect_proceeds_after_safety_window() {
        let synth = MockSynthesizer::new(float_mono())
            .with_samples(vec![0; 64])
            .without_done();

        let rx = synth.synthesize(&SpeechRequest::new("hi")).await.unwrap();
        let result = collect(rx, Duration::from_millis(100)).await;

        assert_eq!(result.samples.len(), 64);
        assert!(!result.completed);
    }

    #[tokio::test]
    async fn collect_stops_when_sender_drops() {
        let (tx, rx) = mpsc::channel(4);
        tx.send(SynthesisEvent::Audio(vec![1, 2])).await.unwrap();
        drop(tx);
        let result = collect(rx, Duration::from_secs(5)).await;
        assert_eq!(result.samples, vec![1, 2]);
        assert!(!result.completed);
    }

    #[tokio::test]
    async fn failing_mock_records_request() {
        let synth = MockSynthesizer::new(float_mono()).with_failure();
        let result = synth.synthesize(&SpeechRequest::new("x")).await;
        assert!(matches!(result, Err(ReelError::Network { status: Some(503), .. })));
        assert_eq!(synth.requests().len(), 1);
    }
}
