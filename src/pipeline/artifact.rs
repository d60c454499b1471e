//! Transport encodings for run results.

use crate::audio::AudioSegment;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// The deliverable of a finished run.
///
/// Serializes as `{"video_url": ...}` or `{"video_base64": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FinalArtifact {
    /// The single generated clip, left where the generator put it.
    RemoteUrl {
        #[serde(rename = "video_url")]
        url: String,
    },
    /// Joined video bytes.
    Video {
        #[serde(rename = "video_base64", with = "base64_bytes")]
        bytes: Vec<u8>,
    },
}

impl FinalArtifact {
    pub fn remote(url: impl Into<String>) -> Self {
        FinalArtifact::RemoteUrl { url: url.into() }
    }

    pub fn video(bytes: Vec<u8>) -> Self {
        FinalArtifact::Video { bytes }
    }

    /// Short human description for logs.
    pub fn describe(&self) -> String {
        match self {
            FinalArtifact::RemoteUrl { url } => format!("remote clip {url}"),
            FinalArtifact::Video { bytes } => format!("{} bytes of video", bytes.len()),
        }
    }
}

/// Result of slicing narration, as returned to callers over JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitResponse {
    /// Base64 WAV container per segment, in order.
    #[serde(with = "base64_list")]
    pub segments: Vec<Vec<u8>>,
    pub split_points: Vec<f64>,
}

impl SplitResponse {
    pub fn new(segments: &[AudioSegment], split_points: &[f64]) -> Self {
        Self {
            segments: segments.iter().map(|s| s.samples.clone()).collect(),
            split_points: split_points.to_vec(),
        }
    }
}

mod base64_bytes {
    use super::*;

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(deserializer)?;
        STANDARD.decode(text).map_err(serde::de::Error::custom)
    }
}

mod base64_list {
    use super::*;

    pub fn serialize<S: Serializer>(items: &[Vec<u8>], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(items.iter().map(|b| STANDARD.encode(b)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<Vec<u8>>, D::Error> {
        let texts = Vec::<String>::deserialize(deserializer)?;
        texts
            .into_iter()
            .map(|t| STANDARD.decode(t).map_err(serde::de::Error::custom))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn remote_url_shape() {
        let artifact = FinalArtifact::remote("https://cdn/x.mp4");
        assert_eq!(
            serde_json::to_value(&artifact).unwrap(),
            json!({"video_url": "https://cdn/x.mp4"})
        );
    }

    #[test]
    fn video_shape_is_base64() {
        let artifact = FinalArtifact::video(b"hello".to_vec());
        assert_eq!(
            serde_json::to_value(&artifact).unwrap(),
            json!({"video_base64": "aGVsbG8="})
        );
    }

    #[test]
    fn parses_both_shapes() {
        let remote: FinalArtifact =
            serde_json::from_str(r#"{"video_url":"https://cdn/y.mp4"}"#).unwrap();
        assert_eq!(remote, FinalArtifact::remote("https://cdn/y.mp4"));

        let video: FinalArtifact = serde_json::from_str(r#"{"video_base64":"aGk="}"#).unwrap();
        assert_eq!(video, FinalArtifact::video(b"hi".to_vec()));
    }

    #[test]
    fn split_response_shape() {
        let segments = vec![
            AudioSegment {
                index: 0,
                start_time: 0.0,
                end_time: 1.5,
                samples: b"ab".to_vec(),
            },
            AudioSegment {
                index: 1,
                start_time: 1.5,
                end_time: 3.0,
                samples: b"cd".to_vec(),
            },
        ];
        let response = SplitResponse::new(&segments, &[1.5]);
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({"segments": ["YWI=", "Y2Q="], "split_points": [1.5]})
        );
    }

    #[test]
    fn describe() {
        assert_eq!(FinalArtifact::video(vec![0; 3]).describe(), "3 bytes of video");
    }
}
