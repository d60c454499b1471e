//! External collaborators consumed by the pipeline: speech synthesis and
//! video generation. Vendor clients live outside this crate; mocks are provided
//! for tests and dry runs.

pub mod speech;
pub mod video;

pub use speech::{
    MockSynthesizer, SpeechFormat, SpeechRequest, SpeechSynthesizer, SynthesisEvent,
    SynthesisResult, Voice,
};
pub use video::{MockVideoGenerator, VideoGenerator, VideoRequest, aspect_ratio_for};
