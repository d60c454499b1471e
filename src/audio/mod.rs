//! Narration audio: container wrapping and time-range slicing.

pub mod slicer;
pub mod wav;

pub use slicer::{AudioSlicer, FfmpegSlicer, WavSlicer};
pub use wav::{DecodedWav, PcmFormat};

/// One time-bounded slice of the narration, as a standalone WAV file.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioSegment {
    /// Position of this segment in the narration, starting at 0.
    pub index: usize,
    pub start_time: f64,
    pub end_time: f64,
    /// Complete WAV container bytes.
    pub samples: Vec<u8>,
}

impl AudioSegment {
    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }
}
