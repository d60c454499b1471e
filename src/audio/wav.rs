//! WAV container wrapping and unwrapping.
//!
//! Synthesized narration arrives as headerless PCM. Wrapping it in a RIFF/WAVE
//! container gives every downstream tool a seekable file whose duration is
//! known from the header alone. Payload bytes are carried through sample-exact
//! in both directions.

use crate::error::{ReelError, Result};
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use std::io::Cursor;

/// Layout of raw interleaved little-endian PCM.
///
/// 16- and 24-bit depths are signed integers; 32-bit is IEEE float.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PcmFormat {
    pub sample_rate: u32,
    pub channels: u16,
    pub bit_depth: u16,
}

impl PcmFormat {
    /// Validate and build a format description.
    pub fn new(sample_rate: u32, channels: u16, bit_depth: u16) -> Result<Self> {
        if sample_rate == 0 {
            return Err(ReelError::input("sample rate must be greater than zero"));
        }
        if channels == 0 {
            return Err(ReelError::input("channel count must be at least 1"));
        }
        if !matches!(bit_depth, 16 | 24 | 32) {
            return Err(ReelError::input(format!(
                "bit depth must be 16, 24 or 32, got {bit_depth}"
            )));
        }
        Ok(Self {
            sample_rate,
            channels,
            bit_depth,
        })
    }

    /// Bytes per single-channel sample.
    pub fn bytes_per_sample(&self) -> usize {
        usize::from(self.bit_depth / 8)
    }

    /// Bytes per frame (one sample for every channel).
    pub fn block_align(&self) -> usize {
        self.bytes_per_sample() * usize::from(self.channels)
    }

    /// Duration in seconds of a payload of `len` bytes.
    pub fn duration_of(&self, len: usize) -> f64 {
        let frames = len / self.block_align();
        frames as f64 / f64::from(self.sample_rate)
    }

    fn spec(&self) -> WavSpec {
        WavSpec {
            channels: self.channels,
            sample_rate: self.sample_rate,
            bits_per_sample: self.bit_depth,
            sample_format: if self.bit_depth == 32 {
                SampleFormat::Float
            } else {
                SampleFormat::Int
            },
        }
    }

    fn from_spec(spec: WavSpec) -> Result<Self> {
        let format = Self::new(spec.sample_rate, spec.channels, spec.bits_per_sample)?;
        let float = spec.sample_format == SampleFormat::Float;
        if float != (format.bit_depth == 32) {
            return Err(ReelError::input(format!(
                "unsupported WAV sample layout: {}-bit {}",
                spec.bits_per_sample,
                if float { "float" } else { "integer" }
            )));
        }
        Ok(format)
    }
}

/// Headerless PCM plus the format it was decoded with.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedWav {
    pub format: PcmFormat,
    pub payload: Vec<u8>,
}

impl DecodedWav {
    pub fn frames(&self) -> usize {
        self.payload.len() / self.format.block_align()
    }

    pub fn duration(&self) -> f64 {
        self.format.duration_of(self.payload.len())
    }
}

/// Wrap raw PCM bytes in a WAV container.
///
/// # Errors
///
/// Returns `ReelError::Input` for an invalid format or when the payload is not
/// a whole number of frames.
pub fn wrap(samples: &[u8], sample_rate: u32, channels: u16, bit_depth: u16) -> Result<Vec<u8>> {
    let format = PcmFormat::new(sample_rate, channels, bit_depth)?;
    encode(samples, format)
}

/// Wrap raw PCM bytes using an already validated format.
pub fn encode(samples: &[u8], format: PcmFormat) -> Result<Vec<u8>> {
    if samples.len() % format.block_align() != 0 {
        return Err(ReelError::input(format!(
            "PCM payload of {} bytes is not a whole number of {}-byte frames",
            samples.len(),
            format.block_align()
        )));
    }

    let mut cursor = Cursor::new(Vec::with_capacity(samples.len() + 64));
    let mut writer = WavWriter::new(&mut cursor, format.spec()).map_err(wav_error)?;
    match format.bit_depth {
        16 => {
            for chunk in samples.chunks_exact(2) {
                writer
                    .write_sample(i16::from_le_bytes([chunk[0], chunk[1]]))
                    .map_err(wav_error)?;
            }
        }
        24 => {
            for chunk in samples.chunks_exact(3) {
                // Sign-extend the 24-bit value through the top byte.
                let value = i32::from_le_bytes([0, chunk[0], chunk[1], chunk[2]]) >> 8;
                writer.write_sample(value).map_err(wav_error)?;
            }
        }
        _ => {
            for chunk in samples.chunks_exact(4) {
                let value = f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
                writer.write_sample(value).map_err(wav_error)?;
            }
        }
    }
    writer.finalize().map_err(wav_error)?;

    Ok(cursor.into_inner())
}

/// Parse a WAV container back into its format and raw payload.
///
/// # Errors
///
/// Returns `ReelError::Input` if the bytes are not a WAV file this crate can
/// represent.
pub fn decode(container: &[u8]) -> Result<DecodedWav> {
    let mut reader = WavReader::new(Cursor::new(container))
        .map_err(|e| ReelError::input(format!("Failed to parse WAV container: {e}")))?;
    let format = PcmFormat::from_spec(reader.spec())?;

    let mut payload = Vec::with_capacity(reader.len() as usize * format.bytes_per_sample());
    match format.bit_depth {
        16 => {
            for sample in reader.samples::<i16>() {
                payload.extend_from_slice(&sample.map_err(wav_error)?.to_le_bytes());
            }
        }
        24 => {
            for sample in reader.samples::<i32>() {
                let bytes = sample.map_err(wav_error)?.to_le_bytes();
                payload.extend_from_slice(&bytes[..3]);
            }
        }
        _ => {
            for sample in reader.samples::<f32>() {
                payload.extend_from_slice(&sample.map_err(wav_error)?.to_le_bytes());
            }
        }
    }

    Ok(DecodedWav { format, payload })
}

/// Duration in seconds, read from the header alone.
pub fn duration(container: &[u8]) -> Result<f64> {
    let reader = WavReader::new(Cursor::new(container))
        .map_err(|e| ReelError::input(format!("Failed to parse WAV container: {e}")))?;
    let spec = reader.spec();
    Ok(f64::from(reader.duration()) / f64::from(spec.sample_rate))
}

fn wav_error(e: hound::Error) -> ReelError {
    ReelError::input(format!("WAV encoding error: {e}"))
}
