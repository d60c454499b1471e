//! Shared fixtures for integration tests.
#![allow(dead_code)]

use reelsplice::ReelError;
use reelsplice::audio::slicer::cut_range;
use reelsplice::audio::wav;
use reelsplice::media::command::{CommandOutput, MockCommandExecutor};
use reelsplice::timing::WordTimestamp;
use std::path::Path;

/// Fifty words of narration spanning 0 to 27.7 seconds.
pub fn scenario_a() -> Vec<WordTimestamp> {
    [
        ("Welcome", 0.0, 0.5),
        ("to", 0.5, 0.7),
        ("our", 0.7, 0.9),
        ("financial", 0.9, 1.4),
        ("advisor", 1.4, 1.9),
        ("channel.", 1.9, 2.5),
        ("Today", 2.8, 3.2),
        ("we'll", 3.2, 3.5),
        ("discuss", 3.5, 4.0),
        ("investment", 4.0, 4.7),
        ("strategies.", 4.7, 5.5),
        ("First,", 6.0, 6.4),
        ("let's", 6.4, 6.7),
        ("talk", 6.7, 7.0),
        ("about", 7.0, 7.3),
        ("diversification.", 7.3, 8.5),
        ("This", 9.0, 9.3),
        ("is", 9.3, 9.5),
        ("crucial", 9.5, 10.0),
        ("for", 10.0, 10.2),
        ("risk", 10.2, 10.5),
        ("management.", 10.5, 11.3),
        ("Next,", 11.8, 12.2),
        ("we'll", 12.2, 12.5),
        ("explore", 12.5, 13.0),
        ("market", 13.0, 13.4),
        ("trends.", 13.4, 14.2),
        ("Understanding", 14.7, 15.5),
        ("these", 15.5, 15.8),
        ("patterns", 15.8, 16.4),
        ("helps", 16.4, 16.8),
        ("you", 16.8, 17.0),
        ("make", 17.0, 17.3),
        ("informed", 17.3, 17.9),
        ("decisions.", 17.9, 18.7),
        ("Finally,", 19.2, 19.8),
        ("remember", 19.8, 20.3),
        ("to", 20.3, 20.5),
        ("stay", 20.5, 20.8),
        ("disciplined", 20.8, 21.5),
        ("and", 21.5, 21.7),
        ("patient.", 21.7, 22.5),
        ("Long-term", 23.0, 23.6),
        ("success", 23.6, 24.1),
        ("requires", 24.1, 24.7),
        ("consistency.", 24.7, 25.7),
        ("Thank", 26.2, 26.5),
        ("you", 26.5, 26.7),
        ("for", 26.7, 26.9),
        ("watching!", 26.9, 27.7),
    ]
    .into_iter()
    .map(|(word, start, end)| WordTimestamp::new(word, start, end))
    .collect()
}

/// Sample rate used by the synthetic narration fixtures.
pub const RATE: u32 = 1000;

/// Raw 16-bit mono PCM of `secs` seconds at [`RATE`], sample value = frame
/// index (wrapping), so slices are distinguishable.
pub fn ramp_pcm(secs: f64) -> Vec<u8> {
    let frames = (secs * f64::from(RATE)).round() as usize;
    (0..frames)
        .flat_map(|i| (i as i16).to_le_bytes())
        .collect()
}

/// [`ramp_pcm`] wrapped in a WAV container.
pub fn ramp_wav(secs: f64) -> Vec<u8> {
    wav::wrap(&ramp_pcm(secs), RATE, 1, 16).unwrap()
}

fn flag_value(args: &[String], flag: &str) -> Option<String> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .cloned()
}

/// Parse a concat demuxer list back into paths.
pub fn read_concat_list(list: &Path) -> Vec<String> {
    std::fs::read_to_string(list)
        .unwrap()
        .lines()
        .filter_map(|line| line.strip_prefix("file '")?.strip_suffix('\'').map(str::to_string))
        .map(|p| p.replace(r"'\''", "'"))
        .collect()
}

/// In-process stand-in for ffmpeg covering the two invocations the crate
/// makes: time-range extraction and concat-demuxer joins. Joins write the
/// inputs' bytes back to back.
pub fn fake_ffmpeg() -> MockCommandExecutor {
    MockCommandExecutor::with_handler(|_, args| {
        let output = args
            .last()
            .cloned()
            .ok_or_else(|| ReelError::process("no output"))?;
        let input = flag_value(args, "-i").ok_or_else(|| ReelError::process("no input"))?;

        if args.iter().any(|a| a == "concat") {
            let mut joined = Vec::new();
            for path in read_concat_list(Path::new(&input)) {
                joined.extend(std::fs::read(path)?);
            }
            std::fs::write(&output, joined)?;
        } else {
            let container = std::fs::read(&input)?;
            let start: f64 = flag_value(args, "-ss")
                .and_then(|s| s.parse().ok())
                .unwrap_or(0.0);
            let end = match flag_value(args, "-t").and_then(|s| s.parse::<f64>().ok()) {
                Some(d) => start + d,
                None => wav::duration(&container)?,
            };
            std::fs::write(&output, cut_range(&container, start, end)?)?;
        }
        Ok(CommandOutput::default())
    })
}

/// Number of entries directly under `dir`.
pub fn entry_count(dir: &Path) -> usize {
    std::fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
}
