//! Command-line interface for reelsplice
//!
//! Provides argument parsing using clap derive macros.

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

/// Split narration at natural word boundaries and stitch video clips back together
#[derive(Parser, Debug)]
#[command(
    name = "reelsplice",
    version,
    about = "Split narration at natural word boundaries and stitch video clips back together"
)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Only report errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose output (-v: debug detail, -vv: trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Parse a segment length into seconds.
///
/// Accepts a bare number of seconds (`7.5`) or any `humantime` duration
/// (`10s`, `1m`, `1m30s`).
fn parse_duration_secs(s: &str) -> Result<f64, String> {
    let s = s.trim();
    let secs = match s.parse::<f64>() {
        Ok(secs) => secs,
        Err(_) => humantime::parse_duration(s)
            .map(|d| d.as_secs_f64())
            .map_err(|e| e.to_string())?,
    };
    if !secs.is_finite() || secs <= 0.0 {
        return Err(format!("duration must be positive, got {s}"));
    }
    Ok(secs)
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print split points for a word timestamp file as JSON
    Plan {
        /// JSON word timestamps (array, or object with a `timestamps` array)
        #[arg(long, value_name = "FILE")]
        timestamps: PathBuf,

        /// Target segment length (default: from config). Examples: 10, 7.5s, 1m
        #[arg(long, value_name = "DURATION", value_parser = parse_duration_secs)]
        target: Option<f64>,
    },

    /// Wrap raw PCM in a WAV container
    Wrap {
        /// Headerless little-endian PCM
        #[arg(long, value_name = "FILE")]
        input: PathBuf,

        /// Destination WAV file
        #[arg(long, value_name = "FILE")]
        output: PathBuf,

        /// Sample rate in Hz (default: from config)
        #[arg(long, value_name = "HZ")]
        sample_rate: Option<u32>,

        /// Channel count (default: from config)
        #[arg(long, value_name = "N")]
        channels: Option<u16>,

        /// Bits per sample: 16, 24 or 32 (default: from config)
        #[arg(long, value_name = "BITS")]
        bit_depth: Option<u16>,
    },

    /// Cut a WAV narration into segments at planned split points
    Split {
        /// Narration WAV file
        #[arg(long, value_name = "FILE")]
        audio: PathBuf,

        /// JSON word timestamps for the narration
        #[arg(long, value_name = "FILE")]
        timestamps: PathBuf,

        /// Directory for segment_NNN.wav files
        #[arg(long, value_name = "DIR")]
        out_dir: PathBuf,

        /// Target segment length (default: from config). Examples: 10, 7.5s, 1m
        #[arg(long, value_name = "DURATION", value_parser = parse_duration_secs)]
        target: Option<f64>,

        /// Cut in-process instead of running ffmpeg
        #[arg(long)]
        native: bool,

        /// Print segments and split points as JSON instead of a summary
        #[arg(long)]
        json: bool,
    },

    /// Download video clips and join them in order
    Stitch {
        /// Destination video file
        #[arg(long, short, value_name = "FILE")]
        output: PathBuf,

        /// Clip URLs in playback order
        #[arg(required = true, value_name = "URL")]
        urls: Vec<String>,
    },

    /// Run the authenticated relay for the video vendor API
    #[cfg(feature = "relay")]
    Relay {
        /// Listen address (default: from config)
        #[arg(long, value_name = "ADDR")]
        listen: Option<String>,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plan() {
        let cli =
            Cli::try_parse_from(["reelsplice", "plan", "--timestamps", "words.json"]).unwrap();
        match cli.command {
            Commands::Plan { timestamps, target } => {
                assert_eq!(timestamps, PathBuf::from("words.json"));
                assert!(target.is_none());
            }
            other => panic!("expected Plan, got {other:?}"),
        }
        assert!(!cli.quiet);
        assert_eq!(cli.verbose, 0);
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_parse_target_formats() {
        for (arg, expected) in [("10", 10.0), ("7.5", 7.5), ("12s", 12.0), ("1m", 60.0)] {
            let cli = Cli::try_parse_from([
                "reelsplice",
                "plan",
                "--timestamps",
                "w.json",
                "--target",
                arg,
            ])
            .unwrap();
            let Commands::Plan { target, .. } = cli.command else {
                panic!("expected Plan");
            };
            assert_eq!(target, Some(expected), "for {arg}");
        }
    }

    #[test]
    fn test_parse_target_rejects_non_positive() {
        for arg in ["0", "-3", "soon"] {
            let result = Cli::try_parse_from([
                "reelsplice",
                "plan",
                "--timestamps",
                "w.json",
                "--target",
                arg,
            ]);
            assert!(result.is_err(), "{arg} should be rejected");
        }
    }

    #[test]
    fn test_parse_verbose_double_global() {
        let cli =
            Cli::try_parse_from(["reelsplice", "plan", "--timestamps", "w.json", "-vv"]).unwrap();
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn test_parse_wrap_with_format() {
        let cli = Cli::try_parse_from([
            "reelsplice",
            "wrap",
            "--input",
            "a.pcm",
            "--output",
            "a.wav",
            "--sample-rate",
            "16000",
            "--bit-depth",
            "16",
        ])
        .unwrap();
        match cli.command {
            Commands::Wrap {
                sample_rate,
                channels,
                bit_depth,
                ..
            } => {
                assert_eq!(sample_rate, Some(16000));
                assert_eq!(channels, None);
                assert_eq!(bit_depth, Some(16));
            }
            other => panic!("expected Wrap, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_split_flags() {
        let cli = Cli::try_parse_from([
            "reelsplice",
            "split",
            "--audio",
            "n.wav",
            "--timestamps",
            "w.json",
            "--out-dir",
            "out",
            "--native",
            "--json",
        ])
        .unwrap();
        match cli.command {
            Commands::Split { native, json, .. } => {
                assert!(native);
                assert!(json);
            }
            other => panic!("expected Split, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_stitch_requires_urls() {
        assert!(Cli::try_parse_from(["reelsplice", "stitch", "-o", "out.mp4"]).is_err());
        let cli = Cli::try_parse_from([
            "reelsplice",
            "stitch",
            "-o",
            "out.mp4",
            "https://cdn/a.mp4",
            "https://cdn/b.mp4",
        ])
        .unwrap();
        match cli.command {
            Commands::Stitch { urls, .. } => assert_eq!(urls.len(), 2),
            other => panic!("expected Stitch, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_completions() {
        let cli = Cli::try_parse_from(["reelsplice", "completions", "bash"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Completions { shell: Shell::Bash }
        ));
    }

    #[test]
    fn test_subcommand_required() {
        assert!(Cli::try_parse_from(["reelsplice"]).is_err());
    }

    #[test]
    fn test_cli_debug_assert() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
