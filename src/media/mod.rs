//! Remote clip download, external tool dispatch and clip concatenation.

pub mod command;
pub mod concat;
pub mod fetch;

pub use command::{CommandExecutor, CommandOutput, MockCommandExecutor, SystemCommandExecutor};
pub use concat::{FfmpegConcatenator, MediaConcatenator};
pub use fetch::{HttpFetcher, MediaFetcher, MockFetcher};
