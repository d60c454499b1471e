//! Tracing subscriber setup for the binary.

use tracing_subscriber::EnvFilter;

/// Default filter directive for a verbosity setting.
///
/// `-q` shows only errors, no flag shows warnings and run summaries, `-v`
/// adds debug detail from this crate, `-vv` traces everything it logs.
pub fn default_directive(quiet: bool, verbose: u8) -> &'static str {
    if quiet {
        return "reelsplice=error";
    }
    match verbose {
        0 => "reelsplice=info",
        1 => "reelsplice=debug",
        _ => "reelsplice=trace",
    }
}

/// Install the global subscriber, writing to stderr.
///
/// `RUST_LOG` wins over the verbosity flags when set. Calling this more than
/// once is harmless.
pub fn init(quiet: bool, verbose: u8) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(quiet, verbose)));

    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbose >= 2)
        .try_init();
    if installed.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}
