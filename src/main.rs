use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use reelsplice::app::{self, SplitArgs};
use reelsplice::cli::{Cli, Commands};
use reelsplice::config::Config;
use reelsplice::logging;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.quiet, cli.verbose);
    tracing::debug!(version = %reelsplice::version_string(), "reelsplice starting");

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Plan { timestamps, target } => {
            app::run_plan(&config, &timestamps, target)?;
        }
        Commands::Wrap {
            input,
            output,
            sample_rate,
            channels,
            bit_depth,
        } => {
            app::run_wrap(
                &config,
                &input,
                &output,
                sample_rate,
                channels,
                bit_depth,
                cli.quiet,
            )?;
        }
        Commands::Split {
            audio,
            timestamps,
            out_dir,
            target,
            native,
            json,
        } => {
            let args = SplitArgs {
                audio,
                timestamps,
                out_dir,
                target,
                native,
                json,
                quiet: cli.quiet,
            };
            app::run_split(&config, &args).await?;
        }
        Commands::Stitch { output, urls } => {
            app::run_stitch(&config, &output, &urls, cli.quiet).await?;
        }
        #[cfg(feature = "relay")]
        Commands::Relay { listen } => {
            app::run_relay(&config, listen).await?;
        }
        Commands::Completions { shell } => {
            clap_complete::generate(
                shell,
                &mut Cli::command(),
                "reelsplice",
                &mut std::io::stdout(),
            );
        }
    }

    Ok(())
}

/// Load configuration from file and environment variables.
fn load_config(custom_path: Option<&std::path::Path>) -> Result<Config> {
    let config = match custom_path {
        // An explicit path must exist.
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::load_or_default(&Config::default_path())?,
    }
    .with_env_overrides();
    config.validate()?;
    Ok(config)
}
