//! COVID-19 Radar - COVID-19 case counts in a launcher
//!
//! Prints a Script Filter list of locations, or the confirmed, deaths and
//! recovered counts for one location when run with `--lookup`.

use std::io;
use std::process::ExitCode;

use clap::error::ErrorKind;
use clap::Parser;
use tracing::{debug, error};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use covid_radar::app::{AppError, Context};
use covid_radar::cli::{Cli, CliError, Invocation};
use covid_radar::config::Config;
use covid_radar::feedback::{Feedback, FeedbackItem, ICON_ERROR};

/// Initialize the tracing subscriber for logging
///
/// Logs go to stderr so stdout carries nothing but the feedback JSON.
/// Use RUST_LOG to control the level (e.g., RUST_LOG=covid_radar=debug).
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

async fn run(cli: &Cli) -> Result<Feedback, AppError> {
    let invocation = Invocation::from_cli(cli)?;
    let config = Config::from_env()?;
    debug!(?invocation, cache_dir = %config.cache_dir.display(), "starting");

    Context::from_config(config).run(invocation).await
}

/// Single row shown in place of the list when an invocation fails
fn error_feedback(err: &AppError) -> Feedback {
    [FeedbackItem::new("Error in COVID-19 Radar")
        .subtitle(err.to_string())
        .icon(ICON_ERROR)]
    .into_iter()
    .collect()
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    init_tracing();

    let result = match Cli::try_parse() {
        Ok(cli) => run(&cli).await,
        Err(e) => match e.kind() {
            ErrorKind::DisplayHelp
            | ErrorKind::DisplayVersion
            | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => e.exit(),
            _ => Err(AppError::from(CliError::from(e))),
        },
    };

    match result {
        Ok(feedback) => match feedback.send(io::stdout().lock()) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                error!(error = %e, "failed to write feedback");
                ExitCode::FAILURE
            }
        },
        Err(e) => {
            error!(error = %e, "invocation failed");
            if let Err(write_err) = error_feedback(&e).send(io::stdout().lock()) {
                error!(error = %write_err, "failed to write error feedback");
            }
            ExitCode::FAILURE
        }
    }
}
