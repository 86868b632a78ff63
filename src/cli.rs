//! Command-line interface parsing for COVID-19 Radar
//!
//! The launcher runs the binary once per keystroke or selection. Without flags
//! the location list is shown; with `--lookup` the stats of the row whose index
//! the launcher exported as `i` are shown. Actioning the update row feeds
//! `workflow:update` back in as the query.

use clap::Parser;
use thiserror::Error;

/// Error types for CLI argument handling
#[derive(Debug, Error)]
pub enum CliError {
    /// `--lookup` was given without a row index
    #[error("--lookup requires a row index in the `i` environment variable")]
    MissingIndex,

    /// The row index is not a non-negative integer
    #[error("Invalid row index: '{0}'")]
    InvalidIndex(String),

    /// clap rejected the arguments
    #[error("{}", first_line(.0))]
    Parse(#[from] clap::Error),
}

/// clap renders usage and hints after the message; one line fits a subtitle
fn first_line(err: &clap::Error) -> String {
    let rendered = err.to_string();
    let line = rendered.lines().next().unwrap_or_default();
    line.trim_start_matches("error: ").to_string()
}

/// Query the update row autocompletes to
pub const UPDATE_QUERY: &str = "workflow:update";

/// COVID-19 Radar - COVID-19 case counts by location
#[derive(Parser, Debug)]
#[command(name = "covid-radar")]
#[command(about = "COVID-19 confirmed, deaths and recovered counts by location")]
#[command(version)]
pub struct Cli {
    /// Show stats for one location instead of listing locations
    #[arg(long)]
    pub lookup: bool,

    /// Row index of the location to show (normally exported by the launcher)
    #[arg(long, env = "i", value_name = "ROW")]
    pub index: Option<String>,

    /// Query typed in the launcher; filtering is left to the launcher
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, hide = true)]
    pub query: Vec<String>,
}

/// What a single run should render
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Invocation {
    /// List every location
    Locations,
    /// Show the stats for the location at this row
    Lookup(usize),
    /// Point at the latest release after the update row was actioned
    Update,
}

/// Parses a row index argument.
///
/// # Returns
/// * `Ok(usize)` if the string is a non-negative integer
/// * `Err(CliError::InvalidIndex)` otherwise
pub fn parse_index_arg(s: &str) -> Result<usize, CliError> {
    s.trim()
        .parse()
        .map_err(|_| CliError::InvalidIndex(s.to_string()))
}

impl Invocation {
    /// Decides the invocation mode from parsed CLI arguments.
    pub fn from_cli(cli: &Cli) -> Result<Self, CliError> {
        if !cli.lookup {
            if cli.query.join(" ").trim() == UPDATE_QUERY {
                return Ok(Invocation::Update);
            }
            return Ok(Invocation::Locations);
        }

        let raw = cli.index.as_deref().ok_or(CliError::MissingIndex)?;
        Ok(Invocation::Lookup(parse_index_arg(raw)?))
    }
}
