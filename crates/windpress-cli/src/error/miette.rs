//! Miette report conversion for CLI errors.

use crate::error::CliError;
use miette::Report;

/// Convert a `CliError` into a report, keeping the diagnostic codes and
/// help text of library errors that carry them.
pub fn cli_error_to_miette(err: CliError) -> Report {
    match err {
        CliError::Build(e) => Report::new(e),
        CliError::Compile(e) => Report::new(e),
        CliError::Optimize(e) => Report::new(e),
        CliError::Candidates(e) => Report::new(e),
        CliError::Backend(e) => Report::new(e),
        CliError::Fetch(e) => Report::new(e),
        CliError::Config(e) => miette::miette!("Configuration error: {}", e),
        other => miette::miette!("{}", other),
    }
}
