//! Error handling for the peek CLI.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level CLI error type.
#[derive(Debug, Error)]
pub enum CliError {
    /// Report directory doesn't exist or isn't a generated report
    #[error("Not a peek report directory: {}\n\nHint: point peek serve at the output directory of a build-mode inspection run", .0.display())]
    NotAReport(PathBuf),

    /// Invalid command-line arguments or options
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Server errors
    #[error("Server error: {0}")]
    Server(String),

    /// I/O errors from file system operations
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using `CliError` as the default error type.
pub type Result<T, E = CliError> = std::result::Result<T, E>;

/// Convert a CLI error into a miette report for terminal display.
pub fn cli_error_to_miette(error: CliError) -> miette::Report {
    miette::Report::msg(error.to_string())
}
