//! Peek CLI - serve static plugin-pipeline inspection reports.
//!
//! This is the main entry point for the peek CLI. It handles command-line
//! argument parsing, logging initialization, and command dispatch.

use clap::Parser;
use miette::Result;
use peek_cli::{cli, commands, error, logger};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = cli::Cli::parse();

    // Initialize logging based on global flags
    logger::init_logger(args.verbose, args.quiet, args.no_color);

    // Execute the appropriate command
    let result = match args.command {
        cli::Command::Serve(serve_args) => commands::serve_execute(serve_args).await,
    };

    // Convert CLI errors to miette diagnostics for readable error reporting
    result.map_err(error::cli_error_to_miette)
}
