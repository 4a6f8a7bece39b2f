//! Command-line interface definition.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Peek - inspect what your bundler's plugins did to every module
#[derive(Parser, Debug)]
#[command(name = "peek", version, about, long_about = None)]
pub struct Cli {
    /// Enable debug-level logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only show error-level logs
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Available peek subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve a generated inspection report
    ///
    /// Points a local HTTP server at the static report tree written by a
    /// build-mode inspection run, so it can be browsed offline.
    Serve(ServeArgs),
}

/// Arguments for the serve command
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Report directory to serve
    ///
    /// The output directory of a build-mode run, containing `reports/`.
    #[arg(value_name = "DIR", default_value = ".peek")]
    pub dir: PathBuf,

    /// Port to listen on
    #[arg(short, long, default_value_t = 4173)]
    pub port: u16,

    /// Host to bind
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serve_defaults() {
        let cli = Cli::try_parse_from(["peek", "serve"]).unwrap();
        let Command::Serve(args) = cli.command;
        assert_eq!(args.dir, PathBuf::from(".peek"));
        assert_eq!(args.port, 4173);
        assert_eq!(args.host, "127.0.0.1");
    }

    #[test]
    fn test_serve_with_overrides() {
        let cli = Cli::try_parse_from(["peek", "-v", "serve", "out", "--port", "5000"]).unwrap();
        assert!(cli.verbose);
        let Command::Serve(args) = cli.command;
        assert_eq!(args.dir, PathBuf::from("out"));
        assert_eq!(args.port, 5000);
    }

    #[test]
    fn test_missing_subcommand_fails() {
        assert!(Cli::try_parse_from(["peek"]).is_err());
    }
}
