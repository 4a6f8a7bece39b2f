//! Serve a generated inspection report over HTTP.
//!
//! The static analog of the live inspector server: the report tree already
//! mirrors the RPC surface, so serving the files is all there is to it.

use crate::cli::ServeArgs;
use crate::error::{CliError, Result};
use axum::Router;
use owo_colors::OwoColorize;
use std::net::SocketAddr;
use std::path::Path;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tracing::info;

/// Execute the serve command.
pub async fn serve_execute(args: ServeArgs) -> Result<()> {
    validate_report_dir(&args.dir)?;

    let addr: SocketAddr = format!("{}:{}", args.host, args.port)
        .parse()
        .map_err(|_| CliError::InvalidArgument(format!("invalid host/port: {}:{}", args.host, args.port)))?;

    let app = Router::new()
        .fallback_service(ServeDir::new(&args.dir))
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| CliError::Server(format!("Failed to bind to {}: {}", addr, e)))?;

    let url = format!("http://{}", addr);
    info!("serving report from {}", args.dir.display());
    println!("  {}  Report: {}", "➜".green(), url.bold());

    axum::serve(listener, app)
        .await
        .map_err(|e| CliError::Server(format!("Server error: {}", e)))?;

    Ok(())
}

/// A report directory must contain the metadata the client bootstraps from.
fn validate_report_dir(dir: &Path) -> Result<()> {
    if dir.join("reports").join("metadata.json").is_file() {
        Ok(())
    } else {
        Err(CliError::NotAReport(dir.to_path_buf()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_rejects_missing_report() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            validate_report_dir(dir.path()),
            Err(CliError::NotAReport(_))
        ));
    }

    #[test]
    fn test_validate_accepts_report_tree() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("reports")).unwrap();
        std::fs::write(dir.path().join("reports/metadata.json"), "{}").unwrap();
        assert!(validate_report_dir(dir.path()).is_ok());
    }
}
