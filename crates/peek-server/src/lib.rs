//! # peek-server
//!
//! Live query layer over the peek recording engine.
//!
//! Exposes the fixed RPC surface (metadata, module listing, transform info,
//! plugin metrics, server metrics, id resolution) as HTTP JSON endpoints plus
//! a Server-Sent Events channel for hot-update push. The same payload shapes
//! are written to disk by `peek-report`, so the live and static viewers share
//! one client implementation.

pub mod middleware;
pub mod rpc;
pub mod server;
pub mod state;

pub use rpc::RpcHandler;
pub use server::{InspectorServer, ServerConfig};
pub use state::{InspectorEvent, MiddlewareTiming, ServerMetrics, ServerState, SharedState};

/// Error types for peek-server operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Query-level failure from the recording engine.
    #[error(transparent)]
    Query(#[from] peek_core::Error),

    /// Server failed to bind or serve.
    #[error("Server error: {0}")]
    Server(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for peek-server operations.
pub type Result<T> = std::result::Result<T, Error>;
