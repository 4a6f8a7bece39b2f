//! Recorded hook events and the monotonic clock they share.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Plugin name carried by the synthetic event that models "module content was
/// read from disk before any plugin touched it". A module whose lineage starts
/// with this event is a real on-disk module.
pub const FILESYSTEM_LOAD_NAME: &str = "__load__";

/// Name of the pipeline's own fallback loader. Loads recorded under this name
/// are filesystem reads the pipeline performed itself, so they classify the
/// module as non-virtual too.
pub const FALLBACK_LOAD_NAME: &str = "load-fallback";

/// Result snapshot recorded in place of code when a hook fails.
pub const ERROR_RESULT: &str = "[Error]";

static EPOCH: Lazy<Instant> = Lazy::new(Instant::now);

/// Milliseconds elapsed since the process-local epoch.
///
/// All event timestamps come from this single monotonic clock, so
/// `end - start` is meaningful across events regardless of wall-clock
/// adjustments.
pub fn now_ms() -> u64 {
    EPOCH.elapsed().as_millis() as u64
}

/// A captured hook failure: the message plus the chain of underlying causes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedError {
    pub message: String,
    pub stack: Vec<String>,
}

impl ParsedError {
    /// Flatten an error into its message and cause chain.
    pub fn from_error(error: &anyhow::Error) -> Self {
        Self {
            message: error.to_string(),
            stack: error.chain().skip(1).map(|cause| cause.to_string()).collect(),
        }
    }
}

/// One observed effect of a single plugin hook invocation on one module.
///
/// `result` is the code snapshot after the hook ran; it is the [`ERROR_RESULT`]
/// sentinel when the hook failed (in which case `error` carries the parsed
/// failure). `start`/`end` bound the invocation on the shared monotonic clock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformEvent {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    pub start: u64,
    pub end: u64,
    /// Opaque ordering tag (execution phase) recorded for display only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sourcemap: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ParsedError>,
}

/// One observed effect of a `resolve_id` hook that changed the identifier.
///
/// No-op resolutions (input equals output) are never recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionEvent {
    pub name: String,
    /// The identifier the input resolved to.
    pub result: String,
    pub start: u64,
    pub end: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<String>,
}
