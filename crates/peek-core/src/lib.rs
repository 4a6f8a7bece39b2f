//! # peek-core
//!
//! Recording and query engine for bundler plugin pipelines.
//!
//! Peek decorates the plugins of a module bundler so that every `resolve_id`,
//! `load`, and `transform` hook invocation is timed and recorded per module
//! and per build environment, without changing what the pipeline produces.
//! The resulting ledger is queryable live (see `peek-server`) and can be
//! snapshotted into a static report tree (see `peek-report`).
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use peek_core::registry::{InstanceConfig, InstanceRegistry};
//! use peek_core::plugin::instrument_plugins;
//!
//! # fn plugins() -> Vec<peek_core::pipeline::SharedPlugin> { Vec::new() }
//! let registry = Arc::new(InstanceRegistry::new());
//! let instance = registry.register(
//!     InstanceConfig::new("/srv/app")
//!         .environment("client", Vec::new())
//!         .environment("server", Vec::new()),
//! );
//!
//! // Hand the instrumented plugin list back to the bundler.
//! let instrumented = instrument_plugins(&instance, plugins());
//!
//! // Later: query the ledger.
//! let env = instance.environment("client");
//! for module in env.get_modules_list() {
//!     println!("{} took {}ms", module.id, module.total_time);
//! }
//! ```

pub mod env;
pub mod events;
pub mod filter;
pub mod graph;
pub mod intercept;
pub mod options;
pub mod pipeline;
pub mod plugin;
pub mod recorder;
pub mod registry;
pub mod util;

// Logging utilities (optional, enabled with "logging" feature)
#[cfg(feature = "logging")]
pub mod logging;

#[cfg(feature = "logging")]
pub use logging::{LogLevel, init_logging, init_logging_from_env};

pub use env::{
    EnvContext, HookMetric, ModuleInfo, ModuleTransformInfo, PluginMetricInfo, PluginTiming,
    TransformRequester,
};
pub use events::{
    ERROR_RESULT, FALLBACK_LOAD_NAME, FILESYSTEM_LOAD_NAME, ParsedError, ResolutionEvent,
    TransformEvent, now_ms,
};
pub use filter::{FilterPattern, ModuleFilter};
pub use graph::{MemoryGraph, ModuleGraphSource};
pub use intercept::{record_builtin_resolution, wrap_plugin};
pub use options::InspectorOptions;
pub use pipeline::{
    HookContext, HookLoadOutput, HookLoadReturn, HookResolveIdReturn, HookTransformOutput,
    HookTransformReturn, LoadArgs, PipelinePlugin, PluginDescriptor, PluginEnforce, ResolveIdArgs,
    ResolvedId, SharedPlugin, TransformArgs,
};
pub use plugin::{InspectorPlugin, PLUGIN_NAME, instrument_plugins};
pub use recorder::{LedgerData, ModuleOrigin, ModuleRecord, Recorder};
pub use registry::{
    BuildInstance, EnvQuery, EnvironmentConfig, InstanceConfig, InstanceMetadata, InstanceRegistry,
    Metadata,
};

/// Error types for peek-core operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A query named an instance id the registry has never assigned.
    #[error("Unknown instance: {0}")]
    UnknownInstance(String),

    /// A query named an environment the instance neither configured nor created.
    #[error("Unknown environment '{environment}' for instance '{instance}'")]
    UnknownEnvironment {
        instance: String,
        environment: String,
    },

    /// Recorded resolutions form a cycle (misbehaving plugin pair).
    #[error("Resolution cycle detected while chasing '{id}'")]
    ResolutionCycle { id: String },

    /// A filter pattern failed to compile.
    #[error("Invalid filter pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Result type alias for peek-core operations.
pub type Result<T> = std::result::Result<T, Error>;
