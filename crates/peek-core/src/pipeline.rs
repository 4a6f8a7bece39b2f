//! The typed hook seam between the bundler's plugin pipeline and peek.
//!
//! The bundler drives plugins through [`PipelinePlugin`]; peek decorates
//! implementations of the same trait (see [`crate::intercept`]) so the
//! pipeline never observes a different interface.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::sync::Arc;

/// Execution slot a plugin asked for, relative to the normal plugin phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PluginEnforce {
    /// Runs before normal plugins
    Pre,
    /// Default slot
    #[default]
    Normal,
    /// Runs after normal plugins
    Post,
}

impl PluginEnforce {
    pub fn as_str(&self) -> &'static str {
        match self {
            PluginEnforce::Pre => "pre",
            PluginEnforce::Normal => "normal",
            PluginEnforce::Post => "post",
        }
    }

    /// Wire form: `pre`/`post`, absent for the default slot.
    pub fn as_wire(&self) -> Option<String> {
        match self {
            PluginEnforce::Normal => None,
            other => Some(other.as_str().to_string()),
        }
    }
}

/// Serialized identity of a configured plugin: name plus enforce tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginDescriptor {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enforce: Option<String>,
}

impl PluginDescriptor {
    pub fn new(name: impl Into<String>, enforce: PluginEnforce) -> Self {
        Self {
            name: name.into(),
            enforce: enforce.as_wire(),
        }
    }
}

/// Per-invocation context handed to every hook by the bundler.
#[derive(Debug, Clone)]
pub struct HookContext {
    /// Name of the build environment the invocation belongs to
    /// (e.g. "client" or "server").
    pub environment: String,
}

impl HookContext {
    pub fn new(environment: impl Into<String>) -> Self {
        Self {
            environment: environment.into(),
        }
    }
}

/// Arguments to a `resolve_id` hook.
#[derive(Debug, Clone)]
pub struct ResolveIdArgs {
    pub specifier: String,
    pub importer: Option<String>,
}

/// Arguments to a `load` hook.
#[derive(Debug, Clone)]
pub struct LoadArgs {
    pub id: String,
}

/// Arguments to a `transform` hook.
#[derive(Debug, Clone)]
pub struct TransformArgs {
    pub id: String,
    pub code: String,
}

/// Successful `resolve_id` output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedId {
    pub id: String,
}

impl ResolvedId {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// Successful `load` output.
#[derive(Debug, Clone, PartialEq)]
pub struct HookLoadOutput {
    pub code: String,
    pub map: Option<serde_json::Value>,
}

/// Successful `transform` output.
#[derive(Debug, Clone, PartialEq)]
pub struct HookTransformOutput {
    pub code: String,
    pub map: Option<serde_json::Value>,
}

pub type HookResolveIdReturn = anyhow::Result<Option<ResolvedId>>;
pub type HookLoadReturn = anyhow::Result<Option<HookLoadOutput>>;
pub type HookTransformReturn = anyhow::Result<Option<HookTransformOutput>>;

/// A plugin participating in module processing.
///
/// All hooks default to "not interested" (`Ok(None)`). Returning `None` from
/// `resolve_id`/`load` defers to the next plugin; returning `None` from
/// `transform` leaves the code untouched.
#[async_trait]
pub trait PipelinePlugin: Send + Sync {
    fn name(&self) -> Cow<'static, str>;

    fn enforce(&self) -> PluginEnforce {
        PluginEnforce::Normal
    }

    async fn resolve_id(&self, _ctx: &HookContext, _args: &ResolveIdArgs) -> HookResolveIdReturn {
        Ok(None)
    }

    async fn load(&self, _ctx: &HookContext, _args: &LoadArgs) -> HookLoadReturn {
        Ok(None)
    }

    async fn transform(&self, _ctx: &HookContext, _args: &TransformArgs) -> HookTransformReturn {
        Ok(None)
    }

    /// Serialized identity for metadata and metric seeding.
    fn descriptor(&self) -> PluginDescriptor {
        PluginDescriptor::new(self.name().into_owned(), self.enforce())
    }
}

/// Shared plugin handle, as the pipeline stores them.
pub type SharedPlugin = Arc<dyn PipelinePlugin>;
