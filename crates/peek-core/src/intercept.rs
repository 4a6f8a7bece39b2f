//! Hook interception.
//!
//! [`wrap_plugin`] decorates a [`PipelinePlugin`] so that every
//! `resolve_id`/`load`/`transform` invocation is timed and recorded in the
//! owning instance's ledger. The decorator is transparent: the pipeline sees
//! the same name, the same enforce slot, the same results, and the same
//! errors. Recording is advisory only and can never change pipeline control
//! flow.

use crate::env::EnvContext;
use crate::events::{ERROR_RESULT, ParsedError, ResolutionEvent, TransformEvent, now_ms};
use crate::pipeline::{
    HookContext, HookLoadReturn, HookResolveIdReturn, HookTransformReturn, LoadArgs,
    PipelinePlugin, PluginEnforce, ResolveIdArgs, SharedPlugin, TransformArgs,
};
use crate::registry::BuildInstance;
use async_trait::async_trait;
use std::borrow::Cow;
use std::sync::Arc;
use tracing::debug;

/// Synthetic plugin name for alias-only builtin resolutions.
pub const ALIAS_RESOLVER_NAME: &str = "alias";

/// Synthetic plugin name for full builtin resolutions (alias included).
pub const BUILTIN_RESOLVER_NAME: &str = "resolver (+alias)";

fn plugin_ptr(plugin: &SharedPlugin) -> usize {
    Arc::as_ptr(plugin) as *const () as usize
}

/// Wrap a plugin in the recording decorator.
///
/// Idempotent per instance: wrapping the same plugin handle again, or wrapping
/// a wrapper, returns the input unchanged. The identity set lives on the
/// instance, so two instances wrapping one shared plugin each get their own
/// decorator.
pub fn wrap_plugin(plugin: SharedPlugin, instance: &Arc<BuildInstance>) -> SharedPlugin {
    let ptr = plugin_ptr(&plugin);
    if instance.is_wrapped(ptr) {
        return plugin;
    }
    debug!(plugin = %plugin.name(), instance = instance.id(), "wrapping pipeline plugin");
    instance.mark_wrapped(ptr);
    let wrapped: SharedPlugin = Arc::new(RecordingPlugin {
        inner: plugin,
        instance: Arc::clone(instance),
    });
    instance.mark_wrapped(plugin_ptr(&wrapped));
    wrapped
}

/// Record a resolution performed by the bundler's own resolver (outside any
/// plugin), under a synthetic plugin name. No-op resolutions are skipped like
/// everywhere else.
pub fn record_builtin_resolution(
    env: &EnvContext,
    specifier: &str,
    resolved: &str,
    alias_only: bool,
    start: u64,
    end: u64,
) {
    if resolved.is_empty() || resolved == specifier {
        return;
    }
    let name = if alias_only {
        ALIAS_RESOLVER_NAME
    } else {
        BUILTIN_RESOLVER_NAME
    };
    env.recorder().record_resolve_id(
        specifier,
        ResolutionEvent {
            name: name.to_string(),
            result: resolved.to_string(),
            start,
            end,
            order: None,
        },
    );
}

/// The recording decorator around one plugin.
pub struct RecordingPlugin {
    inner: SharedPlugin,
    instance: Arc<BuildInstance>,
}

impl RecordingPlugin {
    /// Environments are created on first hook touch, after the inner hook has
    /// completed.
    fn env(&self, ctx: &HookContext) -> Arc<EnvContext> {
        self.instance.environment(&ctx.environment)
    }

    fn order_tag(&self) -> Option<String> {
        Some(self.inner.enforce().as_str().to_string())
    }
}

#[async_trait]
impl PipelinePlugin for RecordingPlugin {
    fn name(&self) -> Cow<'static, str> {
        self.inner.name()
    }

    fn enforce(&self) -> PluginEnforce {
        self.inner.enforce()
    }

    async fn resolve_id(&self, ctx: &HookContext, args: &ResolveIdArgs) -> HookResolveIdReturn {
        let start = now_ms();
        let result = self.inner.resolve_id(ctx, args).await;
        let end = now_ms();

        if let Ok(Some(resolved)) = &result {
            if !resolved.id.is_empty() && resolved.id != args.specifier {
                self.env(ctx).recorder().record_resolve_id(
                    &args.specifier,
                    ResolutionEvent {
                        name: self.inner.name().into_owned(),
                        result: resolved.id.clone(),
                        start,
                        end,
                        order: self.order_tag(),
                    },
                );
            }
        }
        result
    }

    async fn load(&self, ctx: &HookContext, args: &LoadArgs) -> HookLoadReturn {
        let start = now_ms();
        let result = self.inner.load(ctx, args).await;
        let end = now_ms();

        let env = self.env(ctx);
        let id = env.options().normalize_id(&args.id);
        if env.options().filter.matches(&id) {
            match &result {
                Ok(Some(output)) if !output.code.is_empty() => {
                    env.recorder().record_load(
                        &id,
                        TransformEvent {
                            name: self.inner.name().into_owned(),
                            result: Some(output.code.clone()),
                            start,
                            end,
                            order: self.order_tag(),
                            sourcemap: output.map.clone(),
                            error: None,
                        },
                    );
                }
                Err(error) => {
                    env.recorder().record_load(
                        &id,
                        TransformEvent {
                            name: self.inner.name().into_owned(),
                            result: Some(ERROR_RESULT.to_string()),
                            start,
                            end,
                            order: self.order_tag(),
                            sourcemap: None,
                            error: Some(ParsedError::from_error(error)),
                        },
                    );
                }
                _ => {}
            }
        }
        result
    }

    async fn transform(&self, ctx: &HookContext, args: &TransformArgs) -> HookTransformReturn {
        let start = now_ms();
        let result = self.inner.transform(ctx, args).await;
        let end = now_ms();

        let env = self.env(ctx);
        let id = env.options().normalize_id(&args.id);
        if env.options().filter.matches(&id) {
            match &result {
                Ok(Some(output)) => {
                    env.recorder().record_transform(
                        &id,
                        TransformEvent {
                            name: self.inner.name().into_owned(),
                            result: Some(output.code.clone()),
                            start,
                            end,
                            order: self.order_tag(),
                            sourcemap: output.map.clone(),
                            error: None,
                        },
                        &args.code,
                    );
                }
                Err(error) => {
                    env.recorder().record_transform(
                        &id,
                        TransformEvent {
                            name: self.inner.name().into_owned(),
                            result: Some(ERROR_RESULT.to_string()),
                            start,
                            end,
                            order: self.order_tag(),
                            sourcemap: None,
                            error: Some(ParsedError::from_error(error)),
                        },
                        &args.code,
                    );
                }
                Ok(None) => {}
            }
        }
        result
    }
}
