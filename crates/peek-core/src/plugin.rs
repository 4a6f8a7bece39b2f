//! The inspector's own pipeline plugin.
//!
//! Peek participates in the pipeline it instruments: a `pre`-enforced plugin
//! whose `load` hook invalidates the module's previous lineage, so every
//! reload starts a fresh record. [`instrument_plugins`] composes it with the
//! recording decorators over the host's plugin list.

use crate::intercept::wrap_plugin;
use crate::pipeline::{
    HookContext, HookLoadReturn, LoadArgs, PipelinePlugin, PluginEnforce, SharedPlugin,
};
use crate::registry::BuildInstance;
use async_trait::async_trait;
use std::borrow::Cow;
use std::sync::Arc;

/// Name the inspector registers under.
pub const PLUGIN_NAME: &str = "peek";

/// Pre-enforced pipeline plugin that resets module lineages on reload.
pub struct InspectorPlugin {
    instance: Arc<BuildInstance>,
}

impl InspectorPlugin {
    pub fn new(instance: Arc<BuildInstance>) -> Self {
        Self { instance }
    }
}

#[async_trait]
impl PipelinePlugin for InspectorPlugin {
    fn name(&self) -> Cow<'static, str> {
        PLUGIN_NAME.into()
    }

    fn enforce(&self) -> PluginEnforce {
        PluginEnforce::Pre
    }

    async fn load(&self, ctx: &HookContext, args: &LoadArgs) -> HookLoadReturn {
        let env = self.instance.environment(&ctx.environment);
        let id = env.options().normalize_id(&args.id);
        env.recorder().invalidate(&id);
        Ok(None)
    }
}

/// Wrap a host plugin list for one instance.
///
/// The inspector plugin is prepended (it must see loads before anyone else),
/// and every plugin, the inspector included, goes through the recording
/// decorator. Already-wrapped plugins pass through untouched, so calling this
/// twice on the same list is harmless.
pub fn instrument_plugins(
    instance: &Arc<BuildInstance>,
    plugins: Vec<SharedPlugin>,
) -> Vec<SharedPlugin> {
    let mut instrumented = Vec::with_capacity(plugins.len() + 1);
    instrumented.push(wrap_plugin(
        Arc::new(InspectorPlugin::new(Arc::clone(instance))),
        instance,
    ));
    instrumented.extend(plugins.into_iter().map(|plugin| wrap_plugin(plugin, instance)));
    instrumented
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::TransformEvent;
    use crate::registry::{InstanceConfig, InstanceRegistry};

    #[tokio::test]
    async fn test_load_hook_invalidates_previous_lineage() {
        let registry = InstanceRegistry::new();
        let instance = registry.register(InstanceConfig::new("/abs").environment("client", Vec::new()));
        let env = instance.environment("client");
        env.recorder().record_transform(
            "/src/a.js",
            TransformEvent {
                name: "tagger".to_string(),
                result: Some("x".to_string()),
                start: 0,
                end: 1,
                order: None,
                sourcemap: None,
                error: None,
            },
            "0",
        );

        let inspector = InspectorPlugin::new(Arc::clone(&instance));
        let declined = inspector
            .load(
                &HookContext::new("client"),
                &LoadArgs {
                    id: "/src/a.js".to_string(),
                },
            )
            .await
            .unwrap();

        assert!(declined.is_none());
        assert!(env.recorder().module_record("/src/a.js").is_none());
    }

    #[tokio::test]
    async fn test_instrument_plugins_prepends_inspector() {
        let registry = InstanceRegistry::new();
        let instance = registry.register(InstanceConfig::new("/abs").environment("client", Vec::new()));

        let instrumented = instrument_plugins(&instance, Vec::new());
        assert_eq!(instrumented.len(), 1);
        assert_eq!(instrumented[0].name(), PLUGIN_NAME);
        assert_eq!(instrumented[0].enforce(), PluginEnforce::Pre);
    }
}
