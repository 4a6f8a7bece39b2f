//! Instance and environment registry.
//!
//! One process may host several bundler instances (e.g. an app build and a
//! library build side by side), each with several build environments. The
//! registry assigns every configuration a stable short instance id and routes
//! queries to the right [`EnvContext`].

use crate::env::EnvContext;
use crate::options::InspectorOptions;
use crate::pipeline::PluginDescriptor;
use crate::{Error, Result};
use parking_lot::Mutex;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;

/// Prefix for generated instance ids ("uni1", "uni2", ...).
const INSTANCE_ID_PREFIX: &str = "uni";

/// Plugin set of one configured build environment.
#[derive(Debug, Clone)]
pub struct EnvironmentConfig {
    pub name: String,
    pub plugins: Vec<PluginDescriptor>,
}

/// Identity and shape of one bundler instance, as handed over by the host at
/// registration time.
///
/// The `key` is the configuration's identity: registering the same config
/// twice yields the same instance.
#[derive(Debug, Clone)]
pub struct InstanceConfig {
    key: Uuid,
    root: String,
    environments: Vec<EnvironmentConfig>,
    options: InspectorOptions,
}

impl InstanceConfig {
    pub fn new(root: impl Into<String>) -> Self {
        Self {
            key: Uuid::new_v4(),
            root: root.into(),
            environments: Vec::new(),
            options: InspectorOptions::new(),
        }
    }

    /// Declare a build environment and its plugin set.
    pub fn environment(mut self, name: impl Into<String>, plugins: Vec<PluginDescriptor>) -> Self {
        self.environments.push(EnvironmentConfig {
            name: name.into(),
            plugins,
        });
        self
    }

    pub fn options(mut self, options: InspectorOptions) -> Self {
        self.options = options;
        self
    }

    pub fn key(&self) -> Uuid {
        self.key
    }
}

/// Query routing key: which instance, which environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvQuery {
    pub instance_id: String,
    pub environment_name: String,
}

impl EnvQuery {
    pub fn new(instance_id: impl Into<String>, environment_name: impl Into<String>) -> Self {
        Self {
            instance_id: instance_id.into(),
            environment_name: environment_name.into(),
        }
    }
}

/// Serialized registry overview: everything a client needs to enumerate
/// instances, environments, and plugins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    pub instances: Vec<InstanceMetadata>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceMetadata {
    pub id: String,
    pub root: String,
    pub environments: Vec<String>,
    /// Deduplicated plugin list across all environments.
    pub plugins: Vec<PluginDescriptor>,
    /// Environment name to indices into `plugins`.
    pub environment_plugins: BTreeMap<String, Vec<usize>>,
}

/// One registered bundler instance: a stable id, shared recording options,
/// and lazily created environment contexts.
pub struct BuildInstance {
    id: String,
    key: Uuid,
    root: String,
    options: Arc<InspectorOptions>,
    configured: Vec<EnvironmentConfig>,
    environments: Mutex<Vec<Arc<EnvContext>>>,
    wrapped: Mutex<FxHashSet<usize>>,
}

impl BuildInstance {
    fn new(id: String, config: InstanceConfig) -> Self {
        Self {
            id,
            key: config.key,
            root: config.root,
            options: Arc::new(config.options),
            configured: config.environments,
            environments: Mutex::new(Vec::new()),
            wrapped: Mutex::new(FxHashSet::default()),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn options(&self) -> &Arc<InspectorOptions> {
        &self.options
    }

    /// The environment context for `name`, created on first touch.
    ///
    /// Creation is idempotent per (instance, name); unconfigured names get an
    /// empty plugin set.
    pub fn environment(&self, name: &str) -> Arc<EnvContext> {
        let mut environments = self.environments.lock();
        if let Some(env) = environments.iter().find(|env| env.name() == name) {
            return Arc::clone(env);
        }
        let plugins = self
            .configured
            .iter()
            .find(|env| env.name == name)
            .map(|env| env.plugins.clone())
            .unwrap_or_default();
        let env = Arc::new(EnvContext::new(
            self.id.clone(),
            name.to_string(),
            self.root.clone(),
            plugins,
            Arc::clone(&self.options),
        ));
        environments.push(Arc::clone(&env));
        env
    }

    /// The environment context for `name`, without creating unknown ones.
    ///
    /// Configured-but-untouched environments are created on demand; a name
    /// that is neither configured nor created yields `None`.
    pub fn known_environment(&self, name: &str) -> Option<Arc<EnvContext>> {
        let created = self
            .environments
            .lock()
            .iter()
            .any(|env| env.name() == name);
        if created || self.configured.iter().any(|env| env.name == name) {
            Some(self.environment(name))
        } else {
            None
        }
    }

    /// Configured environment names first, then any extra environments hooks
    /// have touched, in creation order.
    pub fn environment_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.configured.iter().map(|env| env.name.clone()).collect();
        for env in self.environments.lock().iter() {
            if !names.iter().any(|name| name == env.name()) {
                names.push(env.name().to_string());
            }
        }
        names
    }

    /// Every created environment context, in creation order.
    pub fn environments(&self) -> Vec<Arc<EnvContext>> {
        self.environments.lock().clone()
    }

    pub(crate) fn is_wrapped(&self, plugin: usize) -> bool {
        self.wrapped.lock().contains(&plugin)
    }

    pub(crate) fn mark_wrapped(&self, plugin: usize) {
        self.wrapped.lock().insert(plugin);
    }

    fn metadata(&self) -> InstanceMetadata {
        let mut plugins: Vec<PluginDescriptor> = Vec::new();
        let mut environment_plugins: BTreeMap<String, Vec<usize>> = BTreeMap::new();

        for name in self.environment_names() {
            let descriptors = self
                .configured
                .iter()
                .find(|env| env.name == name)
                .map(|env| env.plugins.clone())
                .unwrap_or_default();
            let mut indices = Vec::with_capacity(descriptors.len());
            for descriptor in descriptors {
                let index = match plugins.iter().position(|known| known.name == descriptor.name) {
                    Some(index) => index,
                    None => {
                        plugins.push(descriptor);
                        plugins.len() - 1
                    }
                };
                indices.push(index);
            }
            environment_plugins.insert(name, indices);
        }

        InstanceMetadata {
            id: self.id.clone(),
            root: self.root.clone(),
            environments: self.environment_names(),
            plugins,
            environment_plugins,
        }
    }
}

#[derive(Default)]
struct RegistryInner {
    order: Vec<Arc<BuildInstance>>,
    by_key: FxHashMap<Uuid, usize>,
}

/// Process-wide map from configuration identity to build instances.
///
/// Owned by the host and passed by reference; instances live for the process
/// (dev) or the single build invocation (build mode). There is no teardown.
#[derive(Default)]
pub struct InstanceRegistry {
    inner: Mutex<RegistryInner>,
}

impl InstanceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a configuration, returning its instance.
    ///
    /// Idempotent by configuration key: the same config always yields the
    /// same instance (and keeps its first-assigned id).
    pub fn register(&self, config: InstanceConfig) -> Arc<BuildInstance> {
        let mut inner = self.inner.lock();
        if let Some(&index) = inner.by_key.get(&config.key) {
            return Arc::clone(&inner.order[index]);
        }
        let id = format!("{}{}", INSTANCE_ID_PREFIX, inner.order.len() + 1);
        let key = config.key;
        let instance = Arc::new(BuildInstance::new(id, config));
        inner.order.push(Arc::clone(&instance));
        let index = inner.order.len() - 1;
        inner.by_key.insert(key, index);
        instance
    }

    /// Look up an instance by its short id.
    pub fn instance(&self, id: &str) -> Result<Arc<BuildInstance>> {
        self.inner
            .lock()
            .order
            .iter()
            .find(|instance| instance.id() == id)
            .cloned()
            .ok_or_else(|| Error::UnknownInstance(id.to_string()))
    }

    /// All registered instances, in registration order.
    pub fn instances(&self) -> Vec<Arc<BuildInstance>> {
        self.inner.lock().order.clone()
    }

    /// Route a query to its environment context.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownInstance`] or [`Error::UnknownEnvironment`] when the
    /// query names an id the registry has never seen.
    pub fn query_env(&self, query: &EnvQuery) -> Result<Arc<EnvContext>> {
        let instance = self.instance(&query.instance_id)?;
        instance
            .known_environment(&query.environment_name)
            .ok_or_else(|| Error::UnknownEnvironment {
                instance: query.instance_id.clone(),
                environment: query.environment_name.clone(),
            })
    }

    /// Serialized overview of every instance.
    pub fn get_metadata(&self) -> Metadata {
        Metadata {
            instances: self
                .inner
                .lock()
                .order
                .iter()
                .map(|instance| instance.metadata())
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::PluginEnforce;

    #[test]
    fn test_register_assigns_incrementing_ids() {
        let registry = InstanceRegistry::new();
        let first = registry.register(InstanceConfig::new("/a"));
        let second = registry.register(InstanceConfig::new("/b"));
        assert_eq!(first.id(), "uni1");
        assert_eq!(second.id(), "uni2");
    }

    #[test]
    fn test_register_is_idempotent_by_config_key() {
        let registry = InstanceRegistry::new();
        let config = InstanceConfig::new("/a");
        let first = registry.register(config.clone());
        let again = registry.register(config);
        assert_eq!(first.id(), again.id());
        assert_eq!(registry.instances().len(), 1);
    }

    #[test]
    fn test_environment_lazily_created_and_idempotent() {
        let registry = InstanceRegistry::new();
        let instance = registry.register(InstanceConfig::new("/a").environment(
            "client",
            vec![PluginDescriptor::new("tagger", PluginEnforce::Normal)],
        ));

        let env = instance.environment("client");
        let same = instance.environment("client");
        assert!(Arc::ptr_eq(&env, &same));
        assert_eq!(env.plugins().len(), 1);

        // unconfigured environments are still created, with no plugins
        let extra = instance.environment("edge");
        assert!(extra.plugins().is_empty());
        assert_eq!(instance.environment_names(), vec!["client", "edge"]);
    }

    #[test]
    fn test_query_env_errors() {
        let registry = InstanceRegistry::new();
        registry.register(InstanceConfig::new("/a").environment("client", Vec::new()));

        assert!(matches!(
            registry.query_env(&EnvQuery::new("uni9", "client")),
            Err(Error::UnknownInstance(_))
        ));
        assert!(matches!(
            registry.query_env(&EnvQuery::new("uni1", "edge")),
            Err(Error::UnknownEnvironment { .. })
        ));
        assert!(registry.query_env(&EnvQuery::new("uni1", "client")).is_ok());
    }

    #[test]
    fn test_metadata_dedupes_plugins_across_environments() {
        let registry = InstanceRegistry::new();
        let shared = PluginDescriptor::new("shared", PluginEnforce::Normal);
        registry.register(
            InstanceConfig::new("/a")
                .environment(
                    "client",
                    vec![shared.clone(), PluginDescriptor::new("client-only", PluginEnforce::Pre)],
                )
                .environment("server", vec![shared]),
        );

        let metadata = registry.get_metadata();
        let info = &metadata.instances[0];
        assert_eq!(info.id, "uni1");
        assert_eq!(info.plugins.len(), 2);
        assert_eq!(info.environment_plugins["client"], vec![0, 1]);
        assert_eq!(info.environment_plugins["server"], vec![0]);
        assert_eq!(info.environments, vec!["client", "server"]);
    }
}
