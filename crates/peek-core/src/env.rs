//! Build-environment context and query derivation.
//!
//! One [`EnvContext`] per build environment (e.g. "client"/"server") owns the
//! environment's [`Recorder`] and derives every query result fresh from it:
//! the ledger mutates continuously during a dev session, so nothing here is
//! cached across calls.

use crate::events::{FILESYSTEM_LOAD_NAME, ResolutionEvent, TransformEvent};
use crate::graph::ModuleGraphSource;
use crate::options::InspectorOptions;
use crate::pipeline::PluginDescriptor;
use crate::recorder::{ModuleOrigin, Recorder};
use crate::{Error, Result};
use async_trait::async_trait;
use parking_lot::RwLock;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// One plugin's contribution to a module, in event order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginTiming {
    pub name: String,
    /// Elapsed transform time, if this entry came from a transform event.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transform: Option<u64>,
    /// Elapsed resolution time, if this entry came from a resolution event.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolve_id: Option<u64>,
}

/// Derived per-module view. Computed on every query, never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleInfo {
    pub id: String,
    pub deps: Vec<String>,
    pub plugins: Vec<PluginTiming>,
    /// False only when the lineage began with a filesystem read.
    #[serde(rename = "virtual")]
    pub is_virtual: bool,
    pub total_time: u64,
    pub invoke_count: u32,
    pub source_size: usize,
    pub dist_size: usize,
}

/// Invocation count and elapsed total for one hook kind of one plugin.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HookMetric {
    pub invoke_count: u32,
    pub total_time: u64,
}

/// Aggregated per-plugin metrics for one environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginMetricInfo {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enforce: Option<String>,
    pub transform: HookMetric,
    pub resolve_id: HookMetric,
}

impl PluginMetricInfo {
    fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            enforce: None,
            transform: HookMetric::default(),
            resolve_id: HookMetric::default(),
        }
    }
}

/// Resolved id plus the full transform lineage of one module.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleTransformInfo {
    pub resolved_id: String,
    pub transforms: Vec<TransformEvent>,
}

/// Dev-server glue that can force a module back through the pipeline.
///
/// Installed by the host in live mode; absent in build/report mode.
#[async_trait]
pub trait TransformRequester: Send + Sync {
    async fn retransform(&self, id: &str) -> anyhow::Result<()>;
}

/// Per-environment inspection state: identity, ledger, and the optional
/// module-graph / re-transform handles wired in by the host.
pub struct EnvContext {
    instance_id: String,
    name: String,
    root: String,
    plugins: Vec<PluginDescriptor>,
    options: Arc<InspectorOptions>,
    recorder: Recorder,
    graph: RwLock<Option<Arc<dyn ModuleGraphSource>>>,
    refetcher: RwLock<Option<Arc<dyn TransformRequester>>>,
}

impl EnvContext {
    pub(crate) fn new(
        instance_id: String,
        name: String,
        root: String,
        plugins: Vec<PluginDescriptor>,
        options: Arc<InspectorOptions>,
    ) -> Self {
        Self {
            instance_id,
            name,
            root,
            plugins,
            options,
            recorder: Recorder::new(),
            graph: RwLock::new(None),
            refetcher: RwLock::new(None),
        }
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn plugins(&self) -> &[PluginDescriptor] {
        &self.plugins
    }

    pub fn options(&self) -> &InspectorOptions {
        &self.options
    }

    pub fn recorder(&self) -> &Recorder {
        &self.recorder
    }

    /// Attach the environment's live module graph.
    pub fn set_graph(&self, graph: Arc<dyn ModuleGraphSource>) {
        *self.graph.write() = Some(graph);
    }

    /// Attach the dev-server re-transform hook.
    pub fn set_refetcher(&self, refetcher: Arc<dyn TransformRequester>) {
        *self.refetcher.write() = Some(refetcher);
    }

    /// Derive the full module listing, sorted by id ascending.
    ///
    /// The candidate set is every id with transform events plus every id that
    /// appears as a resolution target ("who resolved to me").
    pub fn get_modules_list(&self) -> Vec<ModuleInfo> {
        let mut modules = self.recorder.with_data(|data| {
            let mut resolved_to: FxHashMap<&str, Vec<&ResolutionEvent>> = FxHashMap::default();
            for events in data.resolutions.values() {
                for event in events {
                    resolved_to.entry(event.result.as_str()).or_default().push(event);
                }
            }

            let mut ids: BTreeSet<&str> = data.transforms.keys().map(String::as_str).collect();
            ids.extend(resolved_to.keys().copied());

            ids.into_iter()
                .map(|id| {
                    let record = data.transforms.get(id);
                    let mut total_time = 0u64;
                    let mut plugins = Vec::new();

                    if let Some(record) = record {
                        for event in &record.events {
                            if event.result.is_none() || event.error.is_some() {
                                continue;
                            }
                            let delta = event.end.saturating_sub(event.start);
                            total_time += delta;
                            plugins.push(PluginTiming {
                                name: event.name.clone(),
                                transform: Some(delta),
                                resolve_id: None,
                            });
                        }
                    }
                    if let Some(resolutions) = resolved_to.get(id) {
                        for event in resolutions {
                            plugins.push(PluginTiming {
                                name: event.name.clone(),
                                transform: None,
                                resolve_id: Some(event.end.saturating_sub(event.start)),
                            });
                        }
                    }

                    let byte_len = |event: Option<&TransformEvent>| {
                        event.and_then(|ev| ev.result.as_ref()).map_or(0, |code| code.len())
                    };

                    ModuleInfo {
                        id: id.to_string(),
                        deps: Vec::new(),
                        plugins,
                        is_virtual: record.is_none_or(|r| r.origin == ModuleOrigin::PluginLoad),
                        total_time,
                        invoke_count: data.counters.get(id).copied().unwrap_or(0),
                        source_size: byte_len(record.and_then(|r| r.events.first())),
                        dist_size: byte_len(record.and_then(|r| r.events.last())),
                    }
                })
                .collect::<Vec<_>>()
        });

        // Dependency edges come from foreign graph code, queried outside the
        // ledger lock.
        if let Some(graph) = self.graph.read().clone() {
            for module in &mut modules {
                module.deps = graph.imported_ids(&module.id);
            }
        }
        modules
    }

    /// Aggregate per-plugin metrics, seeded with every configured plugin and
    /// sorted by name ascending.
    pub fn get_plugin_metrics(&self) -> Vec<PluginMetricInfo> {
        let mut map: BTreeMap<String, PluginMetricInfo> = BTreeMap::new();
        for descriptor in &self.plugins {
            map.insert(
                descriptor.name.clone(),
                PluginMetricInfo {
                    name: descriptor.name.clone(),
                    enforce: descriptor.enforce.clone(),
                    transform: HookMetric::default(),
                    resolve_id: HookMetric::default(),
                },
            );
        }

        self.recorder.with_data(|data| {
            for record in data.transforms.values() {
                for event in &record.events {
                    if event.name == FILESYSTEM_LOAD_NAME {
                        continue;
                    }
                    let metric = map
                        .entry(event.name.clone())
                        .or_insert_with(|| PluginMetricInfo::named(&event.name));
                    metric.transform.invoke_count += 1;
                    metric.transform.total_time += event.end.saturating_sub(event.start);
                }
            }
            for events in data.resolutions.values() {
                for event in events {
                    let metric = map
                        .entry(event.name.clone())
                        .or_insert_with(|| PluginMetricInfo::named(&event.name));
                    metric.resolve_id.invoke_count += 1;
                    metric.resolve_id.total_time += event.end.saturating_sub(event.start);
                }
            }
        });

        map.into_values().collect()
    }

    /// Chase recorded resolutions to the terminal id.
    ///
    /// `./`-relative inputs are made absolute against the environment root
    /// first. Follows the first recorded resolution for each id until an id
    /// has none; a revisited id means a plugin pair recorded a cycle, which
    /// surfaces as [`Error::ResolutionCycle`] instead of recursing forever.
    pub fn resolve_id(&self, id: &str) -> Result<String> {
        let mut current = if id.starts_with("./") {
            Path::new(&self.root)
                .join(id.trim_start_matches("./"))
                .to_string_lossy()
                .replace('\\', "/")
        } else {
            id.to_string()
        };

        self.recorder.with_data(|data| {
            let mut seen = FxHashSet::default();
            loop {
                if !seen.insert(current.clone()) {
                    return Err(Error::ResolutionCycle { id: current });
                }
                match data.resolutions.get(&current).and_then(|events| events.first()) {
                    Some(event) => current = event.result.clone(),
                    None => return Ok(current),
                }
            }
        })
    }

    /// Resolved id plus the full transform lineage.
    ///
    /// With `clear`, the module is invalidated and (when a
    /// [`TransformRequester`] is installed) forced back through the pipeline
    /// before reading, so the caller sees a fresh lineage.
    pub async fn get_module_transform_info(
        &self,
        id: &str,
        clear: bool,
    ) -> Result<ModuleTransformInfo> {
        if clear {
            let resolved = self.resolve_id(id)?;
            self.recorder.invalidate(&resolved);
            let refetcher = self.refetcher.read().clone();
            if let Some(refetcher) = refetcher {
                if let Err(error) = refetcher.retransform(&resolved).await {
                    debug!(module = %resolved, %error, "re-transform request failed");
                }
            }
        }

        let resolved_id = self.resolve_id(id)?;
        let transforms = self
            .recorder
            .module_record(&resolved_id)
            .map(|record| record.events)
            .unwrap_or_default();
        Ok(ModuleTransformInfo {
            resolved_id,
            transforms,
        })
    }
}
