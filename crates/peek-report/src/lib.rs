//! # peek-report
//!
//! Build-mode snapshots of the peek recording engine.
//!
//! At build completion the whole registry is serialized into a static
//! directory tree that mirrors the live RPC surface, so the offline report
//! viewer and the live viewer share one client implementation:
//!
//! ```text
//! <output>/reports/metadata.json
//! <output>/reports/<instanceId>-<envName>/modules.json
//! <output>/reports/<instanceId>-<envName>/metric-plugins.json
//! <output>/reports/<instanceId>-<envName>/transforms/<hash(moduleId)>.json
//! ```
//!
//! Filenames for per-module dumps are content hashes of the module id, so
//! they stay filesystem-safe and stable across runs.

use peek_core::env::ModuleTransformInfo;
use peek_core::registry::InstanceRegistry;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Error types for report generation.
///
/// All errors here are fatal: a half-written report is worse than none, so
/// generation aborts on the first failure and nothing is retried.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error while writing the report tree.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for report generation.
pub type Result<T> = std::result::Result<T, Error>;

/// Filesystem-safe stable filename stem for a module id.
pub fn hash_module_id(id: &str) -> String {
    let digest = Sha256::digest(id.as_bytes());
    let mut hex = String::with_capacity(16);
    for byte in digest.iter().take(8) {
        hex.push_str(&format!("{:02x}", byte));
    }
    hex
}

async fn write_json<T: Serialize>(path: PathBuf, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)? + "\n";
    tokio::fs::write(path, json).await?;
    Ok(())
}

/// Snapshot every (instance, environment) pair under `output_dir`.
///
/// Replaces any previous report at that location. Returns the report root.
///
/// # Errors
///
/// Fails on the first I/O or serialization error; the partially written tree
/// is left behind for inspection.
pub async fn generate_report(registry: &InstanceRegistry, output_dir: &Path) -> Result<PathBuf> {
    if tokio::fs::try_exists(output_dir).await? {
        tokio::fs::remove_dir_all(output_dir).await?;
    }
    let reports_dir = output_dir.join("reports");
    tokio::fs::create_dir_all(&reports_dir).await?;

    write_json(reports_dir.join("metadata.json"), &registry.get_metadata()).await?;

    for instance in registry.instances() {
        for env in instance.environments() {
            let key = format!("{}-{}", instance.id(), env.name());
            let env_dir = reports_dir.join(&key);
            let transforms_dir = env_dir.join("transforms");
            tokio::fs::create_dir_all(&transforms_dir).await?;

            write_json(env_dir.join("modules.json"), &env.get_modules_list()).await?;
            write_json(env_dir.join("metric-plugins.json"), &env.get_plugin_metrics()).await?;

            // One dump per recorded module, under the id it was recorded as.
            let mut records: Vec<(String, ModuleTransformInfo)> = env.recorder().with_data(|data| {
                data.transforms
                    .iter()
                    .map(|(id, record)| {
                        (
                            id.clone(),
                            ModuleTransformInfo {
                                resolved_id: id.clone(),
                                transforms: record.events.clone(),
                            },
                        )
                    })
                    .collect()
            });
            records.sort_by(|a, b| a.0.cmp(&b.0));

            for (id, info) in records {
                let filename = format!("{}.json", hash_module_id(&id));
                write_json(transforms_dir.join(filename), &info).await?;
            }

            debug!(environment = key, "report environment written");
        }
    }

    Ok(reports_dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use peek_core::events::TransformEvent;
    use peek_core::pipeline::{PluginDescriptor, PluginEnforce};
    use peek_core::registry::InstanceConfig;
    use std::sync::Arc;

    fn transform_event(name: &str, result: &str, start: u64, end: u64) -> TransformEvent {
        TransformEvent {
            name: name.to_string(),
            result: Some(result.to_string()),
            start,
            end,
            order: None,
            sourcemap: None,
            error: None,
        }
    }

    fn populated_registry() -> Arc<InstanceRegistry> {
        let registry = Arc::new(InstanceRegistry::new());
        let instance = registry.register(InstanceConfig::new("/abs").environment(
            "client",
            vec![PluginDescriptor::new("tagger", PluginEnforce::Normal)],
        ));
        let env = instance.environment("client");
        env.recorder()
            .record_transform("/src/a.js", transform_event("tagger", "const a=1;//tag", 0, 2), "const a=1");
        registry
    }

    #[test]
    fn test_hash_module_id_is_stable_and_fs_safe() {
        let hash = hash_module_id("virtual:foo/bar?query");
        assert_eq!(hash, hash_module_id("virtual:foo/bar?query"));
        assert_eq!(hash.len(), 16);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(hash, hash_module_id("virtual:foo/bar"));
    }

    #[tokio::test]
    async fn test_report_tree_layout() {
        let registry = populated_registry();
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("peek-report");

        let reports = generate_report(&registry, &output).await.unwrap();

        assert!(reports.join("metadata.json").is_file());
        assert!(reports.join("uni1-client/modules.json").is_file());
        assert!(reports.join("uni1-client/metric-plugins.json").is_file());
        let transform_file = reports
            .join("uni1-client/transforms")
            .join(format!("{}.json", hash_module_id("/src/a.js")));
        assert!(transform_file.is_file());
    }

    #[tokio::test]
    async fn test_report_matches_live_query_shape() {
        let registry = populated_registry();
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("peek-report");

        let reports = generate_report(&registry, &output).await.unwrap();

        let written: serde_json::Value = serde_json::from_str(
            &std::fs::read_to_string(reports.join("uni1-client/modules.json")).unwrap(),
        )
        .unwrap();
        let env = registry.instance("uni1").unwrap().environment("client");
        let live = serde_json::to_value(env.get_modules_list()).unwrap();
        assert_eq!(written, live);

        let written_metadata: serde_json::Value = serde_json::from_str(
            &std::fs::read_to_string(reports.join("metadata.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(written_metadata, serde_json::to_value(registry.get_metadata()).unwrap());
    }

    #[tokio::test]
    async fn test_regeneration_replaces_previous_report() {
        let registry = populated_registry();
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("peek-report");

        generate_report(&registry, &output).await.unwrap();
        let stale = output.join("reports/uni1-client/transforms/stale.json");
        std::fs::write(&stale, "{}").unwrap();

        generate_report(&registry, &output).await.unwrap();
        assert!(!stale.exists());
    }

    #[tokio::test]
    async fn test_metric_plugins_serialized_form() {
        let registry = populated_registry();
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("peek-report");

        let reports = generate_report(&registry, &output).await.unwrap();
        let content = std::fs::read_to_string(reports.join("uni1-client/metric-plugins.json")).unwrap();
        assert!(content.ends_with('\n'));

        insta::assert_snapshot!(content.trim_end(), @r#"
        [
          {
            "name": "tagger",
            "transform": {
              "invokeCount": 1,
              "totalTime": 2
            },
            "resolveId": {
              "invokeCount": 0,
              "totalTime": 0
            }
          }
        ]
        "#);
    }
}
