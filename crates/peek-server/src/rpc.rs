//! The remote procedure surface.
//!
//! One method per remote-callable function, shared by the HTTP routes and by
//! any host that wants to embed the query layer directly. Query errors
//! (unknown instance/environment, resolution cycles) propagate to the caller
//! as RPC-level failures; nothing is caught here.

use crate::state::{ServerMetrics, SharedState};
use crate::Result;
use peek_core::env::{ModuleInfo, ModuleTransformInfo, PluginMetricInfo};
use peek_core::registry::{EnvQuery, Metadata};

/// The fixed set of remote-callable functions.
#[derive(Clone)]
pub struct RpcHandler {
    state: SharedState,
}

impl RpcHandler {
    pub fn new(state: SharedState) -> Self {
        Self { state }
    }

    /// All registered instances with their environments and plugins.
    pub async fn get_metadata(&self) -> Metadata {
        self.state.registry().get_metadata()
    }

    /// Derived module listing for one environment.
    pub async fn get_modules_list(&self, query: &EnvQuery) -> Result<Vec<ModuleInfo>> {
        let env = self.state.registry().query_env(query)?;
        Ok(env.get_modules_list())
    }

    /// Resolved id plus transform lineage for one module.
    ///
    /// With `clear`, the module is invalidated and re-transformed before
    /// reading.
    pub async fn get_module_transform_info(
        &self,
        query: &EnvQuery,
        id: &str,
        clear: bool,
    ) -> Result<ModuleTransformInfo> {
        let env = self.state.registry().query_env(query)?;
        Ok(env.get_module_transform_info(id, clear).await?)
    }

    /// Aggregated per-plugin metrics for one environment.
    pub async fn get_plugin_metrics(&self, query: &EnvQuery) -> Result<Vec<PluginMetricInfo>> {
        let env = self.state.registry().query_env(query)?;
        Ok(env.get_plugin_metrics())
    }

    /// Dev-server request timings.
    pub async fn get_server_metrics(&self, query: &EnvQuery) -> Result<ServerMetrics> {
        // Validates the routing key even though the store is server-wide.
        self.state.registry().query_env(query)?;
        Ok(self.state.server_metrics())
    }

    /// Chase recorded resolutions for `id` to its terminal identifier.
    pub async fn resolve_id(&self, query: &EnvQuery, id: &str) -> Result<String> {
        let env = self.state.registry().query_env(query)?;
        Ok(env.resolve_id(id)?)
    }
}
