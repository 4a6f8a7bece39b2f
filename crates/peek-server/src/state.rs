//! Shared state for the inspector server.
//!
//! Holds the registry handle, the connected SSE clients, and the server
//! request metrics, using parking_lot locks for thread-safe access.

use parking_lot::RwLock;
use peek_core::registry::InstanceRegistry;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Events pushed to connected clients.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum InspectorEvent {
    /// Modules were invalidated by a hot reload; the client should refetch.
    ModuleUpdated { ids: Vec<String> },
    /// A client connected to the event stream.
    ClientConnected { id: usize },
}

/// One middleware/handler timing sample for a url.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MiddlewareTiming {
    pub name: String,
    /// Time spent in this handler alone.
    #[serde(rename = "self")]
    pub self_time: u64,
    /// Total time including downstream work.
    pub total: u64,
}

/// Dev-server request timing, keyed by timestamp-stripped url.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ServerMetrics {
    pub middleware: BTreeMap<String, Vec<MiddlewareTiming>>,
}

/// Shared inspector server state.
pub struct ServerState {
    /// Registry of every instrumented bundler instance
    registry: Arc<InstanceRegistry>,

    /// Connected SSE clients
    clients: RwLock<HashMap<usize, tokio::sync::mpsc::Sender<String>>>,

    /// Next client ID
    next_client_id: RwLock<usize>,

    /// Request timings, newest sample list per url
    metrics: RwLock<BTreeMap<String, Vec<MiddlewareTiming>>>,
}

impl ServerState {
    pub fn new(registry: Arc<InstanceRegistry>) -> Self {
        Self {
            registry,
            clients: RwLock::new(HashMap::new()),
            next_client_id: RwLock::new(0),
            metrics: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn registry(&self) -> &Arc<InstanceRegistry> {
        &self.registry
    }

    /// Register a new SSE client.
    ///
    /// # Returns
    ///
    /// Client ID and receiver for events
    pub fn register_client(&self) -> (usize, tokio::sync::mpsc::Receiver<String>) {
        let id = {
            let mut next_id = self.next_client_id.write();
            let id = *next_id;
            *next_id += 1;
            id
        };

        let (tx, rx) = tokio::sync::mpsc::channel(100);
        self.clients.write().insert(id, tx);

        (id, rx)
    }

    /// Unregister an SSE client.
    pub fn unregister_client(&self, id: usize) {
        self.clients.write().remove(&id);
    }

    /// Broadcast an event to all connected clients.
    pub async fn broadcast(&self, event: &InspectorEvent) {
        let json = serde_json::to_string(event).unwrap_or_else(|_| "{}".to_string());

        let clients = self.clients.read().clone();

        // Collect failed client IDs first to avoid modifying the map during iteration
        let mut failed_ids = Vec::new();
        for (id, tx) in clients {
            if tx.send(json.clone()).await.is_err() {
                failed_ids.push(id);
            }
        }
        for id in failed_ids {
            self.unregister_client(id);
        }
    }

    /// Signal connected clients that modules were invalidated.
    ///
    /// Called by the host's hot-reload glue after it invalidated the ledger
    /// entries through the recorder.
    pub async fn notify_module_updated(&self, ids: Vec<String>) {
        self.broadcast(&InspectorEvent::ModuleUpdated { ids }).await;
    }

    /// Get number of connected clients.
    pub fn client_count(&self) -> usize {
        self.clients.read().len()
    }

    /// Replace the timing samples for a url with a fresh request's samples.
    pub fn record_request_timing(&self, url: String, samples: Vec<MiddlewareTiming>) {
        self.metrics.write().insert(url, samples);
    }

    /// Snapshot of all request timings.
    pub fn server_metrics(&self) -> ServerMetrics {
        ServerMetrics {
            middleware: self.metrics.read().clone(),
        }
    }
}

/// Shared state handle for passing around the server.
pub type SharedState = Arc<ServerState>;
