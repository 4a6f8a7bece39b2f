//! Module-graph abstraction.
//!
//! Peek consumes the bundler's dependency graph, it never builds one. The
//! [`ModuleGraphSource`] trait is the seam: the host adapts its own graph
//! behind it, and [`MemoryGraph`] is a plain adjacency map for glue code and
//! tests (and for environments that never get a live graph, derivation simply
//! reports no dependencies).

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

/// Read-only view of a build environment's import edges.
pub trait ModuleGraphSource: Send + Sync {
    /// Ids of the modules imported by `id`, in graph order.
    fn imported_ids(&self, id: &str) -> Vec<String>;
}

/// Adjacency-map graph.
#[derive(Debug, Default)]
pub struct MemoryGraph {
    edges: RwLock<FxHashMap<String, Vec<String>>>,
}

impl MemoryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the import edges for a module, replacing any previous edges.
    pub fn set_imports(&self, id: impl Into<String>, imports: Vec<String>) {
        self.edges.write().insert(id.into(), imports);
    }
}

impl ModuleGraphSource for MemoryGraph {
    fn imported_ids(&self, id: &str) -> Vec<String> {
        self.edges.read().get(id).cloned().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_graph_edges() {
        let graph = MemoryGraph::new();
        graph.set_imports("/src/a.js", vec!["/src/b.js".to_string(), "/src/c.js".to_string()]);

        assert_eq!(graph.imported_ids("/src/a.js").len(), 2);
        assert!(graph.imported_ids("/src/unknown.js").is_empty());
    }
}
