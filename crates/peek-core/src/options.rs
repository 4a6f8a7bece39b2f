//! Inspector configuration.

use crate::filter::ModuleFilter;

/// Per-instance recording options.
///
/// Supplied by the host when registering a pipeline instance; shared by every
/// wrapped plugin of that instance.
#[derive(Debug, Clone)]
pub struct InspectorOptions {
    /// Controls which module ids are recorded for `transform`/`load` events.
    pub filter: ModuleFilter,
    /// Strip `v=<hash>` / `t=<timestamp>` query fragments from module ids
    /// before recording, so a module keeps one ledger entry across
    /// cache-busting reloads.
    pub remove_version_query: bool,
}

impl Default for InspectorOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl InspectorOptions {
    pub fn new() -> Self {
        Self {
            filter: ModuleFilter::default(),
            remove_version_query: true,
        }
    }

    pub fn with_filter(mut self, filter: ModuleFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Normalize a module id according to these options.
    pub fn normalize_id(&self, id: &str) -> String {
        if self.remove_version_query {
            crate::util::remove_version_query(id)
        } else {
            id.to_string()
        }
    }
}
