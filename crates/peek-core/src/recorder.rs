//! Per-environment module ledger.
//!
//! The [`Recorder`] stores every transform/load/resolution event keyed by the
//! module identifier the event was recorded under. It is the single writer
//! surface for the hook interceptor and the single read surface for query
//! derivation; invalidation (hot reload) goes through [`Recorder::invalidate`]
//! so derived views stay consistent.

use crate::events::{FALLBACK_LOAD_NAME, FILESYSTEM_LOAD_NAME, ResolutionEvent, TransformEvent};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;

/// How a module's recorded lineage began.
///
/// Set once at record creation instead of being re-derived from the first
/// event's name on every query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleOrigin {
    /// Content was read from disk (synthetic dummy event or fallback loader).
    Filesystem,
    /// Content was produced by a plugin's `load` hook; the module is virtual.
    PluginLoad,
}

/// The transform-event lineage of one module.
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleRecord {
    pub origin: ModuleOrigin,
    /// Append-only, in hook completion order. Index 0 is the module's initial
    /// content (synthetic filesystem dummy or a genuine load event).
    pub events: Vec<TransformEvent>,
}

/// Raw ledger state. Exposed to the query layer via [`Recorder::with_data`].
#[derive(Debug, Default)]
pub struct LedgerData {
    pub transforms: FxHashMap<String, ModuleRecord>,
    pub resolutions: FxHashMap<String, Vec<ResolutionEvent>>,
    /// How many times each module was fully (re)loaded. Survives
    /// invalidation so unstable re-transforms stay visible.
    pub counters: FxHashMap<String, u32>,
}

/// Event store for one build environment.
///
/// Every operation takes a single lock acquisition, so each recording is
/// atomic with respect to interleaved hook completions on the same module.
/// None of the operations can fail; they are pure in-memory updates.
#[derive(Debug, Default)]
pub struct Recorder {
    data: Mutex<LedgerData>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a transform event for `id`.
    ///
    /// If no existing event for the module carries a populated result, the
    /// lineage is (re)started with a synthetic zero-width "loaded from
    /// filesystem" event carrying `pre_code`, and the invocation counter is
    /// bumped: this models the on-disk baseline the first transform ran
    /// against.
    pub fn record_transform(&self, id: &str, event: TransformEvent, pre_code: &str) {
        let mut data = self.data.lock();
        let has_populated = data
            .transforms
            .get(id)
            .is_some_and(|record| record.events.iter().any(|ev| ev.result.is_some()));

        if has_populated {
            if let Some(record) = data.transforms.get_mut(id) {
                record.events.push(event);
            }
        } else {
            let dummy = TransformEvent {
                name: FILESYSTEM_LOAD_NAME.to_string(),
                result: Some(pre_code.to_string()),
                start: event.start,
                end: event.start,
                order: None,
                sourcemap: event.sourcemap.clone(),
                error: None,
            };
            *data.counters.entry(id.to_string()).or_default() += 1;
            data.transforms.insert(
                id.to_string(),
                ModuleRecord {
                    origin: ModuleOrigin::Filesystem,
                    events: vec![dummy, event],
                },
            );
        }
    }

    /// Record a successful (or failed) `load` hook: the start of a new
    /// lineage. Replaces any prior event sequence for `id` and bumps the
    /// invocation counter.
    pub fn record_load(&self, id: &str, event: TransformEvent) {
        let origin = if event.name == FALLBACK_LOAD_NAME {
            ModuleOrigin::Filesystem
        } else {
            ModuleOrigin::PluginLoad
        };
        let mut data = self.data.lock();
        *data.counters.entry(id.to_string()).or_default() += 1;
        data.transforms.insert(
            id.to_string(),
            ModuleRecord {
                origin,
                events: vec![event],
            },
        );
    }

    /// Append a resolution event under the *input* identifier.
    pub fn record_resolve_id(&self, id: &str, event: ResolutionEvent) {
        let mut data = self.data.lock();
        data.resolutions.entry(id.to_string()).or_default().push(event);
    }

    /// Drop the transform lineage for `id`.
    ///
    /// Resolution history is retained: identifier aliasing is stable across
    /// reloads. The invocation counter is retained as well.
    pub fn invalidate(&self, id: &str) {
        let mut data = self.data.lock();
        data.transforms.remove(id);
    }

    /// Run `f` against the raw ledger under the lock.
    ///
    /// Derivation reads whole-ledger state through this to get a consistent
    /// view without cloning the maps.
    pub fn with_data<R>(&self, f: impl FnOnce(&LedgerData) -> R) -> R {
        let data = self.data.lock();
        f(&data)
    }

    /// Clone of the transform lineage for `id`, if any.
    pub fn module_record(&self, id: &str) -> Option<ModuleRecord> {
        self.data.lock().transforms.get(id).cloned()
    }

    /// How many times `id` was fully (re)loaded.
    pub fn invocation_count(&self, id: &str) -> u32 {
        self.data.lock().counters.get(id).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transform_event(name: &str, result: Option<&str>, start: u64, end: u64) -> TransformEvent {
        TransformEvent {
            name: name.to_string(),
            result: result.map(str::to_string),
            start,
            end,
            order: None,
            sourcemap: None,
            error: None,
        }
    }

    #[test]
    fn test_first_transform_synthesizes_filesystem_dummy() {
        let recorder = Recorder::new();
        recorder.record_transform("/src/a.js", transform_event("tagger", Some("const a=1;//tagged"), 10, 12), "const a=1");

        let record = recorder.module_record("/src/a.js").unwrap();
        assert_eq!(record.origin, ModuleOrigin::Filesystem);
        assert_eq!(record.events.len(), 2);
        assert_eq!(record.events[0].name, FILESYSTEM_LOAD_NAME);
        assert_eq!(record.events[0].result.as_deref(), Some("const a=1"));
        // zero-width timestamp
        assert_eq!(record.events[0].start, record.events[0].end);
        assert_eq!(recorder.invocation_count("/src/a.js"), 1);
    }

    #[test]
    fn test_second_transform_appends_without_dummy() {
        let recorder = Recorder::new();
        recorder.record_transform("/src/a.js", transform_event("a", Some("1"), 0, 1), "0");
        recorder.record_transform("/src/a.js", transform_event("b", Some("2"), 1, 2), "1");

        let record = recorder.module_record("/src/a.js").unwrap();
        assert_eq!(record.events.len(), 3);
        assert_eq!(record.events[2].name, "b");
        assert_eq!(recorder.invocation_count("/src/a.js"), 1);
    }

    #[test]
    fn test_load_replaces_lineage_and_bumps_counter() {
        let recorder = Recorder::new();
        recorder.record_transform("virtual:foo", transform_event("a", Some("1"), 0, 1), "0");
        recorder.record_load("virtual:foo", transform_event("loader", Some("export default 1"), 2, 3));

        let record = recorder.module_record("virtual:foo").unwrap();
        assert_eq!(record.origin, ModuleOrigin::PluginLoad);
        assert_eq!(record.events.len(), 1);
        assert_eq!(record.events[0].name, "loader");
        assert_eq!(recorder.invocation_count("virtual:foo"), 2);
    }

    #[test]
    fn test_fallback_load_is_filesystem_origin() {
        let recorder = Recorder::new();
        recorder.record_load("/src/a.js", transform_event(FALLBACK_LOAD_NAME, Some("const a=1"), 0, 1));
        let record = recorder.module_record("/src/a.js").unwrap();
        assert_eq!(record.origin, ModuleOrigin::Filesystem);
    }

    #[test]
    fn test_invalidate_drops_transforms_keeps_resolutions() {
        let recorder = Recorder::new();
        recorder.record_transform("/src/a.js", transform_event("a", Some("1"), 0, 1), "0");
        recorder.record_resolve_id(
            "./a",
            ResolutionEvent {
                name: "resolver".to_string(),
                result: "/src/a.js".to_string(),
                start: 0,
                end: 1,
                order: None,
            },
        );

        recorder.invalidate("/src/a.js");
        assert!(recorder.module_record("/src/a.js").is_none());
        recorder.with_data(|data| {
            assert_eq!(data.resolutions["./a"].len(), 1);
        });
        // counter survives invalidation
        assert_eq!(recorder.invocation_count("/src/a.js"), 1);
    }

    #[test]
    fn test_transform_after_error_only_lineage_restarts_dummy() {
        let recorder = Recorder::new();
        // An errored event has a populated (sentinel) result, so the lineage
        // it started is considered populated and is kept.
        let mut errored = transform_event("bad", Some(crate::events::ERROR_RESULT), 0, 1);
        errored.error = Some(crate::events::ParsedError {
            message: "boom".to_string(),
            stack: Vec::new(),
        });
        recorder.record_transform("/src/a.js", errored, "const a=1");

        let record = recorder.module_record("/src/a.js").unwrap();
        assert_eq!(record.events.len(), 2);
        assert_eq!(record.events[0].name, FILESYSTEM_LOAD_NAME);
    }
}
