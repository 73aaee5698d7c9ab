// Registry of analyzers attached to one reader
//
// Entries are weak handles keyed by the address of the analyzer they point to,
// so the registry never keeps an analyzer alive and a dropped analyzer cannot
// be called through it.

use crate::analyzer::SampleAnalyzer;
use std::collections::HashMap;
use std::sync::{Arc, Weak};

/// Identity of a registered analyzer
pub type AnalyzerKey = usize;

/// Identity of the analyzer behind `handle`
pub fn analyzer_key(handle: &Weak<dyn SampleAnalyzer>) -> AnalyzerKey {
    Weak::as_ptr(handle) as *const () as usize
}

#[derive(Default)]
pub struct AnalyzerRegistry {
    entries: HashMap<AnalyzerKey, Weak<dyn SampleAnalyzer>>,
}

impl AnalyzerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `handle`; false if it is dead or already present
    pub fn insert(&mut self, handle: Weak<dyn SampleAnalyzer>) -> bool {
        if handle.strong_count() == 0 {
            return false;
        }

        let key = analyzer_key(&handle);
        if self.entries.contains_key(&key) {
            return false;
        }
        self.entries.insert(key, handle);
        true
    }

    /// Remove `handle` if present
    pub fn remove(&mut self, handle: &Weak<dyn SampleAnalyzer>) -> bool {
        self.entries.remove(&analyzer_key(handle)).is_some()
    }

    pub fn contains(&self, handle: &Weak<dyn SampleAnalyzer>) -> bool {
        self.entries.contains_key(&analyzer_key(handle))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Analyzers that are still alive
    pub fn live(&self) -> impl Iterator<Item = Arc<dyn SampleAnalyzer>> + '_ {
        self.entries.values().filter_map(Weak::upgrade)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{TimestampedText, TimestampedValue};

    struct Nop;

    impl SampleAnalyzer for Nop {
        fn fetch_new_data(&self, _record: &TimestampedText) {}

        fn raw_data(&self) -> TimestampedValue {
            TimestampedValue::SENTINEL
        }

        fn processed_data(&self) -> TimestampedValue {
            TimestampedValue::SENTINEL
        }

        fn name(&self) -> &str {
            "nop"
        }
    }

    fn handle(analyzer: &Arc<dyn SampleAnalyzer>) -> Weak<dyn SampleAnalyzer> {
        Arc::downgrade(analyzer)
    }

    #[test]
    fn test_insert_is_unique() {
        let analyzer: Arc<dyn SampleAnalyzer> = Arc::new(Nop);
        let mut registry = AnalyzerRegistry::new();

        assert!(registry.insert(handle(&analyzer)));
        assert!(!registry.insert(handle(&analyzer)));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_remove_is_idempotent() {
        let first: Arc<dyn SampleAnalyzer> = Arc::new(Nop);
        let second: Arc<dyn SampleAnalyzer> = Arc::new(Nop);
        let mut registry = AnalyzerRegistry::new();
        registry.insert(handle(&first));

        assert!(!registry.remove(&handle(&second)));
        assert_eq!(registry.len(), 1);
        assert!(registry.remove(&handle(&first)));
        assert!(!registry.remove(&handle(&first)));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_dead_handle_is_rejected() {
        let analyzer: Arc<dyn SampleAnalyzer> = Arc::new(Nop);
        let weak = handle(&analyzer);
        drop(analyzer);

        let mut registry = AnalyzerRegistry::new();
        assert!(!registry.insert(weak));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_live_skips_dropped_analyzers() {
        let kept: Arc<dyn SampleAnalyzer> = Arc::new(Nop);
        let dropped: Arc<dyn SampleAnalyzer> = Arc::new(Nop);
        let mut registry = AnalyzerRegistry::new();
        registry.insert(handle(&kept));
        registry.insert(handle(&dropped));
        drop(dropped);

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.live().count(), 1);
    }
}
