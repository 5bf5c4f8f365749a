//! Single-slot-per-circuit store of analysis results.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;

use crate::analysis::CachedAnalysisResult;

/// Most recent analysis result for each circuit id.
///
/// Results are published as `Arc`s so readers never observe a partially
/// written value and can keep using a result after it has been replaced.
#[derive(Debug, Default)]
pub struct ResultCache {
    entries: DashMap<String, Arc<CachedAnalysisResult>>,
}

impl ResultCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a result, replacing any previous one for `id`.
    pub fn store(&self, id: &str, result: CachedAnalysisResult) -> Arc<CachedAnalysisResult> {
        let result = Arc::new(result);
        debug!(
            circuit = id,
            kind = %result.kind(),
            points = result.len(),
            "caching analysis result"
        );
        self.entries.insert(id.to_string(), Arc::clone(&result));
        result
    }

    pub fn get(&self, id: &str) -> Option<Arc<CachedAnalysisResult>> {
        self.entries.get(id).map(|entry| Arc::clone(entry.value()))
    }

    /// Remove the entry for `id`. Absent ids are ignored.
    pub fn evict(&self, id: &str) -> bool {
        let removed = self.entries.remove(id).is_some();
        if removed {
            debug!(circuit = id, "evicted cached result");
        }
        removed
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}
