//! Circuit session registry with an "active circuit" pointer.

use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;
use tracing::{debug, info};

use crate::analysis::CachedAnalysisResult;
use crate::cache::ResultCache;
use crate::circuit::Circuit;
use crate::error::{Error, Result};

#[derive(Debug, Default)]
struct RegistryState {
    circuits: IndexMap<String, Circuit>,
    active: Option<String>,
}

impl RegistryState {
    fn mark_active(&mut self, id: Option<String>) {
        if let Some(prev) = self.active.take()
            && let Some(circuit) = self.circuits.get_mut(&prev)
        {
            circuit.set_active_flag(false);
        }
        if let Some(id) = &id
            && let Some(circuit) = self.circuits.get_mut(id)
        {
            circuit.set_active_flag(true);
        }
        self.active = id;
    }
}

/// All circuit sessions, in creation order.
///
/// The registry owns the result cache so that deleting a circuit and evicting
/// its cached result happen in one critical section.
#[derive(Debug)]
pub struct CircuitRegistry {
    state: RwLock<RegistryState>,
    cache: Arc<ResultCache>,
}

impl Default for CircuitRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl CircuitRegistry {
    pub fn new() -> Self {
        Self::with_cache(Arc::new(ResultCache::new()))
    }

    /// Create a registry sharing an existing cache.
    pub fn with_cache(cache: Arc<ResultCache>) -> Self {
        Self {
            state: RwLock::new(RegistryState::default()),
            cache,
        }
    }

    pub fn cache(&self) -> &Arc<ResultCache> {
        &self.cache
    }

    /// Create a circuit. The new circuit is not made active.
    pub fn create(&self, id: &str, description: &str) -> Result<Circuit> {
        let mut state = self.state.write();
        if state.circuits.contains_key(id) {
            return Err(Error::CircuitExists(id.to_string()));
        }
        let circuit = Circuit::new(id, description);
        state.circuits.insert(id.to_string(), circuit.clone());
        info!(circuit = id, "created circuit");
        Ok(circuit)
    }

    /// Snapshot of a circuit.
    pub fn get(&self, id: &str) -> Result<Circuit> {
        self.state
            .read()
            .circuits
            .get(id)
            .cloned()
            .ok_or_else(|| Error::CircuitNotFound(id.to_string()))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.state.read().circuits.contains_key(id)
    }

    /// All circuits in creation order.
    pub fn list(&self) -> Vec<Circuit> {
        self.state.read().circuits.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.state.read().circuits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().circuits.is_empty()
    }

    /// Make `id` the active circuit.
    pub fn set_active(&self, id: &str) -> Result<()> {
        let mut state = self.state.write();
        if !state.circuits.contains_key(id) {
            return Err(Error::CircuitNotFound(id.to_string()));
        }
        state.mark_active(Some(id.to_string()));
        info!(circuit = id, "set active circuit");
        Ok(())
    }

    pub fn active(&self) -> Option<Circuit> {
        let state = self.state.read();
        let id = state.active.as_ref()?;
        state.circuits.get(id).cloned()
    }

    pub fn active_id(&self) -> Option<String> {
        self.state.read().active.clone()
    }

    /// Resolve an explicit id, falling back to the active circuit.
    pub fn resolve(&self, explicit: Option<&str>) -> Result<String> {
        match explicit {
            Some(id) => {
                if self.contains(id) {
                    Ok(id.to_string())
                } else {
                    Err(Error::CircuitNotFound(id.to_string()))
                }
            }
            None => self.active_id().ok_or(Error::NoActiveCircuit),
        }
    }

    /// Remove a circuit and its cached result.
    ///
    /// If the removed circuit was active, the first remaining circuit (by
    /// creation order) becomes active.
    pub fn delete(&self, id: &str) -> Result<Circuit> {
        let mut state = self.state.write();
        let removed = state
            .circuits
            .shift_remove(id)
            .ok_or_else(|| Error::CircuitNotFound(id.to_string()))?;
        self.cache.evict(id);

        if state.active.as_deref() == Some(id) {
            state.active = None;
            let next = state.circuits.keys().next().cloned();
            state.mark_active(next.clone());
            match next {
                Some(next) => info!(circuit = id, promoted = %next, "deleted active circuit"),
                None => info!(circuit = id, "deleted last circuit"),
            }
        } else {
            info!(circuit = id, "deleted circuit");
        }
        Ok(removed)
    }

    /// Mutate a circuit under the write lock.
    pub fn update<T>(&self, id: &str, f: impl FnOnce(&mut Circuit) -> Result<T>) -> Result<T> {
        let mut state = self.state.write();
        let circuit = state
            .circuits
            .get_mut(id)
            .ok_or_else(|| Error::CircuitNotFound(id.to_string()))?;
        f(circuit)
    }

    /// Cache an analysis result for a circuit that still exists.
    ///
    /// The registry read lock is held while writing so a concurrent `delete`
    /// cannot leave an orphaned cache entry behind.
    pub fn store_result(
        &self,
        id: &str,
        result: CachedAnalysisResult,
    ) -> Result<Arc<CachedAnalysisResult>> {
        let state = self.state.read();
        if !state.circuits.contains_key(id) {
            return Err(Error::CircuitNotFound(id.to_string()));
        }
        Ok(self.cache.store(id, result))
    }

    /// Most recent result for a circuit.
    pub fn result(&self, id: &str) -> Result<Arc<CachedAnalysisResult>> {
        self.cache
            .get(id)
            .ok_or_else(|| Error::NoResults(id.to_string()))
    }

    /// Drop every circuit and cached result.
    pub fn clear(&self) {
        let mut state = self.state.write();
        state.circuits.clear();
        state.active = None;
        self.cache.clear();
        debug!("registry cleared");
    }
}
