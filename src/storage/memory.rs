use crate::clustering::{Area, CONVERGENCE_TOLERANCE};
use crate::error::{EngineError, EngineResult};
use crate::types::AreaId;
use dashmap::DashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::info;

/// Process-wide registry of areas.
///
/// Lookups and creations go through a sharded map, so they proceed
/// concurrently; each area carries its own lock for everything else.
/// Cloning yields another handle to the same registry.
#[derive(Clone, Debug)]
pub struct AreaStore {
    areas: Arc<DashMap<AreaId, Arc<Area>>>,
    next_id: Arc<AtomicU64>,
    tolerance: f64,
}

impl AreaStore {
    pub fn new() -> Self {
        Self::with_tolerance(CONVERGENCE_TOLERANCE)
    }

    /// Creates a registry whose areas use `tolerance` in their convergence test.
    pub fn with_tolerance(tolerance: f64) -> Self {
        Self {
            areas: Arc::new(DashMap::new()),
            next_id: Arc::new(AtomicU64::new(1)),
            tolerance,
        }
    }

    /// Creates an empty area and returns its freshly issued id.
    pub fn create(&self) -> AreaId {
        let raw = self.next_id.fetch_add(1, Ordering::Relaxed);
        // Counter starts at 1 and only grows
        let id = AreaId::new(raw).unwrap_or_else(|| unreachable!("area ids start at 1"));

        self.areas
            .insert(id, Arc::new(Area::with_tolerance(id, self.tolerance)));
        info!(area = %id, total = self.areas.len(), "area created");
        id
    }

    pub fn get(&self, id: AreaId) -> EngineResult<Arc<Area>> {
        self.areas
            .get(&id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or(EngineError::UnknownArea {
                id: id.get() as i64,
            })
    }

    /// Looks up an area by a caller-supplied integer.
    pub fn get_raw(&self, id: i64) -> EngineResult<Arc<Area>> {
        self.get(AreaId::from_raw(id)?)
    }

    pub fn len(&self) -> usize {
        self.areas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.areas.is_empty()
    }

    /// Ids of all live areas, ascending.
    pub fn ids(&self) -> Vec<AreaId> {
        let mut ids: Vec<AreaId> = self.areas.iter().map(|entry| *entry.key()).collect();
        ids.sort_unstable();
        ids
    }
}

impl Default for AreaStore {
    fn default() -> Self {
        Self::new()
    }
}
