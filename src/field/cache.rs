//! Cut-state cache: persists per-blade cut amounts across deactivation.
//!
//! When a cell streams out, the field captures its blades' cut amounts here
//! keyed by the cell id. The entry is consumed (removed) by the rebuild that
//! next regenerates the cell. Entries for cells that never return stay until
//! `clear`; active cell counts are bounded, so this is accepted.

use std::collections::HashMap;

use crate::field::blade::BladeId;
use crate::field::cell::CellId;

#[derive(Default)]
pub struct CutCache {
    entries: HashMap<CellId, HashMap<BladeId, f32>>,
}

impl CutCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the cut state captured for `id`, replacing any prior entry.
    pub fn store(&mut self, id: CellId, cuts: HashMap<BladeId, f32>) {
        log::trace!("cached {} cut entries for cell {}", cuts.len(), id.raw());
        self.entries.insert(id, cuts);
    }

    /// Remove and return the entry for `id`. Consume-once: a second take
    /// returns None until the cell deactivates again.
    pub fn take(&mut self, id: CellId) -> Option<HashMap<BladeId, f32>> {
        self.entries.remove(&id)
    }

    pub fn contains(&self, id: CellId) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every entry, including cells that never reactivated.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::blade::CUT_FULL;
    use glam::Vec3;

    fn key() -> BladeId {
        BladeId::from_parts(0, Vec3::new(1.0, 0.0, 2.0), 0.5, 3.0)
    }

    #[test]
    fn test_take_consumes_entry() {
        let mut cache = CutCache::new();
        let id = CellId::next();

        let mut cuts = HashMap::new();
        cuts.insert(key(), CUT_FULL);
        cache.store(id, cuts);
        assert!(cache.contains(id));

        let taken = cache.take(id).expect("entry present");
        assert_eq!(taken.get(&key()), Some(&CUT_FULL));

        assert!(cache.take(id).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_store_replaces_prior_entry() {
        let mut cache = CutCache::new();
        let id = CellId::next();

        let mut first = HashMap::new();
        first.insert(key(), 0.5);
        cache.store(id, first);

        let mut second = HashMap::new();
        second.insert(key(), CUT_FULL);
        cache.store(id, second);

        assert_eq!(cache.len(), 1);
        let taken = cache.take(id).expect("entry present");
        assert_eq!(taken.get(&key()), Some(&CUT_FULL));
    }

    #[test]
    fn test_entries_independent_per_cell() {
        let mut cache = CutCache::new();
        let a = CellId::next();
        let b = CellId::next();

        cache.store(a, HashMap::new());
        cache.store(b, HashMap::new());
        assert_eq!(cache.len(), 2);

        cache.take(a);
        assert!(!cache.contains(a));
        assert!(cache.contains(b));
    }

    #[test]
    fn test_clear() {
        let mut cache = CutCache::new();
        cache.store(CellId::next(), HashMap::new());
        cache.store(CellId::next(), HashMap::new());
        cache.clear();
        assert!(cache.is_empty());
    }
}
