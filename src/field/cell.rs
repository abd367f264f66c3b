//! Streaming cell: a spatial unit that deterministically generates blades.
//!
//! Each cell owns a stable id allocated once for the lifetime of its
//! container; pooled reuse repositions the cell but keeps the id, which is
//! what ties a reactivated cell back to its render slot and cached cuts.
//! Generation is a pure function of the id and footprint, so re-invocation
//! always reproduces the same blade sequence.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use glam::{Mat4, Vec3};

use crate::core::config::{BladeDensity, FieldConfig};
use crate::field::blade::{Blade, BladeId};

/// Stable cell identifier. Allocated once per container; survives pool reuse.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellId(u64);

impl CellId {
    /// Allocate the next id from the process-wide counter.
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(0);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

/// Deterministic sequence generator (splitmix64).
struct BladeRng(u64);

impl BladeRng {
    fn new(seed: u64) -> Self {
        Self(seed)
    }

    fn next_u64(&mut self) -> u64 {
        self.0 = self.0.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.0;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }

    /// Uniform f32 in [0, 1).
    fn next_f32(&mut self) -> f32 {
        (self.next_u64() >> 40) as f32 / (1u64 << 24) as f32
    }

    /// Uniform f32 in [lo, hi).
    fn next_range(&mut self, lo: f32, hi: f32) -> f32 {
        lo + (hi - lo) * self.next_f32()
    }
}

/// A spatial streaming unit generating a deterministic set of blades.
pub struct Cell {
    id: CellId,
    width: f32,
    length: f32,
    density: BladeDensity,
    y_origin: f32,
    rotation_min: f32,
    rotation_max: f32,
    transform: Mat4,
    active: bool,
}

impl Cell {
    /// New cell with a freshly allocated id and an identity transform.
    pub fn from_config(config: &FieldConfig) -> Self {
        Self {
            id: CellId::next(),
            width: config.cell_width,
            length: config.cell_length,
            density: config.density,
            y_origin: config.y_origin,
            rotation_min: config.rotation_min,
            rotation_max: config.rotation_max,
            transform: Mat4::IDENTITY,
            active: false,
        }
    }

    pub fn id(&self) -> CellId {
        self.id
    }

    pub fn transform(&self) -> Mat4 {
        self.transform
    }

    pub fn set_transform(&mut self, transform: Mat4) {
        self.transform = transform;
    }

    /// Place the cell at a world position (translation-only transform).
    pub fn set_origin(&mut self, origin: Vec3) {
        self.transform = Mat4::from_translation(origin);
    }

    /// World position of the cell's local frame.
    pub fn origin(&self) -> Vec3 {
        self.transform.w_axis.truncate()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    /// Blade count this cell generates.
    pub fn blade_count(&self) -> u32 {
        self.density.count_for(self.width, self.length)
    }

    /// Deterministically generate this cell's blades for render slot `slot`.
    ///
    /// Draw order per blade is x, z, rotation, seed; positions span
    /// `[-width/2, width/2) x [-length/2, length/2)` at `y_origin`, yaw spans
    /// the configured rotation range. Each blade's identity is looked up in
    /// `previous_cuts` to restore its cut amount; misses start uncut.
    pub fn generate(
        &self,
        slot: u32,
        previous_cuts: Option<&HashMap<BladeId, f32>>,
    ) -> Vec<Blade> {
        let count = self.blade_count();
        let mut rng = BladeRng::new(self.id.raw());
        let mut blades = Vec::with_capacity(count as usize);

        for _ in 0..count {
            let x = rng.next_range(-self.width * 0.5, self.width * 0.5);
            let z = rng.next_range(-self.length * 0.5, self.length * 0.5);
            let rotation = rng.next_range(self.rotation_min, self.rotation_max);
            let seed = rng.next_f32();

            let position = Vec3::new(x, self.y_origin, z);
            let cut = previous_cuts
                .and_then(|cuts| cuts.get(&BladeId::from_parts(slot, position, seed, rotation)))
                .copied()
                .unwrap_or(0.0);

            blades.push(Blade {
                position: position.to_array(),
                seed,
                cut,
                cell_slot: slot,
                rotation,
                _pad: 0.0,
            });
        }

        blades
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::blade::CUT_FULL;

    fn test_config() -> FieldConfig {
        FieldConfig {
            density: BladeDensity::PerCell(64),
            ..FieldConfig::default()
        }
    }

    #[test]
    fn test_cell_ids_unique() {
        let config = test_config();
        let a = Cell::from_config(&config);
        let b = Cell::from_config(&config);
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_generation_deterministic() {
        let cell = Cell::from_config(&test_config());
        let first = cell.generate(0, None);
        let second = cell.generate(0, None);
        assert_eq!(first.len(), 64);
        assert_eq!(first, second);
    }

    #[test]
    fn test_generation_differs_between_cells() {
        let config = test_config();
        let a = Cell::from_config(&config);
        let b = Cell::from_config(&config);
        let blades_a = a.generate(0, None);
        let blades_b = b.generate(0, None);
        assert_ne!(blades_a, blades_b);
    }

    #[test]
    fn test_generation_respects_footprint_and_ranges() {
        let config = test_config();
        let cell = Cell::from_config(&config);
        let blades = cell.generate(7, None);

        for blade in &blades {
            assert!(blade.position[0].abs() <= config.cell_width * 0.5);
            assert_eq!(blade.position[1], config.y_origin);
            assert!(blade.position[2].abs() <= config.cell_length * 0.5);
            assert!(blade.seed >= 0.0 && blade.seed < 1.0);
            assert!(blade.rotation >= config.rotation_min);
            assert!(blade.rotation < config.rotation_max);
            assert_eq!(blade.cut, 0.0);
            assert_eq!(blade.cell_slot, 7);
        }
    }

    #[test]
    fn test_generation_restores_previous_cuts() {
        let cell = Cell::from_config(&test_config());
        let blades = cell.generate(2, None);

        let mut cuts = HashMap::new();
        cuts.insert(BladeId::from_blade(&blades[10]), CUT_FULL);

        let regenerated = cell.generate(2, Some(&cuts));
        assert_eq!(regenerated[10].cut, CUT_FULL);
        for (i, blade) in regenerated.iter().enumerate() {
            if i != 10 {
                assert_eq!(blade.cut, 0.0);
            }
        }
    }

    #[test]
    fn test_cuts_keyed_to_slot() {
        let cell = Cell::from_config(&test_config());
        let blades = cell.generate(0, None);

        let mut cuts = HashMap::new();
        cuts.insert(BladeId::from_blade(&blades[0]), CUT_FULL);

        // Same cell regenerated under a different slot must not match
        let other_slot = cell.generate(1, Some(&cuts));
        assert_eq!(other_slot[0].cut, 0.0);
    }

    #[test]
    fn test_area_density() {
        let config = FieldConfig {
            density: BladeDensity::PerArea(0.25),
            ..FieldConfig::default()
        };
        let cell = Cell::from_config(&config);
        // 20 x 20 footprint at 0.25 blades per square meter
        assert_eq!(cell.blade_count(), 100);
        assert_eq!(cell.generate(0, None).len(), 100);
    }

    #[test]
    fn test_origin_round_trip() {
        let mut cell = Cell::from_config(&test_config());
        assert_eq!(cell.origin(), Vec3::ZERO);
        cell.set_origin(Vec3::new(0.0, 0.0, 40.0));
        assert_eq!(cell.origin(), Vec3::new(0.0, 0.0, 40.0));
    }
}
