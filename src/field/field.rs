//! Blade field: active cell registry, slot table, GPU buffers, draw state.
//!
//! The field owns the authoritative set of active cells and everything
//! derived from it: the stable slot assignments, the cut-state cache, the
//! CPU-side blade and transform tables, and the GPU-resident buffers. Any
//! registration change marks the field dirty; the next tick rebuilds
//! everything from scratch (full replace, never incremental).
//!
//! Slots are assigned monotonically per cell id and never recycled, so a
//! reactivated cell lands back on its old slot and its persisted blade
//! identities stay valid. The table is bounded by `max_cells`; once the
//! ceiling is reached, cells with new ids are tracked but not drawn. Long
//! sessions that stream through more distinct ids than the ceiling therefore
//! need pooled containers (stable ids) to keep every cell drawable.

use std::collections::HashMap;

use glam::{Mat4, Vec3};

use crate::core::config::FieldConfig;
use crate::field::blade::{Blade, BladeId};
use crate::field::cache::CutCache;
use crate::field::cell::{Cell, CellId};
use crate::math::Aabb;
use crate::render::buffers::FieldBuffers;

pub struct BladeField {
    config: FieldConfig,
    /// World position the empty-field bounds collapse to.
    origin: Vec3,
    /// Active cells in registration order.
    active: Vec<Cell>,
    /// Permanent slot assignment per cell id.
    slots: HashMap<CellId, u32>,
    next_slot: u32,
    dirty: bool,
    rebuild_count: u64,
    /// Transform table indexed by slot; unoccupied rows hold identity.
    transforms: Vec<Mat4>,
    /// Blades produced by the last rebuild, in registration order.
    blades: Vec<Blade>,
    cache: CutCache,
    buffers: Option<FieldBuffers>,
    bounds: Aabb,
}

impl BladeField {
    pub fn new(config: FieldConfig) -> Self {
        let max_cells = config.max_cells as usize;
        Self {
            config,
            origin: Vec3::ZERO,
            active: Vec::new(),
            slots: HashMap::new(),
            next_slot: 0,
            dirty: false,
            rebuild_count: 0,
            transforms: vec![Mat4::IDENTITY; max_cells],
            blades: Vec::new(),
            cache: CutCache::new(),
            buffers: None,
            bounds: Aabb::default(),
        }
    }

    pub fn config(&self) -> &FieldConfig {
        &self.config
    }

    pub fn set_origin(&mut self, origin: Vec3) {
        self.origin = origin;
    }

    /// Activate a cell. First-ever ids get the next free slot; returning ids
    /// keep the slot they held before. Past the slot ceiling the cell is
    /// tracked but will not be drawn.
    pub fn register_cell(&mut self, mut cell: Cell) {
        let id = cell.id();
        if self.active.iter().any(|c| c.id() == id) {
            log::debug!("cell {} already registered", id.raw());
            return;
        }

        if !self.slots.contains_key(&id) {
            if self.next_slot < self.config.max_cells {
                self.slots.insert(id, self.next_slot);
                self.next_slot += 1;
            } else {
                log::warn!(
                    "cell {} exceeds the {}-slot ceiling; tracked but not drawn",
                    id.raw(),
                    self.config.max_cells
                );
            }
        }

        cell.set_active(true);
        self.active.push(cell);
        self.dirty = true;
    }

    /// Deactivate a cell and hand its container back. The slot stays
    /// reserved for this id. Unknown ids return None and change nothing.
    pub fn unregister_cell(&mut self, id: CellId) -> Option<Cell> {
        let index = self.active.iter().position(|c| c.id() == id)?;
        let mut cell = self.active.remove(index);
        cell.set_active(false);
        self.dirty = true;
        Some(cell)
    }

    /// Capture cut state for `id` from a blade buffer snapshot, then
    /// unregister it. Readback failure loses the capture for this
    /// deactivation only; the cell still streams out normally.
    pub fn deactivate_cell(
        &mut self,
        id: CellId,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
    ) -> Option<Cell> {
        if let Some(snapshot) = self.snapshot_blades(device, queue) {
            self.capture_cuts(id, &snapshot);
        }
        self.unregister_cell(id)
    }

    /// Cache the identity to cut-amount map for `id` from a buffer snapshot,
    /// keeping only blades owned by the cell's slot.
    pub fn capture_cuts(&mut self, id: CellId, snapshot: &[Blade]) {
        let Some(&slot) = self.slots.get(&id) else {
            return;
        };
        let cuts: HashMap<BladeId, f32> = snapshot
            .iter()
            .filter(|b| b.cell_slot == slot)
            .map(|b| (BladeId::from_blade(b), b.cut))
            .collect();
        self.cache.store(id, cuts);
    }

    /// Rebuild the transform table and blade list if the field is dirty.
    ///
    /// `previous` is the prior buffer contents; it seeds a cross-cell
    /// fallback map consulted for cells with no cached entry of their own,
    /// so cut state survives rebuilds that never went through deactivation.
    /// Returns true when a rebuild ran.
    pub fn refresh_with(&mut self, previous: Option<&[Blade]>) -> bool {
        if !self.dirty {
            return false;
        }
        self.dirty = false;
        self.rebuild_count += 1;

        let mut fallback: HashMap<BladeId, f32> = HashMap::new();
        if let Some(prev) = previous {
            fallback.reserve(prev.len());
            for blade in prev {
                fallback.insert(BladeId::from_blade(blade), blade.cut);
            }
        }

        self.transforms = vec![Mat4::IDENTITY; self.config.max_cells as usize];
        let mut blades = Vec::new();

        for cell in &self.active {
            let Some(&slot) = self.slots.get(&cell.id()) else {
                continue; // over the ceiling, no transform row
            };
            self.transforms[slot as usize] = cell.transform();

            let taken = self.cache.take(cell.id());
            let cuts = taken.as_ref().unwrap_or(&fallback);
            blades.extend(cell.generate(slot, Some(cuts)));
        }

        self.blades = blades;
        true
    }

    /// Union of active cell origins grown by the configured margin. Falls
    /// back to a unit box around the field origin when nothing is active.
    pub fn compute_bounds(&self) -> Aabb {
        let mut cells = self.active.iter();
        let Some(first) = cells.next() else {
            return Aabb::from_center_half_extent(self.origin, Vec3::splat(0.5));
        };

        let mut bounds = Aabb::from_point(first.origin());
        for cell in cells {
            bounds.expand(cell.origin());
        }
        bounds.inflate(self.config.bounds_margin);
        bounds
    }

    /// Per-frame update: rebuild and re-upload if dirty, then refresh the
    /// draw bounds. The readback that seeds the rebuild fallback is the only
    /// blocking operation here.
    pub fn tick(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        index_count: u32,
    ) -> Aabb {
        if self.dirty {
            let previous = self.snapshot_blades(device, queue);
            self.refresh_with(previous.as_deref());
            self.upload(device, queue, index_count);
        }
        self.bounds = self.compute_bounds();
        self.bounds
    }

    fn snapshot_blades(&self, device: &wgpu::Device, queue: &wgpu::Queue) -> Option<Vec<Blade>> {
        let buffers = self.buffers.as_ref()?;
        if buffers.blade_count() == 0 {
            return None;
        }
        match buffers.read_blades(device, queue) {
            Ok(blades) => Some(blades),
            Err(e) => {
                log::warn!("blade readback failed, cut state not carried over: {}", e);
                None
            }
        }
    }

    fn upload(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, index_count: u32) {
        if self.blades.is_empty() {
            if self.active.is_empty() {
                log::info!("no active cells, blade buffers released");
            } else {
                log::warn!("active cells produced no blades, blade buffers released");
            }
            self.buffers = None;
            return;
        }

        // Full replace. The prior buffer set drops only after its
        // replacement exists; wgpu defers destruction past in-flight work.
        let next = FieldBuffers::new(device, queue, &self.blades, &self.transforms, index_count);
        self.buffers = Some(next);
        log::debug!(
            "rebuilt blade buffers: {} blades across {} cells",
            self.blades.len(),
            self.active.len()
        );
    }

    pub fn buffers(&self) -> Option<&FieldBuffers> {
        self.buffers.as_ref()
    }

    /// Blades currently resident (zero until the first rebuild).
    pub fn blade_count(&self) -> u32 {
        self.blades.len() as u32
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Slot assigned to `id`, or None if it was never granted one.
    pub fn slot_of(&self, id: CellId) -> Option<u32> {
        self.slots.get(&id).copied()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Rebuilds performed since creation.
    pub fn rebuild_count(&self) -> u64 {
        self.rebuild_count
    }

    pub fn blades(&self) -> &[Blade] {
        &self.blades
    }

    pub fn transforms(&self) -> &[Mat4] {
        &self.transforms
    }

    pub fn cut_cache(&self) -> &CutCache {
        &self.cache
    }

    pub fn cut_cache_mut(&mut self) -> &mut CutCache {
        &mut self.cache
    }

    pub fn bounds(&self) -> Aabb {
        self.bounds
    }
}
