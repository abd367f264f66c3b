//! Sliding window of pooled cells along the travel axis.
//!
//! The streamer keeps a fixed number of cells registered ahead of the
//! viewer. Cells that fall fully behind the viewer are deactivated and
//! their containers returned to the pool; fresh rows are spawned ahead
//! from the same pool. Reused containers keep their ids, so the field
//! hands them the same slot (and the same persisted cut state) every
//! time they come around.

use std::collections::VecDeque;

use glam::Vec3;

use crate::core::config::FieldConfig;
use crate::core::events::{EventBus, ViewerMovedEvent};
use crate::core::pool::Pool;
use crate::field::cell::{Cell, CellId};
use crate::field::field::BladeField;

struct WindowSlot {
    id: CellId,
    origin_z: f32,
}

pub struct CellStreamer {
    pool: Pool<Cell>,
    /// Active rows, front = furthest behind the viewer.
    window: VecDeque<WindowSlot>,
    next_row: i64,
    cell_length: f32,
    visible: u32,
    last_position: Vec3,
}

impl CellStreamer {
    pub fn new(config: &FieldConfig) -> Self {
        let cfg = config.clone();
        let mut pool = Pool::new(move || Cell::from_config(&cfg));
        pool.prewarm(config.pool_prewarm as usize);

        Self {
            pool,
            window: VecDeque::new(),
            next_row: 0,
            cell_length: config.cell_length,
            visible: config.visible_cells,
            last_position: Vec3::ZERO,
        }
    }

    /// Update the window for a new viewer position. Evicted cells are
    /// unregistered without a cut-state capture; use [`advance_gpu`] when
    /// a blade buffer is resident.
    ///
    /// [`advance_gpu`]: Self::advance_gpu
    pub fn advance(&mut self, viewer: Vec3, field: &mut BladeField, bus: &EventBus) {
        self.step(viewer, field, bus, None);
    }

    /// Like [`advance`], but evicted cells capture their cut state from the
    /// resident blade buffer before leaving.
    ///
    /// [`advance`]: Self::advance
    pub fn advance_gpu(
        &mut self,
        viewer: Vec3,
        field: &mut BladeField,
        bus: &EventBus,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
    ) {
        self.step(viewer, field, bus, Some((device, queue)));
    }

    fn step(
        &mut self,
        viewer: Vec3,
        field: &mut BladeField,
        bus: &EventBus,
        gpu: Option<(&wgpu::Device, &wgpu::Queue)>,
    ) {
        if viewer != self.last_position {
            bus.publish(&ViewerMovedEvent {
                position: viewer,
                previous: self.last_position,
            });
            self.last_position = viewer;
        }

        // Evict rows whose far edge is behind the viewer.
        while self
            .window
            .front()
            .is_some_and(|front| front.origin_z + self.cell_length < viewer.z)
        {
            let Some(slot) = self.window.pop_front() else {
                break;
            };
            let cell = match gpu {
                Some((device, queue)) => field.deactivate_cell(slot.id, device, queue),
                None => field.unregister_cell(slot.id),
            };
            match cell {
                Some(cell) => self.pool.release(cell),
                None => log::warn!("evicted cell {} was not registered", slot.id.raw()),
            }
        }

        // Spawn rows ahead until the window is full again.
        while (self.window.len() as u32) < self.visible {
            let mut cell = self.pool.acquire();
            let origin_z = self.next_row as f32 * self.cell_length;
            cell.set_origin(Vec3::new(0.0, 0.0, origin_z));
            self.next_row += 1;

            self.window.push_back(WindowSlot {
                id: cell.id(),
                origin_z,
            });
            field.register_cell(cell);
        }
    }

    pub fn window_len(&self) -> usize {
        self.window.len()
    }

    pub fn window_ids(&self) -> impl Iterator<Item = CellId> + '_ {
        self.window.iter().map(|slot| slot.id)
    }

    pub fn pool(&self) -> &Pool<Cell> {
        &self.pool
    }
}
