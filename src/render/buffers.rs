//! GPU buffer set backing the blade field.
//!
//! Rebuilds are full replacements: a new [`FieldBuffers`] is built from the
//! regenerated blade list and swapped in whole. Bind groups are owned by the
//! pipelines and recreated against the current set each dispatch, so nothing
//! here holds group state.

use bytemuck::{Pod, Zeroable};
use glam::Mat4;

use crate::core::{Error, Result};
use crate::field::blade::{Blade, BLADE_STRIDE};

/// Argument block for `draw_indexed_indirect`, in wgpu's required word order.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct DrawIndexedIndirect {
    pub index_count: u32,
    pub instance_count: u32,
    pub first_index: u32,
    pub base_vertex: i32,
    pub first_instance: u32,
}

pub struct FieldBuffers {
    blade_buffer: wgpu::Buffer,
    transform_buffer: wgpu::Buffer,
    indirect_buffer: wgpu::Buffer,
    blade_count: u32,
}

impl FieldBuffers {
    /// Create and fill the buffer set for one rebuilt field. `transforms`
    /// must hold one matrix per slot, identity for unoccupied rows.
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        blades: &[Blade],
        transforms: &[Mat4],
        index_count: u32,
    ) -> Self {
        let blade_count = blades.len() as u32;

        let blade_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("field_blades"),
            size: (blades.len() * BLADE_STRIDE) as u64,
            usage: wgpu::BufferUsages::STORAGE
                | wgpu::BufferUsages::COPY_DST
                | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });
        queue.write_buffer(&blade_buffer, 0, bytemuck::cast_slice(blades));

        let transform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("cell_transforms"),
            size: std::mem::size_of_val(transforms) as u64,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        queue.write_buffer(&transform_buffer, 0, bytemuck::cast_slice(transforms));

        let args = DrawIndexedIndirect {
            index_count,
            instance_count: blade_count,
            first_index: 0,
            base_vertex: 0,
            first_instance: 0,
        };
        let indirect_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("field_draw_args"),
            size: std::mem::size_of::<DrawIndexedIndirect>() as u64,
            usage: wgpu::BufferUsages::INDIRECT | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        queue.write_buffer(&indirect_buffer, 0, bytemuck::bytes_of(&args));

        Self {
            blade_buffer,
            transform_buffer,
            indirect_buffer,
            blade_count,
        }
    }

    /// Copy the blade buffer back to the host and block until it arrives.
    /// This is the one synchronization point in the system; callers decide
    /// whether a failure is fatal or just loses cut state.
    pub fn read_blades(&self, device: &wgpu::Device, queue: &wgpu::Queue) -> Result<Vec<Blade>> {
        let size = (self.blade_count as usize * BLADE_STRIDE) as u64;
        let staging = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("field_blade_staging"),
            size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("blade_readback_encoder"),
        });
        encoder.copy_buffer_to_buffer(&self.blade_buffer, 0, &staging, 0, size);
        queue.submit(std::iter::once(encoder.finish()));

        let slice = staging.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        let _ = device.poll(wgpu::PollType::Wait {
            submission_index: None,
            timeout: None,
        });

        rx.recv()
            .map_err(|_| Error::Readback("map callback never ran".into()))?
            .map_err(|e| Error::Readback(e.to_string()))?;

        let data = slice.get_mapped_range();
        let blades: Vec<Blade> = bytemuck::cast_slice(&data).to_vec();
        drop(data);
        staging.unmap();

        Ok(blades)
    }

    pub fn blade_buffer(&self) -> &wgpu::Buffer {
        &self.blade_buffer
    }

    pub fn transform_buffer(&self) -> &wgpu::Buffer {
        &self.transform_buffer
    }

    pub fn indirect_buffer(&self) -> &wgpu::Buffer {
        &self.indirect_buffer
    }

    pub fn blade_count(&self) -> u32 {
        self.blade_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indirect_args_are_five_words() {
        assert_eq!(std::mem::size_of::<DrawIndexedIndirect>(), 20);
    }

    #[test]
    fn test_indirect_args_word_order() {
        let args = DrawIndexedIndirect {
            index_count: 12,
            instance_count: 3000,
            first_index: 0,
            base_vertex: 0,
            first_instance: 0,
        };
        let words: &[u32] = bytemuck::cast_slice(bytemuck::bytes_of(&args));
        assert_eq!(words, &[12, 3000, 0, 0, 0]);
    }
}
