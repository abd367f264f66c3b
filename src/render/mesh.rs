//! Shared blade geometry, instanced once per blade.

use bytemuck::{Pod, Zeroable};

pub const BLADE_WIDTH: f32 = 0.06;
pub const BLADE_HEIGHT: f32 = 1.0;
/// Quad rows below the tip triangle.
const SEGMENTS: u32 = 3;

#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct BladeVertex {
    pub position: [f32; 3],
    pub uv: [f32; 2],
}

impl BladeVertex {
    pub const LAYOUT: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<BladeVertex>() as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &[
            wgpu::VertexAttribute {
                offset: 0,
                shader_location: 0,
                format: wgpu::VertexFormat::Float32x3,
            },
            wgpu::VertexAttribute {
                offset: 12,
                shader_location: 1,
                format: wgpu::VertexFormat::Float32x2,
            },
        ],
    };
}

/// Tapered strip in blade-local space: origin at the root, +y up, with
/// `uv.y` running root to tip for shading and cut scaling.
fn build_geometry() -> (Vec<BladeVertex>, Vec<u16>) {
    let mut vertices = Vec::with_capacity(SEGMENTS as usize * 2 + 1);
    let mut indices = Vec::with_capacity((SEGMENTS as usize - 1) * 6 + 3);

    for row in 0..SEGMENTS {
        let t = row as f32 / SEGMENTS as f32;
        let half = BLADE_WIDTH * 0.5 * (1.0 - t);
        let y = BLADE_HEIGHT * t;
        vertices.push(BladeVertex {
            position: [-half, y, 0.0],
            uv: [0.0, t],
        });
        vertices.push(BladeVertex {
            position: [half, y, 0.0],
            uv: [1.0, t],
        });
    }
    vertices.push(BladeVertex {
        position: [0.0, BLADE_HEIGHT, 0.0],
        uv: [0.5, 1.0],
    });

    for row in 0..SEGMENTS - 1 {
        let base = (row * 2) as u16;
        indices.extend_from_slice(&[base, base + 1, base + 2, base + 2, base + 1, base + 3]);
    }
    let last = ((SEGMENTS - 1) * 2) as u16;
    let tip = (SEGMENTS * 2) as u16;
    indices.extend_from_slice(&[last, last + 1, tip]);

    (vertices, indices)
}

pub struct BladeMesh {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
}

impl BladeMesh {
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        let (vertices, indices) = build_geometry();
        let index_count = indices.len() as u32;

        let vertex_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("blade_mesh_vertices"),
            size: std::mem::size_of_val(vertices.as_slice()) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        queue.write_buffer(&vertex_buffer, 0, bytemuck::cast_slice(&vertices));

        // Pad the upload to the 4-byte copy alignment; the draw still uses
        // the real index count.
        let mut padded = indices;
        if padded.len() % 2 != 0 {
            padded.push(0);
        }
        let index_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("blade_mesh_indices"),
            size: std::mem::size_of_val(padded.as_slice()) as u64,
            usage: wgpu::BufferUsages::INDEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        queue.write_buffer(&index_buffer, 0, bytemuck::cast_slice(&padded));

        Self {
            vertex_buffer,
            index_buffer,
            index_count,
        }
    }

    pub fn vertex_buffer(&self) -> &wgpu::Buffer {
        &self.vertex_buffer
    }

    pub fn index_buffer(&self) -> &wgpu::Buffer {
        &self.index_buffer
    }

    pub fn index_count(&self) -> u32 {
        self.index_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertex_stride() {
        assert_eq!(std::mem::size_of::<BladeVertex>(), 20);
    }

    #[test]
    fn test_geometry_counts() {
        let (vertices, indices) = build_geometry();
        assert_eq!(vertices.len(), SEGMENTS as usize * 2 + 1);
        assert_eq!(indices.len(), (SEGMENTS as usize - 1) * 6 + 3);
        assert_eq!(indices.len() % 3, 0);
    }

    #[test]
    fn test_indices_reference_valid_vertices() {
        let (vertices, indices) = build_geometry();
        let count = vertices.len() as u16;
        assert!(indices.iter().all(|&i| i < count));
    }

    #[test]
    fn test_strip_tapers_toward_tip() {
        let (vertices, _) = build_geometry();
        let tip = vertices.last().expect("non-empty");
        assert_eq!(tip.position, [0.0, BLADE_HEIGHT, 0.0]);
        assert_eq!(tip.uv, [0.5, 1.0]);

        // Row widths shrink monotonically
        let mut previous = f32::MAX;
        for row in vertices[..vertices.len() - 1].chunks_exact(2) {
            let width = row[1].position[0] - row[0].position[0];
            assert!(width < previous);
            assert!(width > 0.0);
            previous = width;
        }
    }
}
