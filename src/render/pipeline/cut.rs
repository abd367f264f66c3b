//! Blade cutting compute pipeline.
//!
//! One dispatch covers every resident blade: each invocation tests its
//! blade's world position against the cut sphere and writes the cut amount
//! in place. Results stay on the GPU until the next buffer readback.

use bytemuck::{Pod, Zeroable};
use glam::Vec3;

use crate::core::{Error, Result};
use crate::render::buffers::FieldBuffers;

/// Must match the `@workgroup_size` literal in `blade_cut.wgsl`.
pub const CUT_WORKGROUP_SIZE: u32 = 256;

/// Cut dispatch uniform
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct CutParams {
    pub center: [f32; 3],
    pub radius: f32,
    pub count: u32,
    pub _pad: [u32; 3],
}

pub struct CutPipeline {
    pipeline: wgpu::ComputePipeline,
    params_buffer: wgpu::Buffer,
    bind_group_layout: wgpu::BindGroupLayout,
}

impl CutPipeline {
    /// Build the pipeline. Shader or entry-point problems are setup errors
    /// and come back as [`Error::Config`].
    pub fn new(device: &wgpu::Device) -> Result<Self> {
        let error_scope = device.push_error_scope(wgpu::ErrorFilter::Validation);

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("blade_cut_shader"),
            source: wgpu::ShaderSource::Wgsl(
                include_str!("../../../shaders/blade_cut.wgsl").into(),
            ),
        });

        let params_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("cut_params"),
            size: std::mem::size_of::<CutParams>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("blade_cut_layout"),
                entries: &[
                    wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::COMPUTE,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Storage { read_only: false },
                            has_dynamic_offset: false,
                            min_binding_size: None,
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 1,
                        visibility: wgpu::ShaderStages::COMPUTE,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Storage { read_only: true },
                            has_dynamic_offset: false,
                            min_binding_size: None,
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 2,
                        visibility: wgpu::ShaderStages::COMPUTE,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Uniform,
                            has_dynamic_offset: false,
                            min_binding_size: None,
                        },
                        count: None,
                    },
                ],
            });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("blade_cut_pipeline_layout"),
            bind_group_layouts: &[&bind_group_layout],
            immediate_size: 0,
        });

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("blade_cut_pipeline"),
            layout: Some(&pipeline_layout),
            module: &shader,
            entry_point: Some("cut_blades"),
            compilation_options: Default::default(),
            cache: None,
        });

        if let Some(e) = pollster::block_on(error_scope.pop()) {
            return Err(Error::Config(format!("cut pipeline rejected: {}", e)));
        }

        Ok(Self {
            pipeline,
            params_buffer,
            bind_group_layout,
        })
    }

    /// Submit one cut dispatch against the current buffer set. The bind
    /// group is rebuilt here because the buffers are replaced wholesale on
    /// every field rebuild.
    pub fn dispatch(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        buffers: &FieldBuffers,
        center: Vec3,
        radius: f32,
    ) {
        let params = CutParams {
            center: center.to_array(),
            radius,
            count: buffers.blade_count(),
            _pad: [0; 3],
        };
        queue.write_buffer(&self.params_buffer, 0, bytemuck::bytes_of(&params));

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("blade_cut_bind_group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: buffers.blade_buffer().as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: buffers.transform_buffer().as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: self.params_buffer.as_entire_binding(),
                },
            ],
        });

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("blade_cut_encoder"),
        });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("blade_cut_pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            let groups = buffers.blade_count().div_ceil(CUT_WORKGROUP_SIZE);
            pass.dispatch_workgroups(groups, 1, 1);
        }
        queue.submit(std::iter::once(encoder.finish()));

        log::trace!(
            "cut dispatch at ({:.2}, {:.2}, {:.2}) r={:.2} over {} blades",
            center.x,
            center.y,
            center.z,
            radius,
            buffers.blade_count()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cut_params_layout() {
        assert_eq!(std::mem::size_of::<CutParams>(), 32);
        assert_eq!(std::mem::size_of::<CutParams>() % 16, 0);
    }

    #[test]
    fn test_workgroup_rounding() {
        assert_eq!(0u32.div_ceil(CUT_WORKGROUP_SIZE), 0);
        assert_eq!(1u32.div_ceil(CUT_WORKGROUP_SIZE), 1);
        assert_eq!(256u32.div_ceil(CUT_WORKGROUP_SIZE), 1);
        assert_eq!(257u32.div_ceil(CUT_WORKGROUP_SIZE), 2);
    }
}
