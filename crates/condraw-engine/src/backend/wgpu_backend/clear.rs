use std::num::NonZeroU64;

use crate::backend::{align_up, Rgba};

const COLOR_SIZE: u64 = std::mem::size_of::<Rgba>() as u64;

/// Per-list clear colors, one aligned slot each, selected by dynamic offset.
pub(super) struct ClearColors {
    group: wgpu::BindGroup,
    stride: u64,
}

impl ClearColors {
    pub(super) fn group(&self) -> &wgpu::BindGroup {
        &self.group
    }

    pub(super) fn offset(&self, index: usize) -> u32 {
        (index as u64 * self.stride) as u32
    }
}

/// Clears a rect of the color attachment by drawing over it.
///
/// Attachment clears inside a pass have no wgpu equivalent, and a pass-level
/// clear could not be gated.
pub(super) struct ClearKit {
    pipeline: wgpu::RenderPipeline,
    layout: wgpu::BindGroupLayout,
}

impl ClearKit {
    pub(super) fn new(device: &wgpu::Device, format: wgpu::TextureFormat) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("condraw clear shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/clear.wgsl").into()),
        });

        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("condraw clear bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: NonZeroU64::new(COLOR_SIZE),
                },
                count: None,
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("condraw clear pipeline layout"),
            bind_group_layouts: &[&layout],
            immediate_size: 0,
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("condraw clear pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_clear"),
                compilation_options: Default::default(),
                buffers: &[],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_clear"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState::default(),
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        Self { pipeline, layout }
    }

    #[inline]
    pub(super) fn pipeline(&self) -> &wgpu::RenderPipeline {
        &self.pipeline
    }

    /// Uploads `colors` into a uniform buffer with `alignment`-spaced slots.
    pub(super) fn colors(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        colors: &[Rgba],
        alignment: u64,
    ) -> ClearColors {
        let stride = align_up(COLOR_SIZE, alignment.max(COLOR_SIZE));
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("condraw clear colors"),
            size: stride * colors.len().max(1) as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        for (i, color) in colors.iter().enumerate() {
            queue.write_buffer(&buffer, i as u64 * stride, bytemuck::cast_slice(color));
        }

        let group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("condraw clear bind group"),
            layout: &self.layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &buffer,
                    offset: 0,
                    size: NonZeroU64::new(COLOR_SIZE),
                }),
            }],
        });

        ClearColors { group, stride }
    }
}
