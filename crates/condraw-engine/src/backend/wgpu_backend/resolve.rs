use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

/// Upper bound on indirect argument words per gated command.
pub(super) const MAX_ARGS: usize = 8;

const WORKGROUP_SIZE: u32 = 64;

/// One gated command as the resolve shader sees it.
///
/// The shader writes `args[..len] * gate` to `indirect[dst_word..]`, where `gate`
/// is 1 if `conditions[cond_word]` passes (after `invert`) and 0 otherwise. A
/// zeroed argument block is a no-op for both dispatches and draws.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Pod, Zeroable)]
pub(super) struct GateRecord {
    pub cond_word: u32,
    pub invert: u32,
    pub dst_word: u32,
    pub len: u32,
    pub args: [u32; MAX_ARGS],
}

/// Resolve work for the gates reading one predicate buffer.
pub(super) struct ResolveBatch {
    group: wgpu::BindGroup,
    workgroups: u32,
}

/// Compute pipeline that turns predicate memory into indirect arguments.
pub(super) struct ResolveKit {
    pipeline: wgpu::ComputePipeline,
    layout: wgpu::BindGroupLayout,
}

impl ResolveKit {
    pub(super) fn new(device: &wgpu::Device) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("condraw resolve shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/resolve.wgsl").into()),
        });

        let storage = |binding, read_only| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::COMPUTE,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Storage { read_only },
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        };

        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("condraw resolve bgl"),
            entries: &[storage(0, true), storage(1, true), storage(2, false)],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("condraw resolve pipeline layout"),
            bind_group_layouts: &[&layout],
            immediate_size: 0,
        });

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("condraw resolve pipeline"),
            layout: Some(&pipeline_layout),
            module: &shader,
            entry_point: Some("resolve"),
            compilation_options: Default::default(),
            cache: None,
        });

        Self { pipeline, layout }
    }

    /// Uploads `records` and binds them with the predicate and argument buffers.
    pub(super) fn batch(
        &self,
        device: &wgpu::Device,
        predicate: &wgpu::Buffer,
        records: &[GateRecord],
        indirect: &wgpu::Buffer,
    ) -> ResolveBatch {
        let records_buf = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("condraw gate records"),
            contents: bytemuck::cast_slice(records),
            usage: wgpu::BufferUsages::STORAGE,
        });

        let group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("condraw resolve bind group"),
            layout: &self.layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: predicate.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: records_buf.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: indirect.as_entire_binding(),
                },
            ],
        });

        ResolveBatch {
            group,
            workgroups: workgroups_for(records.len() as u32),
        }
    }

    /// Records one compute pass resolving every batch. Must precede any pass that
    /// consumes the argument buffer.
    pub(super) fn encode(&self, encoder: &mut wgpu::CommandEncoder, batches: &[ResolveBatch]) {
        if batches.is_empty() {
            return;
        }
        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some("condraw resolve pass"),
            timestamp_writes: None,
        });
        pass.set_pipeline(&self.pipeline);
        for batch in batches {
            pass.set_bind_group(0, &batch.group, &[]);
            pass.dispatch_workgroups(batch.workgroups, 1, 1);
        }
    }
}

fn workgroups_for(records: u32) -> u32 {
    records.div_ceil(WORKGROUP_SIZE).max(1)
}
