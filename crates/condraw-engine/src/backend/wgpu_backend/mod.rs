//! wgpu implementation of [`Backend`].
//!
//! wgpu has no conditional-rendering command. Each submission starts with a
//! resolve pass that reads predicate memory on the device and writes indirect
//! argument blocks; gated dispatches, clears and draws are then issued as
//! indirect calls. The host never reads the predicate.

mod clear;
mod lower;
mod resolve;

use std::collections::{HashMap, VecDeque};
use std::num::NonZeroU64;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use wgpu::util::DeviceExt;

use crate::command::CommandList;
use crate::model::Mesh;

use super::{
    Backend, BackendError, BindPoint, BindingEntry, BindingKind, BindingLayoutDesc, BindingSetId,
    BufferDesc, BufferId, BufferRegion, BufferUsage, Capabilities, ComputePipelineDesc,
    GraphicsPipelineDesc, LayoutId, MeshId, PipelineId, Rect2D, SubmissionToken,
};

use clear::{ClearColors, ClearKit};
use lower::{Pass, Plan, Step};
use resolve::{ResolveBatch, ResolveKit};

/// Downlevel flags the lowering relies on.
pub const REQUIRED_DOWNLEVEL: wgpu::DownlevelFlags =
    wgpu::DownlevelFlags::INDIRECT_EXECUTION.union(wgpu::DownlevelFlags::COMPUTE_SHADERS);

struct GpuBuffer {
    buffer: wgpu::Buffer,
    size: u64,
}

struct GpuLayout {
    layout: wgpu::BindGroupLayout,
    entries: Vec<super::LayoutEntry>,
}

enum GpuPipeline {
    Render(wgpu::RenderPipeline),
    Compute(wgpu::ComputePipeline),
}

struct GpuMesh {
    vertices: wgpu::Buffer,
    indices: wgpu::Buffer,
    index_count: u32,
}

/// Device objects derived from one revision of a command list.
struct Prepared {
    revision: u64,
    plan: Plan,
    indirect: Option<wgpu::Buffer>,
    batches: Vec<ResolveBatch>,
    clears: Option<ClearColors>,
}

#[derive(Default)]
struct BindState {
    compute_pipeline: Option<PipelineId>,
    compute_set: Option<BindingSetId>,
    graphics_pipeline: Option<PipelineId>,
    graphics_set: Option<BindingSetId>,
}

pub struct WgpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,
    caps: Capabilities,

    buffers: Vec<GpuBuffer>,
    layouts: Vec<GpuLayout>,
    sets: Vec<wgpu::BindGroup>,
    pipelines: Vec<GpuPipeline>,
    meshes: Vec<GpuMesh>,

    resolve: ResolveKit,
    clear: ClearKit,
    prepared: HashMap<u64, Prepared>,

    next_token: u64,
    completed: Arc<AtomicU64>,
    in_flight: VecDeque<(SubmissionToken, wgpu::SubmissionIndex)>,
}

impl WgpuBackend {
    /// Wraps an existing device. `color_format` is the format of every target
    /// passed to [`Backend::submit`].
    pub fn new(
        device: wgpu::Device,
        queue: wgpu::Queue,
        caps: Capabilities,
        color_format: wgpu::TextureFormat,
    ) -> Self {
        let resolve = ResolveKit::new(&device);
        let clear = ClearKit::new(&device, color_format);
        Self {
            device,
            queue,
            caps,
            buffers: Vec::new(),
            layouts: Vec::new(),
            sets: Vec::new(),
            pipelines: Vec::new(),
            meshes: Vec::new(),
            resolve,
            clear,
            prepared: HashMap::new(),
            next_token: 1,
            completed: Arc::new(AtomicU64::new(0)),
            in_flight: VecDeque::new(),
        }
    }

    /// Derives backend capabilities from what the adapter reports.
    pub fn probe(downlevel: &wgpu::DownlevelCapabilities, limits: &wgpu::Limits) -> Capabilities {
        capabilities_from(downlevel.flags, limits)
    }

    fn buffer(&self, id: BufferId) -> Result<&GpuBuffer, BackendError> {
        self.buffers.get(id.index()).ok_or(BackendError::UnknownHandle {
            kind: "buffer",
            index: id.0,
        })
    }

    fn group(&self, id: BindingSetId) -> Result<&wgpu::BindGroup, BackendError> {
        self.sets.get(id.0 as usize).ok_or(BackendError::UnknownHandle {
            kind: "binding set",
            index: id.0,
        })
    }

    fn pipeline(&self, id: PipelineId) -> Result<&GpuPipeline, BackendError> {
        self.pipelines
            .get(id.0 as usize)
            .ok_or(BackendError::UnknownHandle {
                kind: "pipeline",
                index: id.0,
            })
    }

    fn layout(&self, id: LayoutId) -> Result<&GpuLayout, BackendError> {
        self.layouts
            .get(id.0 as usize)
            .ok_or(BackendError::UnknownHandle {
                kind: "binding layout",
                index: id.0,
            })
    }

    fn mesh(&self, id: MeshId) -> Result<&GpuMesh, BackendError> {
        self.meshes.get(id.0 as usize).ok_or(BackendError::UnknownHandle {
            kind: "mesh",
            index: id.0,
        })
    }

    /// Lowers `list` unless the cached plan already matches its revision.
    fn prepare(&mut self, list: &CommandList) -> Result<(), BackendError> {
        if self
            .prepared
            .get(&list.id())
            .is_some_and(|p| p.revision == list.revision())
        {
            return Ok(());
        }

        let meshes = &self.meshes;
        let plan = lower::lower(list, |id| {
            meshes
                .get(id.0 as usize)
                .map(|m| m.index_count)
                .ok_or(BackendError::UnknownHandle {
                    kind: "mesh",
                    index: id.0,
                })
        })?;

        let indirect = (plan.indirect_words > 0).then(|| {
            self.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("condraw indirect args"),
                size: u64::from(plan.indirect_words) * 4,
                usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::INDIRECT,
                mapped_at_creation: false,
            })
        });

        let mut batches = Vec::with_capacity(plan.gates.len());
        if let Some(indirect) = &indirect {
            for group in &plan.gates {
                let predicate = &self.buffer(group.predicate)?.buffer;
                batches.push(
                    self.resolve
                        .batch(&self.device, predicate, &group.records, indirect),
                );
            }
        }

        let clears = (!plan.clear_colors.is_empty()).then(|| {
            self.clear.colors(
                &self.device,
                &self.queue,
                &plan.clear_colors,
                self.caps.min_offset_alignment,
            )
        });

        log::debug!(
            "wgpu: prepared list {} rev {} ({} passes, {} gated commands)",
            list.id(),
            list.revision(),
            plan.passes.len(),
            plan.gates.iter().map(|g| g.records.len()).sum::<usize>()
        );

        self.prepared.insert(
            list.id(),
            Prepared {
                revision: list.revision(),
                plan,
                indirect,
                batches,
                clears,
            },
        );
        Ok(())
    }

    fn encode(
        &self,
        prepared: &Prepared,
        target: &wgpu::TextureView,
    ) -> Result<wgpu::CommandBuffer, BackendError> {
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("condraw frame encoder"),
            });

        self.resolve.encode(&mut encoder, &prepared.batches);

        let mut state = BindState::default();
        for pass in &prepared.plan.passes {
            match pass {
                Pass::Compute(steps) => {
                    self.encode_compute(&mut encoder, prepared, steps, &mut state)?
                }
                Pass::Render { area, steps } => {
                    self.encode_render(&mut encoder, prepared, target, *area, steps, &mut state)?
                }
            }
        }

        Ok(encoder.finish())
    }

    fn encode_compute(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        prepared: &Prepared,
        steps: &[Step],
        state: &mut BindState,
    ) -> Result<(), BackendError> {
        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some("condraw compute pass"),
            timestamp_writes: None,
        });

        if let Some(GpuPipeline::Compute(p)) =
            state.compute_pipeline.map(|id| self.pipeline(id)).transpose()?
        {
            pass.set_pipeline(p);
        }
        if let Some(set) = state.compute_set {
            pass.set_bind_group(0, self.group(set)?, &[]);
        }

        for step in steps {
            match step {
                Step::Bind(id) => match self.pipeline(*id)? {
                    GpuPipeline::Compute(p) => {
                        state.compute_pipeline = Some(*id);
                        pass.set_pipeline(p);
                    }
                    GpuPipeline::Render(_) => state.graphics_pipeline = Some(*id),
                },
                Step::Set { point, set } => match point {
                    BindPoint::Compute => {
                        state.compute_set = Some(*set);
                        pass.set_bind_group(0, self.group(*set)?, &[]);
                    }
                    BindPoint::Graphics => state.graphics_set = Some(*set),
                },
                Step::Dispatch { groups, indirect } => {
                    if state.compute_pipeline.is_none() || state.compute_set.is_none() {
                        return Err(BackendError::Malformed(
                            "dispatch without a bound compute pipeline and set".into(),
                        ));
                    }
                    match indirect {
                        Some(offset) => {
                            pass.dispatch_workgroups_indirect(indirect_buffer(prepared)?, *offset)
                        }
                        None => pass.dispatch_workgroups(groups[0], groups[1], groups[2]),
                    }
                }
                Step::Clear { .. } | Step::Draw { .. } => {
                    return Err(BackendError::Malformed("render command in a compute pass".into()));
                }
            }
        }
        Ok(())
    }

    fn encode_render(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        prepared: &Prepared,
        target: &wgpu::TextureView,
        area: Rect2D,
        steps: &[Step],
        state: &mut BindState,
    ) -> Result<(), BackendError> {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("condraw render pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });
        pass.set_scissor_rect(area.x, area.y, area.width, area.height);

        // Clears replace the pipeline and group 0; this puts the recorded ones back.
        let restore = |pass: &mut wgpu::RenderPass<'_>, state: &BindState| -> Result<(), BackendError> {
            if let Some(GpuPipeline::Render(p)) =
                state.graphics_pipeline.map(|id| self.pipeline(id)).transpose()?
            {
                pass.set_pipeline(p);
            }
            if let Some(set) = state.graphics_set {
                pass.set_bind_group(0, self.group(set)?, &[]);
            }
            Ok(())
        };
        restore(&mut pass, &*state)?;

        for step in steps {
            match step {
                Step::Bind(id) => match self.pipeline(*id)? {
                    GpuPipeline::Render(p) => {
                        state.graphics_pipeline = Some(*id);
                        pass.set_pipeline(p);
                    }
                    GpuPipeline::Compute(_) => state.compute_pipeline = Some(*id),
                },
                Step::Set { point, set } => match point {
                    BindPoint::Graphics => {
                        state.graphics_set = Some(*set);
                        pass.set_bind_group(0, self.group(*set)?, &[]);
                    }
                    BindPoint::Compute => state.compute_set = Some(*set),
                },
                Step::Clear {
                    color,
                    rect,
                    indirect,
                } => {
                    let Some(clip) = intersect(*rect, area) else {
                        continue;
                    };
                    let colors = prepared.clears.as_ref().ok_or_else(|| {
                        BackendError::Malformed("clear colors were not prepared".into())
                    })?;

                    pass.set_pipeline(self.clear.pipeline());
                    pass.set_bind_group(0, colors.group(), &[colors.offset(*color)]);
                    pass.set_scissor_rect(clip.x, clip.y, clip.width, clip.height);
                    match indirect {
                        Some(offset) => pass.draw_indirect(indirect_buffer(prepared)?, *offset),
                        None => pass.draw(0..3, 0..1),
                    }
                    pass.set_scissor_rect(area.x, area.y, area.width, area.height);
                    restore(&mut pass, &*state)?;
                }
                Step::Draw {
                    mesh,
                    instances,
                    index_count,
                    indirect,
                } => {
                    if state.graphics_pipeline.is_none() || state.graphics_set.is_none() {
                        return Err(BackendError::Malformed(
                            "draw without a bound graphics pipeline and set".into(),
                        ));
                    }
                    let mesh = self.mesh(*mesh)?;
                    pass.set_vertex_buffer(0, mesh.vertices.slice(..));
                    pass.set_index_buffer(mesh.indices.slice(..), wgpu::IndexFormat::Uint16);
                    match indirect {
                        Some(offset) => {
                            pass.draw_indexed_indirect(indirect_buffer(prepared)?, *offset)
                        }
                        None => pass.draw_indexed(0..*index_count, 0, 0..*instances),
                    }
                }
                Step::Dispatch { .. } => {
                    return Err(BackendError::Malformed("dispatch in a render pass".into()));
                }
            }
        }
        Ok(())
    }

    fn retire(&mut self) {
        let done = self.completed.load(Ordering::Acquire);
        while self.in_flight.front().is_some_and(|(t, _)| t.0 <= done) {
            self.in_flight.pop_front();
        }
    }
}

impl Backend for WgpuBackend {
    type Target = wgpu::TextureView;

    fn capabilities(&self) -> Capabilities {
        self.caps
    }

    fn create_buffer(&mut self, desc: &BufferDesc<'_>) -> Result<BufferId, BackendError> {
        if desc.size == 0 || desc.size % wgpu::COPY_BUFFER_ALIGNMENT != 0 {
            return Err(BackendError::creation(
                "buffer",
                desc.label,
                format!("size {} is not a non-zero multiple of 4", desc.size),
            ));
        }

        let usage = match desc.usage {
            BufferUsage::Uniform => wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            BufferUsage::Predicate => wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            BufferUsage::Storage => {
                wgpu::BufferUsages::STORAGE
                    | wgpu::BufferUsages::UNIFORM
                    | wgpu::BufferUsages::COPY_DST
            }
        };

        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(desc.label),
            size: desc.size,
            usage,
            mapped_at_creation: false,
        });

        let id = BufferId(self.buffers.len() as u32);
        self.buffers.push(GpuBuffer {
            buffer,
            size: desc.size,
        });
        Ok(id)
    }

    fn write_buffer(&mut self, region: BufferRegion, bytes: &[u8]) -> Result<(), BackendError> {
        let buffer = self.buffer(region.buffer)?;
        if region.end() > buffer.size {
            return Err(BackendError::RegionOutOfBounds {
                region,
                capacity: buffer.size,
            });
        }
        if bytes.len() as u64 != region.size {
            return Err(BackendError::Malformed(format!(
                "write of {} bytes into a {}-byte region",
                bytes.len(),
                region.size
            )));
        }
        self.queue.write_buffer(&buffer.buffer, region.offset, bytes);
        Ok(())
    }

    fn create_binding_layout(
        &mut self,
        desc: &BindingLayoutDesc<'_>,
    ) -> Result<LayoutId, BackendError> {
        let entries: Vec<wgpu::BindGroupLayoutEntry> = desc
            .entries
            .iter()
            .map(|e| wgpu::BindGroupLayoutEntry {
                binding: e.binding,
                visibility: e.stages,
                ty: wgpu::BindingType::Buffer {
                    ty: match e.kind {
                        BindingKind::UniformBuffer | BindingKind::TexelBuffer => {
                            wgpu::BufferBindingType::Uniform
                        }
                        BindingKind::StorageBuffer => {
                            wgpu::BufferBindingType::Storage { read_only: false }
                        }
                    },
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            })
            .collect();

        let layout = self
            .device
            .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some(desc.label),
                entries: &entries,
            });

        let id = LayoutId(self.layouts.len() as u32);
        self.layouts.push(GpuLayout {
            layout,
            entries: desc.entries.to_vec(),
        });
        Ok(id)
    }

    fn create_binding_set(
        &mut self,
        label: &str,
        layout: LayoutId,
        entries: &[BindingEntry],
    ) -> Result<BindingSetId, BackendError> {
        let layout = self.layout(layout)?;
        let alignment = self.caps.min_offset_alignment.max(1);

        let mut resolved = Vec::with_capacity(layout.entries.len());
        for layout_entry in &layout.entries {
            let entry = entries
                .iter()
                .find(|e| e.binding == layout_entry.binding)
                .ok_or_else(|| {
                    BackendError::creation(
                        "binding set",
                        label,
                        format!("binding {} has no resource", layout_entry.binding),
                    )
                })?;
            if entry.region.offset % alignment != 0 {
                return Err(BackendError::creation(
                    "binding set",
                    label,
                    format!("offset {} is not {alignment}-byte aligned", entry.region.offset),
                ));
            }
            let buffer = self.buffer(entry.region.buffer)?;
            if entry.region.end() > buffer.size {
                return Err(BackendError::RegionOutOfBounds {
                    region: entry.region,
                    capacity: buffer.size,
                });
            }
            resolved.push(wgpu::BindGroupEntry {
                binding: entry.binding,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &buffer.buffer,
                    offset: entry.region.offset,
                    size: NonZeroU64::new(entry.region.size),
                }),
            });
        }

        let group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout: &layout.layout,
            entries: &resolved,
        });

        let id = BindingSetId(self.sets.len() as u32);
        self.sets.push(group);
        Ok(id)
    }

    fn create_graphics_pipeline(
        &mut self,
        desc: &GraphicsPipelineDesc<'_>,
    ) -> Result<PipelineId, BackendError> {
        let layout = self.layout(desc.layout)?;

        let shader = self
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(desc.shader.label),
                source: wgpu::ShaderSource::Wgsl(desc.shader.wgsl.into()),
            });

        let pipeline_layout = self
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some(desc.label),
                bind_group_layouts: &[&layout.layout],
                immediate_size: 0,
            });

        let pipeline = self
            .device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(desc.label),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some(desc.vertex_entry),
                    compilation_options: Default::default(),
                    buffers: &[desc.vertex_layout.clone()],
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some(desc.fragment_entry),
                    compilation_options: Default::default(),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: desc.color_format,
                        blend: Some(wgpu::BlendState::REPLACE),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),
                primitive: wgpu::PrimitiveState {
                    topology: desc.topology,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    // No depth attachment: culling alone orders a convex mesh.
                    cull_mode: Some(wgpu::Face::Back),
                    polygon_mode: wgpu::PolygonMode::Fill,
                    unclipped_depth: false,
                    conservative: false,
                },
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview_mask: None,
                cache: None,
            });

        let id = PipelineId(self.pipelines.len() as u32);
        self.pipelines.push(GpuPipeline::Render(pipeline));
        Ok(id)
    }

    fn create_compute_pipeline(
        &mut self,
        desc: &ComputePipelineDesc<'_>,
    ) -> Result<PipelineId, BackendError> {
        if !self.caps.compute {
            return Err(BackendError::MissingCapability("compute"));
        }
        let layout = self.layout(desc.layout)?;

        let shader = self
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(desc.shader.label),
                source: wgpu::ShaderSource::Wgsl(desc.shader.wgsl.into()),
            });

        let pipeline_layout = self
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some(desc.label),
                bind_group_layouts: &[&layout.layout],
                immediate_size: 0,
            });

        let pipeline = self
            .device
            .create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some(desc.label),
                layout: Some(&pipeline_layout),
                module: &shader,
                entry_point: Some(desc.entry),
                compilation_options: Default::default(),
                cache: None,
            });

        let id = PipelineId(self.pipelines.len() as u32);
        self.pipelines.push(GpuPipeline::Compute(pipeline));
        Ok(id)
    }

    fn create_mesh(&mut self, label: &str, mesh: &Mesh) -> Result<MeshId, BackendError> {
        if mesh.indices.is_empty() {
            return Err(BackendError::creation("mesh", label, "no indices"));
        }

        let vertices = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents: bytemuck::cast_slice(&mesh.vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });
        let indices = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents: bytemuck::cast_slice(&mesh.indices),
                usage: wgpu::BufferUsages::INDEX,
            });

        let id = MeshId(self.meshes.len() as u32);
        self.meshes.push(GpuMesh {
            vertices,
            indices,
            index_count: mesh.index_count(),
        });
        Ok(id)
    }

    fn submit(
        &mut self,
        commands: &CommandList,
        target: &mut wgpu::TextureView,
    ) -> Result<SubmissionToken, BackendError> {
        self.prepare(commands)?;
        let prepared = self.prepared.get(&commands.id()).ok_or_else(|| {
            BackendError::Malformed(format!("list {} was not prepared", commands.id()))
        })?;
        let buffer = self.encode(prepared, target)?;

        let token = SubmissionToken(self.next_token);
        self.next_token += 1;

        let index = self.queue.submit(std::iter::once(buffer));
        let completed = Arc::clone(&self.completed);
        self.queue.on_submitted_work_done(move || {
            completed.fetch_max(token.0, Ordering::AcqRel);
        });
        self.in_flight.push_back((token, index));
        self.retire();

        log::trace!("wgpu: submitted list {} as token {}", commands.id(), token.0);
        Ok(token)
    }

    fn is_complete(&mut self, token: SubmissionToken) -> bool {
        if let Err(err) = self.device.poll(wgpu::PollType::Poll) {
            log::warn!("wgpu: poll failed: {err}");
        }
        self.retire();
        self.completed.load(Ordering::Acquire) >= token.0
    }

    fn wait(&mut self, token: SubmissionToken) -> Result<(), BackendError> {
        if token.0 >= self.next_token {
            return Err(BackendError::Device(format!(
                "waiting on submission {} that was never made",
                token.0
            )));
        }
        if self.completed.load(Ordering::Acquire) >= token.0 {
            return Ok(());
        }

        let index = self
            .in_flight
            .iter()
            .find(|(t, _)| *t == token)
            .map(|(_, index)| index.clone());

        self.device
            .poll(wgpu::PollType::Wait {
                submission_index: index,
                timeout: None,
            })
            .map_err(|err| BackendError::Device(err.to_string()))?;

        self.completed.fetch_max(token.0, Ordering::AcqRel);
        self.retire();
        Ok(())
    }

    fn wait_idle(&mut self) -> Result<(), BackendError> {
        self.device
            .poll(wgpu::PollType::wait_indefinitely())
            .map_err(|err| BackendError::Device(err.to_string()))?;
        self.completed
            .fetch_max(self.next_token - 1, Ordering::AcqRel);
        self.retire();
        Ok(())
    }
}

fn indirect_buffer(prepared: &Prepared) -> Result<&wgpu::Buffer, BackendError> {
    prepared
        .indirect
        .as_ref()
        .ok_or_else(|| BackendError::Malformed("gated command without an argument buffer".into()))
}

fn capabilities_from(flags: wgpu::DownlevelFlags, limits: &wgpu::Limits) -> Capabilities {
    Capabilities {
        conditional_execution: flags.contains(REQUIRED_DOWNLEVEL),
        compute: flags.contains(wgpu::DownlevelFlags::COMPUTE_SHADERS),
        min_offset_alignment: u64::from(
            limits
                .min_uniform_buffer_offset_alignment
                .max(limits.min_storage_buffer_offset_alignment),
        ),
    }
}

fn intersect(a: Rect2D, b: Rect2D) -> Option<Rect2D> {
    let x0 = a.x.max(b.x);
    let y0 = a.y.max(b.y);
    let x1 = (a.x + a.width).min(b.x + b.width);
    let y1 = (a.y + a.height).min(b.y + b.height);
    (x1 > x0 && y1 > y0).then(|| Rect2D {
        x: x0,
        y: y0,
        width: x1 - x0,
        height: y1 - y0,
    })
}
