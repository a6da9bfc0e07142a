//! Host-side backend.
//!
//! Executes command lists synchronously against byte buffers. Compute shaders are
//! replaced by registered kernels; the render pass is reduced to a trace of the
//! clears and draws that ran. Device-writable (storage) buffers are tracked for
//! visibility: an access that is not ordered after the last write by a chain of
//! barriers fails the submission with [`BackendError::Hazard`].

use std::collections::HashMap;

use crate::command::{Command, CommandList, Stage};
use crate::model::Mesh;

use super::{
    Backend, BackendError, BindPoint, BindingEntry, BindingKind, BindingLayoutDesc, BindingSetId,
    BufferDesc, BufferId, BufferRegion, BufferUsage, Capabilities, ComputePipelineDesc, Extent,
    GraphicsPipelineDesc, LayoutEntry, LayoutId, MeshId, PipelineId, Rect2D, Rgba,
    SubmissionToken,
};

/// Host stand-in for a compute shader: receives the bytes of the first storage
/// binding and the dispatch size.
pub type ComputeKernel = Box<dyn Fn(&mut [u8], [u32; 3])>;

/// Capabilities the soft device reports.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct SoftConfig {
    pub conditional_execution: bool,
    pub compute: bool,
    pub min_offset_alignment: u64,
}

impl Default for SoftConfig {
    fn default() -> Self {
        Self {
            conditional_execution: true,
            compute: true,
            min_offset_alignment: 256,
        }
    }
}

/// What a submission did to its target.
#[derive(Debug, Clone, PartialEq)]
pub enum TraceEvent {
    Dispatch {
        pipeline: PipelineId,
        groups: [u32; 3],
    },
    Clear {
        color: Rgba,
        rect: Rect2D,
    },
    Draw {
        mesh: MeshId,
        instances: u32,
        index_count: u32,
        /// Value read through the texel binding, if the bound set has one.
        texel: Option<f32>,
    },
    /// A gated command whose predicate did not pass.
    Skipped { command: &'static str },
}

/// Render target for [`SoftBackend`]: the last clear color plus an event trace.
#[derive(Debug, Clone, PartialEq)]
pub struct SoftTarget {
    pub extent: Extent,
    pub color: Rgba,
    pub events: Vec<TraceEvent>,
}

impl SoftTarget {
    pub fn new(extent: Extent) -> Self {
        Self {
            extent,
            color: [0.0, 0.0, 0.0, 1.0],
            events: Vec::new(),
        }
    }

    /// Returns and clears the recorded events. The color is kept (load semantics).
    pub fn take_events(&mut self) -> Vec<TraceEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn dispatch_count(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, TraceEvent::Dispatch { .. }))
            .count()
    }

    pub fn draws(&self) -> impl Iterator<Item = &TraceEvent> {
        self.events
            .iter()
            .filter(|e| matches!(e, TraceEvent::Draw { .. }))
    }
}

struct PendingWrite {
    region: BufferRegion,
    stage: Stage,
    visible_to: Vec<Stage>,
}

struct SoftBuffer {
    label: String,
    bytes: Vec<u8>,
    tracked: bool,
    pending: Vec<PendingWrite>,
}

struct SoftSet {
    entries: Vec<(LayoutEntry, BufferRegion)>,
}

enum SoftPipeline {
    Graphics,
    Compute { kernel: String },
}

#[derive(Default)]
struct Bound {
    compute_pipeline: Option<PipelineId>,
    graphics_pipeline: Option<PipelineId>,
    compute_set: Option<BindingSetId>,
    graphics_set: Option<BindingSetId>,
    pass: Option<Rect2D>,
}

/// Deterministic host executor.
pub struct SoftBackend {
    config: SoftConfig,
    buffers: Vec<SoftBuffer>,
    layouts: Vec<Vec<LayoutEntry>>,
    sets: Vec<SoftSet>,
    pipelines: Vec<SoftPipeline>,
    meshes: Vec<u32>,
    kernels: HashMap<String, ComputeKernel>,
    submitted: u64,
}

impl SoftBackend {
    pub fn new(config: SoftConfig) -> Self {
        Self {
            config,
            buffers: Vec::new(),
            layouts: Vec::new(),
            sets: Vec::new(),
            pipelines: Vec::new(),
            meshes: Vec::new(),
            kernels: HashMap::new(),
            submitted: 0,
        }
    }

    /// Registers `kernel` as the implementation of compute entry point `entry`.
    pub fn with_kernel(
        mut self,
        entry: &str,
        kernel: impl Fn(&mut [u8], [u32; 3]) + 'static,
    ) -> Self {
        self.register_kernel(entry, kernel);
        self
    }

    pub fn register_kernel(&mut self, entry: &str, kernel: impl Fn(&mut [u8], [u32; 3]) + 'static) {
        self.kernels.insert(entry.to_string(), Box::new(kernel));
    }

    /// Number of submissions executed so far.
    #[inline]
    pub fn submissions(&self) -> u64 {
        self.submitted
    }

    /// Current device-side bytes of `region`.
    pub fn read_bytes(&self, region: BufferRegion) -> Result<&[u8], BackendError> {
        let buffer = self.buffer(region.buffer)?;
        let range = checked_range(buffer, region)?;
        Ok(&buffer.bytes[range])
    }

    /// Reads a `T` from the start of `region`.
    pub fn read_value<T: bytemuck::Pod>(&self, region: BufferRegion) -> Result<T, BackendError> {
        let bytes = self.read_bytes(region)?;
        let size = std::mem::size_of::<T>();
        if bytes.len() < size {
            return Err(BackendError::Malformed(format!(
                "region of {} bytes is too small for a {size}-byte value",
                bytes.len()
            )));
        }
        Ok(bytemuck::pod_read_unaligned(&bytes[..size]))
    }

    fn buffer(&self, id: BufferId) -> Result<&SoftBuffer, BackendError> {
        self.buffers.get(id.index()).ok_or(BackendError::UnknownHandle {
            kind: "buffer",
            index: id.0,
        })
    }

    fn buffer_mut(&mut self, id: BufferId) -> Result<&mut SoftBuffer, BackendError> {
        self.buffers
            .get_mut(id.index())
            .ok_or(BackendError::UnknownHandle {
                kind: "buffer",
                index: id.0,
            })
    }

    fn set(&self, id: BindingSetId) -> Result<&SoftSet, BackendError> {
        self.sets.get(id.0 as usize).ok_or(BackendError::UnknownHandle {
            kind: "binding set",
            index: id.0,
        })
    }

    fn pipeline(&self, id: PipelineId) -> Result<&SoftPipeline, BackendError> {
        self.pipelines
            .get(id.0 as usize)
            .ok_or(BackendError::UnknownHandle {
                kind: "pipeline",
                index: id.0,
            })
    }

    /// Checks that `stage` may access `region`, then records the write if any.
    fn access(
        &mut self,
        stage: Stage,
        region: BufferRegion,
        write: bool,
    ) -> Result<(), BackendError> {
        let buffer = self.buffer_mut(region.buffer)?;
        if !buffer.tracked {
            return Ok(());
        }

        if let Some(p) = buffer.pending.iter().find(|p| {
            p.region.overlaps(&region) && p.stage != stage && !p.visible_to.contains(&stage)
        }) {
            return Err(BackendError::Hazard {
                stage,
                writer: p.stage,
                region,
            });
        }

        if write {
            record_write(buffer, region, stage);
        }
        Ok(())
    }

    fn apply_barrier(&mut self, src: Stage, dst: Stage, region: BufferRegion) -> Result<(), BackendError> {
        let buffer = self.buffer_mut(region.buffer)?;
        for p in buffer
            .pending
            .iter_mut()
            .filter(|p| p.region.overlaps(&region))
        {
            // Dependency chains: a write already visible to `src` is carried on to `dst`.
            let reaches_src = p.stage == src || p.visible_to.contains(&src);
            if reaches_src && !p.visible_to.contains(&dst) {
                p.visible_to.push(dst);
            }
        }
        Ok(())
    }

    fn predicate_passes(&self, gate: &crate::predicate::PredicateRef) -> Result<bool, BackendError> {
        let raw: u32 = self.read_value(gate.region)?;
        Ok(gate.passes(raw))
    }

    fn dispatch(
        &mut self,
        bound: &Bound,
        groups: [u32; 3],
        target: &mut SoftTarget,
    ) -> Result<(), BackendError> {
        let (Some(pipeline_id), Some(set_id)) = (bound.compute_pipeline, bound.compute_set) else {
            return Err(BackendError::Malformed(
                "dispatch without a bound compute pipeline and set".into(),
            ));
        };
        let SoftPipeline::Compute { kernel } = self.pipeline(pipeline_id)? else {
            return Err(BackendError::Malformed(
                "graphics pipeline bound at the compute bind point".into(),
            ));
        };
        let kernel = kernel.clone();
        let entries = self.set(set_id)?.entries.clone();

        let mut storage = None;
        for (entry, region) in &entries {
            let write = entry.kind == BindingKind::StorageBuffer;
            self.access(Stage::Compute, *region, write)?;
            if write && storage.is_none() {
                storage = Some(*region);
            }
        }

        if let Some(region) = storage {
            let buffer = self.buffer(region.buffer)?;
            let range = checked_range(buffer, region)?;
            let kernel_fn = self.kernels.get(&kernel).ok_or_else(|| {
                BackendError::Malformed(format!("no kernel registered for `{kernel}`"))
            })?;
            // Disjoint field borrows: kernels are read, one buffer is written.
            let bytes = &mut self.buffers[region.buffer.index()].bytes[range];
            kernel_fn(bytes, groups);
        }

        target.events.push(TraceEvent::Dispatch {
            pipeline: pipeline_id,
            groups,
        });
        Ok(())
    }

    fn draw(
        &mut self,
        bound: &Bound,
        mesh: MeshId,
        instances: u32,
        target: &mut SoftTarget,
    ) -> Result<(), BackendError> {
        let (Some(pipeline_id), Some(set_id)) = (bound.graphics_pipeline, bound.graphics_set) else {
            return Err(BackendError::Malformed(
                "draw without a bound graphics pipeline and set".into(),
            ));
        };
        if !matches!(self.pipeline(pipeline_id)?, SoftPipeline::Graphics) {
            return Err(BackendError::Malformed(
                "compute pipeline bound at the graphics bind point".into(),
            ));
        }
        let index_count = *self
            .meshes
            .get(mesh.0 as usize)
            .ok_or(BackendError::UnknownHandle {
                kind: "mesh",
                index: mesh.0,
            })?;

        let entries = self.set(set_id)?.entries.clone();
        let mut texel = None;
        for (entry, region) in &entries {
            if entry.stages.contains(wgpu::ShaderStages::VERTEX) {
                self.access(Stage::Vertex, *region, false)?;
            }
            if entry.stages.contains(wgpu::ShaderStages::FRAGMENT) {
                self.access(Stage::Fragment, *region, false)?;
            }
            if entry.kind == BindingKind::TexelBuffer {
                texel = Some(self.read_value::<f32>(*region)?);
            }
        }

        target.events.push(TraceEvent::Draw {
            mesh,
            instances,
            index_count,
            texel,
        });
        Ok(())
    }
}

impl Default for SoftBackend {
    fn default() -> Self {
        Self::new(SoftConfig::default())
    }
}

impl Backend for SoftBackend {
    type Target = SoftTarget;

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            conditional_execution: self.config.conditional_execution,
            compute: self.config.compute,
            min_offset_alignment: self.config.min_offset_alignment,
        }
    }

    fn create_buffer(&mut self, desc: &BufferDesc<'_>) -> Result<BufferId, BackendError> {
        if desc.size == 0 {
            return Err(BackendError::creation("buffer", desc.label, "zero size"));
        }
        let id = BufferId(self.buffers.len() as u32);
        self.buffers.push(SoftBuffer {
            label: desc.label.to_string(),
            bytes: vec![0; desc.size as usize],
            tracked: desc.usage == BufferUsage::Storage,
            pending: Vec::new(),
        });
        log::debug!("soft: buffer #{} `{}` ({} bytes)", id.0, desc.label, desc.size);
        Ok(id)
    }

    fn write_buffer(&mut self, region: BufferRegion, bytes: &[u8]) -> Result<(), BackendError> {
        if bytes.len() as u64 != region.size {
            return Err(BackendError::Malformed(format!(
                "write of {} bytes into a {}-byte region",
                bytes.len(),
                region.size
            )));
        }
        let buffer = self.buffer_mut(region.buffer)?;
        let range = checked_range(buffer, region)?;
        buffer.bytes[range].copy_from_slice(bytes);
        if buffer.tracked {
            record_write(buffer, region, Stage::Host);
        }
        Ok(())
    }

    fn create_binding_layout(
        &mut self,
        desc: &BindingLayoutDesc<'_>,
    ) -> Result<LayoutId, BackendError> {
        let mut seen = Vec::with_capacity(desc.entries.len());
        for entry in desc.entries {
            if seen.contains(&entry.binding) {
                return Err(BackendError::creation(
                    "binding layout",
                    desc.label,
                    format!("binding {} declared twice", entry.binding),
                ));
            }
            seen.push(entry.binding);
        }
        let id = LayoutId(self.layouts.len() as u32);
        self.layouts.push(desc.entries.to_vec());
        Ok(id)
    }

    fn create_binding_set(
        &mut self,
        label: &str,
        layout: LayoutId,
        entries: &[BindingEntry],
    ) -> Result<BindingSetId, BackendError> {
        let layout_entries = self
            .layouts
            .get(layout.0 as usize)
            .ok_or(BackendError::UnknownHandle {
                kind: "binding layout",
                index: layout.0,
            })?
            .clone();

        let alignment = self.config.min_offset_alignment.max(1);
        let mut resolved = Vec::with_capacity(layout_entries.len());
        for layout_entry in layout_entries {
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
                    format!(
                        "offset {} of binding {} is not {alignment}-byte aligned",
                        entry.region.offset, entry.binding
                    ),
                ));
            }
            checked_range(self.buffer(entry.region.buffer)?, entry.region)?;
            resolved.push((layout_entry, entry.region));
        }

        let id = BindingSetId(self.sets.len() as u32);
        self.sets.push(SoftSet { entries: resolved });
        Ok(id)
    }

    fn create_graphics_pipeline(
        &mut self,
        desc: &GraphicsPipelineDesc<'_>,
    ) -> Result<PipelineId, BackendError> {
        if self.layouts.get(desc.layout.0 as usize).is_none() {
            return Err(BackendError::creation("graphics pipeline", desc.label, "unknown layout"));
        }
        let id = PipelineId(self.pipelines.len() as u32);
        self.pipelines.push(SoftPipeline::Graphics);
        Ok(id)
    }

    fn create_compute_pipeline(
        &mut self,
        desc: &ComputePipelineDesc<'_>,
    ) -> Result<PipelineId, BackendError> {
        if !self.config.compute {
            return Err(BackendError::MissingCapability("compute"));
        }
        if self.layouts.get(desc.layout.0 as usize).is_none() {
            return Err(BackendError::creation("compute pipeline", desc.label, "unknown layout"));
        }
        if !self.kernels.contains_key(desc.entry) {
            return Err(BackendError::creation(
                "compute pipeline",
                desc.label,
                format!("no kernel registered for entry `{}`", desc.entry),
            ));
        }
        let id = PipelineId(self.pipelines.len() as u32);
        self.pipelines.push(SoftPipeline::Compute {
            kernel: desc.entry.to_string(),
        });
        Ok(id)
    }

    fn create_mesh(&mut self, label: &str, mesh: &Mesh) -> Result<MeshId, BackendError> {
        if mesh.indices.is_empty() {
            return Err(BackendError::creation("mesh", label, "no indices"));
        }
        let id = MeshId(self.meshes.len() as u32);
        self.meshes.push(mesh.index_count());
        Ok(id)
    }

    fn submit(
        &mut self,
        commands: &CommandList,
        target: &mut SoftTarget,
    ) -> Result<SubmissionToken, BackendError> {
        let mut bound = Bound::default();

        for op in commands.ops() {
            let gated_off = match op.gate {
                Some(gate) => !self.predicate_passes(gate)?,
                None => false,
            };

            match op.command {
                Command::Barrier(b) => self.apply_barrier(b.src, b.dst, b.region)?,
                Command::Predicated(_) => {
                    return Err(BackendError::Malformed("nested predicated range".into()));
                }
                Command::BindPipeline(id) => match self.pipeline(*id)? {
                    SoftPipeline::Compute { .. } => bound.compute_pipeline = Some(*id),
                    SoftPipeline::Graphics => bound.graphics_pipeline = Some(*id),
                },
                Command::BindSet { point, set } => {
                    self.set(*set)?;
                    match point {
                        BindPoint::Compute => bound.compute_set = Some(*set),
                        BindPoint::Graphics => bound.graphics_set = Some(*set),
                    }
                }
                Command::Dispatch { x, y, z } => {
                    if gated_off {
                        target.events.push(TraceEvent::Skipped { command: "dispatch" });
                    } else {
                        self.dispatch(&bound, [*x, *y, *z], target)?;
                    }
                }
                Command::BeginRenderPass { area } => bound.pass = Some(*area),
                Command::EndRenderPass => bound.pass = None,
                Command::ClearAttachment { color, rect } => {
                    if bound.pass.is_none() {
                        return Err(BackendError::Malformed("clear outside a render pass".into()));
                    }
                    if gated_off {
                        target.events.push(TraceEvent::Skipped { command: "clear" });
                    } else {
                        target.color = *color;
                        target.events.push(TraceEvent::Clear {
                            color: *color,
                            rect: *rect,
                        });
                    }
                }
                Command::DrawMesh { mesh, instances } => {
                    if bound.pass.is_none() {
                        return Err(BackendError::Malformed("draw outside a render pass".into()));
                    }
                    if gated_off {
                        target.events.push(TraceEvent::Skipped { command: "draw" });
                    } else {
                        self.draw(&bound, *mesh, *instances, target)?;
                    }
                }
            }
        }

        self.submitted += 1;
        log::trace!(
            "soft: submission {} ({} ops) finished",
            self.submitted,
            commands.ops().count()
        );
        Ok(SubmissionToken(self.submitted))
    }

    fn is_complete(&mut self, token: SubmissionToken) -> bool {
        token.0 <= self.submitted
    }

    fn wait(&mut self, token: SubmissionToken) -> Result<(), BackendError> {
        if token.0 > self.submitted {
            return Err(BackendError::Device(format!(
                "waiting on submission {} that was never made",
                token.0
            )));
        }
        Ok(())
    }

    fn wait_idle(&mut self) -> Result<(), BackendError> {
        Ok(())
    }
}

fn checked_range(
    buffer: &SoftBuffer,
    region: BufferRegion,
) -> Result<std::ops::Range<usize>, BackendError> {
    let capacity = buffer.bytes.len() as u64;
    if region.end() > capacity {
        log::error!("soft: region past the end of `{}`", buffer.label);
        return Err(BackendError::RegionOutOfBounds { region, capacity });
    }
    Ok(region.offset as usize..region.end() as usize)
}

fn record_write(buffer: &mut SoftBuffer, region: BufferRegion, stage: Stage) {
    buffer.pending.retain(|p| !region.contains(&p.region));
    buffer.pending.push(PendingWrite {
        region,
        stage,
        visible_to: Vec::new(),
    });
}
