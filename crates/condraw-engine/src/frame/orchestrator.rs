use anyhow::Context;

use crate::backend::{
    Backend, BindPoint, BindingEntry, BufferUsage, Extent, SubmissionToken,
};
use crate::command::Barrier;
use crate::memory::{RegionError, VersionedBuffer};
use crate::model::{perspective, CameraData, DispatchData, Mesh, Model, ModelData, RotationRates};
use crate::pipeline::{
    PipelineRegistry, ShaderSet, CAMERA_BINDING, DISPATCH_BINDING, MODEL_BINDING, STORAGE_BINDING,
};
use crate::predicate::PredicateResource;

use super::{FrameSlot, SceneConfig};

/// Everything needed to build a [`FrameOrchestrator`].
#[derive(Debug, Clone)]
pub struct SceneSetup<'a> {
    /// Number of in-flight frames; one slot and one buffer region each.
    pub frame_count: usize,
    pub extent: Extent,
    pub color_format: wgpu::TextureFormat,
    pub shaders: ShaderSet<'a>,
    pub mesh: &'a Mesh,
    pub config: SceneConfig,
}

/// Owns the scene resources and one [`FrameSlot`] per in-flight frame.
///
/// Every slot records the same sequence over its own buffer regions:
///
/// 1. barrier host -> compute on the dispatch value
/// 2. predicated: bind compute pipeline and set, dispatch 1x1x1
/// 3. barrier compute -> fragment on the dispatch value
/// 4. begin render pass (load, store)
/// 5. bind graphics pipeline and set; predicated: clear primary color, draw
///    primary instances
/// 6. inverted predicated: clear alternate color, draw alternate instances
/// 7. end render pass
///
/// Branch changes never re-record; only a resize does.
#[derive(Debug)]
pub struct FrameOrchestrator {
    config: SceneConfig,
    extent: Extent,
    registry: PipelineRegistry,
    model: Model,

    camera: VersionedBuffer<CameraData>,
    transforms: VersionedBuffer<ModelData>,
    predicate: PredicateResource,
    dispatch: VersionedBuffer<DispatchData>,

    slots: Vec<FrameSlot>,
}

impl FrameOrchestrator {
    pub fn new<B: Backend>(backend: &mut B, setup: SceneSetup<'_>) -> anyhow::Result<Self> {
        let SceneSetup {
            frame_count,
            extent,
            color_format,
            shaders,
            mesh,
            config,
        } = setup;
        anyhow::ensure!(frame_count > 0, "at least one frame slot is required");

        let registry = PipelineRegistry::new(backend, &shaders, color_format)
            .context("failed to build pipelines")?;

        let mesh = backend
            .create_mesh("condraw model", mesh)
            .context("failed to upload the model mesh")?;
        let model = Model::new(mesh, config.model_translation);

        let camera = VersionedBuffer::new(
            backend,
            "condraw camera",
            frame_count,
            BufferUsage::Uniform,
            CameraData::new(projection(&config, extent)),
        )?;
        let transforms = VersionedBuffer::new(
            backend,
            "condraw model",
            frame_count,
            BufferUsage::Uniform,
            ModelData::new(model.transform()),
        )?;
        let predicate = PredicateResource::new(
            backend,
            "condraw predicate",
            frame_count,
            config.duty.is_active(0),
        )?;
        let dispatch = VersionedBuffer::new(
            backend,
            "condraw dispatch",
            frame_count,
            BufferUsage::Storage,
            DispatchData::default(),
        )?;

        let layouts = registry.layouts();
        let mut slots = Vec::with_capacity(frame_count);
        for i in 0..frame_count {
            let compute_set = backend
                .create_binding_set(
                    &format!("condraw compute set {i}"),
                    layouts.compute,
                    &[BindingEntry {
                        binding: STORAGE_BINDING,
                        region: dispatch.region(i)?,
                    }],
                )
                .with_context(|| format!("failed to bind frame {i} compute resources"))?;

            let graphics_set = backend
                .create_binding_set(
                    &format!("condraw graphics set {i}"),
                    layouts.graphics,
                    &[
                        BindingEntry {
                            binding: CAMERA_BINDING,
                            region: camera.region(i)?,
                        },
                        BindingEntry {
                            binding: MODEL_BINDING,
                            region: transforms.region(i)?,
                        },
                        BindingEntry {
                            binding: DISPATCH_BINDING,
                            region: dispatch.region(i)?,
                        },
                    ],
                )
                .with_context(|| format!("failed to bind frame {i} graphics resources"))?;

            slots.push(FrameSlot::new(i, compute_set, graphics_set));
        }

        let mut orchestrator = Self {
            config,
            extent,
            registry,
            model,
            camera,
            transforms,
            predicate,
            dispatch,
            slots,
        };
        orchestrator.record_all()?;

        log::info!(
            "scene ready: {frame_count} frame slots at {}x{}",
            extent.width,
            extent.height
        );
        Ok(orchestrator)
    }

    #[inline]
    pub fn frame_count(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn extent(&self) -> Extent {
        self.extent
    }

    #[inline]
    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    #[inline]
    pub fn registry(&self) -> &PipelineRegistry {
        &self.registry
    }

    #[inline]
    pub fn model(&self) -> &Model {
        &self.model
    }

    #[inline]
    pub fn slots(&self) -> &[FrameSlot] {
        &self.slots
    }

    pub fn slot(&self, index: usize) -> Result<&FrameSlot, RegionError> {
        self.slots.get(index).ok_or(RegionError::IndexOutOfRange {
            index,
            frame_count: self.slots.len(),
        })
    }

    fn slot_mut(&mut self, index: usize) -> Result<&mut FrameSlot, RegionError> {
        let frame_count = self.slots.len();
        self.slots
            .get_mut(index)
            .ok_or(RegionError::IndexOutOfRange { index, frame_count })
    }

    #[inline]
    pub fn predicate(&self) -> &PredicateResource {
        &self.predicate
    }

    #[inline]
    pub fn dispatch(&self) -> &VersionedBuffer<DispatchData> {
        &self.dispatch
    }

    #[inline]
    pub fn camera(&self) -> &VersionedBuffer<CameraData> {
        &self.camera
    }

    #[inline]
    pub fn transforms(&self) -> &VersionedBuffer<ModelData> {
        &self.transforms
    }

    /// Stages the condition every slot's predicated ranges read.
    pub fn set_predicate(&mut self, active: bool) {
        self.predicate.set(active);
    }

    /// Composes one rotation step onto the model and stages the new transform.
    pub fn rotate_model(&mut self, rates: &RotationRates, dt: f32) {
        self.model.rotate(rates, dt);
        self.transforms.write(ModelData::new(self.model.transform()));
    }

    /// Stages the value the next flushed frame starts from. A skipped dispatch
    /// leaves it in place for the draw to read.
    pub fn stage_dispatch(&mut self, value: f32) {
        self.dispatch.write(DispatchData::new(value));
    }

    /// Stages a zero dispatch value.
    pub fn reset_dispatch(&mut self) {
        self.stage_dispatch(0.0);
    }

    /// Copies staged values into frame `index`'s regions.
    ///
    /// The dispatch region is always rewritten: the device may have changed it
    /// since the host last did.
    pub fn flush_frame<B: Backend>(&mut self, backend: &mut B, index: usize) -> anyhow::Result<()> {
        self.camera.flush(backend, index, false)?;
        self.transforms.flush(backend, index, false)?;
        self.predicate.flush(backend, index)?;
        self.dispatch.flush(backend, index, true)?;
        Ok(())
    }

    /// Retires the slot's previous submission, flushes its regions, and submits
    /// its prerecorded commands.
    ///
    /// Blocks only when the slot's previous submission is still running.
    pub fn submit_frame<B: Backend>(
        &mut self,
        backend: &mut B,
        index: usize,
        target: &mut B::Target,
    ) -> anyhow::Result<SubmissionToken> {
        if let Some(token) = self.slot(index)?.pending() {
            if !backend.is_complete(token) {
                log::trace!("frame {index}: waiting on submission {token:?}");
                backend.wait(token)?;
            }
            self.slot_mut(index)?.retire()?;
        }

        self.flush_frame(backend, index)?;

        let slot = self.slot_mut(index)?;
        let token = backend
            .submit(slot.commands(), target)
            .with_context(|| format!("failed to submit frame {index}"))?;
        slot.mark_submitted(token)?;
        Ok(token)
    }

    /// Re-records every slot for a new target extent.
    ///
    /// Waits for the device to go idle first; slots keep their lists and sets.
    pub fn resize<B: Backend>(&mut self, backend: &mut B, extent: Extent) -> anyhow::Result<()> {
        if extent.width == 0 || extent.height == 0 {
            log::debug!("ignoring resize to {}x{}", extent.width, extent.height);
            return Ok(());
        }

        self.idle(backend)?;
        self.extent = extent;
        self.camera
            .write(CameraData::new(projection(&self.config, extent)));
        self.record_all()?;

        log::info!("re-recorded {} slots at {}x{}", self.slots.len(), extent.width, extent.height);
        Ok(())
    }

    /// Waits for all submitted work and retires every slot.
    pub fn idle<B: Backend>(&mut self, backend: &mut B) -> anyhow::Result<()> {
        backend.wait_idle().context("failed to wait for the device")?;
        for slot in &mut self.slots {
            if slot.pending().is_some() {
                slot.retire()?;
            }
        }
        Ok(())
    }

    fn record_all(&mut self) -> anyhow::Result<()> {
        for index in 0..self.slots.len() {
            self.record_slot(index)
                .with_context(|| format!("failed to record frame slot {index}"))?;
        }
        Ok(())
    }

    fn record_slot(&mut self, index: usize) -> anyhow::Result<()> {
        let dispatch = self.dispatch.region(index)?;
        let primary = self.predicate.direct(index)?;
        let alternate = self.predicate.inverted(index)?;
        let area = self.extent.full_rect();
        let compute = self.registry.compute();
        let graphics = self.registry.graphics();
        let mesh = self.model.mesh();
        let frame_count = self.slots.len();
        let config = &self.config;

        let slot = self
            .slots
            .get_mut(index)
            .ok_or(RegionError::IndexOutOfRange { index, frame_count })?;
        let compute_set = slot.compute_set();
        let graphics_set = slot.graphics_set();

        slot.record(|rec| {
            rec.barrier(Barrier::host_to_compute(dispatch))?;

            rec.begin_predicated(primary)?;
            rec.bind_pipeline(compute);
            rec.bind_set(BindPoint::Compute, compute_set);
            rec.dispatch(1, 1, 1)?;
            rec.end_predicated()?;

            rec.barrier(Barrier::compute_to_fragment(dispatch))?;

            rec.begin_render_pass(area)?;
            rec.bind_pipeline(graphics);
            rec.bind_set(BindPoint::Graphics, graphics_set);

            rec.begin_predicated(primary)?;
            rec.clear(config.primary_color, area)?;
            rec.draw_mesh(mesh, config.primary_instances)?;
            rec.end_predicated()?;

            rec.begin_predicated(alternate)?;
            rec.clear(config.alternate_color, area)?;
            rec.draw_mesh(mesh, config.alternate_instances)?;
            rec.end_predicated()?;

            rec.end_render_pass()
        })?;

        log::debug!("recorded frame slot {index}");
        Ok(())
    }
}

fn projection(config: &SceneConfig, extent: Extent) -> glam::Mat4 {
    perspective(config.fov_y, extent.aspect(), config.near, config.far)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BufferRegion, SoftTarget, TraceEvent};
    use crate::command::{Command, Stage};
    use crate::frame::fixture;
    use crate::frame::SlotState;

    #[test]
    fn every_slot_is_recorded_and_ready() {
        let mut backend = fixture::backend();
        let scene = fixture::scene(&mut backend, 3);
        assert_eq!(scene.frame_count(), 3);
        for slot in scene.slots() {
            assert_eq!(slot.state(), SlotState::Ready);
            assert!(!slot.commands().is_empty());
        }
    }

    #[test]
    fn slots_record_the_seven_step_sequence() {
        let mut backend = fixture::backend();
        let scene = fixture::scene(&mut backend, 2);

        for slot in scene.slots() {
            let i = slot.index();
            let dispatch = scene.dispatch().region(i).unwrap();
            let cmds = slot.commands().commands();
            assert_eq!(cmds.len(), 9, "slot {i}");

            assert_eq!(cmds[0], Command::Barrier(Barrier::host_to_compute(dispatch)));
            let Command::Predicated(compute) = &cmds[1] else {
                panic!("slot {i}: expected the predicated dispatch");
            };
            assert!(!compute.condition.invert);
            assert_eq!(compute.commands.last(), Some(&Command::Dispatch { x: 1, y: 1, z: 1 }));
            assert_eq!(cmds[2], Command::Barrier(Barrier::compute_to_fragment(dispatch)));
            assert!(matches!(cmds[3], Command::BeginRenderPass { .. }));
            assert_eq!(cmds[4], Command::BindPipeline(scene.registry().graphics()));
            assert!(matches!(cmds[5], Command::BindSet { point: BindPoint::Graphics, .. }));

            let (Command::Predicated(primary), Command::Predicated(alternate)) = (&cmds[6], &cmds[7])
            else {
                panic!("slot {i}: expected the two predicated draws");
            };
            assert_eq!(primary.condition.complement(), alternate.condition);
            assert_eq!(primary.condition.region, compute.condition.region);
            assert!(matches!(
                primary.commands[1],
                Command::DrawMesh { instances: 2, .. }
            ));
            assert!(matches!(
                alternate.commands[1],
                Command::DrawMesh { instances: 1, .. }
            ));
            assert_eq!(cmds[8], Command::EndRenderPass);
        }
    }

    #[test]
    fn slots_bind_disjoint_regions() {
        let mut backend = fixture::backend();
        let scene = fixture::scene(&mut backend, 3);
        let regions: Vec<BufferRegion> = (0..3)
            .map(|i| scene.predicate().direct(i).unwrap().region)
            .collect();
        assert!(!regions[0].overlaps(&regions[1]));
        assert!(!regions[1].overlaps(&regions[2]));
        assert_ne!(scene.slots()[0].graphics_set(), scene.slots()[1].graphics_set());
    }

    #[test]
    fn barriers_cover_the_dispatch_region_for_every_slot() {
        let mut backend = fixture::backend();
        let scene = fixture::scene(&mut backend, 3);

        for slot in scene.slots() {
            let dispatch = scene.dispatch().region(slot.index()).unwrap();
            let cmds = slot.commands().commands();
            let dispatch_at = cmds
                .iter()
                .position(|c| matches!(c, Command::Predicated(r) if r.commands.iter().any(|c| matches!(c, Command::Dispatch { .. }))))
                .unwrap();
            let pass_at = cmds
                .iter()
                .position(|c| matches!(c, Command::BeginRenderPass { .. }))
                .unwrap();

            let ordered = |from: usize, to: usize, src: Stage, dst: Stage| {
                cmds[from..to]
                    .iter()
                    .any(|c| matches!(c, Command::Barrier(b) if b.orders(src, dst, &dispatch)))
            };
            assert!(ordered(0, dispatch_at, Stage::Host, Stage::Compute));
            assert!(ordered(dispatch_at, pass_at, Stage::Compute, Stage::Fragment));
        }
    }

    #[test]
    fn resize_rerecords_in_place() {
        let mut backend = fixture::backend();
        let mut scene = fixture::scene(&mut backend, 2);
        let before: Vec<(u64, u64)> = scene
            .slots()
            .iter()
            .map(|s| (s.commands().id(), s.commands().revision()))
            .collect();

        let mut target = SoftTarget::new(scene.extent());
        scene.submit_frame(&mut backend, 0, &mut target).unwrap();
        scene.resize(&mut backend, Extent::new(320, 200)).unwrap();

        for (slot, (id, revision)) in scene.slots().iter().zip(before) {
            assert_eq!(slot.state(), SlotState::Ready);
            assert_eq!(slot.commands().id(), id);
            assert!(slot.commands().revision() > revision);
            assert_eq!(
                slot.commands().commands()[3],
                Command::BeginRenderPass {
                    area: Extent::new(320, 200).full_rect()
                }
            );
        }
    }

    #[test]
    fn zero_sized_resize_is_ignored() {
        let mut backend = fixture::backend();
        let mut scene = fixture::scene(&mut backend, 2);
        let extent = scene.extent();
        scene.resize(&mut backend, Extent::new(0, 10)).unwrap();
        assert_eq!(scene.extent(), extent);
    }

    #[test]
    fn submitting_twice_waits_on_the_previous_token() {
        let mut backend = fixture::backend();
        let mut scene = fixture::scene(&mut backend, 2);
        let mut target = SoftTarget::new(scene.extent());

        let first = scene.submit_frame(&mut backend, 1, &mut target).unwrap();
        assert_eq!(scene.slot(1).unwrap().pending(), Some(first));
        let second = scene.submit_frame(&mut backend, 1, &mut target).unwrap();
        assert!(second > first);
        assert_eq!(scene.slot(1).unwrap().state(), SlotState::Submitted(second));
    }

    #[test]
    fn skipped_dispatch_leaves_the_staged_value() {
        let mut backend = fixture::backend();
        let mut scene = fixture::scene(&mut backend, 2);
        let mut target = SoftTarget::new(scene.extent());

        scene.set_predicate(false);
        scene.stage_dispatch(0.25);
        scene.submit_frame(&mut backend, 1, &mut target).unwrap();

        let region = scene.dispatch().region(1).unwrap();
        assert_eq!(backend.read_value::<f32>(region).unwrap(), 0.25);

        let events = target.take_events();
        assert!(events.contains(&TraceEvent::Skipped {
            command: "dispatch"
        }));
        assert!(!events.iter().any(|e| matches!(e, TraceEvent::Dispatch { .. })));
        let texels: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                TraceEvent::Draw { texel, .. } => Some(*texel),
                _ => None,
            })
            .collect();
        assert_eq!(texels, vec![Some(0.25)]);
    }

    #[test]
    fn active_dispatch_overwrites_the_staged_value() {
        let mut backend = fixture::backend();
        let mut scene = fixture::scene(&mut backend, 2);
        let mut target = SoftTarget::new(scene.extent());

        scene.set_predicate(true);
        scene.stage_dispatch(0.25);
        scene.submit_frame(&mut backend, 0, &mut target).unwrap();

        let region = scene.dispatch().region(0).unwrap();
        assert_eq!(backend.read_value::<f32>(region).unwrap(), 1.0);
    }

    #[test]
    fn out_of_range_slot_fails() {
        let mut backend = fixture::backend();
        let mut scene = fixture::scene(&mut backend, 2);
        let mut target = SoftTarget::new(scene.extent());
        assert!(scene.slot(2).is_err());
        assert!(scene.submit_frame(&mut backend, 2, &mut target).is_err());
    }
}
