//! End-to-end runs of the predicated scene on the host backend.

use condraw_engine::backend::{
    BackendError, BindPoint, Extent, ShaderSource, SoftBackend, SoftConfig, SoftTarget,
    TraceEvent,
};
use condraw_engine::command::{Barrier, CommandList, CommandRecorder, Stage};
use condraw_engine::frame::{FrameOrchestrator, SceneConfig, SceneSetup};
use condraw_engine::model::{Mesh, RotationRates, Vertex};
use condraw_engine::pipeline::ShaderSet;
use condraw_engine::time::FixedStep;
use condraw_engine::update::{Tick, UpdateLoop};

const SHADERS: ShaderSet<'static> = ShaderSet {
    graphics: ShaderSource {
        label: "scenario graphics",
        wgsl: "",
    },
    vertex_entry: "vs_main",
    fragment_entry: "fs_main",
    compute: ShaderSource {
        label: "scenario compute",
        wgsl: "",
    },
    compute_entry: "cs_main",
};

const CYAN: [f32; 4] = [0.0, 1.0, 1.0, 1.0];
const MAGENTA: [f32; 4] = [1.0, 0.0, 1.0, 1.0];

struct Harness {
    backend: SoftBackend,
    scene: FrameOrchestrator,
    update: UpdateLoop,
    target: SoftTarget,
    step: FixedStep,
}

impl Harness {
    fn new(frame_count: usize) -> Self {
        let mut backend = SoftBackend::new(SoftConfig::default()).with_kernel("cs_main", |bytes, _| {
            bytes[..4].copy_from_slice(&1.0f32.to_le_bytes());
        });

        let mesh = quad();
        let scene = FrameOrchestrator::new(
            &mut backend,
            SceneSetup {
                frame_count,
                extent: Extent::new(800, 600),
                color_format: wgpu::TextureFormat::Bgra8UnormSrgb,
                shaders: SHADERS,
                mesh: &mesh,
                config: SceneConfig::default(),
            },
        )
        .unwrap();

        Self {
            update: UpdateLoop::new(scene.config()),
            target: SoftTarget::new(scene.extent()),
            step: FixedStep::default(),
            backend,
            scene,
        }
    }

    /// Runs one tick and returns it with the events it produced.
    fn step(&mut self) -> (Tick, Vec<TraceEvent>) {
        let dt = self.step.tick();
        let tick = self
            .update
            .step(&mut self.scene, &mut self.backend, &mut self.target, dt)
            .unwrap();
        (tick, self.target.take_events())
    }

    fn run_until(&mut self, tick: u64) -> (Tick, Vec<TraceEvent>) {
        loop {
            let (t, events) = self.step();
            if t.tick == tick {
                return (t, events);
            }
        }
    }

    fn dispatch_value(&self, slot: usize) -> f32 {
        let region = self.scene.dispatch().region(slot).unwrap();
        self.backend.read_value::<f32>(region).unwrap()
    }

    fn condition(&self, slot: usize) -> u32 {
        let region = self.scene.predicate().buffer().region(slot).unwrap();
        self.backend.read_value::<u32>(region).unwrap()
    }
}

fn quad() -> Mesh {
    let v = |x: f32, y: f32| Vertex {
        position: [x, y, 0.0],
        normal: [0.0, 0.0, 1.0],
    };
    Mesh::new(
        vec![v(-1.0, -1.0), v(1.0, -1.0), v(1.0, 1.0), v(-1.0, 1.0)],
        vec![0, 1, 2, 0, 2, 3],
    )
    .unwrap()
}

fn dispatches(events: &[TraceEvent]) -> usize {
    events
        .iter()
        .filter(|e| matches!(e, TraceEvent::Dispatch { .. }))
        .count()
}

fn single_draw(events: &[TraceEvent]) -> (u32, Option<f32>) {
    let draws: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            TraceEvent::Draw {
                instances, texel, ..
            } => Some((*instances, *texel)),
            _ => None,
        })
        .collect();
    assert_eq!(draws.len(), 1, "exactly one branch draws: {events:?}");
    draws[0]
}

#[test]
fn first_tick_runs_the_primary_branch() {
    let mut h = Harness::new(3);
    let (tick, events) = h.step();

    assert_eq!(tick.tick, 0);
    assert!(tick.active);
    assert_eq!(h.target.color, CYAN);
    assert_eq!(dispatches(&events), 1);
    assert_eq!(single_draw(&events), (2, Some(1.0)));
    assert_eq!(h.dispatch_value(0), 1.0);

    let skipped: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            TraceEvent::Skipped { command } => Some(*command),
            _ => None,
        })
        .collect();
    assert_eq!(skipped, vec!["clear", "draw"]);
}

#[test]
fn tick_sixty_runs_the_alternate_branch() {
    let mut h = Harness::new(3);
    let (tick, events) = h.run_until(60);

    assert!(!tick.active);
    assert_eq!(tick.frame_index, 0);
    assert_eq!(h.target.color, MAGENTA);
    assert_eq!(dispatches(&events), 0);
    assert!(events.contains(&TraceEvent::Skipped {
        command: "dispatch"
    }));
    assert_eq!(single_draw(&events), (1, Some(0.0)));
    assert_eq!(h.dispatch_value(0), 0.0);
}

#[test]
fn alternate_branch_preserves_a_nonzero_dispatch_value() {
    let mut h = Harness::new(3);
    let (tick, _) = h.run_until(60);
    assert!(!tick.active);

    // Predicate stays staged false from tick 60.
    h.scene.stage_dispatch(0.5);
    h.scene
        .submit_frame(&mut h.backend, tick.frame_index, &mut h.target)
        .unwrap();
    let events = h.target.take_events();

    assert_eq!(dispatches(&events), 0);
    assert_eq!(h.dispatch_value(tick.frame_index), 0.5);
    assert_eq!(single_draw(&events), (1, Some(0.5)));
}

#[test]
fn branch_flips_back_after_a_full_period() {
    let mut h = Harness::new(2);

    let (t119, events) = h.run_until(119);
    assert!(!t119.active);
    assert_eq!(h.target.color, MAGENTA);
    assert_eq!(single_draw(&events), (1, Some(0.0)));

    let (t120, events) = h.step();
    assert_eq!(t120.tick, 120);
    assert!(t120.active);
    assert_eq!(h.target.color, CYAN);
    assert_eq!(dispatches(&events), 1);
    assert_eq!(single_draw(&events), (2, Some(1.0)));
}

#[test]
fn each_slot_keeps_its_own_condition_and_dispatch_value() {
    let mut h = Harness::new(3);
    // Ticks 58 and 59 are active, 60 is not; they land in slots 1, 2, 0.
    h.run_until(60);

    assert_eq!(h.condition(0), 0);
    assert_eq!(h.condition(1), 1);
    assert_eq!(h.condition(2), 1);
    assert_eq!(h.dispatch_value(0), 0.0);
    assert_eq!(h.dispatch_value(1), 1.0);
    assert_eq!(h.dispatch_value(2), 1.0);
}

#[test]
fn branch_changes_never_re_record() {
    let mut h = Harness::new(3);
    let before: Vec<(u64, u64)> = h
        .scene
        .slots()
        .iter()
        .map(|s| (s.commands().id(), s.commands().revision()))
        .collect();

    h.run_until(240);

    let after: Vec<(u64, u64)> = h
        .scene
        .slots()
        .iter()
        .map(|s| (s.commands().id(), s.commands().revision()))
        .collect();
    assert_eq!(before, after);
    assert_eq!(h.backend.submissions(), 241);
}

#[test]
fn every_slot_orders_dispatch_writes_before_fragment_reads() {
    let h = Harness::new(3);

    for slot in h.scene.slots() {
        let region = h.scene.dispatch().region(slot.index()).unwrap();
        let barriers: Vec<Barrier> = slot
            .commands()
            .ops()
            .filter_map(|op| match op.command {
                condraw_engine::command::Command::Barrier(b) => Some(*b),
                _ => None,
            })
            .collect();

        assert_eq!(
            barriers,
            vec![
                Barrier::host_to_compute(region),
                Barrier::compute_to_fragment(region),
            ],
            "slot {}",
            slot.index()
        );
    }
}

#[test]
fn missing_compute_to_fragment_barrier_is_a_hazard() {
    let mut h = Harness::new(2);
    h.scene.set_predicate(true);
    h.scene.flush_frame(&mut h.backend, 0).unwrap();

    let slot = h.scene.slot(0).unwrap();
    let dispatch = h.scene.dispatch().region(0).unwrap();
    let gate = h.scene.predicate().direct(0).unwrap();
    let area = h.scene.extent().full_rect();

    let mut list = CommandList::new();
    let mut rec = CommandRecorder::begin(&mut list);
    rec.barrier(Barrier::host_to_compute(dispatch)).unwrap();
    rec.begin_predicated(gate).unwrap();
    rec.bind_pipeline(h.scene.registry().compute());
    rec.bind_set(BindPoint::Compute, slot.compute_set());
    rec.dispatch(1, 1, 1).unwrap();
    rec.end_predicated().unwrap();
    rec.begin_render_pass(area).unwrap();
    rec.bind_pipeline(h.scene.registry().graphics());
    rec.bind_set(BindPoint::Graphics, slot.graphics_set());
    rec.draw_mesh(h.scene.model().mesh(), 1).unwrap();
    rec.end_render_pass().unwrap();
    rec.finish().unwrap();

    let err = condraw_engine::backend::Backend::submit(&mut h.backend, &list, &mut h.target)
        .unwrap_err();
    assert!(
        matches!(
            err,
            BackendError::Hazard {
                writer: Stage::Compute,
                ..
            }
        ),
        "{err}"
    );
}

#[test]
fn missing_host_to_compute_barrier_is_a_hazard() {
    let mut h = Harness::new(2);
    h.scene.set_predicate(true);
    h.scene.flush_frame(&mut h.backend, 1).unwrap();

    let slot = h.scene.slot(1).unwrap();
    let gate = h.scene.predicate().direct(1).unwrap();

    let mut list = CommandList::new();
    let mut rec = CommandRecorder::begin(&mut list);
    rec.begin_predicated(gate).unwrap();
    rec.bind_pipeline(h.scene.registry().compute());
    rec.bind_set(BindPoint::Compute, slot.compute_set());
    rec.dispatch(1, 1, 1).unwrap();
    rec.end_predicated().unwrap();
    rec.finish().unwrap();

    let err = condraw_engine::backend::Backend::submit(&mut h.backend, &list, &mut h.target)
        .unwrap_err();
    assert!(
        matches!(
            err,
            BackendError::Hazard {
                stage: Stage::Compute,
                writer: Stage::Host,
                ..
            }
        ),
        "{err}"
    );
}

#[test]
fn rotation_accumulates_across_ticks() {
    let mut h = Harness::new(3);
    let rates = RotationRates::default();
    let dt = h.step.dt();
    let start = h.scene.model().transform();

    for _ in 0..90 {
        h.step();
    }

    let mut expected = start;
    for _ in 0..90 {
        expected *= rates.increment(dt);
    }
    assert!(h.scene.model().transform().abs_diff_eq(expected, 1e-4));

    // The staged transform matches what the model holds.
    let staged = glam::Mat4::from_cols_array_2d(&h.scene.transforms().data().transform);
    assert!(staged.abs_diff_eq(expected, 1e-6));
}

#[test]
fn resize_keeps_branch_behavior() {
    let mut h = Harness::new(2);
    h.run_until(10);

    h.scene.resize(&mut h.backend, Extent::new(1024, 512)).unwrap();
    h.target = SoftTarget::new(h.scene.extent());

    let (tick, events) = h.step();
    assert_eq!(tick.tick, 11);
    assert_eq!(h.target.color, CYAN);
    let clear_rect = events.iter().find_map(|e| match e {
        TraceEvent::Clear { rect, .. } => Some(*rect),
        _ => None,
    });
    assert_eq!(clear_rect, Some(Extent::new(1024, 512).full_rect()));
}
