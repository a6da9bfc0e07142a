//! Per-tick host updates and submission.

use crate::backend::{Backend, SubmissionToken};
use crate::frame::{FrameOrchestrator, SceneConfig};
use crate::model::RotationRates;
use crate::predicate::DutyCycle;

/// What one tick decided.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Tick {
    /// Counter value the tick was evaluated at.
    pub tick: u64,
    /// Frame slot the tick submits.
    pub frame_index: usize,
    /// Whether the primary branch runs.
    pub active: bool,
}

/// Drives the scene one tick at a time.
///
/// The tick counter is explicit state. A tick evaluates the duty cycle at the
/// current counter, composes one rotation step onto the model, stages a zero
/// dispatch value, then advances the counter.
#[derive(Debug, Clone)]
pub struct UpdateLoop {
    next: u64,
    duty: DutyCycle,
    rates: RotationRates,
}

impl UpdateLoop {
    pub fn new(config: &SceneConfig) -> Self {
        Self {
            next: 0,
            duty: config.duty,
            rates: config.rotation,
        }
    }

    /// Counter value the next tick will use.
    #[inline]
    pub fn next_tick(&self) -> u64 {
        self.next
    }

    #[inline]
    pub fn duty(&self) -> DutyCycle {
        self.duty
    }

    /// Applies one tick of host-side changes to `scene`. Nothing reaches the
    /// device until [`submit`](Self::submit).
    pub fn tick(&mut self, scene: &mut FrameOrchestrator, dt: f32) -> Tick {
        let tick = self.next;
        let active = self.duty.is_active(tick);

        scene.set_predicate(active);
        scene.rotate_model(&self.rates, dt);
        scene.reset_dispatch();

        self.next = self.next.wrapping_add(1);

        let frame_index = (tick % scene.frame_count() as u64) as usize;
        if tick % self.duty.period() == 0 {
            log::debug!("tick {tick}: new duty period");
        }
        log::trace!("tick {tick}: frame {frame_index}, active {active}");

        Tick {
            tick,
            frame_index,
            active,
        }
    }

    /// Submits the slot chosen by `tick`: waits out the slot's previous
    /// submission if needed, flushes its regions, and submits its commands.
    pub fn submit<B: Backend>(
        &self,
        scene: &mut FrameOrchestrator,
        backend: &mut B,
        target: &mut B::Target,
        tick: &Tick,
    ) -> anyhow::Result<SubmissionToken> {
        scene.submit_frame(backend, tick.frame_index, target)
    }

    /// [`tick`](Self::tick) followed by [`submit`](Self::submit).
    pub fn step<B: Backend>(
        &mut self,
        scene: &mut FrameOrchestrator,
        backend: &mut B,
        target: &mut B::Target,
        dt: f32,
    ) -> anyhow::Result<Tick> {
        let tick = self.tick(scene, dt);
        self.submit(scene, backend, target, &tick)?;
        Ok(tick)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{SoftTarget, TraceEvent};
    use crate::frame::fixture;

    #[test]
    fn counter_advances_and_picks_slots_round_robin() {
        let mut backend = fixture::backend();
        let mut scene = fixture::scene(&mut backend, 3);
        let mut update = UpdateLoop::new(&SceneConfig::default());

        let ticks: Vec<Tick> = (0..7).map(|_| update.tick(&mut scene, 0.016)).collect();
        let slots: Vec<usize> = ticks.iter().map(|t| t.frame_index).collect();
        assert_eq!(slots, vec![0, 1, 2, 0, 1, 2, 0]);
        assert_eq!(ticks[6].tick, 6);
        assert_eq!(update.next_tick(), 7);
    }

    #[test]
    fn predicate_follows_the_counter_before_it_advances() {
        let mut backend = fixture::backend();
        let mut scene = fixture::scene(&mut backend, 2);
        let mut update = UpdateLoop::new(&SceneConfig::default());

        for expected in 0..240u64 {
            let tick = update.tick(&mut scene, 0.0);
            assert_eq!(tick.tick, expected);
            assert_eq!(tick.active, expected % 120 < 60);
            assert_eq!(scene.predicate().is_set(), tick.active);
        }
    }

    #[test]
    fn dispatch_value_is_reset_every_tick() {
        let mut backend = fixture::backend();
        let mut scene = fixture::scene(&mut backend, 2);
        let mut update = UpdateLoop::new(&SceneConfig::default());
        update.tick(&mut scene, 0.016);
        assert_eq!(scene.dispatch().data().value, 0.0);
    }

    #[test]
    fn step_submits_the_ticked_slot() {
        let mut backend = fixture::backend();
        let mut scene = fixture::scene(&mut backend, 2);
        let mut update = UpdateLoop::new(&SceneConfig::default());
        let mut target = SoftTarget::new(scene.extent());

        let tick = update.step(&mut scene, &mut backend, &mut target, 0.016).unwrap();
        assert_eq!(tick.frame_index, 0);
        assert!(scene.slot(0).unwrap().pending().is_some());
        assert!(scene.slot(1).unwrap().pending().is_none());

        assert_eq!(target.color, scene.config().primary_color);
        let draws: Vec<_> = target.draws().cloned().collect();
        assert!(matches!(
            draws.as_slice(),
            [TraceEvent::Draw {
                instances: 2,
                texel: Some(v),
                ..
            }] if *v == 1.0
        ));
    }
}
