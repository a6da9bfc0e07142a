use crate::backend::{BindPoint, BindingSetId, MeshId, PipelineId, Rect2D, Rgba};
use crate::predicate::PredicateRef;

use super::{Barrier, Command, CommandList, PredicatedRange};

/// Structural mistakes caught while recording.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecordError {
    #[error("predicated ranges cannot nest")]
    NestedPredicate,
    #[error("no predicated range is open")]
    NoOpenPredicate,
    #[error("predicated range cannot straddle a render pass boundary")]
    PredicateSpansRenderPass,
    #[error("render passes cannot nest")]
    NestedRenderPass,
    #[error("no render pass is open")]
    NoOpenRenderPass,
    #[error("dispatch recorded inside a render pass")]
    DispatchInsideRenderPass,
    #[error("{0} recorded outside a render pass")]
    OutsideRenderPass(&'static str),
    #[error("barrier recorded inside {0}")]
    MisplacedBarrier(&'static str),
    #[error("recording finished with an open {0}")]
    Unterminated(&'static str),
}

struct OpenRange {
    range: PredicatedRange,
    in_render_pass: bool,
}

/// Records commands into a [`CommandList`], enforcing its structural rules:
/// - predicated ranges do not nest and stay on one side of a render pass boundary
/// - dispatches happen outside render passes, clears and draws inside
/// - barriers sit outside both render passes and predicated ranges
///
/// Binds may appear inside a predicated range but are never gated themselves.
pub struct CommandRecorder<'a> {
    list: &'a mut CommandList,
    open_range: Option<OpenRange>,
    in_render_pass: bool,
}

impl<'a> CommandRecorder<'a> {
    /// Starts recording, discarding whatever `list` held before.
    pub fn begin(list: &'a mut CommandList) -> Self {
        list.reset();
        Self {
            list,
            open_range: None,
            in_render_pass: false,
        }
    }

    pub fn barrier(&mut self, barrier: Barrier) -> Result<(), RecordError> {
        if self.in_render_pass {
            return Err(RecordError::MisplacedBarrier("a render pass"));
        }
        if self.open_range.is_some() {
            return Err(RecordError::MisplacedBarrier("a predicated range"));
        }
        self.emit(Command::Barrier(barrier));
        Ok(())
    }

    pub fn begin_predicated(&mut self, condition: PredicateRef) -> Result<(), RecordError> {
        if self.open_range.is_some() {
            return Err(RecordError::NestedPredicate);
        }
        self.open_range = Some(OpenRange {
            range: PredicatedRange {
                condition,
                commands: Vec::new(),
            },
            in_render_pass: self.in_render_pass,
        });
        Ok(())
    }

    pub fn end_predicated(&mut self) -> Result<(), RecordError> {
        let open = self.open_range.take().ok_or(RecordError::NoOpenPredicate)?;
        if open.in_render_pass != self.in_render_pass {
            return Err(RecordError::PredicateSpansRenderPass);
        }
        self.list.push(Command::Predicated(open.range));
        Ok(())
    }

    pub fn bind_pipeline(&mut self, pipeline: PipelineId) {
        self.emit(Command::BindPipeline(pipeline));
    }

    pub fn bind_set(&mut self, point: BindPoint, set: BindingSetId) {
        self.emit(Command::BindSet { point, set });
    }

    pub fn dispatch(&mut self, x: u32, y: u32, z: u32) -> Result<(), RecordError> {
        if self.in_render_pass {
            return Err(RecordError::DispatchInsideRenderPass);
        }
        self.emit(Command::Dispatch { x, y, z });
        Ok(())
    }

    pub fn begin_render_pass(&mut self, area: Rect2D) -> Result<(), RecordError> {
        if self.in_render_pass {
            return Err(RecordError::NestedRenderPass);
        }
        if self.open_range.is_some() {
            return Err(RecordError::PredicateSpansRenderPass);
        }
        self.in_render_pass = true;
        self.emit(Command::BeginRenderPass { area });
        Ok(())
    }

    pub fn end_render_pass(&mut self) -> Result<(), RecordError> {
        if !self.in_render_pass {
            return Err(RecordError::NoOpenRenderPass);
        }
        if self.open_range.is_some() {
            return Err(RecordError::PredicateSpansRenderPass);
        }
        self.in_render_pass = false;
        self.emit(Command::EndRenderPass);
        Ok(())
    }

    pub fn clear(&mut self, color: Rgba, rect: Rect2D) -> Result<(), RecordError> {
        if !self.in_render_pass {
            return Err(RecordError::OutsideRenderPass("clear"));
        }
        self.emit(Command::ClearAttachment { color, rect });
        Ok(())
    }

    pub fn draw_mesh(&mut self, mesh: MeshId, instances: u32) -> Result<(), RecordError> {
        if !self.in_render_pass {
            return Err(RecordError::OutsideRenderPass("draw"));
        }
        self.emit(Command::DrawMesh { mesh, instances });
        Ok(())
    }

    /// Ends recording. The list is left untouched by a failed finish, but it is
    /// incomplete and must be re-recorded before submission.
    pub fn finish(self) -> Result<(), RecordError> {
        if self.open_range.is_some() {
            return Err(RecordError::Unterminated("predicated range"));
        }
        if self.in_render_pass {
            return Err(RecordError::Unterminated("render pass"));
        }
        Ok(())
    }

    fn emit(&mut self, command: Command) {
        match self.open_range.as_mut() {
            Some(open) => open.range.commands.push(command),
            None => self.list.push(command),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BufferId, BufferRegion, Extent};
    use crate::command::Stage;

    fn region() -> BufferRegion {
        BufferRegion::new(BufferId(0), 0, 4)
    }

    fn area() -> Rect2D {
        Extent::new(64, 64).full_rect()
    }

    #[test]
    fn predicated_range_collects_its_commands() {
        let mut list = CommandList::new();
        let mut rec = CommandRecorder::begin(&mut list);
        rec.begin_predicated(PredicateRef::direct(region())).unwrap();
        rec.bind_pipeline(PipelineId(0));
        rec.dispatch(1, 1, 1).unwrap();
        rec.end_predicated().unwrap();
        rec.finish().unwrap();

        assert_eq!(list.commands().len(), 1);
        let Command::Predicated(range) = &list.commands()[0] else {
            panic!("expected a predicated range");
        };
        assert_eq!(range.commands.len(), 2);
        assert!(!range.condition.invert);
    }

    #[test]
    fn ops_flatten_ranges_with_their_gate() {
        let mut list = CommandList::new();
        let mut rec = CommandRecorder::begin(&mut list);
        rec.barrier(Barrier::host_to_compute(region())).unwrap();
        rec.begin_predicated(PredicateRef::inverted(region())).unwrap();
        rec.dispatch(1, 1, 1).unwrap();
        rec.end_predicated().unwrap();
        rec.finish().unwrap();

        let ops: Vec<_> = list.ops().collect();
        assert_eq!(ops.len(), 2);
        assert!(ops[0].gate.is_none());
        assert!(matches!(ops[0].command, Command::Barrier(b) if b.src == Stage::Host));
        assert!(ops[1].gate.is_some_and(|g| g.invert));
    }

    #[test]
    fn nested_predicates_are_rejected() {
        let mut list = CommandList::new();
        let mut rec = CommandRecorder::begin(&mut list);
        rec.begin_predicated(PredicateRef::direct(region())).unwrap();
        assert_eq!(
            rec.begin_predicated(PredicateRef::direct(region())),
            Err(RecordError::NestedPredicate)
        );
    }

    #[test]
    fn predicate_cannot_span_render_pass_begin() {
        let mut list = CommandList::new();
        let mut rec = CommandRecorder::begin(&mut list);
        rec.begin_predicated(PredicateRef::direct(region())).unwrap();
        assert_eq!(
            rec.begin_render_pass(area()),
            Err(RecordError::PredicateSpansRenderPass)
        );
    }

    #[test]
    fn predicate_cannot_outlive_its_render_pass() {
        let mut list = CommandList::new();
        let mut rec = CommandRecorder::begin(&mut list);
        rec.begin_render_pass(area()).unwrap();
        rec.begin_predicated(PredicateRef::direct(region())).unwrap();
        assert_eq!(rec.end_render_pass(), Err(RecordError::PredicateSpansRenderPass));
    }

    #[test]
    fn dispatch_inside_render_pass_is_rejected() {
        let mut list = CommandList::new();
        let mut rec = CommandRecorder::begin(&mut list);
        rec.begin_render_pass(area()).unwrap();
        assert_eq!(rec.dispatch(1, 1, 1), Err(RecordError::DispatchInsideRenderPass));
    }

    #[test]
    fn draws_and_clears_need_a_render_pass() {
        let mut list = CommandList::new();
        let mut rec = CommandRecorder::begin(&mut list);
        assert_eq!(
            rec.draw_mesh(MeshId(0), 1),
            Err(RecordError::OutsideRenderPass("draw"))
        );
        assert_eq!(
            rec.clear([0.0; 4], area()),
            Err(RecordError::OutsideRenderPass("clear"))
        );
    }

    #[test]
    fn barriers_are_rejected_inside_passes_and_ranges() {
        let mut list = CommandList::new();
        let mut rec = CommandRecorder::begin(&mut list);
        rec.begin_predicated(PredicateRef::direct(region())).unwrap();
        assert!(rec.barrier(Barrier::host_to_compute(region())).is_err());
        rec.end_predicated().unwrap();
        rec.begin_render_pass(area()).unwrap();
        assert!(rec.barrier(Barrier::compute_to_fragment(region())).is_err());
    }

    #[test]
    fn finish_reports_unterminated_scopes() {
        let mut list = CommandList::new();
        let mut rec = CommandRecorder::begin(&mut list);
        rec.begin_render_pass(area()).unwrap();
        assert_eq!(rec.finish(), Err(RecordError::Unterminated("render pass")));
    }

    #[test]
    fn begin_resets_previous_recording_and_bumps_revision() {
        let mut list = CommandList::new();
        let mut rec = CommandRecorder::begin(&mut list);
        rec.dispatch(1, 1, 1).unwrap();
        rec.finish().unwrap();
        let (id, revision) = (list.id(), list.revision());

        CommandRecorder::begin(&mut list).finish().unwrap();
        assert!(list.is_empty());
        assert_eq!(list.id(), id);
        assert_ne!(list.revision(), revision);
    }
}
