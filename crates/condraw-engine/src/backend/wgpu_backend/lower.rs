//! Command list to pass plan.
//!
//! wgpu synchronizes between passes on its own, so barriers become pass
//! boundaries. Gated commands become indirect calls whose argument blocks the
//! resolve shader writes from predicate memory at the start of every submission.

use crate::backend::{BackendError, BindPoint, BindingSetId, BufferId, MeshId, PipelineId, Rect2D, Rgba};
use crate::command::{Command, CommandList};
use crate::predicate::PredicateRef;

use super::resolve::{GateRecord, MAX_ARGS};

const CLEAR_VERTICES: u32 = 3;

#[derive(Debug, Clone, PartialEq)]
pub(super) enum Step {
    Bind(PipelineId),
    Set { point: BindPoint, set: BindingSetId },
    /// `indirect` is the byte offset of the argument block when gated.
    Dispatch { groups: [u32; 3], indirect: Option<u64> },
    /// `color` indexes [`Plan::clear_colors`].
    Clear { color: usize, rect: Rect2D, indirect: Option<u64> },
    Draw { mesh: MeshId, instances: u32, index_count: u32, indirect: Option<u64> },
}

#[derive(Debug, Clone, PartialEq)]
pub(super) enum Pass {
    Compute(Vec<Step>),
    Render { area: Rect2D, steps: Vec<Step> },
}

/// Gates that read the same predicate buffer, resolved by one dispatch.
#[derive(Debug, Clone, PartialEq)]
pub(super) struct GateGroup {
    pub predicate: BufferId,
    pub records: Vec<GateRecord>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub(super) struct Plan {
    pub passes: Vec<Pass>,
    pub gates: Vec<GateGroup>,
    pub indirect_words: u32,
    pub clear_colors: Vec<Rgba>,
}

impl Plan {
    fn gate(&mut self, gate: &PredicateRef, args: &[u32]) -> Result<u64, BackendError> {
        if gate.region.offset % 4 != 0 || args.len() > MAX_ARGS {
            return Err(BackendError::Malformed(format!(
                "predicate at offset {} cannot be resolved",
                gate.region.offset
            )));
        }

        let dst_word = self.indirect_words;
        self.indirect_words += args.len() as u32;

        let mut record = GateRecord {
            cond_word: (gate.region.offset / 4) as u32,
            invert: gate.invert as u32,
            dst_word,
            len: args.len() as u32,
            args: [0; MAX_ARGS],
        };
        record.args[..args.len()].copy_from_slice(args);

        let buffer = gate.region.buffer;
        match self.gates.iter_mut().find(|g| g.predicate == buffer) {
            Some(group) => group.records.push(record),
            None => self.gates.push(GateGroup {
                predicate: buffer,
                records: vec![record],
            }),
        }
        Ok(u64::from(dst_word) * 4)
    }
}

/// Lowers `list` into passes. `index_count` resolves mesh sizes for draw arguments.
pub(super) fn lower(
    list: &CommandList,
    mut index_count: impl FnMut(MeshId) -> Result<u32, BackendError>,
) -> Result<Plan, BackendError> {
    let mut plan = Plan::default();
    let mut current = Pass::Compute(Vec::new());

    for op in list.ops() {
        match op.command {
            Command::Barrier(_) => {
                if matches!(current, Pass::Render { .. }) {
                    return Err(BackendError::Malformed("barrier inside a render pass".into()));
                }
                if !steps_empty(&current) {
                    let done = std::mem::replace(&mut current, Pass::Compute(Vec::new()));
                    plan.passes.push(done);
                }
            }
            Command::Predicated(_) => {
                return Err(BackendError::Malformed("nested predicated range".into()));
            }
            Command::BeginRenderPass { area } => {
                if matches!(current, Pass::Render { .. }) {
                    return Err(BackendError::Malformed("nested render pass".into()));
                }
                let done = std::mem::replace(
                    &mut current,
                    Pass::Render {
                        area: *area,
                        steps: Vec::new(),
                    },
                );
                if !steps_empty(&done) {
                    plan.passes.push(done);
                }
            }
            Command::EndRenderPass => {
                if matches!(current, Pass::Compute(_)) {
                    return Err(BackendError::Malformed("render pass ended twice".into()));
                }
                let done = std::mem::replace(&mut current, Pass::Compute(Vec::new()));
                plan.passes.push(done);
            }
            Command::BindPipeline(id) => steps_mut(&mut current).push(Step::Bind(*id)),
            Command::BindSet { point, set } => steps_mut(&mut current).push(Step::Set {
                point: *point,
                set: *set,
            }),
            Command::Dispatch { x, y, z } => {
                let Pass::Compute(steps) = &mut current else {
                    return Err(BackendError::Malformed("dispatch inside a render pass".into()));
                };
                let groups = [*x, *y, *z];
                let indirect = op.gate.map(|g| plan.gate(g, &groups)).transpose()?;
                steps.push(Step::Dispatch { groups, indirect });
            }
            Command::ClearAttachment { color, rect } => {
                let Pass::Render { steps, .. } = &mut current else {
                    return Err(BackendError::Malformed("clear outside a render pass".into()));
                };
                let color_index = plan.clear_colors.len();
                plan.clear_colors.push(*color);
                let indirect = op
                    .gate
                    .map(|g| plan.gate(g, &[CLEAR_VERTICES, 1, 0, 0]))
                    .transpose()?;
                steps.push(Step::Clear {
                    color: color_index,
                    rect: *rect,
                    indirect,
                });
            }
            Command::DrawMesh { mesh, instances } => {
                let Pass::Render { steps, .. } = &mut current else {
                    return Err(BackendError::Malformed("draw outside a render pass".into()));
                };
                let count = index_count(*mesh)?;
                let indirect = op
                    .gate
                    .map(|g| plan.gate(g, &[count, *instances, 0, 0, 0]))
                    .transpose()?;
                steps.push(Step::Draw {
                    mesh: *mesh,
                    instances: *instances,
                    index_count: count,
                    indirect,
                });
            }
        }
    }

    match current {
        Pass::Render { .. } => Err(BackendError::Malformed("render pass never ended".into())),
        Pass::Compute(steps) => {
            if !steps.is_empty() {
                plan.passes.push(Pass::Compute(steps));
            }
            Ok(plan)
        }
    }
}

fn steps_empty(pass: &Pass) -> bool {
    match pass {
        Pass::Compute(steps) | Pass::Render { steps, .. } => steps.is_empty(),
    }
}

fn steps_mut(pass: &mut Pass) -> &mut Vec<Step> {
    match pass {
        Pass::Compute(steps) | Pass::Render { steps, .. } => steps,
    }
}
