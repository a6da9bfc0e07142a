use std::sync::atomic::{AtomicU64, Ordering};

use crate::backend::{BindPoint, BindingSetId, MeshId, PipelineId, Rect2D, Rgba};
use crate::predicate::PredicateRef;

use super::Barrier;

/// A single recorded device command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Barrier(Barrier),
    /// Commands gated by a device-read condition value.
    Predicated(PredicatedRange),
    BindPipeline(PipelineId),
    BindSet { point: BindPoint, set: BindingSetId },
    Dispatch { x: u32, y: u32, z: u32 },
    /// Begins a render pass that loads and stores the existing color contents.
    BeginRenderPass { area: Rect2D },
    EndRenderPass,
    ClearAttachment { color: Rgba, rect: Rect2D },
    DrawMesh { mesh: MeshId, instances: u32 },
}

/// A command range that the device includes or excludes as a whole.
///
/// The condition is read from memory when the range executes on the device;
/// the host never branches on it. Two ranges over the same region, one
/// inverted, express an either/or without re-recording.
#[derive(Debug, Clone, PartialEq)]
pub struct PredicatedRange {
    pub condition: PredicateRef,
    pub commands: Vec<Command>,
}

/// One command together with the predicate gating it, if any.
#[derive(Debug, Copy, Clone)]
pub struct Op<'a> {
    pub gate: Option<&'a PredicateRef>,
    pub command: &'a Command,
}

static NEXT_LIST_ID: AtomicU64 = AtomicU64::new(1);

/// Prerecorded command sequence owned by a frame slot.
///
/// `id` is stable for the lifetime of the list; `revision` changes every time
/// the list is re-recorded, so backends can cache whatever they derive from it.
#[derive(Debug)]
pub struct CommandList {
    id: u64,
    revision: u64,
    commands: Vec<Command>,
}

impl CommandList {
    pub fn new() -> Self {
        Self {
            id: NEXT_LIST_ID.fetch_add(1, Ordering::Relaxed),
            revision: 0,
            commands: Vec::new(),
        }
    }

    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[inline]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Top-level commands in recording order.
    #[inline]
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Iterates every command in execution order, with predicated ranges flattened.
    pub fn ops(&self) -> Ops<'_> {
        Ops {
            outer: self.commands.iter(),
            inner: None,
        }
    }

    /// Drops recorded commands but keeps the allocation, and bumps the revision.
    pub(crate) fn reset(&mut self) {
        self.commands.clear();
        self.revision = self.revision.wrapping_add(1);
    }

    pub(crate) fn push(&mut self, command: Command) {
        self.commands.push(command);
    }
}

impl Default for CommandList {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator returned by [`CommandList::ops`].
pub struct Ops<'a> {
    outer: std::slice::Iter<'a, Command>,
    inner: Option<(&'a PredicateRef, std::slice::Iter<'a, Command>)>,
}

impl<'a> Iterator for Ops<'a> {
    type Item = Op<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some((gate, inner)) = self.inner.as_mut() {
                if let Some(command) = inner.next() {
                    return Some(Op {
                        gate: Some(*gate),
                        command,
                    });
                }
                self.inner = None;
            }

            match self.outer.next()? {
                Command::Predicated(range) => {
                    self.inner = Some((&range.condition, range.commands.iter()));
                }
                command => return Some(Op { gate: None, command }),
            }
        }
    }
}
