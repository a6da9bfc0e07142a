use crate::backend::{BindingSetId, SubmissionToken};
use crate::command::{CommandList, CommandRecorder, RecordError};

/// Lifecycle of a frame slot's command list.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SlotState {
    Unrecorded,
    Recording,
    Ready,
    /// Handed to the device; the token identifies the submission.
    Submitted(SubmissionToken),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SlotError {
    #[error("frame slot {index}: cannot {action} while {state:?}")]
    InvalidTransition {
        index: usize,
        state: SlotState,
        action: &'static str,
    },
}

/// Per-frame-index resources: one command list and the binding sets over that
/// frame's buffer regions.
///
/// Created once; re-recording reuses the list's storage.
#[derive(Debug)]
pub struct FrameSlot {
    index: usize,
    commands: CommandList,
    compute_set: BindingSetId,
    graphics_set: BindingSetId,
    state: SlotState,
}

impl FrameSlot {
    pub fn new(index: usize, compute_set: BindingSetId, graphics_set: BindingSetId) -> Self {
        Self {
            index,
            commands: CommandList::new(),
            compute_set,
            graphics_set,
            state: SlotState::Unrecorded,
        }
    }

    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    #[inline]
    pub fn state(&self) -> SlotState {
        self.state
    }

    #[inline]
    pub fn commands(&self) -> &CommandList {
        &self.commands
    }

    #[inline]
    pub fn compute_set(&self) -> BindingSetId {
        self.compute_set
    }

    #[inline]
    pub fn graphics_set(&self) -> BindingSetId {
        self.graphics_set
    }

    /// The outstanding submission, if the slot is in flight.
    #[inline]
    pub fn pending(&self) -> Option<SubmissionToken> {
        match self.state {
            SlotState::Submitted(token) => Some(token),
            _ => None,
        }
    }

    /// `Unrecorded | Ready -> Recording`. Returns the list to record into.
    pub fn begin_recording(&mut self) -> Result<&mut CommandList, SlotError> {
        match self.state {
            SlotState::Unrecorded | SlotState::Ready => {
                self.state = SlotState::Recording;
                Ok(&mut self.commands)
            }
            state => Err(self.invalid(state, "begin recording")),
        }
    }

    /// `Recording -> Ready`.
    pub fn finish_recording(&mut self) -> Result<(), SlotError> {
        match self.state {
            SlotState::Recording => {
                self.state = SlotState::Ready;
                Ok(())
            }
            state => Err(self.invalid(state, "finish recording")),
        }
    }

    /// Records the slot's list through `f`.
    ///
    /// On success the slot is `Ready`. If `f` or the final structural check
    /// fails, the partial list is dropped and the slot is `Unrecorded` again.
    pub fn record<F>(&mut self, f: F) -> anyhow::Result<()>
    where
        F: FnOnce(&mut CommandRecorder<'_>) -> Result<(), RecordError>,
    {
        let mut rec = CommandRecorder::begin(self.begin_recording()?);
        let recorded = f(&mut rec).and_then(|()| rec.finish());

        match recorded {
            Ok(()) => self.finish_recording()?,
            Err(e) => {
                self.abort_recording()?;
                return Err(e.into());
            }
        }
        Ok(())
    }

    /// `Recording -> Unrecorded`. Drops whatever was partially recorded.
    pub fn abort_recording(&mut self) -> Result<(), SlotError> {
        match self.state {
            SlotState::Recording => {
                self.commands.reset();
                self.state = SlotState::Unrecorded;
                Ok(())
            }
            state => Err(self.invalid(state, "abort recording")),
        }
    }

    /// `Ready -> Submitted(token)`.
    pub fn mark_submitted(&mut self, token: SubmissionToken) -> Result<(), SlotError> {
        match self.state {
            SlotState::Ready => {
                self.state = SlotState::Submitted(token);
                Ok(())
            }
            state => Err(self.invalid(state, "submit")),
        }
    }

    /// `Submitted -> Ready`, once the device has finished the submission.
    pub fn retire(&mut self) -> Result<(), SlotError> {
        match self.state {
            SlotState::Submitted(_) => {
                self.state = SlotState::Ready;
                Ok(())
            }
            state => Err(self.invalid(state, "retire")),
        }
    }

    fn invalid(&self, state: SlotState, action: &'static str) -> SlotError {
        SlotError::InvalidTransition {
            index: self.index,
            state,
            action,
        }
    }
}
