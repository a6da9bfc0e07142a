//! Frame slots and the orchestrator that records them.

mod config;
mod orchestrator;
mod slot;

#[cfg(test)]
pub(crate) mod fixture;

pub use config::SceneConfig;
pub use orchestrator::{FrameOrchestrator, SceneSetup};
pub use slot::{FrameSlot, SlotError, SlotState};
