//! Condraw engine crate.
//!
//! Records per-frame command lists once, with both branches of a predicated
//! frame in place, and replays them with versioned host data every tick.
//!
//! - `backend`: device seam, with a wgpu implementation and a host-side one
//! - `command`, `memory`, `predicate`, `model`, `pipeline`: the scene's building blocks
//! - `frame`, `update`: slot orchestration and the per-tick loop
//! - `device`, `window`, `core`, `time`, `logging`: platform runtime

pub mod backend;
pub mod command;
pub mod memory;
pub mod model;
pub mod pipeline;
pub mod predicate;

pub mod frame;
pub mod update;

pub mod core;
pub mod device;
pub mod time;
pub mod window;

pub mod logging;
