//! Frame timing.
//!
//! - `FrameClock`: clamped wall-clock dt, one per window
//! - `FixedStep`: constant dt for headless and test runs

mod fixed_step;
mod frame_clock;

pub use fixed_step::FixedStep;
pub use frame_clock::{FrameClock, FrameTime};
