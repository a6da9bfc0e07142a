//! Conditional-execution values.
//!
//! A predicate is a single `u32` per frame, staged by the host and inspected by
//! the device when a predicated range executes.

mod duty;
mod resource;

pub use duty::DutyCycle;
pub use resource::{ConditionData, PredicateRef, PredicateResource};
