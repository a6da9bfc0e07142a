//! Backend-neutral command recording.
//!
//! A [`CommandList`] is recorded once per frame slot and replayed on every
//! submission of that slot. Conditional execution is part of the data model:
//! [`PredicatedRange`] wraps the commands a device-read condition includes or
//! excludes, so both branches of a frame are always recorded.

mod barrier;
mod list;
mod recorder;

pub use barrier::{Barrier, Stage};
pub use list::{Command, CommandList, Op, Ops, PredicatedRange};
pub use recorder::{CommandRecorder, RecordError};
