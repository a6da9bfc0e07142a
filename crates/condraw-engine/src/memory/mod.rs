//! Frame-indexed host data.
//!
//! Each in-flight frame owns a disjoint, aligned region of a shared device
//! buffer. The host stages one value and flushes it into the region of the frame
//! being submitted.

mod versioned;

pub use versioned::VersionedBuffer;

/// Frame index misuse. Always a programming defect.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegionError {
    #[error("frame index {index} out of range for {frame_count} frame regions")]
    IndexOutOfRange { index: usize, frame_count: usize },
}
