//! Compute and graphics pipelines plus the binding layouts they share.

mod registry;

pub use registry::{PipelineLayoutSet, PipelineRegistry, ShaderSet};

/// Graphics binding of the camera block.
pub const CAMERA_BINDING: u32 = 0;
/// Graphics binding of the model block.
pub const MODEL_BINDING: u32 = 1;
/// Graphics binding of the view over the dispatch value.
pub const DISPATCH_BINDING: u32 = 2;
/// Compute binding of the dispatch value.
pub const STORAGE_BINDING: u32 = 0;
