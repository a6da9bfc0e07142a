//! Device/queue seam.
//!
//! The core never touches a graphics API directly. Everything it needs from a
//! device goes through [`Backend`]: resources are owned by the backend and
//! referenced by typed ids, command lists are recorded once and handed to
//! [`Backend::submit`] every time their frame slot comes around.
//!
//! Two implementations exist:
//! - [`WgpuBackend`] drives a real device
//! - [`SoftBackend`] executes command lists on the host, deterministically,
//!   and rejects submissions whose barriers do not order device accesses

mod error;
mod types;

pub mod soft;
pub mod wgpu_backend;

pub use error::BackendError;
pub use soft::{SoftBackend, SoftConfig, SoftTarget, TraceEvent};
pub use types::{
    BindPoint, BindingEntry, BindingKind, BindingLayoutDesc, BindingSetId, BufferDesc, BufferId,
    BufferRegion, BufferUsage, Capabilities, ComputePipelineDesc, Extent, GraphicsPipelineDesc,
    LayoutEntry, LayoutId, MeshId, PipelineId, Rect2D, Rgba, ShaderSource, SubmissionToken,
};
pub use wgpu_backend::WgpuBackend;

use crate::command::CommandList;
use crate::model::Mesh;

/// Resource creation and submission contract implemented per device type.
pub trait Backend {
    /// Color target a submission renders into.
    type Target;

    /// Capabilities probed when the device was created.
    fn capabilities(&self) -> Capabilities;

    fn create_buffer(&mut self, desc: &BufferDesc<'_>) -> Result<BufferId, BackendError>;

    /// Copies `bytes` into device-visible memory at `region`.
    ///
    /// `bytes.len()` must equal `region.size`.
    fn write_buffer(&mut self, region: BufferRegion, bytes: &[u8]) -> Result<(), BackendError>;

    fn create_binding_layout(
        &mut self,
        desc: &BindingLayoutDesc<'_>,
    ) -> Result<LayoutId, BackendError>;

    fn create_binding_set(
        &mut self,
        label: &str,
        layout: LayoutId,
        entries: &[BindingEntry],
    ) -> Result<BindingSetId, BackendError>;

    fn create_graphics_pipeline(
        &mut self,
        desc: &GraphicsPipelineDesc<'_>,
    ) -> Result<PipelineId, BackendError>;

    fn create_compute_pipeline(
        &mut self,
        desc: &ComputePipelineDesc<'_>,
    ) -> Result<PipelineId, BackendError>;

    fn create_mesh(&mut self, label: &str, mesh: &Mesh) -> Result<MeshId, BackendError>;

    /// Submits a prerecorded command list. No wait or signal semaphores are involved;
    /// ordering with earlier submissions is implied by the single queue.
    fn submit(
        &mut self,
        commands: &CommandList,
        target: &mut Self::Target,
    ) -> Result<SubmissionToken, BackendError>;

    /// Returns `true` once the device has finished the submission.
    fn is_complete(&mut self, token: SubmissionToken) -> bool;

    /// Blocks until the submission has finished on the device.
    fn wait(&mut self, token: SubmissionToken) -> Result<(), BackendError>;

    /// Blocks until all submitted work has finished.
    fn wait_idle(&mut self) -> Result<(), BackendError>;
}

/// Rounds `value` up to the next multiple of `alignment` (which must be non-zero).
#[inline]
pub const fn align_up(value: u64, alignment: u64) -> u64 {
    value.div_ceil(alignment) * alignment
}

#[cfg(test)]
mod tests {
    use super::align_up;

    #[test]
    fn align_up_rounds_to_multiple() {
        assert_eq!(align_up(4, 256), 256);
        assert_eq!(align_up(256, 256), 256);
        assert_eq!(align_up(257, 256), 512);
        assert_eq!(align_up(64, 16), 64);
    }

    #[test]
    fn align_up_keeps_zero() {
        assert_eq!(align_up(0, 256), 0);
    }
}
