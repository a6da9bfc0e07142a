//! GPU device + surface management.
//!
//! This module is responsible for:
//! - creating the wgpu Instance/Adapter/Device/Queue after a capability check
//! - creating & configuring the Surface (swapchain)
//! - acquiring and presenting swapchain images

mod frame;
mod gpu;
mod init;
mod surface;

pub use surface::SurfaceErrorAction;
pub use frame::GpuFrame;
pub use gpu::Gpu;
pub use init::GpuInit;
