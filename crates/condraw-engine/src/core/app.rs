use anyhow::Result;
use winit::dpi::PhysicalSize;
use winit::event::WindowEvent;
use winit::window::WindowId;

use crate::device::Gpu;

use super::ctx::FrameCtx;

/// Control directive returned by app callbacks.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AppControl {
    Continue,
    Exit,
}

/// Application contract implemented by higher layers.
///
/// Call order: `on_init` once the device exists, then any mix of
/// `on_window_event`, `on_resized` and `on_frame`, then `on_exit` before the
/// device is dropped.
pub trait App {
    /// Called once after the window and GPU context are created.
    ///
    /// An error aborts the runtime.
    fn on_init(&mut self, gpu: &Gpu<'_>) -> Result<()>;

    /// Called for window events, before the runtime handles them.
    fn on_window_event(&mut self, window_id: WindowId, event: &WindowEvent) -> AppControl {
        let _ = (window_id, event);
        AppControl::Continue
    }

    /// Called after the surface has been reconfigured for a new size.
    ///
    /// Not called for zero-sized (minimized) windows.
    fn on_resized(&mut self, gpu: &Gpu<'_>, size: PhysicalSize<u32>) -> AppControl {
        let _ = (gpu, size);
        AppControl::Continue
    }

    /// Called once per redraw.
    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl;

    /// Called once before the window and device are released.
    fn on_exit(&mut self) {}
}
