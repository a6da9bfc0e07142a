use anyhow::Result;
use winit::window::{Window, WindowId};

use crate::device::{Gpu, SurfaceErrorAction};
use crate::time::FrameTime;
use crate::window::RuntimeCtx;

use super::app::AppControl;

/// Per-window handles and immutable window metadata.
pub struct WindowCtx<'a> {
    pub id: WindowId,
    pub window: &'a Window,
}

/// Per-frame context passed to `core::App::on_frame`.
///
/// Lifetimes:
/// - `'a` is the duration of the callback invocation
/// - `'w` is the window-borrow lifetime carried by `Gpu<'w>`
pub struct FrameCtx<'a, 'w> {
    pub window: WindowCtx<'a>,
    pub gpu: &'a mut Gpu<'w>,
    pub time: FrameTime,
    pub runtime: &'a mut RuntimeCtx,
}

impl<'a, 'w> FrameCtx<'a, 'w> {
    /// Acquires a swapchain image, hands its view to `draw`, then presents it.
    ///
    /// Surface errors are absorbed (skip or reconfigure) unless fatal. An error
    /// from `draw` is logged and ends the run; the image is still presented.
    pub fn present_with<F>(&mut self, draw: F) -> AppControl
    where
        F: FnOnce(&mut wgpu::TextureView) -> Result<()>,
    {
        let mut frame = match self.gpu.acquire() {
            Ok(f) => f,
            Err(err) => {
                log::debug!("surface acquire failed: {err}");
                return match self.gpu.handle_surface_error(err) {
                    SurfaceErrorAction::Fatal => AppControl::Exit,
                    _ => AppControl::Continue,
                };
            }
        };

        let result = draw(&mut frame.view);
        self.gpu.present(self.window.window, frame);

        match result {
            Ok(()) => AppControl::Continue,
            Err(e) => {
                log::error!("frame failed: {e:#}");
                AppControl::Exit
            }
        }
    }
}
