use anyhow::{Context, Result};
use wgpu::SurfaceError;
use winit::dpi::PhysicalSize;
use winit::window::Window;

use crate::backend::{Capabilities, Extent, WgpuBackend};

use super::surface::{
    choose_alpha_mode, choose_surface_format, classify_surface_error, surface_config,
};
use super::{GpuFrame, GpuInit, SurfaceErrorAction};

/// Owns wgpu core objects and the surface configuration.
///
/// Creates the Instance/Adapter/Device/Queue, configures the Surface, and
/// acquires and presents swapchain images. Command recording and submission
/// go through the `WgpuBackend` returned by [`Gpu::create_backend`].
pub struct Gpu<'w> {
    #[allow(dead_code)]
    instance: wgpu::Instance,

    /// Surface lifetime is tied to the window via `'w`.
    surface: wgpu::Surface<'w>,

    adapter: wgpu::Adapter,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,

    /// Current drawable size in physical pixels.
    size: PhysicalSize<u32>,

    capabilities: Capabilities,
    frame_count: usize,
}

impl<'w> Gpu<'w> {
    /// Creates a GPU context bound to a window.
    ///
    /// Fails before device creation if the adapter lacks `init.required_downlevel`.
    pub async fn new(window: &'w Window, init: GpuInit) -> Result<Self> {
        let size = window.inner_size();
        anyhow::ensure!(size.width > 0 && size.height > 0, "window has zero size");

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance
            .create_surface(window)
            .context("failed to create wgpu surface")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("failed to find a suitable GPU adapter")?;

        let info = adapter.get_info();
        let downlevel = adapter.get_downlevel_capabilities();
        if !downlevel.flags.contains(init.required_downlevel) {
            anyhow::bail!(
                "adapter `{}` ({:?}) is missing required capabilities: {:?}",
                info.name,
                info.backend,
                init.required_downlevel.difference(downlevel.flags)
            );
        }

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("condraw device"),
                required_features: init.required_features,
                required_limits: init.required_limits.clone(),
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                memory_hints: wgpu::MemoryHints::Performance,
                trace: wgpu::Trace::Off,
            })
            .await
            .context("failed to create wgpu device/queue")?;

        let capabilities = WgpuBackend::probe(&downlevel, &device.limits());
        log::info!(
            "adapter `{}` ({:?}): {:?}",
            info.name,
            info.backend,
            capabilities
        );

        let surface_caps = surface.get_capabilities(&adapter);
        let format = choose_surface_format(&surface_caps, init.surface_format, init.prefer_srgb)
            .context("no supported surface formats")?;
        let alpha_mode = choose_alpha_mode(&surface_caps, init.alpha_mode);
        let config = surface_config(&init, format, alpha_mode, size);
        log::info!("surface {format:?}, {alpha_mode:?}, {:?}", init.present_mode);

        surface.configure(&device, &config);

        Ok(Gpu {
            instance,
            surface,
            adapter,
            device,
            queue,
            config,
            size,
            capabilities,
            frame_count: init.frame_count(),
        })
    }

    /// Returns the active surface format.
    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    /// Returns the current drawable size (physical pixels).
    pub fn size(&self) -> PhysicalSize<u32> {
        self.size
    }

    /// Current drawable size as a backend extent.
    pub fn extent(&self) -> Extent {
        Extent::new(self.size.width, self.size.height)
    }

    /// Number of frame slots to keep in flight.
    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    pub fn adapter_info(&self) -> wgpu::AdapterInfo {
        self.adapter.get_info()
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// Creates a command backend sharing this device and queue.
    pub fn create_backend(&self) -> WgpuBackend {
        WgpuBackend::new(
            self.device.clone(),
            self.queue.clone(),
            self.capabilities,
            self.config.format,
        )
    }

    /// Reconfigures the surface after a resize.
    ///
    /// A 0x0 size only updates internal state; configuration is deferred.
    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        self.size = new_size;
        if !self.has_area() {
            log::debug!("surface minimized; configuration deferred");
            return;
        }
        self.config.width = new_size.width;
        self.config.height = new_size.height;
        self.surface.configure(&self.device, &self.config);
    }

    fn has_area(&self) -> bool {
        self.size.width > 0 && self.size.height > 0
    }

    /// Acquires the next swapchain image.
    pub fn acquire(&self) -> std::result::Result<GpuFrame, SurfaceError> {
        let surface_texture = self.surface.get_current_texture()?;
        let view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        Ok(GpuFrame {
            surface_texture,
            view,
        })
    }

    /// Presents a frame whose work has been submitted.
    pub fn present(&self, window: &Window, frame: GpuFrame) {
        let GpuFrame {
            surface_texture,
            view,
        } = frame;
        drop(view);
        window.pre_present_notify();
        surface_texture.present();
    }

    /// Converts a `SurfaceError` into a higher-level action, reconfiguring the
    /// surface when that is the remedy.
    pub fn handle_surface_error(&mut self, err: SurfaceError) -> SurfaceErrorAction {
        let action = classify_surface_error(&err);
        if action == SurfaceErrorAction::Reconfigured && self.has_area() {
            self.surface.configure(&self.device, &self.config);
        }
        action
    }
}
