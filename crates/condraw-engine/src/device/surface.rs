//! Swapchain configuration and surface error policy.

use winit::dpi::PhysicalSize;

use super::GpuInit;

/// High-level response after a surface error.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SurfaceErrorAction {
    /// Surface was reconfigured; rendering may resume next frame.
    Reconfigured,
    /// Transient error; skip the current frame.
    SkipFrame,
    /// Fatal error (commonly OOM); terminate gracefully.
    Fatal,
}

/// Picks the swapchain format. Both the scene pipeline and the backend's clear
/// pipeline are built for it, so it must be one the surface reports.
///
/// Order: `requested` if supported, then an sRGB format when preferred, then
/// the surface's first format.
pub(crate) fn choose_surface_format(
    caps: &wgpu::SurfaceCapabilities,
    requested: Option<wgpu::TextureFormat>,
    prefer_srgb: bool,
) -> Option<wgpu::TextureFormat> {
    if let Some(format) = requested {
        if caps.formats.contains(&format) {
            return Some(format);
        }
        log::warn!("requested surface format {format:?} is unsupported; choosing another");
    }

    let srgb = [
        wgpu::TextureFormat::Bgra8UnormSrgb,
        wgpu::TextureFormat::Rgba8UnormSrgb,
    ];
    prefer_srgb
        .then(|| srgb.into_iter().find(|f| caps.formats.contains(f)))
        .flatten()
        .or_else(|| caps.formats.first().copied())
}

/// The scene clears to opaque colors, so `Opaque` wins when nothing is requested.
pub(crate) fn choose_alpha_mode(
    caps: &wgpu::SurfaceCapabilities,
    requested: Option<wgpu::CompositeAlphaMode>,
) -> wgpu::CompositeAlphaMode {
    requested
        .filter(|m| caps.alpha_modes.contains(m))
        .or_else(|| {
            caps.alpha_modes
                .contains(&wgpu::CompositeAlphaMode::Opaque)
                .then_some(wgpu::CompositeAlphaMode::Opaque)
        })
        .or_else(|| caps.alpha_modes.first().copied())
        .unwrap_or(wgpu::CompositeAlphaMode::Auto)
}

/// Swapchain configuration for `size`. wgpu rejects 0x0, so both sides are
/// clamped to 1; callers skip `configure` while minimized.
pub(crate) fn surface_config(
    init: &GpuInit,
    format: wgpu::TextureFormat,
    alpha_mode: wgpu::CompositeAlphaMode,
    size: PhysicalSize<u32>,
) -> wgpu::SurfaceConfiguration {
    wgpu::SurfaceConfiguration {
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        format,
        width: size.width.max(1),
        height: size.height.max(1),
        present_mode: init.present_mode,
        alpha_mode,
        view_formats: vec![],
        desired_maximum_frame_latency: init.desired_maximum_frame_latency,
    }
}

/// Decides how the runtime reacts to a failed acquire.
pub(crate) fn classify_surface_error(err: &wgpu::SurfaceError) -> SurfaceErrorAction {
    let action = match err {
        wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated => SurfaceErrorAction::Reconfigured,
        wgpu::SurfaceError::OutOfMemory => SurfaceErrorAction::Fatal,
        wgpu::SurfaceError::Timeout | wgpu::SurfaceError::Other => SurfaceErrorAction::SkipFrame,
    };

    match action {
        SurfaceErrorAction::Reconfigured => log::debug!("surface {err}; reconfiguring"),
        SurfaceErrorAction::SkipFrame => log::warn!("surface {err}; skipping frame"),
        SurfaceErrorAction::Fatal => log::error!("surface {err}; giving up"),
    }
    action
}
