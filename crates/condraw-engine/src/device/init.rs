use crate::backend::wgpu_backend::REQUIRED_DOWNLEVEL;

/// Initialization parameters for the GPU layer.
#[derive(Debug, Clone)]
pub struct GpuInit {
    /// Swapchain format to use when the surface supports it. The scene and
    /// clear pipelines are built for whatever format is finally chosen.
    pub surface_format: Option<wgpu::TextureFormat>,

    /// Prefer an sRGB surface format when available.
    pub prefer_srgb: bool,

    /// Present mode (swap behavior). FIFO is supported everywhere.
    pub present_mode: wgpu::PresentMode,

    /// Optional alpha mode preference for the surface.
    ///
    /// If provided but unsupported on the current surface, a supported mode is selected.
    pub alpha_mode: Option<wgpu::CompositeAlphaMode>,

    /// Required wgpu features.
    pub required_features: wgpu::Features,

    /// Limits requested from the adapter/device.
    pub required_limits: wgpu::Limits,

    /// Downlevel capabilities the adapter must report. Checked before the device
    /// is created; a mismatch aborts startup.
    pub required_downlevel: wgpu::DownlevelFlags,

    /// Desired maximum frame latency for the surface.
    ///
    /// Also sizes the frame ring: one slot per frame the device may queue, plus
    /// the one the host is writing.
    pub desired_maximum_frame_latency: u32,
}

impl GpuInit {
    /// Number of in-flight frame slots implied by the latency setting.
    #[inline]
    pub fn frame_count(&self) -> usize {
        self.desired_maximum_frame_latency.max(1) as usize + 1
    }
}

impl Default for GpuInit {
    fn default() -> Self {
        Self {
            surface_format: None,
            prefer_srgb: true,
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: None,
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            required_downlevel: REQUIRED_DOWNLEVEL,
            desired_maximum_frame_latency: 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_latency_gives_three_slots() {
        assert_eq!(GpuInit::default().frame_count(), 3);
    }

    #[test]
    fn zero_latency_still_double_buffers() {
        let init = GpuInit {
            desired_maximum_frame_latency: 0,
            ..GpuInit::default()
        };
        assert_eq!(init.frame_count(), 2);
    }

    #[test]
    fn default_requires_indirect_compute() {
        let init = GpuInit::default();
        assert!(init.required_downlevel.contains(wgpu::DownlevelFlags::INDIRECT_EXECUTION));
        assert!(init.required_downlevel.contains(wgpu::DownlevelFlags::COMPUTE_SHADERS));
    }
}
