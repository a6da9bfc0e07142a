/// An acquired swapchain image.
///
/// Short-lived: holding it blocks acquisition of the next image. Pass `view` as
/// the submission target, then hand the frame to `Gpu::present`.
pub struct GpuFrame {
    pub surface_texture: wgpu::SurfaceTexture,
    pub view: wgpu::TextureView,
}
