use bytemuck::{Pod, Zeroable};
use glam::Mat4;

/// Camera block bound at graphics binding 0.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct CameraData {
    pub projection: [[f32; 4]; 4],
}

/// Model block bound at graphics binding 1.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct ModelData {
    pub transform: [[f32; 4]; 4],
}

/// Value written by the compute stage and read by the fragment stage.
///
/// Padded to 16 bytes so the same region binds as a uniform block.
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Pod, Zeroable)]
pub struct DispatchData {
    pub value: f32,
    pub _pad: [f32; 3],
}

impl CameraData {
    #[inline]
    pub fn new(projection: Mat4) -> Self {
        Self {
            projection: projection.to_cols_array_2d(),
        }
    }
}

impl ModelData {
    #[inline]
    pub fn new(transform: Mat4) -> Self {
        Self {
            transform: transform.to_cols_array_2d(),
        }
    }
}

impl DispatchData {
    #[inline]
    pub const fn new(value: f32) -> Self {
        Self {
            value,
            _pad: [0.0; 3],
        }
    }
}
