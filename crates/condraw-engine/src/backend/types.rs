/// Typed handle to a buffer owned by a backend arena.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct BufferId(pub(crate) u32);

/// Typed handle to a binding layout.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct LayoutId(pub(crate) u32);

/// Typed handle to a set of resource bindings (one per frame slot and pipeline).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct BindingSetId(pub(crate) u32);

/// Typed handle to a compute or graphics pipeline.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct PipelineId(pub(crate) u32);

/// Typed handle to uploaded vertex/index data.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct MeshId(pub(crate) u32);

/// Identifies one submission; used to wait for its completion.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct SubmissionToken(pub(crate) u64);

impl BufferId {
    #[inline]
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// A byte range inside one backend buffer.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct BufferRegion {
    pub buffer: BufferId,
    pub offset: u64,
    pub size: u64,
}

impl BufferRegion {
    #[inline]
    pub const fn new(buffer: BufferId, offset: u64, size: u64) -> Self {
        Self { buffer, offset, size }
    }

    /// One past the last byte of the region.
    #[inline]
    pub const fn end(&self) -> u64 {
        self.offset + self.size
    }

    /// Returns `true` if both regions live in the same buffer and share at least one byte.
    #[inline]
    pub fn overlaps(&self, other: &BufferRegion) -> bool {
        self.buffer == other.buffer && self.offset < other.end() && other.offset < self.end()
    }

    /// Returns `true` if `other` lies entirely inside `self`.
    #[inline]
    pub fn contains(&self, other: &BufferRegion) -> bool {
        self.buffer == other.buffer && self.offset <= other.offset && other.end() <= self.end()
    }
}

/// How a buffer is consumed by the device.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum BufferUsage {
    /// Host-written uniform data (camera, model matrices).
    Uniform,
    /// Host-written condition values inspected by predicated ranges.
    Predicate,
    /// Device-writable storage that is also read by later stages.
    Storage,
}

#[derive(Debug, Clone)]
pub struct BufferDesc<'a> {
    pub label: &'a str,
    pub size: u64,
    pub usage: BufferUsage,
}

/// Kind of resource bound at one binding slot.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum BindingKind {
    UniformBuffer,
    StorageBuffer,
    /// Read-only formatted view over a buffer region.
    TexelBuffer,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct LayoutEntry {
    pub binding: u32,
    pub kind: BindingKind,
    pub stages: wgpu::ShaderStages,
}

#[derive(Debug, Clone)]
pub struct BindingLayoutDesc<'a> {
    pub label: &'a str,
    pub entries: &'a [LayoutEntry],
}

/// Binds `region` at `binding` of a set.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct BindingEntry {
    pub binding: u32,
    pub region: BufferRegion,
}

/// Shader source handed over by the loader. Opaque to the core.
#[derive(Debug, Copy, Clone)]
pub struct ShaderSource<'a> {
    pub label: &'a str,
    pub wgsl: &'a str,
}

#[derive(Debug, Clone)]
pub struct GraphicsPipelineDesc<'a> {
    pub label: &'a str,
    pub shader: ShaderSource<'a>,
    pub vertex_entry: &'a str,
    pub fragment_entry: &'a str,
    pub layout: LayoutId,
    pub vertex_layout: wgpu::VertexBufferLayout<'static>,
    pub topology: wgpu::PrimitiveTopology,
    pub color_format: wgpu::TextureFormat,
}

#[derive(Debug, Clone)]
pub struct ComputePipelineDesc<'a> {
    pub label: &'a str,
    pub shader: ShaderSource<'a>,
    pub entry: &'a str,
    pub layout: LayoutId,
}

/// Pipeline bind point.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum BindPoint {
    Compute,
    Graphics,
}

/// Render target extent in physical pixels.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct Extent {
    pub width: u32,
    pub height: u32,
}

impl Extent {
    #[inline]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Rectangle covering the whole extent.
    #[inline]
    pub const fn full_rect(self) -> Rect2D {
        Rect2D {
            x: 0,
            y: 0,
            width: self.width,
            height: self.height,
        }
    }

    #[inline]
    pub fn aspect(self) -> f32 {
        self.width.max(1) as f32 / self.height.max(1) as f32
    }
}

/// Integer rectangle in physical pixels.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct Rect2D {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Linear RGBA color.
pub type Rgba = [f32; 4];

/// What a backend's device can do, probed once at startup.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Capabilities {
    /// Commands can be included or excluded by a device-read condition value.
    pub conditional_execution: bool,
    /// Compute pipelines are available.
    pub compute: bool,
    /// Minimum alignment for bound buffer offsets, in bytes.
    pub min_offset_alignment: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region(buffer: u32, offset: u64, size: u64) -> BufferRegion {
        BufferRegion::new(BufferId(buffer), offset, size)
    }

    #[test]
    fn overlapping_regions_in_same_buffer() {
        assert!(region(0, 0, 16).overlaps(&region(0, 8, 16)));
        assert!(region(0, 8, 16).overlaps(&region(0, 0, 16)));
    }

    #[test]
    fn adjacent_regions_do_not_overlap() {
        assert!(!region(0, 0, 256).overlaps(&region(0, 256, 256)));
    }

    #[test]
    fn regions_in_different_buffers_never_overlap() {
        assert!(!region(0, 0, 16).overlaps(&region(1, 0, 16)));
    }

    #[test]
    fn contains_requires_full_cover() {
        let outer = region(2, 256, 256);
        assert!(outer.contains(&region(2, 256, 16)));
        assert!(outer.contains(&outer));
        assert!(!outer.contains(&region(2, 500, 16)));
    }

    #[test]
    fn full_rect_matches_extent() {
        let rect = Extent::new(640, 480).full_rect();
        assert_eq!((rect.x, rect.y, rect.width, rect.height), (0, 0, 640, 480));
    }
}
