use bytemuck::{Pod, Zeroable};

/// Vertex consumed by the graphics pipeline.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

impl Vertex {
    const ATTRS: [wgpu::VertexAttribute; 2] = wgpu::vertex_attr_array![
        0 => Float32x3, // position
        1 => Float32x3  // normal
    ];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRS,
        }
    }
}

/// Immutable indexed triangle list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u16>,
}

impl Mesh {
    /// Returns `None` when the mesh is empty or an index points past the vertices.
    pub fn new(vertices: Vec<Vertex>, indices: Vec<u16>) -> Option<Self> {
        if vertices.is_empty() || indices.is_empty() || indices.len() % 3 != 0 {
            return None;
        }
        if indices.iter().any(|&i| usize::from(i) >= vertices.len()) {
            return None;
        }
        Some(Self { vertices, indices })
    }

    #[inline]
    pub fn index_count(&self) -> u32 {
        self.indices.len() as u32
    }
}
