//! Shared scene setup for unit tests.

use crate::backend::{Extent, ShaderSource, SoftBackend, SoftConfig};
use crate::model::{DispatchData, Mesh, Vertex};
use crate::pipeline::ShaderSet;

use super::{FrameOrchestrator, SceneConfig, SceneSetup};

pub(crate) const SHADERS: ShaderSet<'static> = ShaderSet {
    graphics: ShaderSource {
        label: "test graphics",
        wgsl: "",
    },
    vertex_entry: "vs_main",
    fragment_entry: "fs_main",
    compute: ShaderSource {
        label: "test compute",
        wgsl: "",
    },
    compute_entry: "cs_main",
};

/// Soft backend whose `cs_main` writes 1.0 into the dispatch value.
pub(crate) fn backend() -> SoftBackend {
    SoftBackend::new(SoftConfig::default()).with_kernel("cs_main", |bytes, _| {
        bytes[..16].copy_from_slice(bytemuck::bytes_of(&DispatchData::new(1.0)));
    })
}

pub(crate) fn triangle() -> Mesh {
    let v = |x: f32, y: f32| Vertex {
        position: [x, y, 0.0],
        normal: [0.0, 0.0, 1.0],
    };
    Mesh {
        vertices: vec![v(0.0, 1.0), v(-1.0, -1.0), v(1.0, -1.0)],
        indices: vec![0, 1, 2],
    }
}

pub(crate) fn scene(backend: &mut SoftBackend, frame_count: usize) -> FrameOrchestrator {
    let mesh = triangle();
    FrameOrchestrator::new(
        backend,
        SceneSetup {
            frame_count,
            extent: Extent::new(640, 480),
            color_format: wgpu::TextureFormat::Bgra8UnormSrgb,
            shaders: SHADERS,
            mesh: &mesh,
            config: SceneConfig::default(),
        },
    )
    .unwrap()
}
