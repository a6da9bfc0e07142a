//! Scene data: the mesh, its transform, and the uniform blocks the shaders read.

mod mesh;
mod transform;
mod uniforms;

pub use mesh::{Mesh, Vertex};
pub use transform::{perspective, Model, RotationRates};
pub use uniforms::{CameraData, DispatchData, ModelData};
