//! Rendering module
//!
//! The scene is drawn through the `Surface` trait. `MeshSurface` tessellates
//! draw calls into triangles; `GpuSurface` uploads them with WebGPU.

pub mod mesh;
pub mod pipeline;
pub mod scene;
pub mod shapes;
pub mod surface;
pub mod vertex;

pub use mesh::MeshSurface;
pub use pipeline::GpuSurface;
pub use scene::{SceneView, ScenePainter, draw_frame};
pub use surface::{Color, Surface, SurfaceError};
pub use vertex::Vertex;
