//! Vertex types for 2D rendering

use bytemuck::{Pod, Zeroable};

/// Simple 2D vertex with position and color
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 2],
    pub color: [f32; 4],
}

impl Vertex {
    pub const fn new(x: f32, y: f32, color: [f32; 4]) -> Self {
        Self {
            position: [x, y],
            color,
        }
    }

    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x2,
                },
                wgpu::VertexAttribute {
                    offset: std::mem::size_of::<[f32; 2]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x4,
                },
            ],
        }
    }
}

/// Colors for wind tunnel elements
pub mod colors {
    pub const BACKGROUND: [f32; 4] = [0.059, 0.090, 0.165, 1.0]; // #0f172a
    pub const PARTICLE: [f32; 4] = [1.0, 1.0, 1.0, 0.1];
    pub const HULL: [f32; 4] = [0.973, 0.980, 0.988, 1.0]; // #f8fafc
    pub const MAST: [f32; 4] = [0.580, 0.639, 0.722, 1.0]; // #94a3b8
    pub const BOOM: [f32; 4] = [0.392, 0.455, 0.545, 1.0]; // #64748b
    /// Luffing sail / separated telltale
    pub const LUFFING: [f32; 4] = [0.937, 0.267, 0.267, 1.0]; // #ef4444
    /// Driving sail / attached telltale
    pub const ATTACHED: [f32; 4] = [0.133, 0.773, 0.369, 1.0]; // #22c55e
    /// Sail drawing but still slow
    pub const SLOW: [f32; 4] = [0.984, 0.749, 0.141, 1.0]; // #fbbf24
}
