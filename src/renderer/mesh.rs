//! CPU tessellating surface
//!
//! Turns draw calls into a triangle list ready for GPU upload. Also serves as
//! the headless surface for the native binary and tests.

use glam::Vec2;

use super::shapes;
use super::surface::{Color, Surface, SurfaceError};
use super::vertex::Vertex;

/// Circle tessellation quality
const CIRCLE_SEGMENTS: u32 = 16;

/// A surface that records one frame of triangles
#[derive(Debug, Clone)]
pub struct MeshSurface {
    size: (u32, u32),
    /// Vertices being built for the current frame
    building: Vec<Vertex>,
    /// Vertices of the last completed frame
    presented: Vec<Vertex>,
    frames: u64,
    disposed: bool,
}

impl MeshSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            size: (width, height),
            building: Vec::new(),
            presented: Vec::new(),
            frames: 0,
            disposed: false,
        }
    }

    /// Triangles of the last presented frame
    pub fn vertices(&self) -> &[Vertex] {
        &self.presented
    }

    /// Number of frames presented so far
    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.size = (width, height);
    }

    /// Simulate the host tearing the surface down; every draw call fails afterwards
    pub fn dispose(&mut self) {
        self.disposed = true;
        self.building.clear();
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    fn push(&mut self, vertices: Vec<Vertex>) -> Result<(), SurfaceError> {
        self.check()?;
        self.building.extend(vertices);
        Ok(())
    }

    fn check(&self) -> Result<(), SurfaceError> {
        if self.disposed {
            Err(SurfaceError::Lost)
        } else {
            Ok(())
        }
    }
}

impl Surface for MeshSurface {
    fn size(&self) -> (u32, u32) {
        self.size
    }

    fn begin_frame(&mut self) -> Result<(), SurfaceError> {
        self.check()?;
        self.building.clear();
        Ok(())
    }

    fn fill_rect(&mut self, min: Vec2, max: Vec2, color: Color) -> Result<(), SurfaceError> {
        self.push(shapes::rect(min, max, color))
    }

    fn fill_polygon(&mut self, points: &[Vec2], color: Color) -> Result<(), SurfaceError> {
        self.push(shapes::polygon(points, color))
    }

    fn fill_circle(&mut self, center: Vec2, radius: f32, color: Color) -> Result<(), SurfaceError> {
        self.push(shapes::circle(center, radius, color, CIRCLE_SEGMENTS))
    }

    fn stroke_polyline(
        &mut self,
        points: &[Vec2],
        width: f32,
        color: Color,
    ) -> Result<(), SurfaceError> {
        self.push(shapes::polyline(points, width, color))
    }

    fn end_frame(&mut self) -> Result<(), SurfaceError> {
        self.check()?;
        std::mem::swap(&mut self.building, &mut self.presented);
        self.building.clear();
        self.frames += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_lifecycle() {
        let mut s = MeshSurface::new(100, 100);
        s.begin_frame().unwrap();
        s.fill_rect(Vec2::ZERO, Vec2::new(100.0, 100.0), [0.0; 4]).unwrap();
        assert!(s.vertices().is_empty(), "nothing presented before end_frame");
        s.end_frame().unwrap();
        assert_eq!(s.vertices().len(), 6);
        assert_eq!(s.frames(), 1);
    }

    #[test]
    fn test_disposed_surface_rejects_draws() {
        let mut s = MeshSurface::new(100, 100);
        s.dispose();
        assert_eq!(s.begin_frame(), Err(SurfaceError::Lost));
        assert_eq!(
            s.stroke_line(Vec2::ZERO, Vec2::ONE, 1.0, [1.0; 4]),
            Err(SurfaceError::Lost)
        );
        assert_eq!(s.end_frame(), Err(SurfaceError::Lost));
        assert_eq!(s.frames(), 0);
    }
}
