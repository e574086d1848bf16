//! Host rendering surface abstraction
//!
//! The engine only ever issues 2D draw calls in surface space (pixels, y
//! down). Backends decide how to rasterize them.

use glam::Vec2;
use thiserror::Error;

/// RGBA color, components in 0-1
pub type Color = [f32; 4];

/// Reasons a draw call could not be carried out
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SurfaceError {
    /// The surface was disposed or its context lost
    #[error("rendering surface lost")]
    Lost,
    /// The surface exists but cannot accept a frame right now
    #[error("rendering surface unavailable: {0}")]
    Unavailable(String),
}

/// A 2D drawing target supplied by the host
pub trait Surface {
    /// Surface size in pixels
    fn size(&self) -> (u32, u32);

    /// Start a new frame, discarding the previous one
    fn begin_frame(&mut self) -> Result<(), SurfaceError>;

    /// Fill an axis-aligned rectangle
    fn fill_rect(&mut self, min: Vec2, max: Vec2, color: Color) -> Result<(), SurfaceError>;

    /// Fill a polygon that is star-shaped around its centroid
    fn fill_polygon(&mut self, points: &[Vec2], color: Color) -> Result<(), SurfaceError>;

    /// Fill a circle
    fn fill_circle(&mut self, center: Vec2, radius: f32, color: Color) -> Result<(), SurfaceError>;

    /// Stroke an open polyline
    fn stroke_polyline(
        &mut self,
        points: &[Vec2],
        width: f32,
        color: Color,
    ) -> Result<(), SurfaceError>;

    /// Finish the frame and present it
    fn end_frame(&mut self) -> Result<(), SurfaceError>;

    /// Stroke a single segment
    fn stroke_line(&mut self, a: Vec2, b: Vec2, width: f32, color: Color) -> Result<(), SurfaceError> {
        self.stroke_polyline(&[a, b], width, color)
    }
}

impl<S: Surface + ?Sized> Surface for Box<S> {
    fn size(&self) -> (u32, u32) {
        (**self).size()
    }

    fn begin_frame(&mut self) -> Result<(), SurfaceError> {
        (**self).begin_frame()
    }

    fn fill_rect(&mut self, min: Vec2, max: Vec2, color: Color) -> Result<(), SurfaceError> {
        (**self).fill_rect(min, max, color)
    }

    fn fill_polygon(&mut self, points: &[Vec2], color: Color) -> Result<(), SurfaceError> {
        (**self).fill_polygon(points, color)
    }

    fn fill_circle(&mut self, center: Vec2, radius: f32, color: Color) -> Result<(), SurfaceError> {
        (**self).fill_circle(center, radius, color)
    }

    fn stroke_polyline(
        &mut self,
        points: &[Vec2],
        width: f32,
        color: Color,
    ) -> Result<(), SurfaceError> {
        (**self).stroke_polyline(points, width, color)
    }

    fn end_frame(&mut self) -> Result<(), SurfaceError> {
        (**self).end_frame()
    }

    fn stroke_line(&mut self, a: Vec2, b: Vec2, width: f32, color: Color) -> Result<(), SurfaceError> {
        (**self).stroke_line(a, b, width, color)
    }
}
