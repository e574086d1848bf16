//! Shape generation for 2D primitives

use glam::Vec2;
use std::f32::consts::PI;

use super::vertex::Vertex;

/// Sample a quadratic Bézier curve into `segments + 1` points
pub fn quadratic_bezier(p0: Vec2, control: Vec2, p1: Vec2, segments: u32) -> Vec<Vec2> {
    let segments = segments.max(1);
    (0..=segments)
        .map(|i| {
            let t = i as f32 / segments as f32;
            let u = 1.0 - t;
            p0 * (u * u) + control * (2.0 * u * t) + p1 * (t * t)
        })
        .collect()
}

/// Sample a cubic Bézier curve into `segments + 1` points
pub fn cubic_bezier(p0: Vec2, c1: Vec2, c2: Vec2, p1: Vec2, segments: u32) -> Vec<Vec2> {
    let segments = segments.max(1);
    (0..=segments)
        .map(|i| {
            let t = i as f32 / segments as f32;
            let u = 1.0 - t;
            p0 * (u * u * u) + c1 * (3.0 * u * u * t) + c2 * (3.0 * u * t * t) + p1 * (t * t * t)
        })
        .collect()
}

/// Generate vertices for an axis-aligned rectangle
pub fn rect(min: Vec2, max: Vec2, color: [f32; 4]) -> Vec<Vertex> {
    vec![
        Vertex::new(min.x, min.y, color),
        Vertex::new(max.x, min.y, color),
        Vertex::new(min.x, max.y, color),
        Vertex::new(min.x, max.y, color),
        Vertex::new(max.x, min.y, color),
        Vertex::new(max.x, max.y, color),
    ]
}

/// Generate vertices for a thick polyline (one quad per segment)
pub fn polyline(points: &[Vec2], width: f32, color: [f32; 4]) -> Vec<Vertex> {
    if points.len() < 2 {
        return Vec::new();
    }

    let half = width * 0.5;
    let mut vertices = Vec::with_capacity((points.len() - 1) * 6);

    for pair in points.windows(2) {
        let (p1, p2) = (pair[0], pair[1]);

        // Direction from p1 to p2
        let dir = (p2 - p1).normalize_or_zero();
        if dir == Vec2::ZERO {
            continue;
        }
        // Perpendicular for width
        let perp = Vec2::new(-dir.y, dir.x) * half;

        let v1a = p1 + perp;
        let v1b = p1 - perp;
        let v2a = p2 + perp;
        let v2b = p2 - perp;

        // Two triangles
        vertices.push(Vertex::new(v1a.x, v1a.y, color));
        vertices.push(Vertex::new(v1b.x, v1b.y, color));
        vertices.push(Vertex::new(v2a.x, v2a.y, color));

        vertices.push(Vertex::new(v2a.x, v2a.y, color));
        vertices.push(Vertex::new(v1b.x, v1b.y, color));
        vertices.push(Vertex::new(v2b.x, v2b.y, color));
    }

    vertices
}

/// Generate vertices for a polygon as a triangle fan around its centroid
pub fn polygon(points: &[Vec2], color: [f32; 4]) -> Vec<Vertex> {
    if points.len() < 3 {
        return Vec::new();
    }

    let centroid = points.iter().copied().sum::<Vec2>() / points.len() as f32;
    let mut vertices = Vec::with_capacity(points.len() * 3);

    for i in 0..points.len() {
        let a = points[i];
        let b = points[(i + 1) % points.len()];
        vertices.push(Vertex::new(centroid.x, centroid.y, color));
        vertices.push(Vertex::new(a.x, a.y, color));
        vertices.push(Vertex::new(b.x, b.y, color));
    }

    vertices
}

/// Generate vertices for a filled circle
pub fn circle(center: Vec2, radius: f32, color: [f32; 4], segments: u32) -> Vec<Vertex> {
    let mut vertices = Vec::with_capacity((segments * 3) as usize);

    for i in 0..segments {
        let theta1 = (i as f32 / segments as f32) * 2.0 * PI;
        let theta2 = ((i + 1) as f32 / segments as f32) * 2.0 * PI;

        // Triangle from center to edge
        vertices.push(Vertex::new(center.x, center.y, color));
        vertices.push(Vertex::new(
            center.x + radius * theta1.cos(),
            center.y + radius * theta1.sin(),
            color,
        ));
        vertices.push(Vertex::new(
            center.x + radius * theta2.cos(),
            center.y + radius * theta2.sin(),
            color,
        ));
    }

    vertices
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quadratic_bezier_endpoints_and_midpoint() {
        let pts = quadratic_bezier(Vec2::ZERO, Vec2::new(20.0, 40.0), Vec2::new(0.0, 80.0), 8);
        assert_eq!(pts.len(), 9);
        assert_eq!(pts[0], Vec2::ZERO);
        assert!((pts[8] - Vec2::new(0.0, 80.0)).length() < 1e-4);
        // Midpoint of a quadratic sits halfway to the control point
        assert!((pts[4] - Vec2::new(10.0, 40.0)).length() < 1e-4);
    }

    #[test]
    fn test_cubic_bezier_endpoints() {
        let pts = cubic_bezier(
            Vec2::new(0.0, -60.0),
            Vec2::new(30.0, -30.0),
            Vec2::new(30.0, 60.0),
            Vec2::new(0.0, 80.0),
            12,
        );
        assert_eq!(pts.len(), 13);
        assert!((pts[0] - Vec2::new(0.0, -60.0)).length() < 1e-4);
        assert!((pts[12] - Vec2::new(0.0, 80.0)).length() < 1e-4);
        assert!(pts.iter().all(|p| p.x >= 0.0));
    }

    #[test]
    fn test_polyline_vertex_count() {
        let pts = [Vec2::ZERO, Vec2::new(10.0, 0.0), Vec2::new(10.0, 10.0)];
        assert_eq!(polyline(&pts, 2.0, [1.0; 4]).len(), 12);
        assert!(polyline(&pts[..1], 2.0, [1.0; 4]).is_empty());
    }

    #[test]
    fn test_polyline_width() {
        let v = polyline(&[Vec2::ZERO, Vec2::new(10.0, 0.0)], 4.0, [1.0; 4]);
        let ys: Vec<f32> = v.iter().map(|v| v.position[1]).collect();
        assert!(ys.iter().all(|y| (y.abs() - 2.0).abs() < 1e-5));
    }

    #[test]
    fn test_polygon_fan() {
        let square = [
            Vec2::new(0.0, 0.0),
            Vec2::new(2.0, 0.0),
            Vec2::new(2.0, 2.0),
            Vec2::new(0.0, 2.0),
        ];
        let v = polygon(&square, [1.0; 4]);
        assert_eq!(v.len(), 12);
        assert_eq!(v[0].position, [1.0, 1.0]);
    }
}
