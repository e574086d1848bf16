//! Wind tunnel scene
//!
//! Draws one frame: background, wind streaks, hull, mast, boom + sail and
//! telltales. Geometry is built in boat space and mapped to surface space
//! with `Affine2` transforms.

use glam::{Affine2, Vec2};
use rand::Rng;

use super::surface::{Surface, SurfaceError};
use super::vertex::colors;
use crate::consts::STREAK_LENGTH;
use crate::sim::particles::{Particle, drift_direction};
use crate::sim::state::{BoatControl, BoatDynamics, WindState};

/// Curve resolution for hull and sail
const CURVE_SEGMENTS: u32 = 12;
/// Pivot of the boom, relative to the hull origin
const MAST_POS: Vec2 = Vec2::new(0.0, 10.0);
const MAST_RADIUS: f32 = 4.0;
const BOOM_LENGTH: f32 = 80.0;
/// Sideways bulge of a filled sail at mid-chord
const SAIL_DRAFT: f32 = 20.0;
/// Telltale stations along the sail
const TELLTALE_STATIONS: [f32; 3] = [20.0, 40.0, 60.0];
const TELLTALE_LENGTH: f32 = 10.0;
/// Above this speed the sail is drawn as driving hard
const FAST_SPEED: f32 = 5.0;

/// Everything the painter needs for one frame
#[derive(Debug, Clone, Copy)]
pub struct SceneView<'a> {
    pub wind: &'a WindState,
    pub control: &'a BoatControl,
    pub dynamics: &'a BoatDynamics,
    pub particles: &'a [Particle],
    pub relative_wind_angle: f32,
}

/// Which side the boom swings to: -1 (port) when the wind comes over
/// starboard (0 < relative < 180), +1 otherwise
#[inline]
pub fn boom_side(relative_wind_angle: f32) -> f32 {
    if relative_wind_angle > 0.0 && relative_wind_angle < 180.0 {
        -1.0
    } else {
        1.0
    }
}

/// Draws frames and absorbs surface failures so the simulation never stops
#[derive(Debug, Default)]
pub struct ScenePainter {
    surface_lost: bool,
    frames_dropped: u64,
}

impl ScenePainter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Draw a frame. Failures are logged once per outage and otherwise ignored.
    pub fn paint<S, R>(&mut self, surface: &mut S, view: &SceneView<'_>, rng: &mut R)
    where
        S: Surface + ?Sized,
        R: Rng,
    {
        match draw_frame(surface, view, rng) {
            Ok(()) => {
                if self.surface_lost {
                    log::info!(
                        "Rendering surface recovered after {} dropped frames",
                        self.frames_dropped
                    );
                }
                self.surface_lost = false;
            }
            Err(e) => {
                if !self.surface_lost {
                    log::warn!("Rendering disabled: {}", e);
                }
                self.surface_lost = true;
                self.frames_dropped += 1;
            }
        }
    }

    /// True while the last frame could not be drawn
    pub fn surface_lost(&self) -> bool {
        self.surface_lost
    }

    pub fn frames_dropped(&self) -> u64 {
        self.frames_dropped
    }
}

/// Draw one complete frame
pub fn draw_frame<S, R>(surface: &mut S, view: &SceneView<'_>, rng: &mut R) -> Result<(), SurfaceError>
where
    S: Surface + ?Sized,
    R: Rng,
{
    let (w, h) = surface.size();
    let (w, h) = (w as f32, h as f32);

    surface.begin_frame()?;
    surface.fill_rect(Vec2::ZERO, Vec2::new(w, h), colors::BACKGROUND)?;

    draw_particles(surface, view)?;

    let hull = Affine2::from_translation(Vec2::new(w / 2.0, h / 2.0))
        * Affine2::from_angle(view.control.heading.to_radians());
    draw_hull(surface, &hull)?;
    draw_sail(surface, &hull, view, rng)?;

    surface.end_frame()
}

/// Streaks trail behind each particle, opposite to its travel
fn draw_particles<S: Surface + ?Sized>(surface: &mut S, view: &SceneView<'_>) -> Result<(), SurfaceError> {
    let tail = drift_direction(view.wind) * STREAK_LENGTH;
    for p in view.particles {
        surface.stroke_line(p.pos, p.pos - tail, 1.0, colors::PARTICLE)?;
    }
    Ok(())
}

fn draw_hull<S: Surface + ?Sized>(surface: &mut S, hull: &Affine2) -> Result<(), SurfaceError> {
    let bow = Vec2::new(0.0, -60.0);
    let stern = Vec2::new(0.0, 80.0);

    let mut outline = super::shapes::cubic_bezier(
        bow,
        Vec2::new(30.0, -30.0),
        Vec2::new(30.0, 60.0),
        stern,
        CURVE_SEGMENTS,
    );
    let port = super::shapes::cubic_bezier(
        stern,
        Vec2::new(-30.0, 60.0),
        Vec2::new(-30.0, -30.0),
        bow,
        CURVE_SEGMENTS,
    );
    // Skip duplicated joints so the fan has no degenerate triangles
    outline.extend(&port[1..port.len() - 1]);

    let outline: Vec<Vec2> = outline.into_iter().map(|p| hull.transform_point2(p)).collect();
    surface.fill_polygon(&outline, colors::HULL)?;
    surface.fill_circle(hull.transform_point2(MAST_POS), MAST_RADIUS, colors::MAST)
}

fn draw_sail<S, R>(
    surface: &mut S,
    hull: &Affine2,
    view: &SceneView<'_>,
    rng: &mut R,
) -> Result<(), SurfaceError>
where
    S: Surface + ?Sized,
    R: Rng,
{
    let side = boom_side(view.relative_wind_angle);
    let boom_angle = view.control.mainsail_angle * side;
    let boom = *hull
        * Affine2::from_translation(MAST_POS)
        * Affine2::from_angle(boom_angle.to_radians());
    let to_surface = |p: Vec2| boom.transform_point2(p);

    let clew = Vec2::new(0.0, BOOM_LENGTH);
    surface.stroke_line(to_surface(Vec2::ZERO), to_surface(clew), 4.0, colors::BOOM)?;

    let luffing = view.dynamics.luffing;
    let draft = if luffing {
        (rng.random::<f32>() - 0.5) * 10.0
    } else {
        -side * SAIL_DRAFT
    };
    let sail_color = if luffing {
        colors::LUFFING
    } else if view.dynamics.speed > FAST_SPEED {
        colors::ATTACHED
    } else {
        colors::SLOW
    };
    let sail: Vec<Vec2> = super::shapes::quadratic_bezier(
        Vec2::ZERO,
        Vec2::new(draft, BOOM_LENGTH / 2.0),
        clew,
        CURVE_SEGMENTS,
    )
    .into_iter()
    .map(to_surface)
    .collect();
    surface.stroke_polyline(&sail, 2.0, sail_color)?;

    for y in TELLTALE_STATIONS {
        let t = y / BOOM_LENGTH;
        // Point on the sail curve at this station
        let tx = 2.0 * (1.0 - t) * t * draft;
        let start = Vec2::new(tx, y);
        let (end, color) = if luffing {
            let jitter = Vec2::new(rng.random::<f32>() - 0.5, rng.random::<f32>() - 0.5) * 15.0;
            (start + jitter, colors::LUFFING)
        } else {
            (start + Vec2::new(0.0, TELLTALE_LENGTH), colors::ATTACHED)
        };
        surface.stroke_line(to_surface(start), to_surface(end), 1.0, color)?;
    }

    Ok(())
}
