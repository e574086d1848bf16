//! Wind-field particles
//!
//! A fixed pool of streaks drifting downwind across a toroidal field.
//! Particles are never created or destroyed after construction.

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::state::WindState;
use crate::bearing_to_vec;
use crate::consts::{PARTICLE_DRIFT, WRAP_MARGIN};

/// A single wind indicator
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Particle {
    /// Position in surface space (pixels, y down)
    pub pos: Vec2,
    /// Per-particle speed drawn from the wind speed with jitter
    pub speed: f32,
    /// 0-1, reserved for fade/respawn effects
    pub life: f32,
}

/// Fixed-size pool of particles covering a `width` x `height` surface
#[derive(Debug, Clone)]
pub struct ParticleField {
    particles: Vec<Particle>,
    width: f32,
    height: f32,
}

impl ParticleField {
    /// Scatter `count` particles uniformly over the surface
    pub fn new<R: Rng>(
        count: usize,
        width: f32,
        height: f32,
        wind_speed: f32,
        rng: &mut R,
    ) -> Self {
        let width = width.max(0.0);
        let height = height.max(0.0);
        let particles = (0..count)
            .map(|_| Particle {
                pos: Vec2::new(rng.random::<f32>() * width, rng.random::<f32>() * height),
                speed: (rng.random::<f32>() * 0.5 + 0.5) * wind_speed,
                life: rng.random::<f32>(),
            })
            .collect();

        Self {
            particles,
            width,
            height,
        }
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn size(&self) -> (f32, f32) {
        (self.width, self.height)
    }

    /// Move every particle one tick downwind, wrapping at the edges
    pub fn advect(&mut self, wind: &WindState) {
        let drift = drift_direction(wind);
        let (w, h) = (self.width, self.height);

        for p in &mut self.particles {
            p.pos += drift * p.speed * PARTICLE_DRIFT;
            p.pos.x = wrap(p.pos.x, w);
            p.pos.y = wrap(p.pos.y, h);
        }
    }

    /// Rescale positions after the host surface changed size. An axis that
    /// had no extent has nothing to scale, so it is scattered afresh.
    pub fn resize<R: Rng>(&mut self, width: f32, height: f32, rng: &mut R) {
        let width = width.max(0.0);
        let height = height.max(0.0);
        let (old_w, old_h) = (self.width, self.height);

        for p in &mut self.particles {
            p.pos.x = if old_w > 0.0 {
                wrap(p.pos.x * width / old_w, width)
            } else {
                rng.random::<f32>() * width
            };
            p.pos.y = if old_h > 0.0 {
                wrap(p.pos.y * height / old_h, height)
            } else {
                rng.random::<f32>() * height
            };
        }
        self.width = width;
        self.height = height;
    }
}

/// Direction the wind blows TOWARD (reciprocal of its source bearing)
#[inline]
pub fn drift_direction(wind: &WindState) -> Vec2 {
    bearing_to_vec(wind.direction + 180.0)
}

/// Teleport a coordinate that left [-margin, max + margin] to the other edge
#[inline]
fn wrap(v: f32, max: f32) -> f32 {
    if v < -WRAP_MARGIN {
        max + WRAP_MARGIN
    } else if v > max + WRAP_MARGIN {
        -WRAP_MARGIN
    } else {
        v
    }
}
