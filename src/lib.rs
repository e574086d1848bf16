//! Wind Tunnel - real-time sail-trim physics and wind-field simulation
//!
//! Core modules:
//! - `sim`: Deterministic simulation (wind/boat state, dynamics, particles, engine)
//! - `renderer`: Surface abstraction, tessellation and WebGPU upload
//! - `protocol`: Messages exchanged between the host and the engine
//! - `actor`: Mailbox task that owns the engine (native)
//! - `web`: Browser binding driven by `requestAnimationFrame` (wasm32)
//! - `settings`: Data-driven engine configuration

#[cfg(not(target_arch = "wasm32"))]
pub mod actor;
pub mod error;
pub mod protocol;
pub mod renderer;
pub mod settings;
pub mod sim;
#[cfg(target_arch = "wasm32")]
pub mod web;

pub use error::EngineError;
pub use protocol::{EngineEvent, HostMessage, StateSnapshot, WireMessage};
pub use settings::{QualityPreset, Settings};
pub use sim::Engine;

use glam::Vec2;

/// Simulation constants
pub mod consts {
    /// Default fixed tick rate (one tick per display refresh at 60 Hz)
    pub const DEFAULT_TICK_HZ: u32 = 60;
    /// Highest accepted tick rate; faster rates round the interval to zero
    pub const MAX_TICK_HZ: u32 = 1000;
    /// Maximum substeps per `advance` call to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;

    /// Wind speeds above this (knots) are clamped on merge
    pub const MAX_WIND_SPEED: f32 = 100.0;

    /// Exponential smoothing factor applied once per tick
    pub const SMOOTHING: f32 = 0.05;

    /// Half-width of the no-go zone around the wind (degrees)
    pub const HEAD_TO_WIND_DEG: f32 = 30.0;
    /// Below this angle of attack the sail is feathered and flaps
    pub const FEATHERED_AOA_DEG: f32 = 5.0;
    /// Angle of attack with peak efficiency
    pub const OPTIMAL_AOA_DEG: f32 = 15.0;
    /// Upper edge of the attached-flow band
    pub const ATTACHED_AOA_MAX_DEG: f32 = 25.0;

    pub const FEATHERED_EFFICIENCY: f32 = 0.1;
    pub const STALLED_EFFICIENCY: f32 = 0.3;
    /// Heeling force per knot at a given efficiency (attached flow)
    pub const ATTACHED_HEEL_FACTOR: f32 = 0.8;
    /// Heeling force per knot when overtrimmed (drag dominated)
    pub const STALLED_HEEL_FACTOR: f32 = 1.5;
    /// Heel target = heeling force * gain
    pub const HEEL_GAIN: f32 = 2.0;

    /// Wind-field particle pool size
    pub const DEFAULT_PARTICLE_COUNT: usize = 100;
    /// Pixels per tick per knot of particle speed
    pub const PARTICLE_DRIFT: f32 = 0.2;
    /// Particles wrap once they leave the surface by this many pixels
    pub const WRAP_MARGIN: f32 = 10.0;
    /// Length of the streak drawn behind each particle
    pub const STREAK_LENGTH: f32 = 10.0;
}

/// Normalize an angle in degrees to [0, 360)
#[inline]
pub fn normalize_degrees(angle: f32) -> f32 {
    let wrapped = angle.rem_euclid(360.0);
    // rem_euclid rounds tiny negative inputs up to exactly 360.0
    if wrapped >= 360.0 { 0.0 } else { wrapped }
}

/// Unit vector for a compass bearing in surface space.
///
/// 0° points up (north) and bearings grow clockwise; surface y grows downward.
#[inline]
pub fn bearing_to_vec(bearing_deg: f32) -> Vec2 {
    let rad = bearing_deg.to_radians();
    Vec2::new(rad.sin(), -rad.cos())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_degrees() {
        assert_eq!(normalize_degrees(0.0), 0.0);
        assert_eq!(normalize_degrees(360.0), 0.0);
        assert_eq!(normalize_degrees(-90.0), 270.0);
        assert_eq!(normalize_degrees(725.0), 5.0);
        assert_eq!(normalize_degrees(-1e-7), 0.0);
    }

    #[test]
    fn test_bearing_to_vec_compass_points() {
        let north = bearing_to_vec(0.0);
        assert!(north.x.abs() < 1e-6 && (north.y + 1.0).abs() < 1e-6);

        let east = bearing_to_vec(90.0);
        assert!((east.x - 1.0).abs() < 1e-6 && east.y.abs() < 1e-6);

        let south = bearing_to_vec(180.0);
        assert!((south.y - 1.0).abs() < 1e-6);
    }
}
