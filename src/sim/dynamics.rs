//! Sail-trim dynamics model
//!
//! Maps wind + controls to a sail regime, an efficiency in [0, 1] and a
//! heeling force, then low-pass filters speed and heel toward their targets.

use serde::{Deserialize, Serialize};

use super::state::{BoatControl, BoatDynamics, WindState};
use crate::consts::*;
use crate::normalize_degrees;

/// Discrete flow state of the mainsail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SailRegime {
    /// Pointing into the no-go zone; no drive at all
    HeadToWind,
    /// Sail eased until it lines up with the wind and flaps
    Feathered,
    /// Attached flow, efficiency peaks at the optimal angle of attack
    Attached,
    /// Overtrimmed: separated flow, low drive, lots of heel
    Stalled,
}

impl SailRegime {
    /// Luffing regimes produce (almost) no drive and flapping telltales
    pub fn is_luffing(self) -> bool {
        matches!(self, SailRegime::HeadToWind | SailRegime::Feathered)
    }
}

/// Tunable model parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DynamicsParams {
    /// Smoothing factor per tick, in (0, 1]
    pub smoothing: f32,
    /// Extra degrees a luffing sail must clear before it fills again
    pub luff_hysteresis_deg: f32,
}

impl Default for DynamicsParams {
    fn default() -> Self {
        Self {
            smoothing: SMOOTHING,
            luff_hysteresis_deg: 0.0,
        }
    }
}

/// Instantaneous (unsmoothed) result of evaluating the sail
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SailForces {
    pub relative_wind_angle: f32,
    pub angle_of_attack: f32,
    pub regime: SailRegime,
    pub efficiency: f32,
    pub heeling_force: f32,
    pub target_speed: f32,
}

/// Wind direction in the boat's frame, [0, 360)
#[inline]
pub fn relative_wind_angle(wind_direction: f32, heading: f32) -> f32 {
    normalize_degrees(wind_direction - heading + 360.0)
}

/// Angular offset between the apparent wind and the boom
#[inline]
pub fn angle_of_attack(relative_wind_angle: f32, mainsail_angle: f32) -> f32 {
    (relative_wind_angle - mainsail_angle.abs()).abs()
}

/// Classify the sail. Checks run in priority order.
pub fn classify(
    relative_wind_angle: f32,
    angle_of_attack: f32,
    hysteresis_deg: f32,
    was_luffing: bool,
) -> SailRegime {
    let slack = if was_luffing { hysteresis_deg.max(0.0) } else { 0.0 };
    let no_go = HEAD_TO_WIND_DEG + slack;

    if relative_wind_angle < no_go || relative_wind_angle > 360.0 - no_go {
        SailRegime::HeadToWind
    } else if angle_of_attack < FEATHERED_AOA_DEG + slack {
        SailRegime::Feathered
    } else if angle_of_attack <= ATTACHED_AOA_MAX_DEG {
        SailRegime::Attached
    } else {
        SailRegime::Stalled
    }
}

/// Evaluate the sail for the current inputs
pub fn sail_forces(
    wind: &WindState,
    control: &BoatControl,
    params: &DynamicsParams,
    was_luffing: bool,
) -> SailForces {
    let relative = relative_wind_angle(wind.direction, control.heading);
    let aoa = angle_of_attack(relative, control.mainsail_angle);
    let regime = classify(relative, aoa, params.luff_hysteresis_deg, was_luffing);

    let (efficiency, heeling_force) = match regime {
        SailRegime::HeadToWind => (0.0, 0.0),
        SailRegime::Feathered => (FEATHERED_EFFICIENCY, 0.0),
        SailRegime::Attached => {
            let eff = 1.0 - (aoa - OPTIMAL_AOA_DEG).abs() / OPTIMAL_AOA_DEG;
            (eff, eff.clamp(0.0, 1.0) * wind.speed * ATTACHED_HEEL_FACTOR)
        }
        SailRegime::Stalled => (STALLED_EFFICIENCY, wind.speed * STALLED_HEEL_FACTOR),
    };
    let efficiency = efficiency.clamp(0.0, 1.0);

    SailForces {
        relative_wind_angle: relative,
        angle_of_attack: aoa,
        regime,
        efficiency,
        heeling_force,
        target_speed: efficiency * wind.speed / 2.0,
    }
}

/// First-order low-pass filter step
#[inline]
pub fn smooth(current: f32, target: f32, alpha: f32) -> f32 {
    current + (target - current) * alpha
}

/// Advance the boat response by one tick
pub fn step(
    wind: &WindState,
    control: &BoatControl,
    dynamics: &mut BoatDynamics,
    params: &DynamicsParams,
) -> SailForces {
    let forces = sail_forces(wind, control, params, dynamics.luffing);

    dynamics.speed = smooth(dynamics.speed, forces.target_speed, params.smoothing).max(0.0);
    dynamics.heel = smooth(dynamics.heel, forces.heeling_force * HEEL_GAIN, params.smoothing).max(0.0);
    dynamics.luffing = forces.regime.is_luffing();

    forces
}
