//! Wind and boat state
//!
//! Environment and control inputs are merged from partial updates; every
//! value is sanitized here so the dynamics model never sees NaN or
//! out-of-range angles.

use serde::{Deserialize, Serialize};

use crate::consts::MAX_WIND_SPEED;
use crate::normalize_degrees;

/// Environment: where the wind blows from and how hard
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindState {
    /// Bearing the wind blows FROM (degrees, [0, 360), 0 = north, clockwise)
    pub direction: f32,
    /// Wind speed in knots (>= 0)
    pub speed: f32,
}

impl Default for WindState {
    fn default() -> Self {
        Self {
            direction: 0.0,
            speed: 12.0,
        }
    }
}

impl WindState {
    /// Build a sanitized wind state. Non-finite values fall back to defaults.
    pub fn new(direction: f32, speed: f32) -> Self {
        let mut wind = Self::default();
        wind.merge(&EnvUpdate {
            direction: Some(direction),
            speed: Some(speed),
        });
        wind
    }

    /// Merge a partial environment update (omitted fields are left unchanged)
    pub fn merge(&mut self, update: &EnvUpdate) {
        if let Some(direction) = finite("wind direction", update.direction) {
            self.direction = normalize_degrees(direction);
        }
        if let Some(speed) = finite("wind speed", update.speed) {
            self.speed = speed.clamp(0.0, MAX_WIND_SPEED);
        }
    }

    /// True when every field holds a finite value
    pub fn is_finite(&self) -> bool {
        self.direction.is_finite() && self.speed.is_finite()
    }
}

/// Learner's boat controls
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoatControl {
    /// Compass heading (degrees, [0, 360))
    pub heading: f32,
    /// Boom angle off the centreline; the sign is ignored by the model
    pub mainsail_angle: f32,
    /// How hard the sheet is hauled in (0..1). Advisory, not modeled.
    pub sheet_tension: f32,
}

impl Default for BoatControl {
    fn default() -> Self {
        Self {
            heading: 45.0,
            mainsail_angle: 15.0,
            sheet_tension: 0.8,
        }
    }
}

impl BoatControl {
    /// Build sanitized controls. Non-finite values fall back to defaults.
    pub fn new(heading: f32, mainsail_angle: f32, sheet_tension: f32) -> Self {
        let mut control = Self::default();
        control.merge(&BoatUpdate {
            heading: Some(heading),
            mainsail_angle: Some(mainsail_angle),
            sheet_tension: Some(sheet_tension),
        });
        control
    }

    /// Merge a partial control update (omitted fields are left unchanged)
    pub fn merge(&mut self, update: &BoatUpdate) {
        if let Some(heading) = finite("heading", update.heading) {
            self.heading = normalize_degrees(heading);
        }
        if let Some(angle) = finite("mainsail angle", update.mainsail_angle) {
            self.mainsail_angle = angle.clamp(-180.0, 180.0);
        }
        if let Some(tension) = finite("sheet tension", update.sheet_tension) {
            self.sheet_tension = tension.clamp(0.0, 1.0);
        }
    }

    pub fn is_finite(&self) -> bool {
        self.heading.is_finite() && self.mainsail_angle.is_finite() && self.sheet_tension.is_finite()
    }
}

/// Derived boat response, recomputed every tick
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoatDynamics {
    /// Smoothed boat speed in knots (>= 0)
    pub speed: f32,
    /// Smoothed heel (>= 0)
    pub heel: f32,
    /// Sail has lost attached flow and is flapping
    pub luffing: bool,
}

/// Partial environment update (UPDATE_ENV payload)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EnvUpdate {
    #[serde(rename = "windDirection", default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<f32>,
    #[serde(rename = "windSpeed", default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<f32>,
}

impl EnvUpdate {
    pub fn direction(direction: f32) -> Self {
        Self {
            direction: Some(direction),
            speed: None,
        }
    }

    pub fn speed(speed: f32) -> Self {
        Self {
            direction: None,
            speed: Some(speed),
        }
    }
}

/// Partial control update (UPDATE_BOAT payload)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoatUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mainsail_angle: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sheet_tension: Option<f32>,
}

impl BoatUpdate {
    pub fn heading(heading: f32) -> Self {
        Self {
            heading: Some(heading),
            ..Default::default()
        }
    }

    pub fn mainsail_angle(angle: f32) -> Self {
        Self {
            mainsail_angle: Some(angle),
            ..Default::default()
        }
    }
}

/// Drop non-finite values at the merge boundary
fn finite(field: &str, value: Option<f32>) -> Option<f32> {
    match value {
        Some(v) if v.is_finite() => Some(v),
        Some(v) => {
            log::debug!("Ignoring non-finite {}: {}", field, v);
            None
        }
        None => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_env_merge_is_partial() {
        let mut wind = WindState::new(90.0, 12.0);
        wind.merge(&EnvUpdate::speed(20.0));
        assert_eq!(wind.direction, 90.0);
        assert_eq!(wind.speed, 20.0);
    }

    #[test]
    fn test_env_merge_idempotent() {
        let mut wind = WindState::default();
        let update = EnvUpdate {
            direction: Some(-45.0),
            speed: Some(8.0),
        };
        wind.merge(&update);
        let first = wind;
        wind.merge(&update);
        assert_eq!(wind, first);
        assert_eq!(wind.direction, 315.0);
    }

    #[test]
    fn test_nan_fields_are_dropped() {
        let mut control = BoatControl::default();
        control.merge(&BoatUpdate {
            heading: Some(f32::NAN),
            mainsail_angle: Some(f32::INFINITY),
            sheet_tension: Some(0.3),
        });
        assert_eq!(control.heading, 45.0);
        assert_eq!(control.mainsail_angle, 15.0);
        assert_eq!(control.sheet_tension, 0.3);
    }

    #[test]
    fn test_negative_wind_speed_clamped() {
        let wind = WindState::new(10.0, -5.0);
        assert_eq!(wind.speed, 0.0);
    }

    #[test]
    fn test_huge_wind_speed_clamped() {
        let mut wind = WindState::default();
        wind.merge(&EnvUpdate::speed(3.0e38));
        assert_eq!(wind.speed, MAX_WIND_SPEED);
    }

    #[test]
    fn test_sheet_tension_clamped() {
        let control = BoatControl::new(0.0, 20.0, 3.0);
        assert_eq!(control.sheet_tension, 1.0);
    }

    #[test]
    fn test_update_wire_names() {
        let env: EnvUpdate = serde_json::from_str(r#"{"windDirection": 370}"#).unwrap();
        assert_eq!(env.direction, Some(370.0));
        assert_eq!(env.speed, None);

        let boat: BoatUpdate = serde_json::from_str(r#"{"mainsailAngle": -30}"#).unwrap();
        assert_eq!(boat.mainsail_angle, Some(-30.0));
        assert_eq!(boat.heading, None);
    }

    proptest! {
        #[test]
        fn prop_angles_stay_normalized(dir in any::<f32>(), heading in any::<f32>()) {
            let mut wind = WindState::default();
            wind.merge(&EnvUpdate::direction(dir));
            prop_assert!(wind.direction >= 0.0 && wind.direction < 360.0);

            let mut control = BoatControl::default();
            control.merge(&BoatUpdate::heading(heading));
            prop_assert!(control.heading >= 0.0 && control.heading < 360.0);
        }
    }
}
