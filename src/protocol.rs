//! Host/engine message protocol
//!
//! Messages are fire-and-forget and processed strictly in arrival order.
//! The JSON wire form mirrors the browser worker protocol:
//! `{"type": "UPDATE_ENV", "payload": {"windDirection": 90}}`.

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::sim::dynamics::SailRegime;
use crate::sim::state::{BoatControl, BoatDynamics, BoatUpdate, EnvUpdate, WindState};

/// Above this speed (knots) with no luffing the flow is reported as laminar
const LAMINAR_SPEED: f32 = 5.0;

/// Host → engine
#[derive(Debug)]
pub enum HostMessage<S> {
    /// Hand over the rendering surface and initial state, start ticking
    Init {
        surface: S,
        wind: WindState,
        control: BoatControl,
    },
    /// Merge into the wind state
    UpdateEnv(EnvUpdate),
    /// Merge into the boat controls
    UpdateBoat(BoatUpdate),
    /// Stop ticking and release the surface
    Stop,
}

impl<S> HostMessage<S> {
    /// Protocol name of this message
    pub fn kind(&self) -> &'static str {
        match self {
            HostMessage::Init { .. } => "INIT",
            HostMessage::UpdateEnv(_) => "UPDATE_ENV",
            HostMessage::UpdateBoat(_) => "UPDATE_BOAT",
            HostMessage::Stop => "STOP",
        }
    }

    /// Lift a decoded wire message. INIT needs the surface the host owns.
    pub fn from_wire(wire: WireMessage, surface: Option<S>) -> Result<Self, EngineError> {
        Ok(match wire {
            WireMessage::Init(payload) => {
                let (wind, control) = payload.validate()?;
                let surface = surface
                    .ok_or_else(|| EngineError::InvalidInit("missing rendering surface".into()))?;
                HostMessage::Init {
                    surface,
                    wind,
                    control,
                }
            }
            WireMessage::UpdateEnv(update) => HostMessage::UpdateEnv(update),
            WireMessage::UpdateBoat(payload) => HostMessage::UpdateBoat(payload.boat_state),
            WireMessage::Stop => HostMessage::Stop,
        })
    }
}

/// Serialized host → engine message (everything but the surface handle)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WireMessage {
    Init(InitPayload),
    UpdateEnv(EnvUpdate),
    UpdateBoat(BoatPayload),
    Stop,
}

impl WireMessage {
    pub fn decode(json: &str) -> Result<Self, EngineError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// INIT payload; fields are optional here so missing ones can be reported
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitPayload {
    #[serde(default)]
    pub wind_direction: Option<f32>,
    #[serde(default)]
    pub wind_speed: Option<f32>,
    #[serde(default)]
    pub boat_state: Option<BoatUpdate>,
}

impl InitPayload {
    /// Check that every required field is present and finite
    pub fn validate(&self) -> Result<(WindState, BoatControl), EngineError> {
        let direction = require("windDirection", self.wind_direction)?;
        let speed = require("windSpeed", self.wind_speed)?;
        let boat = self
            .boat_state
            .ok_or_else(|| EngineError::InvalidInit("missing field boatState".into()))?;
        let heading = require("boatState.heading", boat.heading)?;
        let mainsail = require("boatState.mainsailAngle", boat.mainsail_angle)?;
        let tension = match boat.sheet_tension {
            Some(t) => require("boatState.sheetTension", Some(t))?,
            None => BoatControl::default().sheet_tension,
        };

        Ok((
            WindState::new(direction, speed),
            BoatControl::new(heading, mainsail, tension),
        ))
    }
}

fn require(field: &str, value: Option<f32>) -> Result<f32, EngineError> {
    match value {
        Some(v) if v.is_finite() => Ok(v),
        Some(v) => Err(EngineError::InvalidInit(format!("{} is not finite ({})", field, v))),
        None => Err(EngineError::InvalidInit(format!("missing field {}", field))),
    }
}

/// UPDATE_BOAT payload wrapper
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoatPayload {
    pub boat_state: BoatUpdate,
}

/// STATE_UPDATE payload: the values used for one tick's render
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateSnapshot {
    /// Tick counter since INIT (first tick is 1)
    pub tick: u64,
    #[serde(flatten)]
    pub dynamics: BoatDynamics,
    pub regime: SailRegime,
    pub relative_wind_angle: f32,
    pub angle_of_attack: f32,
    pub efficiency: f32,
    pub target_speed: f32,
}

impl StateSnapshot {
    /// Dashboard banner for this state, if any
    pub fn status_label(&self) -> Option<&'static str> {
        if self.dynamics.luffing {
            Some("LUFFING")
        } else if self.dynamics.speed > LAMINAR_SPEED {
            Some("LAMINAR FLOW")
        } else {
            None
        }
    }
}

/// Engine → host
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EngineEvent {
    /// Emitted once per tick
    StateUpdate(StateSnapshot),
    /// A message was rejected; the engine keeps going
    Error(EngineError),
    /// The loop has ended
    Stopped,
}

impl EngineEvent {
    pub fn to_json(&self) -> Result<String, EngineError> {
        serde_json::to_string(self).map_err(EngineError::from)
    }
}
