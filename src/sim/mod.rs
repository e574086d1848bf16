//! Deterministic simulation module
//!
//! All physics lives here. Given the same settings, messages and tick count
//! the engine produces the same snapshots:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable particle order

pub mod dynamics;
pub mod engine;
pub mod particles;
pub mod state;

pub use dynamics::{DynamicsParams, SailForces, SailRegime};
pub use engine::{Engine, EnginePhase};
pub use particles::{Particle, ParticleField};
pub use state::{BoatControl, BoatDynamics, BoatUpdate, EnvUpdate, WindState};
