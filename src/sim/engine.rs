//! Wind tunnel engine
//!
//! Owns the simulation state between INIT and STOP and runs one fixed tick at
//! a time: dynamics, particles, frame, snapshot. Hosts either call `tick()`
//! on their own schedule or feed wall time to `advance()`.

use rand::SeedableRng;
use rand_pcg::Pcg32;

use super::dynamics::{self, DynamicsParams, SailForces};
use super::particles::ParticleField;
use super::state::{BoatControl, BoatDynamics, BoatUpdate, EnvUpdate, WindState};
use crate::consts::MAX_SUBSTEPS;
use crate::error::EngineError;
use crate::protocol::{HostMessage, StateSnapshot};
use crate::renderer::scene::{SceneView, ScenePainter};
use crate::renderer::surface::Surface;
use crate::settings::Settings;

/// Lifecycle of the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnginePhase {
    /// Waiting for INIT
    Stopped,
    /// Ticking
    Running,
}

/// Everything allocated by INIT and released by STOP
#[derive(Debug)]
struct Session<S> {
    wind: WindState,
    control: BoatControl,
    dynamics: BoatDynamics,
    field: ParticleField,
    surface: S,
    painter: ScenePainter,
    tick: u64,
    /// Unsimulated wall time carried between `advance` calls (seconds)
    accumulator: f32,
}

/// The engine. One per host surface.
#[derive(Debug)]
pub struct Engine<S> {
    settings: Settings,
    params: DynamicsParams,
    rng: Pcg32,
    session: Option<Session<S>>,
}

impl<S: Surface> Engine<S> {
    pub fn new(settings: Settings) -> Self {
        let params = settings.dynamics_params();
        let rng = Pcg32::seed_from_u64(settings.seed);
        Self {
            settings,
            params,
            rng,
            session: None,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn phase(&self) -> EnginePhase {
        if self.session.is_some() {
            EnginePhase::Running
        } else {
            EnginePhase::Stopped
        }
    }

    pub fn is_running(&self) -> bool {
        self.session.is_some()
    }

    /// Apply one host message
    pub fn handle(&mut self, msg: HostMessage<S>) -> Result<(), EngineError> {
        log::trace!("Handling {}", msg.kind());
        match msg {
            HostMessage::Init {
                surface,
                wind,
                control,
            } => self.init(surface, wind, control),
            HostMessage::UpdateEnv(update) => self.update_env(&update),
            HostMessage::UpdateBoat(update) => self.update_boat(&update),
            HostMessage::Stop => self.stop().map(drop),
        }
    }

    /// Take ownership of the surface and start a fresh session
    pub fn init(&mut self, surface: S, wind: WindState, control: BoatControl) -> Result<(), EngineError> {
        if self.session.is_some() {
            return Err(EngineError::AlreadyRunning);
        }
        if !wind.is_finite() || !control.is_finite() {
            return Err(EngineError::InvalidInit("non-finite initial state".into()));
        }
        let wind = WindState::new(wind.direction, wind.speed);
        let control = BoatControl::new(control.heading, control.mainsail_angle, control.sheet_tension);

        // Same seed every session so a replayed script draws the same frames
        self.rng = Pcg32::seed_from_u64(self.settings.seed);
        let (w, h) = surface.size();
        let field = ParticleField::new(
            self.settings.particle_count(),
            w as f32,
            h as f32,
            wind.speed,
            &mut self.rng,
        );

        log::info!(
            "Engine started: {}x{} surface, {} particles, wind {:.0}° @ {:.1} kn, heading {:.0}°",
            w,
            h,
            field.len(),
            wind.direction,
            wind.speed,
            control.heading
        );

        self.session = Some(Session {
            wind,
            control,
            dynamics: BoatDynamics::default(),
            field,
            surface,
            painter: ScenePainter::new(),
            tick: 0,
            accumulator: 0.0,
        });
        Ok(())
    }

    /// Merge a partial wind update; visible from the next tick
    pub fn update_env(&mut self, update: &EnvUpdate) -> Result<(), EngineError> {
        let session = self.session.as_mut().ok_or(EngineError::NotRunning)?;
        session.wind.merge(update);
        Ok(())
    }

    /// Merge a partial control update; visible from the next tick
    pub fn update_boat(&mut self, update: &BoatUpdate) -> Result<(), EngineError> {
        let session = self.session.as_mut().ok_or(EngineError::NotRunning)?;
        session.control.merge(update);
        Ok(())
    }

    /// End the session and hand the surface back
    pub fn stop(&mut self) -> Result<S, EngineError> {
        let session = self.session.take().ok_or(EngineError::NotRunning)?;
        log::info!(
            "Engine stopped after {} ticks ({} frames dropped)",
            session.tick,
            session.painter.frames_dropped()
        );
        Ok(session.surface)
    }

    /// Run exactly one fixed tick. Returns `None` while stopped.
    pub fn tick(&mut self) -> Option<StateSnapshot> {
        let session = self.session.as_mut()?;

        let forces = dynamics::step(
            &session.wind,
            &session.control,
            &mut session.dynamics,
            &self.params,
        );

        let (w, h) = session.surface.size();
        let size = (w as f32, h as f32);
        if size != session.field.size() {
            log::debug!("Surface resized to {}x{}", w, h);
            session.field.resize(size.0, size.1, &mut self.rng);
        }
        session.field.advect(&session.wind);

        let view = SceneView {
            wind: &session.wind,
            control: &session.control,
            dynamics: &session.dynamics,
            particles: session.field.particles(),
            relative_wind_angle: forces.relative_wind_angle,
        };
        session.painter.paint(&mut session.surface, &view, &mut self.rng);

        session.tick += 1;
        Some(snapshot(session.tick, session.dynamics, &forces))
    }

    /// Feed elapsed wall time and run as many fixed ticks as it covers,
    /// capped at `MAX_SUBSTEPS`. Leftover time carries to the next call.
    pub fn advance(&mut self, dt: f32) -> Vec<StateSnapshot> {
        let step = self.settings.tick_interval().as_secs_f32();
        let Some(session) = self.session.as_mut() else {
            return Vec::new();
        };
        if dt.is_finite() && dt > 0.0 {
            session.accumulator += dt;
        }

        let mut snapshots = Vec::new();
        let mut steps = 0;
        while self.session.as_ref().is_some_and(|s| s.accumulator >= step) && steps < MAX_SUBSTEPS {
            if let Some(session) = self.session.as_mut() {
                session.accumulator -= step;
            }
            snapshots.extend(self.tick());
            steps += 1;
        }

        // Drop the backlog after a long stall instead of replaying it
        if steps == MAX_SUBSTEPS {
            if let Some(session) = self.session.as_mut() {
                if session.accumulator >= step {
                    log::debug!("Dropping {:.3}s of simulation backlog", session.accumulator);
                    session.accumulator = 0.0;
                }
            }
        }

        snapshots
    }

    pub fn wind(&self) -> Option<&WindState> {
        self.session.as_ref().map(|s| &s.wind)
    }

    pub fn control(&self) -> Option<&BoatControl> {
        self.session.as_ref().map(|s| &s.control)
    }

    pub fn dynamics(&self) -> Option<&BoatDynamics> {
        self.session.as_ref().map(|s| &s.dynamics)
    }

    pub fn particles(&self) -> Option<&ParticleField> {
        self.session.as_ref().map(|s| &s.field)
    }

    pub fn surface(&self) -> Option<&S> {
        self.session.as_ref().map(|s| &s.surface)
    }

    pub fn surface_mut(&mut self) -> Option<&mut S> {
        self.session.as_mut().map(|s| &mut s.surface)
    }

    /// Ticks run since INIT (0 while stopped)
    pub fn tick_count(&self) -> u64 {
        self.session.as_ref().map_or(0, |s| s.tick)
    }
}

fn snapshot(tick: u64, dynamics: BoatDynamics, forces: &SailForces) -> StateSnapshot {
    StateSnapshot {
        tick,
        dynamics,
        regime: forces.regime,
        relative_wind_angle: forces.relative_wind_angle,
        angle_of_attack: forces.angle_of_attack,
        efficiency: forces.efficiency,
        target_speed: forces.target_speed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::mesh::MeshSurface;
    use crate::sim::dynamics::SailRegime;

    fn running(wind: WindState, control: BoatControl) -> Engine<MeshSurface> {
        let mut engine = Engine::new(Settings::default());
        engine
            .init(MeshSurface::new(800, 600), wind, control)
            .unwrap();
        engine
    }

    fn run(engine: &mut Engine<MeshSurface>, ticks: usize) -> StateSnapshot {
        let mut last = None;
        for _ in 0..ticks {
            last = engine.tick();
        }
        last.unwrap()
    }

    #[test]
    fn test_updates_before_init_rejected() {
        let mut engine: Engine<MeshSurface> = Engine::new(Settings::default());
        assert_eq!(
            engine.update_env(&EnvUpdate::direction(90.0)),
            Err(EngineError::NotRunning)
        );
        assert_eq!(
            engine.handle(HostMessage::UpdateBoat(BoatUpdate::heading(10.0))),
            Err(EngineError::NotRunning)
        );
        assert_eq!(engine.stop().err(), Some(EngineError::NotRunning));
        assert!(engine.tick().is_none());
        assert!(engine.advance(1.0).is_empty());
        assert_eq!(engine.phase(), EnginePhase::Stopped);
    }

    #[test]
    fn test_double_init_rejected() {
        let mut engine = running(WindState::default(), BoatControl::default());
        let err = engine
            .init(MeshSurface::new(10, 10), WindState::default(), BoatControl::default())
            .unwrap_err();
        assert_eq!(err, EngineError::AlreadyRunning);
        // The running session keeps its surface
        assert_eq!(engine.surface().map(|s| s.size()), Some((800, 600)));
    }

    #[test]
    fn test_non_finite_init_rejected() {
        let mut engine: Engine<MeshSurface> = Engine::new(Settings::default());
        let wind = WindState {
            direction: f32::NAN,
            speed: 12.0,
        };
        let err = engine
            .init(MeshSurface::new(10, 10), wind, BoatControl::default())
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidInit(_)));
        assert!(!engine.is_running());
    }

    #[test]
    fn test_first_tick_snapshot() {
        let mut engine = running(WindState::new(90.0, 12.0), BoatControl::new(0.0, 75.0, 0.8));
        let snap = engine.tick().unwrap();
        assert_eq!(snap.tick, 1);
        assert_eq!(snap.regime, SailRegime::Attached);
        assert_eq!(snap.efficiency, 1.0);
        assert_eq!(snap.target_speed, 6.0);
        assert!((snap.dynamics.speed - 0.3).abs() < 1e-6);
        assert_eq!(engine.surface().map(|s| s.frames()), Some(1));
    }

    #[test]
    fn test_scenario_beam_reach_converges() {
        let mut engine = running(WindState::new(90.0, 12.0), BoatControl::new(0.0, 75.0, 0.8));
        let snap = run(&mut engine, 60);
        assert!(!snap.dynamics.luffing);
        assert!(snap.dynamics.speed >= 6.0 * 0.95 && snap.dynamics.speed <= 6.0);
    }

    #[test]
    fn test_head_to_wind_decays() {
        let mut engine = running(WindState::new(90.0, 12.0), BoatControl::new(0.0, 75.0, 0.8));
        let fast = run(&mut engine, 120).dynamics.speed;

        engine.update_boat(&BoatUpdate::heading(90.0)).unwrap();
        let mut prev = fast;
        for _ in 0..120 {
            let snap = engine.tick().unwrap();
            assert!(snap.dynamics.luffing);
            assert_eq!(snap.regime, SailRegime::HeadToWind);
            assert!(snap.dynamics.speed <= prev);
            prev = snap.dynamics.speed;
        }
        assert!(prev < fast * 0.01);
    }

    #[test]
    fn test_update_env_is_idempotent() {
        let mut a = running(WindState::default(), BoatControl::default());
        let mut b = running(WindState::default(), BoatControl::default());
        let update = EnvUpdate {
            direction: Some(270.0),
            speed: Some(20.0),
        };
        a.update_env(&update).unwrap();
        b.update_env(&update).unwrap();
        b.update_env(&update).unwrap();

        assert_eq!(a.wind(), b.wind());
        assert_eq!(a.tick(), b.tick());
    }

    #[test]
    fn test_extreme_wind_keeps_heel_smooth() {
        // Dead downwind, boom out: stalled
        let mut engine = running(WindState::new(180.0, 12.0), BoatControl::new(0.0, 90.0, 0.8));
        engine.update_env(&EnvUpdate::speed(3.0e38)).unwrap();

        let mut prev = 0.0;
        for _ in 0..10 {
            let snap = engine.tick().unwrap();
            assert!(snap.dynamics.heel.is_finite());
            assert!(snap.dynamics.heel >= prev);
            prev = snap.dynamics.heel;
        }

        engine.update_env(&EnvUpdate::speed(12.0)).unwrap();
        let snap = engine.tick().unwrap();
        assert!(snap.dynamics.speed.is_finite() && snap.dynamics.speed < 100.0);
        let json = crate::EngineEvent::StateUpdate(snap).to_json().unwrap();
        assert!(!json.contains("null"));
    }

    #[test]
    fn test_update_visible_next_tick() {
        let mut engine = running(WindState::new(0.0, 12.0), BoatControl::new(90.0, 75.0, 0.8));
        assert_eq!(engine.tick().unwrap().relative_wind_angle, 270.0);
        engine.handle(HostMessage::UpdateEnv(EnvUpdate::direction(180.0))).unwrap();
        assert_eq!(engine.tick().unwrap().relative_wind_angle, 90.0);
    }

    #[test]
    fn test_stop_then_init_restarts_fresh() {
        let mut engine = running(WindState::new(90.0, 12.0), BoatControl::new(0.0, 75.0, 0.8));
        run(&mut engine, 30);
        let first_positions: Vec<_> = engine
            .particles()
            .map(|f| f.particles().to_vec())
            .unwrap_or_default();

        let surface = engine.stop().unwrap();
        assert_eq!(surface.frames(), 30);
        assert!(!engine.is_running());
        assert!(engine.tick().is_none());

        engine
            .init(MeshSurface::new(800, 600), WindState::new(90.0, 12.0), BoatControl::new(0.0, 75.0, 0.8))
            .unwrap();
        assert_eq!(engine.tick_count(), 0);
        assert_eq!(engine.dynamics(), Some(&BoatDynamics::default()));

        run(&mut engine, 30);
        let second_positions: Vec<_> = engine
            .particles()
            .map(|f| f.particles().to_vec())
            .unwrap_or_default();
        assert_eq!(first_positions, second_positions);
    }

    #[test]
    fn test_lost_surface_keeps_state_flowing() {
        let mut engine = running(WindState::new(90.0, 12.0), BoatControl::new(0.0, 75.0, 0.8));
        run(&mut engine, 5);
        if let Some(surface) = engine.surface_mut() {
            surface.dispose();
        }
        let snap = run(&mut engine, 10);
        assert_eq!(snap.tick, 15);
        assert_eq!(engine.surface().map(|s| s.frames()), Some(5));
    }

    #[test]
    fn test_surface_resize_rescales_field() {
        let mut engine = running(WindState::default(), BoatControl::default());
        if let Some(surface) = engine.surface_mut() {
            surface.resize(400, 300);
        }
        engine.tick();
        let field = engine.particles().unwrap();
        assert_eq!(field.size(), (400.0, 300.0));
        assert_eq!(field.len(), 100);
    }

    #[test]
    fn test_hidden_canvas_then_shown_spreads_field() {
        let mut engine = Engine::new(Settings::default());
        engine
            .init(MeshSurface::new(0, 0), WindState::default(), BoatControl::default())
            .unwrap();
        engine.tick();
        if let Some(surface) = engine.surface_mut() {
            surface.resize(800, 600);
        }
        engine.tick();

        let field = engine.particles().unwrap();
        assert_eq!(field.size(), (800.0, 600.0));
        let first = field.particles()[0].pos;
        assert!(field.particles().iter().any(|p| p.pos.distance(first) > 50.0));
    }

    #[test]
    fn test_advance_runs_fixed_ticks() {
        let mut engine = running(WindState::default(), BoatControl::default());
        let step = engine.settings().tick_interval().as_secs_f32();

        assert!(engine.advance(step * 0.5).is_empty());
        let snaps = engine.advance(step * 0.6);
        assert_eq!(snaps.len(), 1);
        assert_eq!(snaps[0].tick, 1);

        let snaps = engine.advance(step * 3.0);
        assert_eq!(snaps.len(), 3);
        assert_eq!(engine.tick_count(), 4);
    }

    #[test]
    fn test_advance_caps_substeps() {
        let mut engine = running(WindState::default(), BoatControl::default());
        let snaps = engine.advance(10.0);
        assert_eq!(snaps.len(), MAX_SUBSTEPS as usize);
        // Backlog dropped rather than replayed
        assert!(engine.advance(0.0).is_empty());
        assert!(engine.advance(f32::NAN).is_empty());
    }

    #[test]
    fn test_particles_disabled() {
        let settings = Settings {
            particles: false,
            ..Settings::default()
        };
        let mut engine = Engine::new(settings);
        engine
            .init(MeshSurface::new(100, 100), WindState::default(), BoatControl::default())
            .unwrap();
        assert!(engine.particles().is_some_and(|f| f.is_empty()));
        assert!(engine.tick().is_some());
    }
}
