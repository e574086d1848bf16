//! Engine actor
//!
//! Runs an `Engine` inside a single tokio task. The host posts messages into
//! an unbounded mailbox and listens on a broadcast stream of events; neither
//! side ever waits on the other.

use std::sync::Arc;

use tokio::sync::{Notify, broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::error::EngineError;
use crate::protocol::{EngineEvent, HostMessage, WireMessage};
use crate::renderer::surface::Surface;
use crate::settings::Settings;
use crate::sim::Engine;
use crate::sim::state::{BoatControl, BoatUpdate, EnvUpdate, WindState};

/// Surface handed across the task boundary
pub type BoxedSurface = Box<dyn Surface + Send>;

/// Events buffered per listener before old snapshots are skipped
const EVENT_CAPACITY: usize = 256;

/// Host-side handle to a running engine task
pub struct EngineHandle {
    mailbox: mpsc::UnboundedSender<HostMessage<BoxedSurface>>,
    events: broadcast::Sender<EngineEvent>,
    shutdown: Arc<Notify>,
    task: JoinHandle<()>,
}

impl EngineHandle {
    /// Spawn the engine task on the current tokio runtime
    pub fn spawn(settings: Settings) -> Self {
        let (mailbox, mailbox_rx) = mpsc::unbounded_channel();
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let shutdown = Arc::new(Notify::new());

        let task = tokio::spawn(engine_task(
            Engine::new(settings),
            mailbox_rx,
            events.clone(),
            shutdown.clone(),
        ));

        Self {
            mailbox,
            events,
            shutdown,
            task,
        }
    }

    /// Post a message. Never blocks.
    pub fn send(&self, msg: HostMessage<BoxedSurface>) -> Result<(), EngineError> {
        self.mailbox.send(msg).map_err(|_| EngineError::Disconnected)
    }

    pub fn init<S>(&self, surface: S, wind: WindState, control: BoatControl) -> Result<(), EngineError>
    where
        S: Surface + Send + 'static,
    {
        self.send(HostMessage::Init {
            surface: Box::new(surface),
            wind,
            control,
        })
    }

    pub fn update_env(&self, update: EnvUpdate) -> Result<(), EngineError> {
        self.send(HostMessage::UpdateEnv(update))
    }

    pub fn update_boat(&self, update: BoatUpdate) -> Result<(), EngineError> {
        self.send(HostMessage::UpdateBoat(update))
    }

    pub fn stop(&self) -> Result<(), EngineError> {
        self.send(HostMessage::Stop)
    }

    /// Decode and post a JSON wire message. INIT also needs the surface.
    pub fn post_json(&self, json: &str, surface: Option<BoxedSurface>) -> Result<(), EngineError> {
        let wire = WireMessage::decode(json)?;
        self.send(HostMessage::from_wire(wire, surface)?)
    }

    /// Listen for events posted from now on
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.events.subscribe()
    }

    /// Stop the task and wait for it to exit
    pub async fn shutdown(self) {
        self.shutdown.notify_one();
        if let Err(e) = self.task.await {
            log::error!("Engine task failed: {}", e);
        }
    }
}

/// Mailbox + fixed-rate tick loop. Messages win over ticks so an update is
/// always visible on the next tick.
pub async fn engine_task(
    mut engine: Engine<BoxedSurface>,
    mut mailbox: mpsc::UnboundedReceiver<HostMessage<BoxedSurface>>,
    events: broadcast::Sender<EngineEvent>,
    shutdown: Arc<Notify>,
) {
    let mut interval = tokio::time::interval(engine.settings().tick_interval());
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;

            _ = shutdown.notified() => {
                log::debug!("Engine task shutting down");
                break;
            }
            msg = mailbox.recv() => {
                let Some(msg) = msg else {
                    log::info!("Mailbox closed, engine task exiting");
                    break;
                };
                let kind = msg.kind();
                let is_init = matches!(msg, HostMessage::Init { .. });
                let is_stop = matches!(msg, HostMessage::Stop);
                match engine.handle(msg) {
                    Ok(()) => {
                        if is_init {
                            interval.reset();
                        } else if is_stop {
                            let _ = events.send(EngineEvent::Stopped);
                        }
                    }
                    Err(e) => {
                        log::warn!("Rejected {}: {}", kind, e);
                        let _ = events.send(EngineEvent::Error(e));
                    }
                }
            }
            _ = interval.tick(), if engine.is_running() => {
                if let Some(snapshot) = engine.tick() {
                    // No listeners is fine; the host may not care about readouts
                    let _ = events.send(EngineEvent::StateUpdate(snapshot));
                }
            }
        }
    }

    if engine.is_running() {
        let _ = engine.stop();
    }
    let _ = events.send(EngineEvent::Stopped);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::mesh::MeshSurface;
    use crate::sim::dynamics::SailRegime;
    use std::time::Duration;
    use tokio::time::timeout;

    const WAIT: Duration = Duration::from_secs(5);

    async fn next_event(rx: &mut broadcast::Receiver<EngineEvent>) -> EngineEvent {
        timeout(WAIT, rx.recv())
            .await
            .expect("timed out waiting for event")
            .expect("event stream closed")
    }

    async fn next_state(rx: &mut broadcast::Receiver<EngineEvent>) -> crate::StateSnapshot {
        loop {
            if let EngineEvent::StateUpdate(snap) = next_event(rx).await {
                return snap;
            }
        }
    }

    #[tokio::test]
    async fn test_update_before_init_reports_error() {
        let handle = EngineHandle::spawn(Settings::default());
        let mut rx = handle.subscribe();

        handle.update_env(EnvUpdate::direction(90.0)).unwrap();
        assert_eq!(next_event(&mut rx).await, EngineEvent::Error(EngineError::NotRunning));

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_extreme_tick_rate_keeps_task_alive() {
        let settings = Settings {
            tick_hz: 4_000_000_000,
            ..Settings::default()
        };
        let handle = EngineHandle::spawn(settings);
        let mut rx = handle.subscribe();

        handle.update_env(EnvUpdate::direction(90.0)).unwrap();
        assert_eq!(next_event(&mut rx).await, EngineEvent::Error(EngineError::NotRunning));

        handle
            .init(MeshSurface::new(100, 100), WindState::default(), BoatControl::default())
            .unwrap();
        assert_eq!(next_state(&mut rx).await.tick, 1);

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_init_streams_state_updates() {
        let handle = EngineHandle::spawn(Settings::default());
        let mut rx = handle.subscribe();

        handle
            .init(
                MeshSurface::new(800, 600),
                WindState::new(90.0, 12.0),
                BoatControl::new(0.0, 75.0, 0.8),
            )
            .unwrap();

        let first = next_state(&mut rx).await;
        assert_eq!(first.tick, 1);
        assert_eq!(first.regime, SailRegime::Attached);
        let second = next_state(&mut rx).await;
        assert_eq!(second.tick, 2);
        assert!(second.dynamics.speed > first.dynamics.speed);

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_double_init_and_restart() {
        let handle = EngineHandle::spawn(Settings::default());
        let mut rx = handle.subscribe();

        handle
            .init(MeshSurface::new(100, 100), WindState::default(), BoatControl::default())
            .unwrap();
        handle
            .init(MeshSurface::new(100, 100), WindState::default(), BoatControl::default())
            .unwrap();
        loop {
            match next_event(&mut rx).await {
                EngineEvent::Error(e) => {
                    assert_eq!(e, EngineError::AlreadyRunning);
                    break;
                }
                EngineEvent::StateUpdate(_) => {}
                EngineEvent::Stopped => panic!("unexpected stop"),
            }
        }

        handle.stop().unwrap();
        loop {
            if next_event(&mut rx).await == EngineEvent::Stopped {
                break;
            }
        }

        handle
            .init(MeshSurface::new(100, 100), WindState::default(), BoatControl::default())
            .unwrap();
        assert_eq!(next_state(&mut rx).await.tick, 1);

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_update_visible_on_next_tick() {
        let handle = EngineHandle::spawn(Settings::default());
        let mut rx = handle.subscribe();

        handle
            .init(
                MeshSurface::new(200, 200),
                WindState::new(90.0, 12.0),
                BoatControl::new(0.0, 75.0, 0.8),
            )
            .unwrap();
        next_state(&mut rx).await;

        handle.update_boat(BoatUpdate::heading(90.0)).unwrap();
        // A tick may already be buffered from before the update was sent
        let mut snap = next_state(&mut rx).await;
        if snap.regime != SailRegime::HeadToWind {
            snap = next_state(&mut rx).await;
        }
        assert_eq!(snap.regime, SailRegime::HeadToWind);
        assert!(snap.dynamics.luffing);

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_post_json() {
        let handle = EngineHandle::spawn(Settings::default());
        let mut rx = handle.subscribe();

        let err = handle.post_json("{", None).unwrap_err();
        assert!(matches!(err, EngineError::Decode(_)));

        let init = r#"{"type":"INIT","payload":{"windDirection":0,"windSpeed":12,
            "boatState":{"heading":45,"mainsailAngle":15}}}"#;
        handle
            .post_json(init, Some(Box::new(MeshSurface::new(300, 200))))
            .unwrap();
        let snap = next_state(&mut rx).await;
        assert_eq!(snap.relative_wind_angle, 315.0);

        handle.post_json(r#"{"type":"STOP"}"#, None).unwrap();
        loop {
            if next_event(&mut rx).await == EngineEvent::Stopped {
                break;
            }
        }

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_shutdown_reports_stopped() {
        let handle = EngineHandle::spawn(Settings::default());
        let mut rx = handle.subscribe();
        handle
            .init(MeshSurface::new(50, 50), WindState::default(), BoatControl::default())
            .unwrap();
        next_state(&mut rx).await;

        handle.shutdown().await;
        loop {
            match rx.recv().await {
                Ok(EngineEvent::Stopped) => break,
                Ok(_) => {}
                Err(e) => panic!("stream ended before STOPPED: {}", e),
            }
        }
    }
}
