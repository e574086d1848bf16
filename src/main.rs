//! Wind Tunnel entry point
//!
//! Natively this runs a headless scripted session and logs the dashboard
//! readouts. In the browser the library's `WindTunnelWorker` is used instead.

#[cfg(not(target_arch = "wasm32"))]
mod headless {
    use tokio::sync::broadcast::{self, error::RecvError};

    use wind_tunnel::actor::EngineHandle;
    use wind_tunnel::renderer::MeshSurface;
    use wind_tunnel::sim::{BoatControl, BoatUpdate, EnvUpdate, WindState};
    use wind_tunnel::{EngineError, EngineEvent, Settings, StateSnapshot};

    /// Canvas size of the classroom widget
    const SURFACE_SIZE: (u32, u32) = (800, 600);
    /// Seconds each scenario is held before the readout is taken
    const SCENARIO_SECONDS: u32 = 2;

    struct Scenario {
        name: &'static str,
        wind: EnvUpdate,
        boat: BoatUpdate,
    }

    fn scenarios() -> [Scenario; 3] {
        [
            Scenario {
                name: "Dead upwind",
                wind: EnvUpdate {
                    direction: Some(0.0),
                    speed: Some(12.0),
                },
                boat: BoatUpdate {
                    heading: Some(0.0),
                    mainsail_angle: Some(15.0),
                    sheet_tension: None,
                },
            },
            Scenario {
                name: "Beam reach",
                wind: EnvUpdate {
                    direction: Some(90.0),
                    speed: Some(12.0),
                },
                boat: BoatUpdate {
                    heading: Some(0.0),
                    mainsail_angle: Some(75.0),
                    sheet_tension: None,
                },
            },
            Scenario {
                name: "Dead downwind",
                wind: EnvUpdate {
                    direction: Some(180.0),
                    speed: Some(12.0),
                },
                boat: BoatUpdate {
                    heading: Some(0.0),
                    mainsail_angle: Some(90.0),
                    sheet_tension: None,
                },
            },
        ]
    }

    /// Wait for `ticks` state updates and return the last one
    async fn settle(
        events: &mut broadcast::Receiver<EngineEvent>,
        ticks: u32,
    ) -> Result<StateSnapshot, EngineError> {
        let mut seen = 0;
        let mut last = None;
        while seen < ticks {
            match events.recv().await {
                Ok(EngineEvent::StateUpdate(snapshot)) => {
                    seen += 1;
                    last = Some(snapshot);
                }
                Ok(EngineEvent::Error(e)) => log::warn!("Engine reported: {}", e),
                Ok(EngineEvent::Stopped) => break,
                Err(RecvError::Lagged(n)) => log::debug!("Skipped {} events", n),
                Err(RecvError::Closed) => break,
            }
        }
        last.ok_or(EngineError::Disconnected)
    }

    fn report(name: &str, snap: &StateSnapshot) {
        log::info!(
            "{:<14} speed {:>5.2} kn | heel {:>5.1}° | rel {:>5.1}° | aoa {:>5.1}° | eff {:.2} | {:?}{}",
            name,
            snap.dynamics.speed,
            snap.dynamics.heel,
            snap.relative_wind_angle,
            snap.angle_of_attack,
            snap.efficiency,
            snap.regime,
            snap.status_label().map(|l| format!(" | {}", l)).unwrap_or_default()
        );
    }

    pub async fn run() -> Result<(), EngineError> {
        let settings = Settings::load();
        let ticks = settings.effective_tick_hz() * SCENARIO_SECONDS;

        let handle = EngineHandle::spawn(settings);
        let mut events = handle.subscribe();

        handle.init(
            MeshSurface::new(SURFACE_SIZE.0, SURFACE_SIZE.1),
            WindState::default(),
            BoatControl::default(),
        )?;
        let snap = settle(&mut events, ticks).await?;
        report("Initial trim", &snap);

        for scenario in scenarios() {
            handle.update_env(scenario.wind)?;
            handle.update_boat(scenario.boat)?;
            let snap = settle(&mut events, ticks).await?;
            report(scenario.name, &snap);
        }

        handle.stop()?;
        loop {
            match events.recv().await {
                Ok(EngineEvent::Stopped) | Err(RecvError::Closed) => break,
                _ => {}
            }
        }
        handle.shutdown().await;
        Ok(())
    }
}

#[cfg(not(target_arch = "wasm32"))]
#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Wind Tunnel (native, headless) starting...");

    if let Err(e) = headless::run().await {
        log::error!("Session failed: {}", e);
        std::process::exit(1);
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is WindTunnelWorker, this is just to satisfy the compiler
}
