//! Browser binding
//!
//! `WindTunnelWorker` owns an `Engine<GpuSurface>` bound to a canvas and
//! drives it from `requestAnimationFrame`. Messages use the JSON wire form.

use std::cell::RefCell;
use std::rc::Rc;

use wasm_bindgen::prelude::*;
use web_sys::HtmlCanvasElement;

use crate::error::EngineError;
use crate::protocol::{EngineEvent, HostMessage, WireMessage};
use crate::renderer::pipeline::GpuSurface;
use crate::renderer::surface::{Surface, SurfaceError};
use crate::settings::Settings;
use crate::sim::Engine;

struct Inner {
    engine: Engine<GpuSurface>,
    canvas: Option<HtmlCanvasElement>,
    on_state: Option<js_sys::Function>,
    last_time: f64,
    loop_active: bool,
}

/// JS-facing engine handle
#[wasm_bindgen]
pub struct WindTunnelWorker {
    inner: Rc<RefCell<Inner>>,
}

#[wasm_bindgen]
impl WindTunnelWorker {
    #[wasm_bindgen(constructor)]
    pub fn new() -> WindTunnelWorker {
        console_error_panic_hook::set_once();
        // Already initialized when a second worker is created
        let _ = console_log::init_with_level(log::Level::Info);

        let settings = Settings::load();
        WindTunnelWorker {
            inner: Rc::new(RefCell::new(Inner {
                engine: Engine::new(settings),
                canvas: None,
                on_state: None,
                last_time: 0.0,
                loop_active: false,
            })),
        }
    }

    /// Bind the canvas and apply an INIT message. Resolves once ticking.
    pub fn init(&self, canvas: HtmlCanvasElement, init_json: String) -> js_sys::Promise {
        let inner = self.inner.clone();
        wasm_bindgen_futures::future_to_promise(async move {
            let wire = WireMessage::decode(&init_json).map_err(to_js)?;
            if !matches!(wire, WireMessage::Init(_)) {
                return Err(to_js(EngineError::InvalidInit("expected an INIT message".into())));
            }
            if inner.borrow().engine.is_running() {
                return Err(to_js(EngineError::AlreadyRunning));
            }

            let (width, height) = canvas_size(&canvas);
            let surface = create_surface(&canvas, width, height)
                .await
                .map_err(|e| JsValue::from_str(&e.to_string()))?;
            let msg = HostMessage::from_wire(wire, Some(surface)).map_err(to_js)?;

            let start_loop = {
                let mut w = inner.borrow_mut();
                w.engine.handle(msg).map_err(to_js)?;
                w.canvas = Some(canvas);
                w.last_time = 0.0;
                !std::mem::replace(&mut w.loop_active, true)
            };
            if start_loop {
                request_animation_frame(inner);
            }
            Ok(JsValue::UNDEFINED)
        })
    }

    /// Apply an UPDATE_ENV, UPDATE_BOAT or STOP message
    #[wasm_bindgen(js_name = postMessage)]
    pub fn post_message(&self, json: &str) -> Result<(), JsValue> {
        let wire = WireMessage::decode(json).map_err(to_js)?;
        let msg = HostMessage::from_wire(wire, None).map_err(to_js)?;
        let mut inner = self.inner.borrow_mut();
        inner.engine.handle(msg).map_err(|e| {
            log::warn!("Rejected message: {}", e);
            to_js(e)
        })
    }

    /// Register the STATE_UPDATE listener
    #[wasm_bindgen(js_name = onState)]
    pub fn on_state(&self, callback: js_sys::Function) {
        self.inner.borrow_mut().on_state = Some(callback);
    }

    pub fn stop(&self) -> Result<(), JsValue> {
        let mut inner = self.inner.borrow_mut();
        inner.canvas = None;
        inner.engine.stop().map(drop).map_err(to_js)
    }
}

impl Default for WindTunnelWorker {
    fn default() -> Self {
        Self::new()
    }
}

fn to_js(e: EngineError) -> JsValue {
    EngineEvent::Error(e.clone())
        .to_json()
        .map(|json| JsValue::from_str(&json))
        .unwrap_or_else(|_| JsValue::from_str(&e.to_string()))
}

/// Backing-store size of the canvas in device pixels
fn canvas_size(canvas: &HtmlCanvasElement) -> (u32, u32) {
    let dpr = web_sys::window().map_or(1.0, |w| w.device_pixel_ratio());
    let width = (canvas.client_width() as f64 * dpr) as u32;
    let height = (canvas.client_height() as f64 * dpr) as u32;
    (width.max(1), height.max(1))
}

async fn create_surface(
    canvas: &HtmlCanvasElement,
    width: u32,
    height: u32,
) -> Result<GpuSurface, SurfaceError> {
    canvas.set_width(width);
    canvas.set_height(height);

    let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
        backends: wgpu::Backends::BROWSER_WEBGPU | wgpu::Backends::GL,
        ..Default::default()
    });
    let surface = instance
        .create_surface(wgpu::SurfaceTarget::Canvas(canvas.clone()))
        .map_err(|e| SurfaceError::Unavailable(e.to_string()))?;
    let adapter = instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        })
        .await
        .map_err(|e| SurfaceError::Unavailable(e.to_string()))?;

    log::info!("Using adapter: {:?}", adapter.get_info().name);

    GpuSurface::new(surface, &adapter, width, height).await
}

fn request_animation_frame(inner: Rc<RefCell<Inner>>) {
    let Some(window) = web_sys::window() else {
        log::error!("No window; animation loop not started");
        return;
    };
    let closure = Closure::once(move |time: f64| frame(inner, time));
    let _ = window.request_animation_frame(closure.as_ref().unchecked_ref());
    closure.forget();
}

fn frame(inner: Rc<RefCell<Inner>>, time: f64) {
    let (snapshots, callback) = {
        let mut guard = inner.borrow_mut();
        let w = &mut *guard;
        if !w.engine.is_running() {
            w.loop_active = false;
            return;
        }

        let dt = if w.last_time > 0.0 {
            (((time - w.last_time) / 1000.0) as f32).min(0.1)
        } else {
            w.engine.settings().tick_interval().as_secs_f32()
        };
        w.last_time = time;

        if let Some(canvas) = w.canvas.as_ref() {
            let (cw, ch) = canvas_size(canvas);
            if let Some(surface) = w.engine.surface_mut() {
                if surface.size() != (cw, ch) {
                    canvas.set_width(cw);
                    canvas.set_height(ch);
                    surface.resize(cw, ch);
                }
            }
        }

        (w.engine.advance(dt), w.on_state.clone())
    };

    // Borrow released: the listener may post messages back
    if let Some(callback) = callback {
        for snapshot in snapshots {
            let Ok(json) = EngineEvent::StateUpdate(snapshot).to_json() else {
                continue;
            };
            let payload = js_sys::JSON::parse(&json).unwrap_or_else(|_| JsValue::from_str(&json));
            if let Err(e) = callback.call1(&JsValue::NULL, &payload) {
                log::warn!("State listener threw: {:?}", e);
            }
        }
    }

    request_animation_frame(inner);
}
