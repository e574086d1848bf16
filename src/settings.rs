//! Engine settings
//!
//! Read from `WIND_TUNNEL_*` environment variables natively and from
//! LocalStorage in the browser.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::consts::{DEFAULT_PARTICLE_COUNT, DEFAULT_TICK_HZ, MAX_TICK_HZ, SMOOTHING};
use crate::error::EngineError;
use crate::sim::dynamics::DynamicsParams;

/// Quality preset levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum QualityPreset {
    Low,
    #[default]
    Medium,
    High,
}

impl QualityPreset {
    pub fn as_str(&self) -> &'static str {
        match self {
            QualityPreset::Low => "Low",
            QualityPreset::Medium => "Medium",
            QualityPreset::High => "High",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "low" => Some(QualityPreset::Low),
            "medium" | "med" => Some(QualityPreset::Medium),
            "high" => Some(QualityPreset::High),
            _ => None,
        }
    }

    /// Wind-field particle pool size for this preset
    pub fn particle_count(&self) -> usize {
        match self {
            QualityPreset::Low => DEFAULT_PARTICLE_COUNT / 2,
            QualityPreset::Medium => DEFAULT_PARTICLE_COUNT,
            QualityPreset::High => DEFAULT_PARTICLE_COUNT * 4,
        }
    }
}

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Graphics quality preset
    pub quality: QualityPreset,
    /// Draw the wind field at all
    pub particles: bool,
    /// Fixed simulation rate
    pub tick_hz: u32,
    /// Exponential smoothing factor per tick
    pub smoothing: f32,
    /// Degrees a luffing sail must clear before it fills again (0 = off)
    pub luff_hysteresis_deg: f32,
    /// Seed for particle placement and flapping jitter
    pub seed: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            quality: QualityPreset::Medium,
            particles: true,
            tick_hz: DEFAULT_TICK_HZ,
            smoothing: SMOOTHING,
            luff_hysteresis_deg: 0.0,
            seed: 0x5eed_0f_5a11,
        }
    }
}

impl Settings {
    /// Create settings from a quality preset
    pub fn from_preset(preset: QualityPreset) -> Self {
        Self {
            quality: preset,
            ..Self::default()
        }
    }

    /// Effective particle pool size
    pub fn particle_count(&self) -> usize {
        if !self.particles {
            0
        } else {
            self.quality.particle_count()
        }
    }

    /// Tick rate actually used, kept within 1..=`MAX_TICK_HZ`
    pub fn effective_tick_hz(&self) -> u32 {
        self.tick_hz.clamp(1, MAX_TICK_HZ)
    }

    /// Fixed timestep between ticks (never zero)
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.effective_tick_hz() as f64)
    }

    /// Dynamics model parameters, with the smoothing factor kept in (0, 1]
    pub fn dynamics_params(&self) -> DynamicsParams {
        let smoothing = if self.smoothing.is_finite() && self.smoothing > 0.0 {
            self.smoothing.min(1.0)
        } else {
            SMOOTHING
        };
        let hysteresis = if self.luff_hysteresis_deg.is_finite() {
            self.luff_hysteresis_deg.max(0.0)
        } else {
            0.0
        };
        DynamicsParams {
            smoothing,
            luff_hysteresis_deg: hysteresis,
        }
    }

    /// Parse settings JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Apply overrides from a key lookup (environment variables natively)
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Self::default();

        if let Some(quality) = lookup("WIND_TUNNEL_QUALITY").and_then(|v| QualityPreset::from_str(&v)) {
            settings.quality = quality;
        }
        if let Some(particles) = lookup("WIND_TUNNEL_PARTICLES").and_then(|v| v.parse().ok()) {
            settings.particles = particles;
        }
        if let Some(hz) = lookup("WIND_TUNNEL_TICK_HZ").and_then(|v| v.parse::<u32>().ok()) {
            if hz > 0 {
                settings.tick_hz = hz;
            }
        }
        if let Some(alpha) = lookup("WIND_TUNNEL_SMOOTHING").and_then(|v| v.parse().ok()) {
            settings.smoothing = alpha;
        }
        if let Some(h) = lookup("WIND_TUNNEL_HYSTERESIS").and_then(|v| v.parse().ok()) {
            settings.luff_hysteresis_deg = h;
        }
        if let Some(seed) = lookup("WIND_TUNNEL_SEED").and_then(|v| v.parse().ok()) {
            settings.seed = seed;
        }

        settings
    }

    /// LocalStorage key
    #[allow(dead_code)]
    const STORAGE_KEY: &'static str = "wind_tunnel_settings";

    /// Load settings from LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn load() -> Self {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(Some(json)) = storage.get_item(Self::STORAGE_KEY) {
                match Self::from_json(&json) {
                    Ok(settings) => {
                        log::info!("Loaded settings from LocalStorage");
                        return settings;
                    }
                    Err(e) => log::warn!("Ignoring stored settings: {}", e),
                }
            }
        }

        log::info!("Using default settings");
        Self::default()
    }

    /// Load settings from the environment
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load() -> Self {
        let settings = Self::from_lookup(|key| std::env::var(key).ok());
        log::info!(
            "Settings: quality={} particles={} tick_hz={} seed={}",
            settings.quality.as_str(),
            settings.particle_count(),
            settings.effective_tick_hz(),
            settings.seed
        );
        settings
    }
}
