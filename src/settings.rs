//! Game settings
//!
//! Tunables for dragging, rest detection and bounds. Read from JSON in
//! LocalStorage on web; edit the stored value to tune a deployment.

use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::error::GameError;
use crate::sim::TowerBounds;

/// Tunable game parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // === Input ===
    /// World units moved per screen pixel while dragging
    pub drag_sensitivity: f32,

    // === Turn switching ===
    /// Speed (linear and angular) at or below which a block is at rest
    pub rest_threshold: f32,
    /// Milliseconds between rest polls while a turn switch is pending
    pub rest_poll_interval_ms: f64,
    /// Force the switch after this long; `None` waits forever
    pub rest_timeout_ms: Option<f64>,

    // === Physics ===
    /// Seconds advanced per frame
    pub physics_dt: f32,

    // === Bounds ===
    /// Footprint used for the out-of-bounds test
    pub bounds_footprint: f32,
    /// Half extent of the tower rectangle on X and Z
    pub tower_half_extent: f32,

    // === Camera ===
    /// Vertical field of view in degrees
    pub fov_degrees: f32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            drag_sensitivity: DRAG_SENSITIVITY,

            rest_threshold: REST_THRESHOLD,
            rest_poll_interval_ms: REST_POLL_INTERVAL_MS,
            rest_timeout_ms: Some(REST_TIMEOUT_MS),

            physics_dt: PHYSICS_DT,

            bounds_footprint: BOUNDS_FOOTPRINT,
            tower_half_extent: TOWER_HALF_EXTENT,

            fov_degrees: 75.0,
        }
    }
}

impl Settings {
    /// Parse settings from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self, GameError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Tower rectangle described by these settings
    pub fn tower_bounds(&self) -> TowerBounds {
        TowerBounds::centered(self.tower_half_extent, self.tower_half_extent)
    }

    /// LocalStorage key (used only in wasm32)
    #[allow(dead_code)]
    const STORAGE_KEY: &'static str = "tumble_tower_settings";

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

    /// Native stubs
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load() -> Self {
        Self::default()
    }
}
