//! Data-driven game balance
//!
//! Every constant the simulation uses lives here so a JSON override stored
//! under [`TUNING_KEY`] can retune the game without a rebuild. Missing fields
//! keep their defaults.

use serde::{Deserialize, Serialize};

use crate::consts::TUNING_KEY;
use crate::error::{StorageError, TuningError};
use crate::persistence::KeyValueStore;

/// Flight integrator constants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlightTuning {
    /// Downward acceleration (m/s²)
    pub gravity: f32,
    /// Linear drag coefficient (1/s)
    pub drag: f32,
    /// Launch speed at zero power (m/s)
    pub launch_speed_base: f32,
    /// Extra launch speed at full power (m/s)
    pub launch_speed_range: f32,
    /// Ground friction while sliding (m/s²)
    pub slide_friction: f32,
    /// Below this horizontal speed a slide has stopped (m/s)
    pub stop_speed: f32,
}

impl Default for FlightTuning {
    fn default() -> Self {
        Self {
            gravity: 9.8,
            drag: 0.02,
            launch_speed_base: 8.0,
            launch_speed_range: 22.0,
            slide_friction: 2.0,
            stop_speed: 0.2,
        }
    }
}

/// Thresholds of the slide/crash decision on ground contact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImpactPolicy {
    /// Launch angle considered "very high" (degrees)
    pub high_launch_deg: f32,
    pub high_launch_verticality_deg: f32,
    pub high_launch_speed: f32,
    /// Very vertical and hard
    pub hard_verticality_deg: f32,
    pub hard_speed: f32,
    /// Very fast with moderate verticality
    pub soft_verticality_deg: f32,
    pub soft_speed: f32,
    /// Almost no horizontal speed left
    pub min_horizontal_speed: f32,
    pub low_horizontal_speed: f32,
    /// Light vertical drop always slides
    pub slide_grace_vy: f32,
}

impl Default for ImpactPolicy {
    fn default() -> Self {
        Self {
            high_launch_deg: 65.0,
            high_launch_verticality_deg: 34.0,
            high_launch_speed: 6.5,
            hard_verticality_deg: 48.0,
            hard_speed: 10.5,
            soft_verticality_deg: 36.0,
            soft_speed: 12.5,
            min_horizontal_speed: 1.0,
            low_horizontal_speed: 6.0,
            slide_grace_vy: 2.0,
        }
    }
}

/// Mid-flight boost timing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoostTuning {
    /// Ready sub-window opens this long after launch (ms)
    pub blue_start_ms: f64,
    /// Ready sub-window length (ms)
    pub blue_duration_ms: f64,
    /// Velocity scale at full intensity
    pub multiplier_max: f32,
    /// Random variance range applied to the bonus
    pub variance_min: f32,
    pub variance_max: f32,
}

impl BoostTuning {
    /// Whole boost window (ms): warm-up plus ready sub-window
    pub fn window_ms(&self) -> f64 {
        self.blue_start_ms + self.blue_duration_ms
    }
}

impl Default for BoostTuning {
    fn default() -> Self {
        Self {
            blue_start_ms: 900.0,
            blue_duration_ms: 1000.0,
            multiplier_max: 1.95,
            variance_min: 0.85,
            variance_max: 1.15,
        }
    }
}

/// Ground-slide impulses (fish taps and bombs)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlideTuning {
    /// Ground-skim window: height (m)
    pub skim_max_py: f32,
    /// Ground-skim window: vertical speed (m/s)
    pub skim_max_vy: f32,

    pub fish_base_boost: f32,
    pub fish_increment: f32,
    pub fish_max_boost: f32,

    pub bomb_impulse: f32,
    pub bomb_velocity_bump: f32,
    pub bomb_min_vx: f32,
    pub bomb_velocity_scale: f32,
    pub bomb_first_threshold: u32,
    pub bomb_interval: u32,

    /// Tap prompt lifetime before the session fails (ms)
    pub tap_timeout_ms: f64,
    /// Delay before the next prompt after a hit (ms)
    pub tap_respawn_ms: f64,
    /// Prompt offset range around the actor (px)
    pub tap_offset_x_px: f32,
    pub tap_offset_y_px: f32,
    /// Bomb fuse after pressing (ms)
    pub bomb_countdown_ms: f64,
    /// Explosion display time (ms)
    pub bomb_explode_ms: f64,
}

impl Default for SlideTuning {
    fn default() -> Self {
        Self {
            skim_max_py: 0.08,
            skim_max_vy: 0.16,
            fish_base_boost: 0.32,
            fish_increment: 0.15,
            fish_max_boost: 0.62,
            bomb_impulse: 5.6,
            bomb_velocity_bump: 3.4,
            bomb_min_vx: 1.5,
            bomb_velocity_scale: 1.25,
            bomb_first_threshold: 5,
            bomb_interval: 10,
            tap_timeout_ms: 1100.0,
            tap_respawn_ms: 260.0,
            tap_offset_x_px: 120.0,
            tap_offset_y_px: 55.0,
            bomb_countdown_ms: 420.0,
            bomb_explode_ms: 700.0,
        }
    }
}

/// Camera smoothing and zoom policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraTuning {
    /// Pan smoothing rate (1/s)
    pub follow_rate: f32,
    /// Zoom smoothing rate (1/s)
    pub zoom_rate: f32,
    pub zoom_min: f32,
    pub zoom_max: f32,
    /// Actor position as a fraction of screen width while following
    pub follow_fraction: f32,
    /// Actor position as a fraction of screen width on flight entry
    pub entry_fraction: f32,
    pub entry_zoom: f32,
    /// Flight zoom = base + span * min(1, speed / reference_speed)
    pub flight_zoom_base: f32,
    pub flight_zoom_span: f32,
    pub flight_zoom_reference_speed: f32,
    pub rest_zoom: f32,
}

impl Default for CameraTuning {
    fn default() -> Self {
        Self {
            follow_rate: 4.0,
            zoom_rate: 2.0,
            zoom_min: 0.9,
            zoom_max: 1.2,
            follow_fraction: 0.5,
            entry_fraction: 0.32,
            entry_zoom: 1.06,
            flight_zoom_base: 1.03,
            flight_zoom_span: 0.07,
            flight_zoom_reference_speed: 28.0,
            rest_zoom: 1.0,
        }
    }
}

/// Complete balance sheet
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    pub flight: FlightTuning,
    pub impact: ImpactPolicy,
    pub boost: BoostTuning,
    pub slide: SlideTuning,
    pub camera: CameraTuning,
}

impl Tuning {
    /// Parse a (possibly partial) JSON override
    pub fn from_json(json: &str) -> Result<Self, TuningError> {
        let tuning: Tuning = serde_json::from_str(json)?;
        tuning.validate()?;
        Ok(tuning)
    }

    /// Reject values the integrator cannot work with
    pub fn validate(&self) -> Result<(), TuningError> {
        let checks: [(&'static str, f32, bool); 11] = [
            ("flight.gravity", self.flight.gravity, self.flight.gravity > 0.0),
            ("flight.drag", self.flight.drag, self.flight.drag >= 0.0),
            // Both must be positive or a slide never comes to rest
            (
                "flight.slide_friction",
                self.flight.slide_friction,
                self.flight.slide_friction > 0.0,
            ),
            ("flight.stop_speed", self.flight.stop_speed, self.flight.stop_speed > 0.0),
            ("boost.multiplier_max", self.boost.multiplier_max, self.boost.multiplier_max >= 1.0),
            (
                "boost.blue_duration_ms",
                self.boost.blue_duration_ms as f32,
                self.boost.blue_duration_ms > 0.0,
            ),
            (
                "slide.fish_max_boost",
                self.slide.fish_max_boost,
                self.slide.fish_max_boost >= self.slide.fish_base_boost,
            ),
            ("camera.zoom_min", self.camera.zoom_min, self.camera.zoom_min > 0.0),
            (
                "camera.zoom_max",
                self.camera.zoom_max,
                self.camera.zoom_max >= self.camera.zoom_min,
            ),
            // Negative rates make the smoothing diverge
            ("camera.follow_rate", self.camera.follow_rate, self.camera.follow_rate >= 0.0),
            ("camera.zoom_rate", self.camera.zoom_rate, self.camera.zoom_rate >= 0.0),
        ];
        match checks.into_iter().find(|(_, _, ok)| !ok) {
            Some((field, value, _)) => Err(TuningError::OutOfRange { field, value }),
            None => Ok(()),
        }
    }

    /// Load overrides from storage, falling back to defaults
    pub fn load(store: &dyn KeyValueStore) -> Self {
        match store.get(TUNING_KEY) {
            Ok(Some(json)) => match Self::from_json(&json) {
                Ok(tuning) => {
                    log::info!("Loaded tuning overrides");
                    tuning
                }
                Err(e) => {
                    log::warn!("Ignoring tuning overrides: {e}");
                    Self::default()
                }
            },
            Ok(None) => {
                log::info!("Using default tuning");
                Self::default()
            }
            Err(e) => {
                log::warn!("Tuning storage unreadable ({e}), using defaults");
                Self::default()
            }
        }
    }

    /// Save as the current override set
    pub fn save(&self, store: &mut dyn KeyValueStore) -> Result<(), StorageError> {
        let json = serde_json::to_string(self)?;
        store.set(TUNING_KEY, &json)?;
        log::info!("Tuning saved");
        Ok(())
    }
}
