//! Follow camera
//!
//! Position and zoom chase their targets with independent exponential decay:
//! `current += (target - current) * (1 - e^(-rate * dt))`. The step factor
//! stays in [0, 1), so the approach is monotonic and never overshoots.

use serde::{Deserialize, Serialize};

use crate::tuning::CameraTuning;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    /// World x (meters) drawn at the left margin
    pub x: f32,
    pub target_x: f32,
    pub zoom: f32,
    pub zoom_target: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            x: 0.0,
            target_x: 0.0,
            zoom: 1.0,
            zoom_target: 1.0,
        }
    }
}

/// Fraction of the remaining gap closed in `dt` seconds
#[inline]
pub fn smoothing_factor(rate: f32, dt: f32) -> f32 {
    1.0 - (-rate * dt).exp()
}

impl Camera {
    pub fn set_target(&mut self, x: f32) {
        self.target_x = x;
    }

    /// Zoom targets outside the configured range are clamped
    pub fn set_zoom_target(&mut self, zoom: f32, tuning: &CameraTuning) {
        self.zoom_target = zoom.clamp(tuning.zoom_min, tuning.zoom_max);
    }

    /// Jump straight to the target (or to `x`), no catch-up lag
    pub fn snap(&mut self, x: Option<f32>) {
        self.x = x.unwrap_or(self.target_x);
        self.zoom = self.zoom_target;
    }

    /// Advance the smoothing by `dt` seconds
    pub fn tick(&mut self, dt: f32, tuning: &CameraTuning) {
        if !(dt > 0.0) {
            return;
        }
        let k_pan = smoothing_factor(tuning.follow_rate, dt);
        let k_zoom = smoothing_factor(tuning.zoom_rate, dt);
        self.x += (self.target_x - self.x) * k_pan;
        self.zoom += (self.zoom_target - self.zoom) * k_zoom;
    }

    /// Target that puts `actor_x` at `fraction` of the screen width from the
    /// left margin. Never scrolls behind the cannon.
    pub fn follow(&mut self, actor_x: f32, screen_meters: f32, margin_meters: f32, fraction: f32) {
        self.target_x = (actor_x - screen_meters * fraction + margin_meters).max(0.0);
    }

    /// Move both current and target (impulses teleport the actor forward)
    pub fn shift(&mut self, dx: f32) {
        self.x += dx;
        self.target_x += dx;
    }
}

/// Zoom target while airborne: faster flight zooms in a little more
pub fn flight_zoom_target(speed: f32, tuning: &CameraTuning) -> f32 {
    let k = (speed / tuning.flight_zoom_reference_speed).min(1.0);
    tuning.flight_zoom_base + k * tuning.flight_zoom_span
}
