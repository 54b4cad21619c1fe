//! Impact kinematics
//!
//! Pure helpers: launch decomposition, impact metrics and the slide/crash
//! decision made on ground contact.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::tuning::{FlightTuning, ImpactPolicy};

/// Launch angle limits (degrees)
pub const ANGLE_MIN_DEG: f32 = 10.0;
pub const ANGLE_MAX_DEG: f32 = 80.0;

/// Clamp a launch angle into the cannon's range
#[inline]
pub fn clamp_angle_deg(deg: f32) -> f32 {
    deg.clamp(ANGLE_MIN_DEG, ANGLE_MAX_DEG)
}

/// Clamp a power reading into [0, 1]
#[inline]
pub fn clamp_power01(p: f32) -> f32 {
    p.clamp(0.0, 1.0)
}

/// Muzzle speed for a power reading
#[inline]
pub fn launch_speed(power01: f32, flight: &FlightTuning) -> f32 {
    flight.launch_speed_base + clamp_power01(power01) * flight.launch_speed_range
}

/// Initial velocity for the cannon settings
pub fn launch_velocity(angle_deg: f32, power01: f32, flight: &FlightTuning) -> Vec2 {
    let v0 = launch_speed(power01, flight);
    let rad = angle_deg.to_radians();
    Vec2::new(v0 * rad.cos(), v0 * rad.sin())
}

/// Direction of travel below horizontal: 0° = flat, 90° = straight down.
/// A stationary body counts as vertical.
pub fn impact_angle_deg(vel: Vec2) -> f32 {
    if vel.length() <= 1e-6 {
        return 90.0;
    }
    vel.y.abs().atan2(vel.x.abs()).to_degrees()
}

/// Speed and verticality at the moment of ground contact
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImpactMetrics {
    pub speed: f32,
    pub verticality_deg: f32,
}

impl ImpactMetrics {
    pub fn from_velocity(vel: Vec2) -> Self {
        Self {
            speed: vel.x.hypot(vel.y),
            verticality_deg: impact_angle_deg(vel),
        }
    }
}

/// What happens on ground contact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImpactOutcome {
    /// Keeps sliding along the ice
    Slide,
    /// Head first into the snow
    Crash,
}

/// Decide slide vs crash for the post-integration velocity.
///
/// Any of the four crash rules fires a crash, except that a light vertical
/// drop at moderate speed always slides.
pub fn classify_impact(vel: Vec2, launch_angle_deg: f32, policy: &ImpactPolicy) -> ImpactOutcome {
    let ImpactMetrics {
        speed,
        verticality_deg,
    } = ImpactMetrics::from_velocity(vel);

    let high_launch = launch_angle_deg >= policy.high_launch_deg
        && verticality_deg >= policy.high_launch_verticality_deg
        && speed > policy.high_launch_speed;
    let hard_vertical = verticality_deg >= policy.hard_verticality_deg && speed >= policy.hard_speed;
    let soft_vertical = speed >= policy.soft_speed && verticality_deg >= policy.soft_verticality_deg;
    let low_horizontal =
        vel.x.abs() < policy.min_horizontal_speed && speed > policy.low_horizontal_speed;

    let favor_slide = vel.y.abs() < policy.slide_grace_vy && speed < policy.soft_speed;

    if !favor_slide && (high_launch || hard_vertical || soft_vertical || low_horizontal) {
        ImpactOutcome::Crash
    } else {
        ImpactOutcome::Slide
    }
}

/// Feedback intensity for a crash of the given speed
#[inline]
pub fn crash_power(impact_speed: f32) -> f32 {
    (impact_speed / 8.0).clamp(0.6, 1.6)
}
