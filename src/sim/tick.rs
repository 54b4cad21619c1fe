//! Flight integrator
//!
//! One explicit-Euler sub-step per frame with linear drag. Ground contact is
//! resolved here as a pure decision; `Game::step` applies the result.

use glam::Vec2;

use super::kinematics::{ImpactMetrics, ImpactOutcome, classify_impact};
use super::state::GameState;
use crate::tuning::Tuning;

/// Result of integrating one frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Integration {
    /// Integrator inactive (not launched, already decided, or dt <= 0)
    Idle,
    /// Still above the ice
    Airborne { pos: Vec2, vel: Vec2 },
    /// On the ice, friction applied, still moving
    Sliding { pos: Vec2, vel: Vec2 },
    /// Slide came to rest at `pos`
    Stopped { pos: Vec2 },
    /// Head first at `pos`
    Crashed { pos: Vec2, metrics: ImpactMetrics },
}

/// Advance `state` by `dt` seconds without mutating it
pub fn integrate(state: &GameState, tuning: &Tuning, dt: f32) -> Integration {
    if !state.running || state.has_landed || !(dt > 0.0) {
        return Integration::Idle;
    }

    let flight = &tuning.flight;
    let next_pos = state.pos + state.vel * dt;
    let mut next_vel = Vec2::new(
        state.vel.x * (1.0 - flight.drag * dt),
        state.vel.y - flight.gravity * dt,
    );

    if next_pos.y > 0.0 {
        return Integration::Airborne {
            pos: next_pos,
            vel: next_vel,
        };
    }

    // Ground contact this step
    let pos = Vec2::new(next_pos.x, 0.0);
    if classify_impact(next_vel, state.angle_deg, &tuning.impact) == ImpactOutcome::Crash {
        return Integration::Crashed {
            pos,
            metrics: ImpactMetrics::from_velocity(next_vel),
        };
    }

    let friction = flight.slide_friction * dt;
    let slip = (next_vel.x.abs() - friction).max(0.0);
    next_vel = Vec2::new(slip.copysign(next_vel.x), 0.0);

    if next_vel.x.abs() < flight.stop_speed {
        Integration::Stopped { pos }
    } else {
        Integration::Sliding { pos, vel: next_vel }
    }
}
