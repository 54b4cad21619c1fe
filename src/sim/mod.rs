//! Simulation module
//!
//! All gameplay logic lives here. Nothing in this module touches a renderer,
//! the DOM or the wall clock directly:
//! - Time comes from an injected `Clock`
//! - Randomness comes from a seeded RNG
//! - One integrator step per frame, dt clamped to 33 ms

pub mod camera;
pub mod game;
pub mod kinematics;
pub mod session;
pub mod state;
pub mod tick;

pub use camera::{Camera, flight_zoom_target};
pub use game::{BoostGauge, CrashReport, Game, Viewport};
pub use kinematics::{
    ANGLE_MAX_DEG, ANGLE_MIN_DEG, ImpactMetrics, ImpactOutcome, classify_impact, launch_velocity,
};
pub use session::{BombFuse, SlideSession, TapPrompt};
pub use state::{
    BombState, BoostState, GameEvent, GamePhase, GameState, ImpactAnchor, ImpactRecord,
    LaunchGrade, MenuState,
};
pub use tick::{Integration, integrate};
