//! Pinguin Boom - spring-cannon launch arcade game
//!
//! Core modules:
//! - `sim`: Simulation core (phases, physics integration, camera, slide timers)
//! - `ranking`: Best-distance leaderboard
//! - `persistence`: Key/value storage backends (LocalStorage on web, files on native)
//! - `platform`: Browser/native platform abstraction (clock)
//! - `scores`: External score-submission hook
//! - `tuning`: Data-driven game balance

pub mod error;
pub mod persistence;
pub mod platform;
pub mod ranking;
pub mod scores;
pub mod sim;
pub mod tuning;

pub use error::{StorageError, SubmitError, TuningError};
pub use ranking::Ranking;
pub use sim::{Game, GameEvent, GamePhase, GameState, Viewport};
pub use tuning::Tuning;

/// Game configuration constants
pub mod consts {
    /// Largest frame delta the integrator accepts (seconds)
    pub const MAX_FRAME_DT: f32 = 0.033;

    /// Presentation scale: pixels per world meter
    pub const PIXELS_PER_METER: f32 = 32.0;
    /// Left layout margin in pixels (where world x == camera x lands)
    pub const MARGIN_LEFT_PX: f32 = 60.0;

    /// Ranking size
    pub const MAX_RANKING_ITEMS: usize = 5;

    /// Storage keys
    pub const RANKING_KEY: &str = "pinguinboom-ranking";
    pub const TUNING_KEY: &str = "pinguinboom-tuning";
}

/// Linear interpolation between `a` and `b`
#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

#[inline]
pub fn meters_to_px(meters: f32, ppm: f32) -> f32 {
    meters * ppm
}

#[inline]
pub fn px_to_meters(px: f32, ppm: f32) -> f32 {
    px / ppm
}

/// World x (meters) to screen x (pixels), given the camera position in meters
/// and the left layout margin.
#[inline]
pub fn world_x_to_screen_px(world_m: f32, camera_m: f32, ppm: f32, margin_px: f32) -> f32 {
    meters_to_px(world_m - camera_m, ppm) + margin_px
}

/// Inverse of [`world_x_to_screen_px`]
#[inline]
pub fn screen_px_to_world_x(screen_px: f32, camera_m: f32, ppm: f32, margin_px: f32) -> f32 {
    px_to_meters(screen_px - margin_px, ppm) + camera_m
}
