//! Game state and core simulation types
//!
//! One aggregate, exclusively owned by [`crate::sim::Game`]. The presentation
//! layer reads it every frame and drains [`GameEvent`]s for one-shot feedback.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::camera::Camera;
use super::kinematics::ImpactOutcome;
use crate::ranking::Ranking;
use crate::tuning::SlideTuning;
use crate::world_x_to_screen_px;

/// Stage of one launch cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum GamePhase {
    /// Charging the spring (power bar oscillates)
    #[default]
    Power,
    /// Aiming the cannon (angle slider oscillates)
    Angle,
    /// In the air, or skimming the ice before the run is decided
    Flight,
    /// Slid to a stop
    Landed,
    /// Head first into the snow
    Crashed,
}

impl GamePhase {
    /// Run is over, only `reset` leaves this phase
    pub fn is_terminal(&self) -> bool {
        matches!(self, GamePhase::Landed | GamePhase::Crashed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GamePhase::Power => "power",
            GamePhase::Angle => "angle",
            GamePhase::Flight => "flight",
            GamePhase::Landed => "landed",
            GamePhase::Crashed => "crashed",
        }
    }
}

/// Launch quality bucket, drives the launch sound
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LaunchGrade {
    Strong,
    Nice,
    Bad,
}

impl LaunchGrade {
    pub fn from_power(power01: f32) -> Self {
        if power01 >= 0.75 {
            LaunchGrade::Strong
        } else if power01 >= 0.4 {
            LaunchGrade::Nice
        } else {
            LaunchGrade::Bad
        }
    }
}

/// Where an impact happened
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ImpactAnchor {
    /// World x in meters
    World(f32),
    /// Screen x in pixels (legacy callers that only know the sprite position)
    ScreenPx(f32),
}

/// One-shot crash description for particle effects.
/// At least one of `wx`/`x_px` is set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImpactRecord {
    /// Timestamp (ms) doubling as an event key
    pub key: f64,
    /// World x (meters)
    pub wx: Option<f32>,
    /// Screen x (pixels) at the moment of impact
    pub x_px: Option<f32>,
    pub power: f32,
}

impl ImpactRecord {
    pub fn new(key: f64, anchor: ImpactAnchor, power: f32) -> Self {
        let (wx, x_px) = match anchor {
            ImpactAnchor::World(wx) => (Some(wx), None),
            ImpactAnchor::ScreenPx(px) => (None, Some(px)),
        };
        Self {
            key,
            wx,
            x_px,
            power,
        }
    }

    /// Screen x for the current camera. World anchors are re-projected so the
    /// effect stays glued to the ground while the camera moves.
    pub fn screen_x(&self, camera_x: f32, ppm: f32, margin_px: f32) -> Option<f32> {
        match (self.wx, self.x_px) {
            (Some(wx), _) => Some(world_x_to_screen_px(wx, camera_x, ppm, margin_px)),
            (None, px) => px,
        }
    }
}

/// Mid-flight boost window
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BoostState {
    /// Launch timestamp (ms); None once the window is closed
    pub window_start_ms: Option<f64>,
    /// The one press per flight has been spent
    pub used: bool,
    /// Set to the press timestamp on a successful boost
    pub blast_key: Option<f64>,
    pub last_intensity: f32,
}

/// Bomb readiness
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BombState {
    pub ready: bool,
    /// Tap count at which the next bomb becomes ready
    pub next_threshold: u32,
}

impl BombState {
    pub fn new(first_threshold: u32) -> Self {
        Self {
            ready: false,
            next_threshold: first_threshold,
        }
    }
}

/// Menu/session bookkeeping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuState {
    pub menu_open: bool,
    pub game_started: bool,
    pub has_started_before: bool,
}

impl Default for MenuState {
    fn default() -> Self {
        Self {
            menu_open: true,
            game_started: false,
            has_started_before: false,
        }
    }
}

/// Something the presentation layer may want to react to exactly once
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    PhaseChanged {
        from: GamePhase,
        to: GamePhase,
    },
    Launched {
        velocity: Vec2,
        grade: LaunchGrade,
    },
    /// `intensity` is None when the press missed the ready window
    BoostResolved {
        intensity: Option<f32>,
        scale: f32,
    },
    TapPromptShown {
        offset_px: Vec2,
    },
    TapPromptMissed,
    FishImpulse {
        count: u32,
        boost: f32,
    },
    BombReady {
        count: u32,
    },
    BombCountdown,
    BombDetonated {
        vx: f32,
    },
    Crashed {
        distance: f32,
        impact_speed: f32,
        power: f32,
    },
    /// Presentation consumed the impact record
    ImpactCleared,
    Landed {
        distance: f32,
    },
    RankingUpdated {
        rank: Option<usize>,
        best: Option<f32>,
    },
}

impl GameEvent {
    /// Outcome carried by a terminal event
    pub fn outcome(&self) -> Option<ImpactOutcome> {
        match self {
            GameEvent::Crashed { .. } => Some(ImpactOutcome::Crash),
            GameEvent::Landed { .. } => Some(ImpactOutcome::Slide),
            _ => None,
        }
    }
}

/// Complete game state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameState {
    /// Seconds of flight integrated this cycle
    pub time: f32,
    /// Integrator active
    pub running: bool,
    pub has_landed: bool,
    pub phase: GamePhase,

    /// Cannon settings
    pub angle_deg: f32,
    pub power01: f32,

    /// Meters; y == 0 is the ice
    pub pos: Vec2,
    /// Meters/second
    pub vel: Vec2,
    /// Farthest x reached this cycle (meters)
    pub distance: f32,

    pub impact: Option<ImpactRecord>,
    pub boost: BoostState,
    pub fish_boost_count: u32,
    pub bomb: BombState,
    pub camera: Camera,
    pub menu: MenuState,
    pub ranking: Ranking,

    /// Pending one-shot events (not part of the snapshot)
    #[serde(skip)]
    pub events: Vec<GameEvent>,
}

/// Cannon defaults for a fresh cycle
pub const DEFAULT_ANGLE_DEG: f32 = 45.0;
pub const DEFAULT_POWER01: f32 = 0.6;

impl GameState {
    /// Process-start state
    pub fn new(ranking: Ranking, slide: &SlideTuning) -> Self {
        Self {
            time: 0.0,
            running: false,
            has_landed: false,
            phase: GamePhase::Power,
            angle_deg: DEFAULT_ANGLE_DEG,
            power01: DEFAULT_POWER01,
            pos: Vec2::ZERO,
            vel: Vec2::ZERO,
            distance: 0.0,
            impact: None,
            boost: BoostState::default(),
            fish_boost_count: 0,
            bomb: BombState::new(slide.bomb_first_threshold),
            camera: Camera::default(),
            menu: MenuState::default(),
            ranking,
            events: Vec::new(),
        }
    }

    /// Back to a fresh cycle. Ranking and the started-before flag survive;
    /// the menu stays closed for returning players.
    pub fn reset(&mut self, slide: &SlideTuning) {
        let ranking = std::mem::take(&mut self.ranking);
        let events = std::mem::take(&mut self.events);
        let has_started_before = self.menu.has_started_before;
        let menu_open = if has_started_before {
            false
        } else {
            self.menu.menu_open
        };

        *self = Self::new(ranking, slide);
        self.events = events;
        self.power01 = 0.0;
        self.menu = MenuState {
            menu_open,
            game_started: false,
            has_started_before,
        };
    }

    /// Clear flight-cycle bookkeeping at launch
    pub fn begin_flight(&mut self, velocity: Vec2, now_ms: f64, slide: &SlideTuning) {
        self.time = 0.0;
        self.running = true;
        self.has_landed = false;
        self.pos = Vec2::ZERO;
        self.vel = velocity;
        self.distance = 0.0;
        self.impact = None;
        self.boost = BoostState {
            window_start_ms: Some(now_ms),
            ..BoostState::default()
        };
        self.fish_boost_count = 0;
        self.bomb = BombState::new(slide.bomb_first_threshold);
        self.camera = Camera::default();
    }

    /// Touched down but not yet decided: tap and bomb impulses apply
    pub fn is_sliding_ground(&self, slide: &SlideTuning) -> bool {
        self.phase == GamePhase::Flight
            && self.running
            && self.pos.y <= slide.skim_max_py
            && self.vel.y.abs() <= slide.skim_max_vy
    }

    /// Extend the run; never shortens it
    pub fn extend_distance(&mut self, x: f32) {
        self.distance = self.distance.max(x);
    }

    pub fn push_event(&mut self, event: GameEvent) {
        self.events.push(event);
    }
}
