//! Game state machine
//!
//! `Game` owns the state aggregate and every collaborator it talks to (RNG,
//! clock, storage, score sink). Commands mutate the state in place; commands
//! issued in the wrong phase are ignored. Nothing here returns an error:
//! storage and submission failures are logged and swallowed.

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use super::camera::flight_zoom_target;
use super::kinematics::{self, ImpactMetrics, crash_power};
use super::session::{SessionSignal, SlideSession};
use super::state::{GameEvent, GamePhase, GameState, ImpactAnchor, ImpactRecord, LaunchGrade};
use super::tick::{Integration, integrate};
use crate::consts::{MARGIN_LEFT_PX, MAX_FRAME_DT, PIXELS_PER_METER};
use crate::persistence::{self, KeyValueStore};
use crate::platform::{Clock, SystemClock};
use crate::ranking::Ranking;
use crate::scores::{FinishMode, NullSink, ScoreSink, ScoreSubmission};
use crate::tuning::Tuning;
use crate::world_x_to_screen_px;

/// Screen geometry in world units, supplied by the presentation layer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// Visible world width (meters)
    pub screen_meters: f32,
    /// Left layout margin (meters)
    pub margin_meters: f32,
    pub pixels_per_meter: f32,
}

impl Viewport {
    pub fn from_pixels(width_px: f32, pixels_per_meter: f32, margin_px: f32) -> Self {
        Self {
            screen_meters: width_px / pixels_per_meter,
            margin_meters: margin_px / pixels_per_meter,
            pixels_per_meter,
        }
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::from_pixels(800.0, PIXELS_PER_METER, MARGIN_LEFT_PX)
    }
}

/// Payload of [`Game::set_crashed`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CrashReport {
    /// Where the impact effect goes; defaults to the distance
    pub anchor: Option<ImpactAnchor>,
    pub distance: f32,
    /// Effect intensity; defaults to 1.0
    pub power: Option<f32>,
}

/// What the presentation layer needs to draw the boost gauge
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoostGauge {
    /// Time since launch, clamped to the whole window (ms)
    pub elapsed_ms: f64,
    /// Inside the ready sub-window
    pub ready: bool,
    /// 1.0 when the ready window opens, falling to 0.0 as it closes
    pub intensity: f32,
}

pub struct Game {
    state: GameState,
    tuning: Tuning,
    rng: Pcg32,
    clock: Box<dyn Clock>,
    store: Box<dyn KeyValueStore>,
    sink: Box<dyn ScoreSink>,
    session: SlideSession,
    /// Phase seen by the previous `advance_frame`
    frame_phase: GamePhase,
}

impl Game {
    /// Game wired to the platform clock and storage
    pub fn new(seed: u64) -> Self {
        let store = persistence::default_store();
        let tuning = Tuning::load(store.as_ref());
        Self::with_parts(seed, tuning, Box::new(SystemClock), store, Box::new(NullSink))
    }

    /// Game with explicit collaborators. The ranking is read from `store`.
    pub fn with_parts(
        seed: u64,
        tuning: Tuning,
        clock: Box<dyn Clock>,
        store: Box<dyn KeyValueStore>,
        sink: Box<dyn ScoreSink>,
    ) -> Self {
        let ranking = Ranking::load(store.as_ref());
        let state = GameState::new(ranking, &tuning.slide);
        Self {
            frame_phase: state.phase,
            state,
            tuning,
            rng: Pcg32::seed_from_u64(seed),
            clock,
            store,
            sink,
            session: SlideSession::new(),
        }
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn tuning(&self) -> &Tuning {
        &self.tuning
    }

    pub fn session(&self) -> &SlideSession {
        &self.session
    }

    /// Take the events produced since the last call
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.state.events)
    }

    fn set_phase(&mut self, to: GamePhase) {
        let from = self.state.phase;
        if from == to {
            return;
        }
        log::info!("Phase {} -> {}", from.as_str(), to.as_str());
        self.state.phase = to;
        self.state.push_event(GameEvent::PhaseChanged { from, to });
    }

    // === Cannon ===

    /// Only while aiming; clamped to [10, 80]
    pub fn set_angle(&mut self, deg: f32) {
        if matches!(self.state.phase, GamePhase::Power | GamePhase::Angle) {
            self.state.angle_deg = kinematics::clamp_angle_deg(deg);
        }
    }

    /// Only while aiming; clamped to [0, 1]
    pub fn set_power01(&mut self, p: f32) {
        if matches!(self.state.phase, GamePhase::Power | GamePhase::Angle) {
            self.state.power01 = kinematics::clamp_power01(p);
        }
    }

    /// Fire the cannon with the current angle and power
    pub fn launch(&mut self) {
        if !matches!(self.state.phase, GamePhase::Power | GamePhase::Angle) {
            log::debug!("Launch ignored in phase {}", self.state.phase.as_str());
            return;
        }

        let now = self.clock.now_ms();
        let velocity =
            kinematics::launch_velocity(self.state.angle_deg, self.state.power01, &self.tuning.flight);
        self.state.begin_flight(velocity, now, &self.tuning.slide);
        self.session.cancel();
        self.set_phase(GamePhase::Flight);

        let grade = LaunchGrade::from_power(self.state.power01);
        log::info!(
            "Launched at {:.0}° power {:.2} ({:?}): v = ({:.2}, {:.2})",
            self.state.angle_deg,
            self.state.power01,
            grade,
            velocity.x,
            velocity.y
        );
        self.state.push_event(GameEvent::Launched { velocity, grade });
    }

    /// The one big button: power -> angle, angle -> launch, flight -> boost
    pub fn press_main(&mut self) {
        match self.state.phase {
            GamePhase::Power => self.set_phase(GamePhase::Angle),
            GamePhase::Angle => self.launch(),
            GamePhase::Flight if !self.state.boost.used => self.resolve_boost(),
            _ => {}
        }
    }

    /// Boost gauge at `now_ms`; None outside an open window
    pub fn boost_gauge(&self, now_ms: f64) -> Option<BoostGauge> {
        let boost = &self.state.boost;
        if self.state.phase != GamePhase::Flight || boost.used {
            return None;
        }
        let start = boost.window_start_ms?;
        let cfg = &self.tuning.boost;
        let elapsed_ms = (now_ms - start).clamp(0.0, cfg.window_ms());
        let ready = elapsed_ms >= cfg.blue_start_ms && elapsed_ms <= cfg.window_ms();
        let intensity = if ready {
            boost_intensity(elapsed_ms, cfg.blue_start_ms, cfg.blue_duration_ms)
        } else {
            0.0
        };
        Some(BoostGauge {
            elapsed_ms,
            ready,
            intensity,
        })
    }

    fn resolve_boost(&mut self) {
        let now = self.clock.now_ms();
        let cfg = &self.tuning.boost;
        let start = self.state.boost.window_start_ms.unwrap_or(now);
        let elapsed = (now - start).max(0.0);
        self.state.boost.used = true;

        if elapsed < cfg.blue_start_ms || elapsed > cfg.window_ms() {
            log::debug!("Boost missed ({elapsed:.0} ms after launch)");
            self.state.push_event(GameEvent::BoostResolved {
                intensity: None,
                scale: 1.0,
            });
            return;
        }

        let intensity = boost_intensity(elapsed, cfg.blue_start_ms, cfg.blue_duration_ms);
        let variance =
            cfg.variance_min + self.rng.random::<f32>() * (cfg.variance_max - cfg.variance_min);
        let scale = 1.0 + intensity * (cfg.multiplier_max - 1.0) * variance;

        self.state.vel *= scale;
        self.state.boost.blast_key = Some(now);
        self.state.boost.last_intensity = intensity;
        log::info!("Boost! intensity {intensity:.2}, scale {scale:.2}");
        self.state.push_event(GameEvent::BoostResolved {
            intensity: Some(intensity),
            scale,
        });
    }

    // === Ground-slide impulses ===

    pub fn is_sliding_ground(&self) -> bool {
        self.state.is_sliding_ground(&self.tuning.slide)
    }

    /// Successful timed tap while skimming the ice. Returns whether it applied.
    pub fn apply_fish_impulse(&mut self) -> bool {
        if !self.is_sliding_ground() {
            return false;
        }
        let cfg = &self.tuning.slide;
        let count = self.state.fish_boost_count + 1;
        let bonus = (count as f32 * cfg.fish_increment).min(cfg.fish_max_boost - cfg.fish_base_boost);
        let boost = (cfg.fish_base_boost + bonus).min(cfg.fish_max_boost);

        self.state.pos.x += boost;
        let x = self.state.pos.x;
        self.state.extend_distance(x);
        self.state.camera.shift(boost);
        self.state.fish_boost_count = count;

        log::debug!("Fish impulse #{count}: +{boost:.2} m");
        self.state.push_event(GameEvent::FishImpulse { count, boost });

        if !self.state.bomb.ready && count >= self.state.bomb.next_threshold {
            self.state.bomb.ready = true;
            log::debug!("Bomb ready after {count} taps");
            self.state.push_event(GameEvent::BombReady { count });
        }
        true
    }

    /// Fire a ready bomb while skimming the ice. Returns whether it applied.
    pub fn trigger_bomb_impulse(&mut self) -> bool {
        if !self.state.bomb.ready || !self.is_sliding_ground() {
            return false;
        }
        let cfg = &self.tuning.slide;
        let vx = self.state.vel.x;
        let boosted_vx =
            (vx + cfg.bomb_velocity_bump).max(cfg.bomb_min_vx.max(vx * cfg.bomb_velocity_scale));

        self.state.pos.x += cfg.bomb_impulse;
        let x = self.state.pos.x;
        self.state.extend_distance(x);
        self.state.camera.shift(cfg.bomb_impulse);
        self.state.vel.x = boosted_vx;
        self.state.vel.y = 0.0;
        self.state.bomb.ready = false;
        self.state.bomb.next_threshold += cfg.bomb_interval;

        log::info!(
            "Bomb! +{:.1} m, vx {:.2}, next at {} taps",
            cfg.bomb_impulse,
            boosted_vx,
            self.state.bomb.next_threshold
        );
        self.state.push_event(GameEvent::BombDetonated { vx: boosted_vx });
        true
    }

    /// Tap on the prompt shown during a slide. Applies the fish impulse only
    /// when a prompt is showing.
    pub fn tap_prompt(&mut self) -> bool {
        if !self.is_sliding_ground() || !self.session.tap(&self.tuning.slide) {
            return false;
        }
        self.apply_fish_impulse()
    }

    /// Press the bomb button; it goes off after the fuse countdown
    pub fn press_bomb(&mut self) -> bool {
        if !self.state.bomb.ready || !self.is_sliding_ground() {
            return false;
        }
        let lit = self.session.light_fuse(&self.tuning.slide);
        if lit {
            self.state.push_event(GameEvent::BombCountdown);
        }
        lit
    }

    // === Physics ===

    /// Advance the flight by `dt` seconds (clamped to 33 ms)
    pub fn step(&mut self, dt: f32, pixels_per_meter: f32) {
        let dt = dt.min(MAX_FRAME_DT);
        match integrate(&self.state, &self.tuning, dt) {
            Integration::Idle => {}
            Integration::Airborne { pos, vel } | Integration::Sliding { pos, vel } => {
                self.state.pos = pos;
                self.state.vel = vel;
                self.state.time += dt;
                self.state.extend_distance(pos.x);
            }
            Integration::Stopped { pos } => self.finish_slide(pos),
            Integration::Crashed { pos, metrics } => self.finish_crash(pos, metrics, pixels_per_meter),
        }
    }

    fn finish_slide(&mut self, pos: glam::Vec2) {
        self.state.pos = pos;
        self.state.vel = glam::Vec2::ZERO;
        self.state.extend_distance(pos.x.max(0.0));
        self.state.running = false;
        self.state.has_landed = true;
        self.set_phase(GamePhase::Landed);

        let distance = self.state.distance;
        log::info!("Landed at {distance:.2} m");
        self.state.push_event(GameEvent::Landed { distance });
        self.submit_score(FinishMode::Slide);
        self.add_ranking(distance);
    }

    fn finish_crash(&mut self, pos: glam::Vec2, metrics: ImpactMetrics, pixels_per_meter: f32) {
        self.state.pos = pos;
        let distance = self.state.distance.max(pos.x.max(0.0));
        let power = crash_power(metrics.speed);

        self.set_crashed(CrashReport {
            anchor: Some(ImpactAnchor::World(distance)),
            distance,
            power: Some(power),
        });
        if let Some(impact) = self.state.impact.as_mut() {
            impact.x_px = Some(world_x_to_screen_px(
                distance,
                self.state.camera.x,
                pixels_per_meter,
                MARGIN_LEFT_PX,
            ));
        }

        log::info!(
            "Crashed at {distance:.2} m ({:.1} m/s, {:.0}°)",
            metrics.speed,
            metrics.verticality_deg
        );
        self.state.push_event(GameEvent::Crashed {
            distance,
            impact_speed: metrics.speed,
            power,
        });
        self.add_ranking(distance);
        self.submit_score(FinishMode::Crash);
    }

    /// The crash transition. Only meaningful in flight; the recorded distance
    /// never shortens the run.
    pub fn set_crashed(&mut self, report: CrashReport) {
        if self.state.phase != GamePhase::Flight {
            log::debug!("Crash ignored in phase {}", self.state.phase.as_str());
            return;
        }
        let now = self.clock.now_ms();
        self.state.extend_distance(report.distance);
        let anchor = report
            .anchor
            .unwrap_or(ImpactAnchor::World(report.distance));
        self.state.impact = Some(ImpactRecord::new(now, anchor, report.power.unwrap_or(1.0)));

        self.state.running = false;
        self.state.has_landed = true;
        self.state.vel = glam::Vec2::ZERO;
        self.state.pos.y = 0.0;
        // A stale boost press after the crash must not do anything
        self.state.boost.window_start_ms = None;
        self.state.boost.used = true;
        self.state.boost.blast_key = None;
        self.state.boost.last_intensity = 0.0;
        self.session.cancel();
        self.set_phase(GamePhase::Crashed);
    }

    /// Presentation has shown the impact effect
    pub fn clear_impact(&mut self) {
        if self.state.impact.take().is_some() {
            self.state.push_event(GameEvent::ImpactCleared);
        }
    }

    /// Presentation has shown the boost blast
    pub fn clear_boost_blast(&mut self) {
        self.state.boost.blast_key = None;
    }

    // === Camera ===

    pub fn set_camera_target(&mut self, x: f32) {
        self.state.camera.set_target(x);
    }

    pub fn set_zoom_target(&mut self, zoom: f32) {
        self.state.camera.set_zoom_target(zoom, &self.tuning.camera);
    }

    pub fn snap_camera(&mut self, x: Option<f32>) {
        self.state.camera.snap(x);
    }

    pub fn tick_camera(&mut self, dt: f32) {
        self.state.camera.tick(dt, &self.tuning.camera);
    }

    /// Keep the penguin at the configured fraction of the screen
    pub fn follow_penguin(&mut self, x: f32, screen_meters: f32, margin_meters: f32) {
        let fraction = self.tuning.camera.follow_fraction;
        self.state
            .camera
            .follow(x, screen_meters, margin_meters, fraction);
    }

    // === Frame driver ===

    /// Everything the presentation layer does once per animation frame:
    /// physics step, camera policy, camera smoothing and slide timers.
    pub fn advance_frame(&mut self, raw_dt: f32, viewport: &Viewport) {
        let raw_dt = raw_dt.max(0.0);
        self.step(raw_dt, viewport.pixels_per_meter);

        let phase = self.state.phase;
        let entered = phase != self.frame_phase;
        self.frame_phase = phase;

        match phase {
            GamePhase::Flight => {
                if entered {
                    let cam = &self.tuning.camera;
                    let target = (self.state.pos.x - viewport.screen_meters * cam.entry_fraction
                        + viewport.margin_meters)
                        .max(0.0);
                    let entry_zoom = cam.entry_zoom;
                    self.set_camera_target(target);
                    self.snap_camera(Some(target));
                    self.set_zoom_target(entry_zoom);
                }
                self.follow_penguin(
                    self.state.pos.x,
                    viewport.screen_meters,
                    viewport.margin_meters,
                );
                let zoom = flight_zoom_target(self.state.vel.length(), &self.tuning.camera);
                self.set_zoom_target(zoom);
            }
            GamePhase::Landed => {
                let rest = self.tuning.camera.rest_zoom;
                self.set_zoom_target(rest);
            }
            _ => {}
        }
        self.tick_camera(raw_dt);

        let sliding = self.is_sliding_ground();
        let signals = self.session.advance(
            f64::from(raw_dt) * 1000.0,
            sliding,
            self.state.bomb.ready,
            &mut self.rng,
            &self.tuning.slide,
        );
        for signal in signals {
            match signal {
                SessionSignal::PromptShown { offset_px } => {
                    self.state.push_event(GameEvent::TapPromptShown { offset_px });
                }
                SessionSignal::PromptMissed => {
                    log::debug!("Tap prompt missed");
                    self.state.push_event(GameEvent::TapPromptMissed);
                }
                SessionSignal::Detonate => {
                    self.trigger_bomb_impulse();
                }
            }
        }
    }

    // === Ranking ===

    /// Record a finished distance and persist the board
    pub fn add_ranking(&mut self, distance: f32) {
        let rank = self.state.ranking.add(distance);
        if let Err(e) = self.state.ranking.save(self.store.as_mut()) {
            log::warn!("Failed to persist ranking: {e}");
        }
        let best = self.state.ranking.best();
        self.state.push_event(GameEvent::RankingUpdated { rank, best });
    }

    fn submit_score(&mut self, mode: FinishMode) {
        let submission = ScoreSubmission::new(
            self.state.distance,
            self.state.power01,
            self.state.angle_deg,
            mode,
        );
        if let Err(e) = self.sink.submit(&submission) {
            log::warn!("Score submission failed: {e}");
        }
    }

    // === Lifecycle ===

    /// Back to the power phase; ranking and started-before survive
    pub fn reset(&mut self) {
        let from = self.state.phase;
        self.state.reset(&self.tuning.slide);
        self.session.cancel();
        if from != GamePhase::Power {
            log::info!("Reset from {}", from.as_str());
            self.state.push_event(GameEvent::PhaseChanged {
                from,
                to: GamePhase::Power,
            });
        }
    }

    pub fn open_menu(&mut self) {
        self.state.menu.menu_open = true;
    }

    pub fn close_menu(&mut self) {
        self.state.menu.menu_open = false;
    }

    pub fn set_game_started(&mut self, started: bool) {
        self.state.menu.game_started = started;
    }

    pub fn mark_started_before(&mut self) {
        self.state.menu.has_started_before = true;
    }
}

/// 1.0 at the start of the ready window, 0.0 at its end
fn boost_intensity(elapsed_ms: f64, blue_start_ms: f64, blue_duration_ms: f64) -> f32 {
    let progress = (elapsed_ms - blue_start_ms) / blue_duration_ms;
    (1.0 - progress).max(0.0) as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::RANKING_KEY;
    use crate::error::{StorageError, SubmitError};
    use std::cell::RefCell;
    use std::rc::Rc;
    use crate::persistence::{MemoryStore, UnavailableStore};
    use crate::platform::ManualClock;
    use crate::scores::RecordingSink;
    use glam::Vec2;
    use proptest::prelude::*;

    const DT: f32 = 1.0 / 60.0;

    struct FailingSink;

    impl ScoreSink for FailingSink {
        fn submit(&mut self, _submission: &ScoreSubmission) -> Result<(), SubmitError> {
            Err(SubmitError::Rejected("offline".to_string()))
        }
    }

    /// Store whose clones see the same items
    #[derive(Clone, Default)]
    struct SharedStore(Rc<RefCell<MemoryStore>>);

    impl KeyValueStore for SharedStore {
        fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
            self.0.borrow().get(key)
        }

        fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
            self.0.borrow_mut().set(key, value)
        }
    }

    fn game() -> (Game, ManualClock) {
        let clock = ManualClock::new(10_000.0);
        let game = Game::with_parts(
            42,
            Tuning::default(),
            Box::new(clock.clone()),
            Box::new(MemoryStore::new()),
            Box::new(NullSink),
        );
        (game, clock)
    }

    /// Put the game into the ground-skim window at `x`
    fn sliding_at(game: &mut Game, x: f32, vx: f32) {
        game.launch();
        game.state.pos = Vec2::new(x, 0.0);
        game.state.vel = Vec2::new(vx, 0.0);
        game.state.distance = x;
        assert!(game.is_sliding_ground());
    }

    fn run_until_done(game: &mut Game) {
        for _ in 0..100_000 {
            if game.state().phase != GamePhase::Flight {
                return;
            }
            game.step(DT, PIXELS_PER_METER);
            assert!(game.state().pos.y >= 0.0);
        }
        panic!("flight never resolved");
    }

    #[test]
    fn test_launch_from_power_phase() {
        let (mut game, _) = game();
        game.set_angle(45.0);
        game.set_power01(1.0);
        game.launch();

        let state = game.state();
        assert_eq!(state.phase, GamePhase::Flight);
        assert!(state.vel.x > 0.0);
        assert!(state.vel.y > 0.0);
        assert!(!state.boost.used);
        assert_eq!(state.boost.window_start_ms, Some(10_000.0));
        assert!(state.running);
        assert!((state.vel.length() - 30.0).abs() < 1e-3);

        let events = game.drain_events();
        assert!(events.contains(&GameEvent::PhaseChanged {
            from: GamePhase::Power,
            to: GamePhase::Flight
        }));
        assert!(events.iter().any(|e| matches!(
            e,
            GameEvent::Launched {
                grade: LaunchGrade::Strong,
                ..
            }
        )));
    }

    #[test]
    fn test_press_main_walks_phases() {
        let (mut game, _) = game();
        game.set_power01(0.5);
        game.press_main();
        assert_eq!(game.state().phase, GamePhase::Angle);
        game.set_angle(30.0);
        game.press_main();
        assert_eq!(game.state().phase, GamePhase::Flight);
        // Same formula as launch(): 8 + 22 * 0.5
        assert!((game.state().vel.length() - 19.0).abs() < 1e-3);
    }

    #[test]
    fn test_launch_ignored_mid_flight() {
        let (mut game, _) = game();
        game.launch();
        game.step(DT, PIXELS_PER_METER);
        let pos = game.state().pos;
        game.launch();
        assert_eq!(game.state().pos, pos);
    }

    #[test]
    fn test_setters_clamp_and_lock_in_flight() {
        let (mut game, _) = game();
        game.set_angle(200.0);
        game.set_power01(-3.0);
        assert_eq!(game.state().angle_deg, 80.0);
        assert_eq!(game.state().power01, 0.0);

        game.launch();
        game.set_angle(20.0);
        assert_eq!(game.state().angle_deg, 80.0);
    }

    #[test]
    fn test_boost_in_ready_window_scales_velocity() {
        let (mut game, clock) = game();
        game.launch();
        let before = game.state().vel;

        clock.advance(900.0);
        game.press_main();

        let state = game.state();
        assert!(state.boost.used);
        assert_eq!(state.boost.blast_key, Some(10_900.0));
        assert_eq!(state.boost.last_intensity, 1.0);
        let scale = state.vel.x / before.x;
        // 1 + 0.95 * [0.85, 1.15]
        assert!(scale >= 1.0 + 0.95 * 0.85 - 1e-4);
        assert!(scale <= 1.0 + 0.95 * 1.15 + 1e-4);
        assert!((state.vel.y / before.y - scale).abs() < 1e-4);
    }

    #[test]
    fn test_boost_intensity_falls_across_window() {
        let (mut game, clock) = game();
        game.launch();
        clock.advance(1650.0);
        game.press_main();
        assert!((game.state().boost.last_intensity - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_clear_boost_blast_consumes_token_only() {
        let (mut game, clock) = game();
        game.launch();
        clock.advance(1000.0);
        game.press_main();
        assert_eq!(game.state().boost.blast_key, Some(11_000.0));
        let boosted = game.state().vel;

        game.clear_boost_blast();
        let state = game.state();
        assert_eq!(state.boost.blast_key, None);
        assert!(state.boost.used);
        assert_eq!(state.vel, boosted);

        // No second blast after clearing
        game.press_main();
        assert_eq!(game.state().boost.blast_key, None);
        assert_eq!(game.state().vel, boosted);
    }

    #[test]
    fn test_boost_too_early_is_wasted() {
        let (mut game, clock) = game();
        game.launch();
        let before = game.state().vel;
        clock.advance(500.0);
        game.press_main();
        assert!(game.state().boost.used);
        assert_eq!(game.state().vel, before);
        assert_eq!(game.state().boost.blast_key, None);
    }

    #[test]
    fn test_boost_too_late_is_wasted() {
        let (mut game, clock) = game();
        game.launch();
        let before = game.state().vel;
        clock.advance(1901.0);
        game.press_main();
        assert!(game.state().boost.used);
        assert_eq!(game.state().vel, before);
    }

    #[test]
    fn test_second_press_has_no_effect() {
        let (mut game, clock) = game();
        game.launch();
        clock.advance(1000.0);
        game.press_main();
        let boosted = game.state().vel;
        game.press_main();
        assert_eq!(game.state().vel, boosted);
    }

    #[test]
    fn test_boost_is_seed_deterministic() {
        let (mut a, clock_a) = game();
        let (mut b, clock_b) = game();
        for (g, c) in [(&mut a, &clock_a), (&mut b, &clock_b)] {
            g.launch();
            c.advance(1200.0);
            g.press_main();
        }
        assert_eq!(a.state().vel, b.state().vel);
    }

    #[test]
    fn test_boost_gauge() {
        let (mut game, _) = game();
        assert!(game.boost_gauge(10_000.0).is_none());
        game.launch();

        let warmup = game.boost_gauge(10_450.0).unwrap();
        assert!(!warmup.ready);
        assert_eq!(warmup.intensity, 0.0);

        let ready = game.boost_gauge(11_400.0).unwrap();
        assert!(ready.ready);
        assert!((ready.intensity - 0.5).abs() < 1e-6);

        let past = game.boost_gauge(20_000.0).unwrap();
        assert_eq!(past.elapsed_ms, 1900.0);
    }

    #[test]
    fn test_full_flight_terminates() {
        let (mut game, _) = game();
        game.set_angle(45.0);
        game.set_power01(1.0);
        game.launch();
        run_until_done(&mut game);

        let state = game.state();
        assert!(state.phase.is_terminal());
        assert!(state.pos.y >= 0.0);
        assert!(!state.running);
        assert!(state.has_landed);
        assert_eq!(state.vel, Vec2::ZERO);
        assert!(state.distance > 0.0);
        assert_eq!(state.ranking.best(), Some(state.distance));
    }

    #[test]
    fn test_steep_launch_crashes_with_impact_record() {
        let (mut game, _) = game();
        game.set_angle(80.0);
        game.set_power01(1.0);
        game.launch();
        run_until_done(&mut game);

        let state = game.state();
        assert_eq!(state.phase, GamePhase::Crashed);
        let impact = state.impact.expect("impact record");
        assert_eq!(impact.wx, Some(state.distance));
        assert!(impact.x_px.is_some());
        assert!((0.6..=1.6).contains(&impact.power));
        assert!(state.boost.used);
        assert_eq!(state.boost.window_start_ms, None);

        game.clear_impact();
        assert!(game.state().impact.is_none());
        assert_eq!(game.drain_events().last(), Some(&GameEvent::ImpactCleared));
    }

    #[test]
    fn test_flat_launch_slides_to_a_stop() {
        let (mut game, _) = game();
        game.set_angle(10.0);
        game.set_power01(0.0);
        game.launch();
        run_until_done(&mut game);
        assert_eq!(game.state().phase, GamePhase::Landed);
        assert!(game.state().impact.is_none());
    }

    #[test]
    fn test_terminal_transition_submits_score() {
        let sink = RecordingSink::new();
        let mut game = Game::with_parts(
            1,
            Tuning::default(),
            Box::new(ManualClock::new(0.0)),
            Box::new(MemoryStore::new()),
            Box::new(sink.clone()),
        );
        game.set_angle(80.0);
        game.set_power01(1.0);
        game.launch();
        run_until_done(&mut game);

        let submissions = sink.submissions();
        assert_eq!(submissions.len(), 1);
        assert_eq!(submissions[0].mode, FinishMode::Crash);
        assert_eq!(submissions[0].distance, game.state().distance.round() as u32);
        assert_eq!(submissions[0].angle, 80.0);
    }

    #[test]
    fn test_storage_and_sink_failures_are_swallowed() {
        let mut game = Game::with_parts(
            1,
            Tuning::default(),
            Box::new(ManualClock::new(0.0)),
            Box::new(UnavailableStore),
            Box::new(FailingSink),
        );
        game.launch();
        run_until_done(&mut game);
        assert!(game.state().phase.is_terminal());
        // In-memory ranking still updated
        assert_eq!(game.state().ranking.len(), 1);
    }

    #[test]
    fn test_ranking_loaded_and_persisted() {
        let store = MemoryStore::new().with_item(RANKING_KEY, "[12, 90, \"bad\"]");
        let mut game = Game::with_parts(
            1,
            Tuning::default(),
            Box::new(ManualClock::new(0.0)),
            Box::new(store),
            Box::new(NullSink),
        );
        assert_eq!(game.state().ranking.entries(), &[90.0, 12.0]);

        game.add_ranking(50.0);
        assert_eq!(game.state().ranking.entries(), &[90.0, 50.0, 12.0]);
        let events = game.drain_events();
        assert_eq!(
            events.last(),
            Some(&GameEvent::RankingUpdated {
                rank: Some(2),
                best: Some(90.0)
            })
        );
    }

    #[test]
    fn test_fish_impulse_only_on_ice() {
        let (mut game, _) = game();
        assert!(!game.apply_fish_impulse());

        game.launch();
        // Still rising off the cannon
        assert!(!game.apply_fish_impulse());
        assert_eq!(game.state().fish_boost_count, 0);
    }

    #[test]
    fn test_fish_impulse_grows_to_cap() {
        let (mut game, _) = game();
        sliding_at(&mut game, 20.0, 5.0);

        let mut boosts = Vec::new();
        for _ in 0..4 {
            let x = game.state().pos.x;
            assert!(game.apply_fish_impulse());
            boosts.push(game.state().pos.x - x);
        }
        // 0.32 + min(n * 0.15, 0.30), capped at 0.62
        assert!((boosts[0] - 0.47).abs() < 1e-4);
        assert!((boosts[1] - 0.62).abs() < 1e-4);
        assert!((boosts[2] - 0.62).abs() < 1e-4);
        assert!((boosts[3] - 0.62).abs() < 1e-4);

        let state = game.state();
        assert_eq!(state.fish_boost_count, 4);
        assert_eq!(state.distance, state.pos.x);
        assert!((state.camera.x - (0.47 + 3.0 * 0.62)).abs() < 1e-4);
        assert_eq!(state.camera.x, state.camera.target_x);
    }

    #[test]
    fn test_bomb_ready_after_threshold_then_rises() {
        let (mut game, _) = game();
        sliding_at(&mut game, 20.0, 5.0);

        for _ in 0..4 {
            game.apply_fish_impulse();
        }
        assert!(!game.state().bomb.ready);
        assert!(!game.trigger_bomb_impulse());

        game.apply_fish_impulse();
        assert!(game.state().bomb.ready);

        let x = game.state().pos.x;
        assert!(game.trigger_bomb_impulse());
        let state = game.state();
        assert!((state.pos.x - x - 5.6).abs() < 1e-4);
        // max(5 + 3.4, max(1.5, 5 * 1.25))
        assert!((state.vel.x - 8.4).abs() < 1e-4);
        assert_eq!(state.vel.y, 0.0);
        assert!(!state.bomb.ready);
        assert_eq!(state.bomb.next_threshold, 15);

        // Not ready again until tap 15
        for _ in 0..9 {
            game.apply_fish_impulse();
        }
        assert!(!game.state().bomb.ready);
        game.apply_fish_impulse();
        assert!(game.state().bomb.ready);
    }

    #[test]
    fn test_bomb_on_slow_slide_uses_floor() {
        let (mut game, _) = game();
        sliding_at(&mut game, 20.0, 0.5);
        game.state.bomb.ready = true;
        assert!(game.trigger_bomb_impulse());
        // max(0.5 + 3.4, max(1.5, 0.625))
        assert!((game.state().vel.x - 3.9).abs() < 1e-4);
    }

    #[test]
    fn test_slide_continues_after_bomb() {
        let (mut game, _) = game();
        sliding_at(&mut game, 20.0, 3.0);
        game.state.bomb.ready = true;
        game.trigger_bomb_impulse();
        game.step(DT, PIXELS_PER_METER);
        assert_eq!(game.state().phase, GamePhase::Flight);
        assert!(game.is_sliding_ground());
    }

    #[test]
    fn test_set_crashed_only_in_flight() {
        let (mut game, clock) = game();
        game.set_crashed(CrashReport {
            anchor: None,
            distance: 5.0,
            power: None,
        });
        assert_eq!(game.state().phase, GamePhase::Power);

        game.launch();
        clock.advance(300.0);
        game.set_crashed(CrashReport {
            anchor: Some(ImpactAnchor::ScreenPx(240.0)),
            distance: 5.0,
            power: None,
        });
        let state = game.state();
        assert_eq!(state.phase, GamePhase::Crashed);
        assert_eq!(state.distance, 5.0);
        let impact = state.impact.unwrap();
        assert_eq!(impact.key, 10_300.0);
        assert_eq!(impact.x_px, Some(240.0));
        assert_eq!(impact.wx, None);
        assert_eq!(impact.power, 1.0);

        // Dead penguins do not boost
        let vel = state.vel;
        game.press_main();
        assert_eq!(game.state().vel, vel);
    }

    #[test]
    fn test_reset_after_crash() {
        let (mut game, _) = game();
        game.mark_started_before();
        game.set_game_started(true);
        game.set_angle(80.0);
        game.set_power01(1.0);
        game.launch();
        run_until_done(&mut game);
        let best = game.state().ranking.best();

        game.reset();
        let state = game.state();
        assert_eq!(state.phase, GamePhase::Power);
        assert_eq!(state.pos, Vec2::ZERO);
        assert_eq!(state.distance, 0.0);
        assert!(state.impact.is_none());
        assert!(!state.boost.used);
        assert_eq!(state.ranking.best(), best);
        assert!(!state.menu.menu_open);
        assert!(!state.menu.game_started);
    }

    #[test]
    fn test_menu_flags() {
        let (mut game, _) = game();
        assert!(game.state().menu.menu_open);
        game.close_menu();
        assert!(!game.state().menu.menu_open);
        game.open_menu();
        assert!(game.state().menu.menu_open);
    }

    #[test]
    fn test_camera_commands() {
        let (mut game, _) = game();
        game.set_camera_target(8.0);
        game.set_zoom_target(5.0);
        assert_eq!(game.state().camera.zoom_target, 1.2);
        game.tick_camera(0.1);
        assert!(game.state().camera.x > 0.0 && game.state().camera.x < 8.0);
        game.snap_camera(None);
        assert_eq!(game.state().camera.x, 8.0);
        assert_eq!(game.state().camera.zoom, 1.2);
        game.follow_penguin(30.0, 25.0, 1.875);
        assert!((game.state().camera.target_x - 19.375).abs() < 1e-4);
    }

    #[test]
    fn test_advance_frame_follows_and_zooms() {
        let (mut game, _) = game();
        let viewport = Viewport::default();
        game.set_power01(1.0);
        game.launch();

        for _ in 0..60 {
            game.advance_frame(DT, &viewport);
        }
        let camera = game.state().camera;
        assert!(camera.target_x > 0.0);
        assert!(camera.x > 0.0);
        assert!(camera.zoom_target > 1.03 && camera.zoom_target <= 1.10);
    }

    #[test]
    fn test_advance_frame_rests_zoom_after_landing() {
        let (mut game, _) = game();
        let viewport = Viewport::default();
        game.set_angle(10.0);
        game.set_power01(0.0);
        game.launch();

        let mut flight_zoom = 0.0;
        for _ in 0..100_000 {
            game.advance_frame(DT, &viewport);
            if game.state().phase != GamePhase::Flight {
                break;
            }
            flight_zoom = game.state().camera.zoom_target;
        }
        assert_eq!(game.state().phase, GamePhase::Landed);
        assert!(flight_zoom > 1.0);
        assert_eq!(game.state().camera.zoom_target, 1.0);

        // Stays at rest on later frames
        game.advance_frame(DT, &viewport);
        assert_eq!(game.state().camera.zoom_target, 1.0);
    }

    #[test]
    fn test_landing_persists_ranking() {
        let store = SharedStore::default();
        let mut game = Game::with_parts(
            3,
            Tuning::default(),
            Box::new(ManualClock::new(0.0)),
            Box::new(store.clone()),
            Box::new(NullSink),
        );
        game.set_angle(10.0);
        game.set_power01(0.0);
        game.launch();
        run_until_done(&mut game);
        assert_eq!(game.state().phase, GamePhase::Landed);

        let distance = game.state().distance;
        let raw = store.get(RANKING_KEY).unwrap().expect("ranking written");
        assert_eq!(raw, serde_json::to_string(&[distance]).unwrap());

        // Next session starts from the persisted board
        let next = Game::with_parts(
            4,
            Tuning::default(),
            Box::new(ManualClock::new(0.0)),
            Box::new(store),
            Box::new(NullSink),
        );
        assert_eq!(next.state().ranking.entries(), &[distance]);
    }

    #[test]
    fn test_advance_frame_runs_slide_session() {
        let (mut game, _) = game();
        let viewport = Viewport::default();
        sliding_at(&mut game, 20.0, 6.0);
        game.drain_events();

        game.advance_frame(DT, &viewport);
        let events = game.drain_events();
        assert!(events.iter().any(|e| matches!(e, GameEvent::TapPromptShown { .. })));

        assert!(game.tap_prompt());
        assert_eq!(game.state().fish_boost_count, 1);
        // Prompt is gone until it respawns
        assert!(!game.tap_prompt());
    }

    #[test]
    fn test_bomb_button_detonates_after_fuse() {
        let (mut game, _) = game();
        let viewport = Viewport::default();
        sliding_at(&mut game, 20.0, 8.0);
        game.state.bomb.ready = true;

        game.advance_frame(DT, &viewport);
        assert!(game.press_bomb());
        let x = game.state().pos.x;

        // 420 ms fuse at 60 fps
        for _ in 0..30 {
            game.advance_frame(DT, &viewport);
        }
        let state = game.state();
        assert!(!state.bomb.ready);
        assert_eq!(state.bomb.next_threshold, 15);
        assert!(state.pos.x > x + 5.6);
        assert!(game.drain_events().iter().any(|e| matches!(e, GameEvent::BombDetonated { .. })));
    }

    #[test]
    fn test_step_clamps_large_dt() {
        let (mut a, _) = game();
        let (mut b, _) = game();
        a.launch();
        b.launch();
        a.step(0.5, PIXELS_PER_METER);
        b.step(MAX_FRAME_DT, PIXELS_PER_METER);
        assert_eq!(a.state().pos, b.state().pos);
    }

    #[derive(Debug, Clone)]
    enum Command {
        Step(f32),
        Fish,
        Bomb,
        Press,
    }

    fn command() -> impl Strategy<Value = Command> {
        prop_oneof![
            6 => (0.0f32..0.05).prop_map(Command::Step),
            2 => Just(Command::Fish),
            1 => Just(Command::Bomb),
            1 => Just(Command::Press),
        ]
    }

    proptest! {
        #[test]
        fn prop_distance_never_decreases(
            angle in 10.0f32..80.0,
            power in 0.0f32..1.0,
            commands in prop::collection::vec(command(), 1..400),
        ) {
            let (mut game, clock) = game();
            game.set_angle(angle);
            game.set_power01(power);
            game.launch();

            let mut last = game.state().distance;
            for cmd in commands {
                match cmd {
                    Command::Step(dt) => {
                        clock.advance(f64::from(dt) * 1000.0);
                        game.step(dt, PIXELS_PER_METER);
                    }
                    Command::Fish => { game.apply_fish_impulse(); }
                    Command::Bomb => { game.trigger_bomb_impulse(); }
                    Command::Press => game.press_main(),
                }
                let state = game.state();
                prop_assert!(state.distance >= last);
                prop_assert!(state.pos.y >= 0.0);
                last = state.distance;
            }
        }

        #[test]
        fn prop_fish_boosts_are_capped(taps in 1usize..60) {
            let (mut game, _) = game();
            sliding_at(&mut game, 10.0, 50.0);
            let cfg = game.tuning().slide.clone();
            let start = game.state().pos.x;
            for _ in 0..taps {
                let x = game.state().pos.x;
                game.apply_fish_impulse();
                let boost = game.state().pos.x - x;
                prop_assert!(boost <= cfg.fish_max_boost + 1e-4);
                prop_assert!(boost - cfg.fish_base_boost <= cfg.fish_max_boost - cfg.fish_base_boost + 1e-4);
            }
            let total = game.state().pos.x - start;
            prop_assert!(total <= taps as f32 * cfg.fish_max_boost + 1e-2);
        }
    }
}
