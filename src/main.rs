//! Pinguin Boom entry point
//!
//! On the web this exposes the game to the page's render loop. Natively it
//! runs a headless autoplay round, which is handy for tuning the balance.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod wasm_game {
    use std::cell::RefCell;

    use wasm_bindgen::prelude::*;

    use pinguin_boom::Game;
    use pinguin_boom::consts::{MARGIN_LEFT_PX, PIXELS_PER_METER};
    use pinguin_boom::sim::{CrashReport, ImpactAnchor, Viewport};

    thread_local! {
        static GAME: RefCell<Option<Game>> = const { RefCell::new(None) };
    }

    fn with_game<T: Default>(f: impl FnOnce(&mut Game) -> T) -> T {
        GAME.with(|cell| cell.borrow_mut().as_mut().map(f).unwrap_or_default())
    }

    pub fn start() {
        let seed = (js_sys::Math::random() * u32::MAX as f64) as u64;
        let game = Game::new(seed);
        log::info!(
            "Game initialized with seed {} ({} ranking entries)",
            seed,
            game.state().ranking.len()
        );
        GAME.with(|cell| *cell.borrow_mut() = Some(game));
    }

    #[wasm_bindgen]
    pub fn press_main() {
        with_game(|g| g.press_main());
    }

    #[wasm_bindgen]
    pub fn set_angle(deg: f32) {
        with_game(|g| g.set_angle(deg));
    }

    #[wasm_bindgen]
    pub fn set_power(power01: f32) {
        with_game(|g| g.set_power01(power01));
    }

    #[wasm_bindgen]
    pub fn tap_prompt() -> bool {
        with_game(|g| g.tap_prompt())
    }

    #[wasm_bindgen]
    pub fn press_bomb() -> bool {
        with_game(|g| g.press_bomb())
    }

    #[wasm_bindgen]
    pub fn launch() {
        with_game(|g| g.launch());
    }

    /// Call once the crash particles have been spawned
    #[wasm_bindgen]
    pub fn clear_impact() {
        with_game(|g| g.clear_impact());
    }

    /// Call once the boost flash has been shown
    #[wasm_bindgen]
    pub fn clear_boost_blast() {
        with_game(|g| g.clear_boost_blast());
    }

    /// Crash reported by the page. Pass NaN for `power` to use the default.
    #[wasm_bindgen]
    pub fn set_crashed(distance: f32, x_px: Option<f32>, power: f32) {
        let report = CrashReport {
            anchor: x_px.map(ImpactAnchor::ScreenPx),
            distance,
            power: power.is_finite().then_some(power),
        };
        with_game(|g| g.set_crashed(report));
    }

    #[wasm_bindgen]
    pub fn set_camera_target(x: f32) {
        with_game(|g| g.set_camera_target(x));
    }

    #[wasm_bindgen]
    pub fn set_zoom_target(zoom: f32) {
        with_game(|g| g.set_zoom_target(zoom));
    }

    #[wasm_bindgen]
    pub fn snap_camera(x: Option<f32>) {
        with_game(|g| g.snap_camera(x));
    }

    #[wasm_bindgen]
    pub fn add_ranking(distance: f32) {
        with_game(|g| g.add_ranking(distance));
    }

    #[wasm_bindgen]
    pub fn close_menu() {
        with_game(|g| {
            g.close_menu();
            g.set_game_started(true);
            g.mark_started_before();
        });
    }

    #[wasm_bindgen]
    pub fn open_menu() {
        with_game(|g| g.open_menu());
    }

    #[wasm_bindgen]
    pub fn reset() {
        with_game(|g| g.reset());
    }

    #[wasm_bindgen]
    pub fn advance_frame(dt: f32, width_px: f32) {
        let viewport = Viewport::from_pixels(width_px, PIXELS_PER_METER, MARGIN_LEFT_PX);
        with_game(|g| g.advance_frame(dt, &viewport));
    }

    /// Current state as JSON for the page to draw
    #[wasm_bindgen]
    pub fn state_json() -> String {
        with_game(|g| match serde_json::to_string(g.state()) {
            Ok(json) => json,
            Err(e) => {
                log::error!("State serialization failed: {e}");
                String::new()
            }
        })
    }

    /// Events since the last call, as a JSON array
    #[wasm_bindgen]
    pub fn drain_events_json() -> String {
        with_game(|g| serde_json::to_string(&g.drain_events()).unwrap_or_else(|_| "[]".into()))
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn wasm_main() {
    console_error_panic_hook::set_once();
    if let Err(e) = console_log::init_with_level(log::Level::Info) {
        web_sys::console::error_1(&format!("Logger init failed: {e}").into());
    }
    log::info!("Pinguin Boom starting...");
    wasm_game::start();
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    log::info!("Pinguin Boom (native) starting...");
    log::info!("Native mode runs a headless round - serve the wasm build to play");

    autoplay::run();
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}

/// Scripted round: aim, boost at the top of the window, hit every prompt
#[cfg(not(target_arch = "wasm32"))]
mod autoplay {
    use pinguin_boom::consts::{MARGIN_LEFT_PX, PIXELS_PER_METER};
    use pinguin_boom::persistence;
    use pinguin_boom::platform::{Clock, ManualClock, SystemClock};
    use pinguin_boom::scores::NullSink;
    use pinguin_boom::sim::{ImpactOutcome, TapPrompt, Viewport};
    use pinguin_boom::{Game, GameEvent, Tuning};

    const FRAME_DT: f32 = 1.0 / 60.0;
    const MAX_FRAMES: usize = 60 * 120;

    pub fn run() {
        let seed = SystemClock.now_ms() as u64;
        let store = persistence::default_store();
        let tuning = Tuning::load(store.as_ref());
        // Frames run faster than real time, so the boost window needs frame time
        let clock = ManualClock::new(0.0);
        let mut game = Game::with_parts(seed, tuning, Box::new(clock.clone()), store, Box::new(NullSink));
        let viewport = Viewport::from_pixels(960.0, PIXELS_PER_METER, MARGIN_LEFT_PX);

        log::info!("Seed {seed}, best so far: {:?}", game.state().ranking.best());

        game.set_power01(0.92);
        game.press_main();
        game.set_angle(38.0);
        game.press_main();

        let mut outcome = None;
        for _ in 0..MAX_FRAMES {
            if outcome.is_some() {
                break;
            }
            clock.advance(f64::from(FRAME_DT) * 1000.0);

            if game
                .boost_gauge(clock.now_ms())
                .is_some_and(|gauge| gauge.ready && gauge.intensity > 0.9)
            {
                game.press_main();
            }
            if matches!(game.session().tap, TapPrompt::Showing { .. }) {
                game.tap_prompt();
            }
            if game.state().bomb.ready {
                game.press_bomb();
            }

            game.advance_frame(FRAME_DT, &viewport);
            for event in game.drain_events() {
                log::debug!("{event:?}");
                if let Some(decided) = event.outcome() {
                    outcome = Some(decided);
                }
                if let GameEvent::RankingUpdated { rank: Some(rank), .. } = event {
                    log::info!("New ranking entry at #{rank}");
                }
            }
        }

        let state = game.state();
        match outcome {
            Some(ImpactOutcome::Slide) => println!("Slid to a stop at {:.1} m", state.distance),
            Some(ImpactOutcome::Crash) => println!("Crashed at {:.1} m", state.distance),
            None => println!(
                "Still in {} after {MAX_FRAMES} frames",
                state.phase.as_str()
            ),
        }
        println!("Fish taps: {}", state.fish_boost_count);
        for (i, d) in state.ranking.entries().iter().enumerate() {
            println!("  #{} {:.1} m", i + 1, d);
        }
    }
}
