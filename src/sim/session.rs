//! Slide-session timers
//!
//! The tap prompt and the bomb fuse only exist while the actor skims the ice.
//! Both are driven by frame time (not wall time) and are cancelled the frame
//! the ground-skim window closes.

use glam::Vec2;
use rand::Rng;

use crate::tuning::SlideTuning;

/// Tap prompt lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum TapPrompt {
    /// Not sliding, or the session was just cancelled
    #[default]
    Inactive,
    /// Waiting for a tap
    Showing { offset_px: Vec2, remaining_ms: f64 },
    /// Hit; next prompt after a short pause
    Respawning { remaining_ms: f64 },
    /// Missed; no more prompts this slide
    Failed,
}

/// Bomb fuse lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum BombFuse {
    #[default]
    Idle,
    /// Bomb available, waiting for a press
    Ready,
    Countdown { remaining_ms: f64 },
    Exploding { remaining_ms: f64 },
}

/// What the session asks the game to do after a frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SessionSignal {
    PromptShown { offset_px: Vec2 },
    PromptMissed,
    Detonate,
}

#[derive(Debug, Clone, Default)]
pub struct SlideSession {
    pub tap: TapPrompt,
    pub bomb: BombFuse,
}

impl SlideSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every pending timer
    pub fn cancel(&mut self) {
        if self.tap != TapPrompt::Inactive || self.bomb != BombFuse::Idle {
            log::debug!("Slide session cancelled");
        }
        self.tap = TapPrompt::Inactive;
        self.bomb = BombFuse::Idle;
    }

    /// Advance timers by `dt_ms`. `sliding` is the ground-skim predicate for
    /// this frame, `bomb_ready` the core's bomb readiness.
    pub fn advance<R: Rng>(
        &mut self,
        dt_ms: f64,
        sliding: bool,
        bomb_ready: bool,
        rng: &mut R,
        tuning: &SlideTuning,
    ) -> Vec<SessionSignal> {
        let mut signals = Vec::new();
        if !sliding {
            self.cancel();
            return signals;
        }

        self.tap = match self.tap {
            TapPrompt::Inactive => Self::spawn(rng, tuning, &mut signals),
            TapPrompt::Showing {
                offset_px,
                remaining_ms,
            } => {
                let remaining_ms = remaining_ms - dt_ms;
                if remaining_ms <= 0.0 {
                    signals.push(SessionSignal::PromptMissed);
                    TapPrompt::Failed
                } else {
                    TapPrompt::Showing {
                        offset_px,
                        remaining_ms,
                    }
                }
            }
            TapPrompt::Respawning { remaining_ms } => {
                let remaining_ms = remaining_ms - dt_ms;
                if remaining_ms <= 0.0 {
                    Self::spawn(rng, tuning, &mut signals)
                } else {
                    TapPrompt::Respawning { remaining_ms }
                }
            }
            TapPrompt::Failed => TapPrompt::Failed,
        };

        self.bomb = match self.bomb {
            BombFuse::Idle if bomb_ready => BombFuse::Ready,
            BombFuse::Countdown { remaining_ms } => {
                let remaining_ms = remaining_ms - dt_ms;
                if remaining_ms <= 0.0 {
                    signals.push(SessionSignal::Detonate);
                    BombFuse::Exploding {
                        remaining_ms: tuning.bomb_explode_ms,
                    }
                } else {
                    BombFuse::Countdown { remaining_ms }
                }
            }
            BombFuse::Exploding { remaining_ms } => {
                let remaining_ms = remaining_ms - dt_ms;
                if remaining_ms <= 0.0 {
                    BombFuse::Idle
                } else {
                    BombFuse::Exploding { remaining_ms }
                }
            }
            other => other,
        };

        signals
    }

    /// Player tapped the prompt. True when it counted.
    pub fn tap(&mut self, tuning: &SlideTuning) -> bool {
        match self.tap {
            TapPrompt::Showing { .. } => {
                self.tap = TapPrompt::Respawning {
                    remaining_ms: tuning.tap_respawn_ms,
                };
                true
            }
            _ => false,
        }
    }

    /// Player pressed the bomb. True when the fuse was lit.
    pub fn light_fuse(&mut self, tuning: &SlideTuning) -> bool {
        match self.bomb {
            BombFuse::Ready => {
                self.bomb = BombFuse::Countdown {
                    remaining_ms: tuning.bomb_countdown_ms,
                };
                true
            }
            _ => false,
        }
    }

    fn spawn<R: Rng>(rng: &mut R, tuning: &SlideTuning, signals: &mut Vec<SessionSignal>) -> TapPrompt {
        let offset_px = Vec2::new(
            (rng.random::<f32>() - 0.5) * 2.0 * tuning.tap_offset_x_px,
            (rng.random::<f32>() - 0.5) * 2.0 * tuning.tap_offset_y_px,
        );
        signals.push(SessionSignal::PromptShown { offset_px });
        TapPrompt::Showing {
            offset_px,
            remaining_ms: tuning.tap_timeout_ms,
        }
    }
}
