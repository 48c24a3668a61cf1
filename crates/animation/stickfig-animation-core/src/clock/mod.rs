//! Playback clocks for the two strategies.
//!
//! Neither clock reads time on its own; every operation takes `now_ms` from the
//! engine's time source. Pausing is modelled as a rebased origin so that the
//! cursor is always `now - origin`.

pub mod frames;
pub mod timeline;

use serde::{Deserialize, Serialize};

pub use frames::FrameStepper;
pub use timeline::{build_segments, locate, Segment, SegmentPosition, Timeline};

/// Discrete mode reports every Nth frame to the keyframe callback.
pub const FRAME_CALLBACK_STRIDE: usize = 10;

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackStatus {
    #[default]
    Stopped,
    /// Restart requested; waiting out the settle delay.
    Starting,
    Playing,
    Paused,
    Completed,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    Continuous,
    Discrete,
}

/// Strategy chosen once at load from the presence of `target_fps`.
#[derive(Clone, Debug)]
pub enum PlaybackStrategy {
    Continuous(Timeline),
    Discrete(FrameStepper),
}

impl PlaybackStrategy {
    pub fn kind(&self) -> StrategyKind {
        match self {
            Self::Continuous(_) => StrategyKind::Continuous,
            Self::Discrete(_) => StrategyKind::Discrete,
        }
    }

    pub fn start(&mut self, now_ms: f64) {
        match self {
            Self::Continuous(t) => t.start(now_ms),
            Self::Discrete(f) => f.start(now_ms),
        }
    }

    pub fn pause(&mut self, now_ms: f64) {
        match self {
            Self::Continuous(t) => t.pause(now_ms),
            Self::Discrete(f) => f.pause(now_ms),
        }
    }

    pub fn resume(&mut self, now_ms: f64) {
        match self {
            Self::Continuous(t) => t.resume(now_ms),
            Self::Discrete(f) => f.resume(now_ms),
        }
    }

    /// Overall progress in [0,1] at `now_ms`.
    pub fn progress(&self, now_ms: f64) -> f32 {
        match self {
            Self::Continuous(t) => t.progress(now_ms),
            Self::Discrete(f) => f.progress(),
        }
    }
}
