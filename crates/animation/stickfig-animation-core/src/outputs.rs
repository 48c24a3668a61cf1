//! Events and state snapshots reported by the engine.

use serde::{Deserialize, Serialize};

use crate::clock::{PlaybackStatus, StrategyKind};

/// Semantic signals accumulated during calls; hosts read them with `drain_events`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
#[non_exhaustive]
pub enum PlaybackEvent {
    Loaded {
        strategy: StrategyKind,
        keyframes: usize,
        characters: usize,
        skipped_poses: usize,
    },
    Started,
    Paused {
        progress: f32,
    },
    Resumed {
        progress: f32,
    },
    /// Restart accepted; playback begins after `delay_ms`.
    Restarting {
        delay_ms: f64,
    },
    Seeked {
        index: usize,
        progress: f32,
    },
    KeyframeReached {
        index: usize,
        timestamp_ms: f64,
    },
    Completed,
    Cleared,
    /// A call was ignored (for example `play` before any load).
    Rejected {
        op: String,
        reason: String,
    },
}

/// Result of `state()`. `current_frame`/`total_frames` are only set in discrete mode.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackSnapshot {
    pub is_playing: bool,
    pub has_data: bool,
    pub progress: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_frame: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_frames: Option<usize>,
    pub status: PlaybackStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<StrategyKind>,
}

impl PlaybackSnapshot {
    pub(crate) fn empty() -> Self {
        Self {
            is_playing: false,
            has_data: false,
            progress: 0.0,
            current_frame: None,
            total_frames: None,
            status: PlaybackStatus::Stopped,
            strategy: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn snapshot_uses_camel_case_and_omits_frame_fields() {
        let v = serde_json::to_value(PlaybackSnapshot::empty()).unwrap();
        assert_eq!(
            v,
            json!({"isPlaying": false, "hasData": false, "progress": 0.0, "status": "stopped"})
        );
    }

    #[test]
    fn events_are_tagged() {
        let v = serde_json::to_value(PlaybackEvent::KeyframeReached {
            index: 2,
            timestamp_ms: 500.0,
        })
        .unwrap();
        assert_eq!(v, json!({"type": "keyframe_reached", "index": 2, "timestamp_ms": 500.0}));
    }
}
