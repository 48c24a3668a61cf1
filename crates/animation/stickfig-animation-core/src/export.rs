//! Pose resolution at arbitrary instants, and clock-free frame streams for export.
//!
//! Resolution is complete: every posed character and every prop with a known
//! state appears in a [`ResolvedFrame`]. Between keyframes `i` and `i + 1`:
//! - present in both: blended;
//! - present only in `i + 1`: seeded with the target;
//! - present only in `i`: held;
//! - present in neither: the latest earlier value is carried forward.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::clock::{build_segments, locate, Segment, StrategyKind};
use crate::data::{Animation, PropState};
use crate::ids::{CharacterId, PropId};
use crate::interp::{blend_optional, blend_prop, Easing};
use crate::pose::PoseVariant;

/// Fully resolved state at one instant.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResolvedFrame {
    /// Keyframe at or before `time_ms`.
    pub index: usize,
    pub time_ms: f64,
    pub poses: IndexMap<CharacterId, PoseVariant>,
    pub props: IndexMap<PropId, PropState>,
    /// Latest narration at or before `index`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

fn carried_pose<'a>(anim: &'a Animation, id: &CharacterId, upto: usize) -> Option<&'a PoseVariant> {
    anim.keyframes[..=upto]
        .iter()
        .rev()
        .find_map(|k| k.poses.get(id))
}

fn carried_prop(anim: &Animation, id: &PropId, upto: usize) -> Option<PropState> {
    anim.keyframes[..=upto]
        .iter()
        .rev()
        .find_map(|k| k.props.get(id).copied())
}

fn carried_text(anim: &Animation, upto: usize) -> Option<String> {
    anim.keyframes[..=upto]
        .iter()
        .rev()
        .find_map(|k| k.text.clone())
}

/// Resolve keyframe `index` blended toward `index + 1` by `progress` (before easing).
///
/// `index` is clamped to the last keyframe. An empty animation yields an empty frame.
pub fn resolve_between(
    anim: &Animation,
    index: usize,
    progress: f32,
    ease: Easing,
    time_ms: f64,
) -> ResolvedFrame {
    resolve(anim, index, Some((progress, ease)), time_ms)
}

fn resolve(
    anim: &Animation,
    index: usize,
    toward: Option<(f32, Easing)>,
    time_ms: f64,
) -> ResolvedFrame {
    let mut frame = ResolvedFrame {
        index: 0,
        time_ms,
        poses: IndexMap::new(),
        props: IndexMap::new(),
        text: None,
    };
    let Some(last) = anim.keyframes.len().checked_sub(1) else {
        return frame;
    };
    let index = index.min(last);
    let from = &anim.keyframes[index];
    let (progress, ease) = toward.unwrap_or((0.0, Easing::Linear));
    let to = toward.and_then(|_| anim.keyframes.get(index + 1));
    frame.index = index;

    for character in &anim.characters {
        let id = &character.id;
        let pose = match to {
            Some(to) => blend_optional(from.poses.get(id), to.poses.get(id), progress, ease),
            None => from.poses.get(id).cloned(),
        }
        .or_else(|| carried_pose(anim, id, index).cloned());
        if let Some(pose) = pose {
            frame.poses.insert(id.clone(), pose);
        }
    }

    for prop in &anim.props {
        let id = &prop.id;
        let a = from.props.get(id);
        let b = to.and_then(|k| k.props.get(id));
        let state = match (a, b) {
            (Some(a), Some(b)) => Some(blend_prop(a, b, progress, ease)),
            (None, Some(b)) => Some(*b),
            (Some(a), None) => Some(*a),
            (None, None) => carried_prop(anim, id, index),
        };
        if let Some(state) = state {
            frame.props.insert(id.clone(), state);
        }
    }

    frame.text = carried_text(anim, index);
    frame
}

/// Resolve keyframe `index` exactly.
pub fn resolve_keyframe(anim: &Animation, index: usize) -> ResolvedFrame {
    let time_ms = anim
        .keyframes
        .get(index)
        .or(anim.keyframes.last())
        .map_or(0.0, |k| k.timestamp_ms);
    resolve(anim, index, None, time_ms)
}

/// Resolve the continuous timeline at `time_ms`.
pub fn resolve_at(anim: &Animation, segments: &[Segment], time_ms: f64) -> ResolvedFrame {
    let pos = locate(segments, time_ms);
    let ease = segments
        .get(pos.index)
        .map_or(Easing::Linear, |s| s.ease);
    resolve_between(anim, pos.index, pos.progress, ease, time_ms)
}

/// Deterministic frame iterator that never touches the playback clock.
///
/// Continuous animations are sampled at a fixed rate from 0 to the last
/// timestamp inclusive; discrete animations yield each frame once.
pub struct FrameStream<'a> {
    anim: &'a Animation,
    segments: Vec<Segment>,
    /// Discrete frame times, relative to the first frame.
    offsets: Vec<f64>,
    mode: StrategyKind,
    step_ms: f64,
    next: usize,
    done: bool,
}

impl<'a> FrameStream<'a> {
    pub fn new(anim: &'a Animation, fps: f32, default_ease: Easing) -> Self {
        let fps = if fps.is_finite() && fps > 0.0 { fps } else { 30.0 };
        let mode = anim.strategy_kind();
        let offsets = match mode {
            StrategyKind::Discrete => anim.frame_offsets(),
            StrategyKind::Continuous => Vec::new(),
        };
        Self {
            anim,
            segments: build_segments(&anim.keyframes, default_ease),
            offsets,
            mode,
            step_ms: 1000.0 / f64::from(fps),
            next: 0,
            done: anim.keyframes.is_empty(),
        }
    }

    /// Number of frames the stream yields in total.
    pub fn frame_count(&self) -> usize {
        if self.anim.keyframes.is_empty() {
            return 0;
        }
        match self.mode {
            StrategyKind::Discrete => self.anim.keyframes.len(),
            StrategyKind::Continuous => {
                let total = self.anim.duration_ms();
                let whole = (total / self.step_ms).floor() as usize;
                let aligned = (whole as f64 * self.step_ms - total).abs() < 1e-9;
                whole + if aligned { 1 } else { 2 }
            }
        }
    }
}

impl Iterator for FrameStream<'_> {
    type Item = ResolvedFrame;

    fn next(&mut self) -> Option<ResolvedFrame> {
        if self.done {
            return None;
        }
        let i = self.next;
        self.next += 1;
        match self.mode {
            StrategyKind::Discrete => {
                if i + 1 >= self.anim.keyframes.len() {
                    self.done = true;
                }
                let mut frame = resolve_keyframe(self.anim, i);
                frame.time_ms = self.offsets[i];
                Some(frame)
            }
            StrategyKind::Continuous => {
                let total = self.anim.duration_ms();
                let mut t = i as f64 * self.step_ms;
                if t >= total - 1e-9 {
                    t = total;
                    self.done = true;
                }
                Some(resolve_at(self.anim, &self.segments, t))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::payload::parse_payload_json;
    use crate::pose::Point;

    fn anim(json: &str) -> Animation {
        Animation::from_payload(parse_payload_json(json).unwrap(), &Config::default()).unwrap()
    }

    const TWO: &str = r#"{"characters":[{"id":"a"},{"id":"b"}],
        "props":[{"id":"ball"}],
        "keyframes":[
            {"timestamp":0,"text":"one","ease":"linear","characters":{"a":{"joints":{"head":{"x":0,"y":0}}}},
             "props":{"ball":{"x":0,"visible":false}}},
            {"timestamp":1000,"ease":"linear","characters":{"a":{"joints":{"head":{"x":100,"y":0}}},
                                            "b":{"joints":{"head":{"x":7,"y":7}}}},
             "props":{"ball":{"x":10,"visible":true}}},
            {"timestamp":2000,"ease":"linear","characters":{"b":{"joints":{"head":{"x":9,"y":9}}}}}
        ]}"#;

    #[test]
    fn midpoint_blends_and_seeds() {
        let a = anim(TWO);
        let segs = build_segments(&a.keyframes, Easing::QuadInOut);
        let f = resolve_at(&a, &segs, 500.0);
        assert_eq!(f.index, 0);
        assert_eq!(f.poses[&CharacterId::from("a")].joint("head"), Some(Point { x: 50.0, y: 0.0 }));
        assert_eq!(f.poses[&CharacterId::from("b")].joint("head"), Some(Point { x: 7.0, y: 7.0 }));
        assert_eq!(f.props[&PropId::from("ball")].x, 5.0);
        assert!(!f.props[&PropId::from("ball")].visible);
        assert_eq!(f.text.as_deref(), Some("one"));
    }

    #[test]
    fn missing_character_holds_then_carries() {
        let a = anim(TWO);
        let segs = build_segments(&a.keyframes, Easing::QuadInOut);
        let f = resolve_at(&a, &segs, 1500.0);
        assert_eq!(f.poses[&CharacterId::from("a")].joint("head"), Some(Point { x: 100.0, y: 0.0 }));
        let end = resolve_at(&a, &segs, 2000.0);
        assert_eq!(end.index, 2);
        assert_eq!(end.poses[&CharacterId::from("a")].joint("head"), Some(Point { x: 100.0, y: 0.0 }));
        assert_eq!(end.props[&PropId::from("ball")].x, 10.0);
    }

    #[test]
    fn continuous_stream_is_deterministic_and_ends_on_last_timestamp() {
        let a = anim(TWO);
        let s = FrameStream::new(&a, 4.0, Easing::QuadInOut);
        assert_eq!(s.frame_count(), 9);
        let first: Vec<_> = s.collect();
        let second: Vec<_> = FrameStream::new(&a, 4.0, Easing::QuadInOut).collect();
        assert_eq!(first, second);
        assert_eq!(first.len(), 9);
        assert_eq!(first[1].time_ms, 250.0);
        assert_eq!(first.last().map(|f| f.time_ms), Some(2000.0));
    }

    #[test]
    fn discrete_stream_yields_each_frame() {
        let a = anim(
            r#"{"characters":[{"id":"a"}],"target_fps":10,"keyframes":[
                {"timestamp":40,"characters":{"a":{"joints":{"head":{"x":0,"y":0}}}}},
                {"timestamp":140,"characters":{"a":{"joints":{"head":{"x":1,"y":0}}}}}
            ]}"#,
        );
        let frames: Vec<_> = FrameStream::new(&a, 30.0, Easing::QuadInOut).collect();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[1].time_ms, 100.0);
        assert_eq!(frames[1].poses[&CharacterId::from("a")].joint("head"), Some(Point { x: 1.0, y: 0.0 }));
    }

    #[test]
    fn discrete_stream_times_match_frame_offsets() {
        let keyframes: Vec<String> = (0..25)
            .map(|i| {
                format!(
                    r#"{{"timestamp":{},"characters":{{"a":{{"joints":{{"head":{{"x":{i},"y":0}}}}}}}}}}"#,
                    200 + i * 33
                )
            })
            .collect();
        let a = anim(&format!(
            r#"{{"characters":[{{"id":"a"}}],"target_fps":30,"keyframes":[{}]}}"#,
            keyframes.join(",")
        ));
        let s = FrameStream::new(&a, 30.0, Easing::QuadInOut);
        assert_eq!(s.frame_count(), 25);
        let times: Vec<f64> = s.map(|f| f.time_ms).collect();
        assert_eq!(times, a.frame_offsets());
        assert_eq!(times[24], 792.0);
    }
}
