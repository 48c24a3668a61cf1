//! Continuous timeline: segments between consecutive keyframes and a rebased cursor.

use crate::data::Keyframe;
use crate::interp::Easing;

/// Interpolation window between keyframe `i` and `i + 1`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Segment {
    pub start_ms: f64,
    pub duration_ms: f64,
    pub ease: Easing,
}

/// Where a cursor falls: blend keyframe `index` toward `index + 1` by `progress`.
///
/// When `index` is the last keyframe there is nothing to blend toward and the
/// keyframe is shown as-is.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SegmentPosition {
    pub index: usize,
    pub progress: f32,
}

/// One segment per consecutive keyframe pair. The arriving keyframe's `ease`
/// overrides `default_ease`.
pub fn build_segments(keyframes: &[Keyframe], default_ease: Easing) -> Vec<Segment> {
    keyframes
        .windows(2)
        .map(|w| Segment {
            start_ms: w[0].timestamp_ms,
            duration_ms: w[1].timestamp_ms - w[0].timestamp_ms,
            ease: w[1].ease.unwrap_or(default_ease),
        })
        .collect()
}

/// Locate `cursor_ms` among `segments`.
///
/// Before the first keyframe the first pose holds; past the last segment the
/// last pose holds. Zero-length segments resolve to their later keyframe.
pub fn locate(segments: &[Segment], cursor_ms: f64) -> SegmentPosition {
    let after = segments.partition_point(|s| s.start_ms <= cursor_ms);
    if after == 0 {
        return SegmentPosition {
            index: 0,
            progress: 0.0,
        };
    }
    let i = after - 1;
    let seg = &segments[i];
    let progress = if seg.duration_ms <= 0.0 {
        1.0
    } else {
        ((cursor_ms - seg.start_ms) / seg.duration_ms).clamp(0.0, 1.0) as f32
    };
    if progress >= 1.0 {
        SegmentPosition {
            index: i + 1,
            progress: 0.0,
        }
    } else {
        SegmentPosition { index: i, progress }
    }
}

#[derive(Clone, Debug)]
pub struct Timeline {
    segments: Vec<Segment>,
    total_ms: f64,
    origin_ms: f64,
    paused_at: Option<f64>,
}

impl Timeline {
    pub fn new(keyframes: &[Keyframe], default_ease: Easing) -> Self {
        Self {
            segments: build_segments(keyframes, default_ease),
            total_ms: keyframes.last().map_or(0.0, |k| k.timestamp_ms),
            origin_ms: 0.0,
            paused_at: None,
        }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn total_ms(&self) -> f64 {
        self.total_ms
    }

    pub fn start(&mut self, now_ms: f64) {
        self.origin_ms = now_ms;
        self.paused_at = None;
    }

    /// Cursor in [0, total]. Frozen while paused.
    pub fn cursor_at(&self, now_ms: f64) -> f64 {
        let now = self.paused_at.unwrap_or(now_ms);
        (now - self.origin_ms).clamp(0.0, self.total_ms)
    }

    pub fn position_at(&self, now_ms: f64) -> SegmentPosition {
        locate(&self.segments, self.cursor_at(now_ms))
    }

    pub fn is_finished(&self, now_ms: f64) -> bool {
        self.cursor_at(now_ms) >= self.total_ms
    }

    pub fn progress(&self, now_ms: f64) -> f32 {
        if self.total_ms <= 0.0 {
            return if self.is_finished(now_ms) { 1.0 } else { 0.0 };
        }
        (self.cursor_at(now_ms) / self.total_ms) as f32
    }

    pub fn is_paused(&self) -> bool {
        self.paused_at.is_some()
    }

    pub fn pause(&mut self, now_ms: f64) {
        if self.paused_at.is_none() {
            self.paused_at = Some(now_ms);
        }
    }

    pub fn resume(&mut self, now_ms: f64) {
        if let Some(at) = self.paused_at.take() {
            self.origin_ms += now_ms - at;
        }
    }

    /// Move the cursor to `cursor_ms` (clamped). Pause state is kept.
    pub fn seek(&mut self, now_ms: f64, cursor_ms: f64) {
        let cursor = cursor_ms.clamp(0.0, self.total_ms);
        let now = self.paused_at.unwrap_or(now_ms);
        self.origin_ms = now - cursor;
    }

    /// Milliseconds until the cursor reaches `target_ms`, or `None` if already there.
    pub fn remaining_until(&self, now_ms: f64, target_ms: f64) -> Option<f64> {
        let remaining = target_ms.min(self.total_ms) - self.cursor_at(now_ms);
        (remaining > 0.0).then_some(remaining)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;

    fn kfs(ts: &[f64]) -> Vec<Keyframe> {
        ts.iter()
            .map(|&t| Keyframe {
                timestamp_ms: t,
                text: None,
                poses: IndexMap::new(),
                props: IndexMap::new(),
                ease: None,
            })
            .collect()
    }

    #[test]
    fn segment_durations_follow_timestamps() {
        let tl = Timeline::new(&kfs(&[0.0, 500.0, 1200.0]), Easing::QuadInOut);
        let d: Vec<_> = tl.segments().iter().map(|s| s.duration_ms).collect();
        assert_eq!(d, vec![500.0, 700.0]);
        assert_eq!(tl.total_ms(), 1200.0);
    }

    #[test]
    fn locate_handles_bounds_and_interior() {
        let segs = build_segments(&kfs(&[100.0, 500.0, 1200.0]), Easing::Linear);
        assert_eq!(locate(&segs, 0.0), SegmentPosition { index: 0, progress: 0.0 });
        assert_eq!(locate(&segs, 300.0), SegmentPosition { index: 0, progress: 0.5 });
        assert_eq!(locate(&segs, 500.0), SegmentPosition { index: 1, progress: 0.0 });
        assert_eq!(locate(&segs, 1200.0), SegmentPosition { index: 2, progress: 0.0 });
        assert_eq!(locate(&segs, 9999.0), SegmentPosition { index: 2, progress: 0.0 });
    }

    #[test]
    fn duplicate_timestamps_resolve_to_the_later_keyframe() {
        let segs = build_segments(&kfs(&[0.0, 500.0, 500.0, 900.0]), Easing::Linear);
        assert_eq!(locate(&segs, 500.0).index, 2);
    }

    #[test]
    fn pause_freezes_and_resume_rebases() {
        let mut tl = Timeline::new(&kfs(&[0.0, 1000.0]), Easing::Linear);
        tl.start(10_000.0);
        tl.pause(10_250.0);
        tl.pause(10_400.0);
        assert_eq!(tl.cursor_at(10_900.0), 250.0);
        tl.resume(11_000.0);
        assert_eq!(tl.cursor_at(11_100.0), 350.0);
        assert!(!tl.is_finished(11_100.0));
        assert!(tl.is_finished(11_750.0));
    }

    #[test]
    fn seek_keeps_pause_state() {
        let mut tl = Timeline::new(&kfs(&[0.0, 1000.0]), Easing::Linear);
        tl.start(0.0);
        tl.pause(100.0);
        tl.seek(300.0, 600.0);
        assert!(tl.is_paused());
        assert_eq!(tl.cursor_at(900.0), 600.0);
        tl.resume(1000.0);
        assert_eq!(tl.cursor_at(1100.0), 700.0);
        assert_eq!(tl.remaining_until(1100.0, 1000.0), Some(300.0));
    }
}
