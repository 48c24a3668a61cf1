//! Discrete frame stepping with drift correction.
//!
//! The wait before frame `i + 1` is `offset[i + 1] - (now - origin)`, never the
//! nominal frame interval, so late timers do not accumulate error.

#[derive(Clone, Debug)]
pub struct FrameStepper {
    offsets: Vec<f64>,
    index: usize,
    origin_ms: f64,
    paused_at: Option<f64>,
}

impl FrameStepper {
    /// `offsets` are per-frame times relative to the first frame.
    pub fn new(offsets: Vec<f64>) -> Self {
        Self {
            offsets,
            index: 0,
            origin_ms: 0.0,
            paused_at: None,
        }
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn is_last(&self) -> bool {
        self.index + 1 >= self.offsets.len()
    }

    pub fn start(&mut self, now_ms: f64) {
        self.index = 0;
        self.origin_ms = now_ms;
        self.paused_at = None;
    }

    fn elapsed(&self, now_ms: f64) -> f64 {
        self.paused_at.unwrap_or(now_ms) - self.origin_ms
    }

    /// Wait before the next frame is due, clamped at zero. `None` on the last frame.
    pub fn delay_to_next(&self, now_ms: f64) -> Option<f64> {
        let next = self.offsets.get(self.index + 1)?;
        Some((next - self.elapsed(now_ms)).max(0.0))
    }

    /// Step to the next frame if there is one; returns the new index.
    pub fn advance(&mut self) -> Option<usize> {
        if self.is_last() {
            return None;
        }
        self.index += 1;
        Some(self.index)
    }

    pub fn is_paused(&self) -> bool {
        self.paused_at.is_some()
    }

    pub fn pause(&mut self, now_ms: f64) {
        if self.paused_at.is_none() {
            self.paused_at = Some(now_ms);
        }
    }

    /// Rebase the start forward by the paused duration.
    pub fn resume(&mut self, now_ms: f64) {
        if let Some(at) = self.paused_at.take() {
            self.origin_ms += now_ms - at;
        }
    }

    /// Jump to `index` (clamped) and rebase so the schedule continues from there.
    pub fn jump(&mut self, index: usize, now_ms: f64) -> usize {
        let Some(last) = self.offsets.len().checked_sub(1) else {
            return 0;
        };
        self.index = index.min(last);
        let now = self.paused_at.unwrap_or(now_ms);
        self.origin_ms = now - self.offsets[self.index];
        self.index
    }

    /// Index of the last frame whose offset is at or before `offset_ms`.
    pub fn index_at(&self, offset_ms: f64) -> usize {
        self.offsets
            .partition_point(|&o| o <= offset_ms)
            .saturating_sub(1)
    }

    /// `offset[index] / offset[last]`; a zero-length sequence reports 1 on its last frame.
    pub fn progress(&self) -> f32 {
        let Some(&total) = self.offsets.last() else {
            return 0.0;
        };
        if total <= 0.0 {
            return if self.is_last() { 1.0 } else { 0.0 };
        }
        (self.offsets[self.index] / total).clamp(0.0, 1.0) as f32
    }
}
