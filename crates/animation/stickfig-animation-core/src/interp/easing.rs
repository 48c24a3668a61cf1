//! Easing curves applied to segment progress before blending.

use serde::{Deserialize, Serialize};

/// Timing curve mapping linear progress in [0,1] to eased progress.
///
/// Every curve maps 0 to 0 and 1 to 1.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Easing {
    Linear,
    QuadIn,
    QuadOut,
    /// Accelerate through the first half, decelerate through the second.
    #[default]
    QuadInOut,
    CubicInOut,
    SineInOut,
    /// Hold the start value until the segment completes.
    Step,
    /// CSS-style cubic-bezier timing with control points (x1, y1, x2, y2).
    CubicBezier([f32; 4]),
}

impl Easing {
    /// Apply the curve to `t`, clamping the input into [0,1] first.
    pub fn apply(self, t: f32) -> f32 {
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        match self {
            Self::Linear => t,
            Self::QuadIn => t * t,
            Self::QuadOut => 1.0 - (1.0 - t) * (1.0 - t),
            Self::QuadInOut => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    let u = -2.0 * t + 2.0;
                    1.0 - u * u / 2.0
                }
            }
            Self::CubicInOut => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    let u = -2.0 * t + 2.0;
                    1.0 - u * u * u / 2.0
                }
            }
            Self::SineInOut => -((std::f32::consts::PI * t).cos() - 1.0) / 2.0,
            Self::Step => {
                if t >= 1.0 {
                    1.0
                } else {
                    0.0
                }
            }
            Self::CubicBezier([x1, y1, x2, y2]) => bezier_ease(t, x1, y1, x2, y2),
        }
    }

    /// Look up a curve by the names payloads use (`"linear"`, `"power2.inOut"`,
    /// `"ease_in_out"`, ...). Unknown names yield `None`.
    pub fn from_name(name: &str) -> Option<Self> {
        let key = name.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        let curve = match key.as_str() {
            "linear" | "none" | "power0" | "power0.none" => Self::Linear,
            "quad_in" | "ease_in" | "power1.in" | "power2.in" => Self::QuadIn,
            "quad_out" | "ease_out" | "power1.out" | "power2.out" => Self::QuadOut,
            "quad_in_out" | "ease_in_out" | "power1.inout" | "power2.inout" => Self::QuadInOut,
            "cubic_in_out" | "power3.inout" => Self::CubicInOut,
            "sine_in_out" | "sine.inout" => Self::SineInOut,
            "step" | "steps" | "hold" => Self::Step,
            _ => return None,
        };
        Some(curve)
    }
}

#[inline]
fn cubic_bezier(p0: f32, p1: f32, p2: f32, p3: f32, t: f32) -> f32 {
    let u = 1.0 - t;
    u * u * u * p0 + 3.0 * u * u * t * p1 + 3.0 * u * t * t * p2 + t * t * t * p3
}

/// Invert the x polynomial by bisection, then evaluate y.
fn bezier_ease(t: f32, x1: f32, y1: f32, x2: f32, y2: f32) -> f32 {
    if x1 == 0.0 && y1 == 0.0 && x2 == 1.0 && y2 == 1.0 {
        return t;
    }
    if t <= 0.0 {
        return 0.0;
    }
    if t >= 1.0 {
        return 1.0;
    }
    let mut lo = 0.0f32;
    let mut hi = 1.0f32;
    let mut mid = t;
    for _ in 0..24 {
        let x = cubic_bezier(0.0, x1, x2, 1.0, mid);
        if (x - t).abs() < 1e-6 {
            break;
        }
        if x < t {
            lo = mid;
        } else {
            hi = mid;
        }
        mid = 0.5 * (lo + hi);
    }
    cubic_bezier(0.0, y1, y2, 1.0, mid)
}
