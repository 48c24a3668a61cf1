//! Pose blending.
//!
//! Rules, applied per joint (position format) or per part (segment format):
//! - present in both poses: component-wise linear blend at the eased fraction;
//! - present only in `to`: seeded with `to`'s value, never blended from the origin;
//! - present only in `from`: left out of the result.
//!
//! All functions are pure; inputs are never mutated.

use crate::data::PropState;
use crate::interp::Easing;
use crate::pose::{Circle, JointMap, Part, PartMap, PartShape, Point, PoseVariant, Segment};

/// Linear interpolation that returns the endpoints exactly at t <= 0 and t >= 1.
#[inline]
pub fn lerp_f32(a: f32, b: f32, t: f32) -> f32 {
    if t <= 0.0 {
        a
    } else if t >= 1.0 {
        b
    } else {
        a + (b - a) * t
    }
}

#[inline]
fn lerp_point(a: Point, b: Point, t: f32) -> Point {
    Point {
        x: lerp_f32(a.x, b.x, t),
        y: lerp_f32(a.y, b.y, t),
    }
}

fn lerp_part(a: &Part, b: &Part, t: f32) -> Part {
    let shape = match (a.shape, b.shape) {
        (PartShape::Line(sa), PartShape::Line(sb)) => PartShape::Line(Segment {
            x1: lerp_f32(sa.x1, sb.x1, t),
            y1: lerp_f32(sa.y1, sb.y1, t),
            x2: lerp_f32(sa.x2, sb.x2, t),
            y2: lerp_f32(sa.y2, sb.y2, t),
        }),
        (PartShape::Circle(ca), PartShape::Circle(cb)) => PartShape::Circle(Circle {
            cx: lerp_f32(ca.cx, cb.cx, t),
            cy: lerp_f32(ca.cy, cb.cy, t),
            r: lerp_f32(ca.r, cb.r, t),
        }),
        // Shape changed between keyframes: no meaningful blend, snap to the target.
        (_, target) => target,
    };
    let stroke_width = match (a.stroke_width, b.stroke_width) {
        (Some(wa), Some(wb)) => Some(lerp_f32(wa, wb, t)),
        (_, wb) => wb,
    };
    Part {
        shape,
        stroke_width,
    }
}

fn blend_joints(from: &JointMap, to: &JointMap, t: f32) -> JointMap {
    to.iter()
        .map(|(name, target)| {
            let value = match from.get(name) {
                Some(start) => lerp_point(*start, *target, t),
                None => *target,
            };
            (name.clone(), value)
        })
        .collect()
}

fn blend_parts(from: &PartMap, to: &PartMap, t: f32) -> PartMap {
    to.iter()
        .map(|(name, target)| {
            let value = match from.get(name) {
                Some(start) => lerp_part(start, target, t),
                None => *target,
            };
            (name.clone(), value)
        })
        .collect()
}

/// Blend two poses at progress `t` (clamped to [0,1]) after applying `ease`.
///
/// Poses of different formats do not blend; the result is `to`.
pub fn blend(from: &PoseVariant, to: &PoseVariant, t: f32, ease: Easing) -> PoseVariant {
    let t = ease.apply(t);
    match (from, to) {
        (PoseVariant::Joints(a), PoseVariant::Joints(b)) => {
            PoseVariant::Joints(blend_joints(a, b, t))
        }
        (PoseVariant::Segments(a), PoseVariant::Segments(b)) => {
            PoseVariant::Segments(blend_parts(a, b, t))
        }
        _ => to.clone(),
    }
}

/// Character-level resolution between two keyframes that may not both carry a pose.
///
/// Only `to`: seeded with `to`. Only `from`: held.
pub fn blend_optional(
    from: Option<&PoseVariant>,
    to: Option<&PoseVariant>,
    t: f32,
    ease: Easing,
) -> Option<PoseVariant> {
    match (from, to) {
        (Some(a), Some(b)) => Some(blend(a, b, t, ease)),
        (None, Some(b)) => Some(b.clone()),
        (Some(a), None) => Some(a.clone()),
        (None, None) => None,
    }
}

/// Blend prop transforms. Visibility holds the left value until the segment completes.
pub fn blend_prop(from: &PropState, to: &PropState, t: f32, ease: Easing) -> PropState {
    let t = ease.apply(t);
    PropState {
        x: lerp_f32(from.x, to.x, t),
        y: lerp_f32(from.y, to.y, t),
        rotation: lerp_f32(from.rotation, to.rotation, t),
        scale: lerp_f32(from.scale, to.scale, t),
        visible: if t >= 1.0 { to.visible } else { from.visible },
    }
}
