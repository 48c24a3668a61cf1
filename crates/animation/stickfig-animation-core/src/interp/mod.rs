//! Interpolation: easing curves and pose/prop blending.

pub mod blend;
pub mod easing;

pub use blend::{blend, blend_optional, blend_prop, lerp_f32};
pub use easing::Easing;
