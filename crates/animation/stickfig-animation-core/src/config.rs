//! Core configuration for stickfig-animation-core.

use serde::{Deserialize, Serialize};

use crate::error::AnimatorError;
use crate::interp::Easing;

/// Engine configuration. Every field has a default, so partial JSON is accepted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Gap between `restart()` and playback starting again, in milliseconds.
    /// Gives the host time to finish tearing down the previous run.
    pub settle_delay_ms: f64,

    /// Curve used for every continuous segment that does not name its own.
    pub default_easing: Easing,

    /// Sampling rate for `export_frames` when the caller passes no rate and the
    /// animation is continuous.
    pub export_fps: f32,

    /// Bone lengths used to resolve angle (6-DOF) poses into segments.
    pub skeleton: SkeletonConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            settle_delay_ms: 50.0,
            default_easing: Easing::QuadInOut,
            export_fps: 30.0,
            skeleton: SkeletonConfig::default(),
        }
    }
}

impl Config {
    /// Parse a JSON config; absent fields keep their defaults.
    pub fn from_json(s: &str) -> Result<Self, AnimatorError> {
        let cfg: Config = serde_json::from_str(s)?;
        if !cfg.settle_delay_ms.is_finite() || cfg.settle_delay_ms < 0.0 {
            return Err(AnimatorError::invalid(
                "config.settle_delay_ms must be finite and >= 0",
            ));
        }
        if !cfg.export_fps.is_finite() || cfg.export_fps <= 0.0 {
            return Err(AnimatorError::invalid("config.export_fps must be > 0"));
        }
        Ok(cfg)
    }
}

/// Proportions of the 6-DOF stick figure, in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkeletonConfig {
    pub head_radius: f32,
    pub body_length: f32,
    pub arm_length: f32,
    pub leg_length: f32,
    /// Distance from the chest line to each shoulder.
    pub shoulder_offset: f32,
    /// Distance from the waist to each hip.
    pub hip_offset: f32,
}

impl Default for SkeletonConfig {
    fn default() -> Self {
        Self {
            head_radius: 20.0,
            body_length: 60.0,
            arm_length: 40.0,
            leg_length: 50.0,
            shoulder_offset: 20.0,
            hip_offset: 10.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg = Config::from_json(r#"{"settle_delay_ms": 120, "skeleton": {"arm_length": 55}}"#)
            .unwrap();
        assert_eq!(cfg.settle_delay_ms, 120.0);
        assert_eq!(cfg.skeleton.arm_length, 55.0);
        assert_eq!(cfg.skeleton.leg_length, 50.0);
        assert_eq!(cfg.default_easing, Easing::QuadInOut);
    }

    #[test]
    fn rejects_negative_settle_delay() {
        assert!(Config::from_json(r#"{"settle_delay_ms": -1}"#).is_err());
        assert!(Config::from_json(r#"{"export_fps": 0}"#).is_err());
    }
}
