//! Wire format of an animation payload as returned by the generation service.
//!
//! These structs mirror the JSON one-to-one. Pose values stay as raw JSON here;
//! [`crate::data::Animation::from_payload`] normalizes them.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::AnimatorError;

fn default_color() -> String {
    "#000000".to_string()
}

fn default_scale() -> f32 {
    1.0
}

fn default_visible() -> bool {
    true
}

/// Top-level payload.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct AnimationPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub characters: Vec<CharacterSpec>,
    #[serde(default)]
    pub props: Vec<PropSpec>,
    /// Present only for pre-computed frame sequences; selects discrete playback.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_fps: Option<f64>,
    #[serde(default)]
    pub keyframes: Vec<KeyframeSpec>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CharacterSpec {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default = "default_color")]
    pub color: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PropSpec {
    pub id: String,
    /// `"circle"` or `"path"`; inferred from `radius`/`svg_data` when absent.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub radius: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub svg_data: Option<String>,
    #[serde(default = "default_color")]
    pub color: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct KeyframeSpec {
    #[serde(alias = "timestamp")]
    pub timestamp_ms: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Easing for the segment arriving at this keyframe (`"linear"`, `"power2.inOut"`, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ease: Option<String>,
    /// Character id -> raw pose object (`{"joints": ..}` or `{"pose": ..}`).
    #[serde(default)]
    pub characters: IndexMap<String, JsonValue>,
    #[serde(default)]
    pub props: IndexMap<String, PropStateSpec>,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct PropStateSpec {
    #[serde(default)]
    pub x: f32,
    #[serde(default)]
    pub y: f32,
    #[serde(default)]
    pub rotation: f32,
    #[serde(default = "default_scale")]
    pub scale: f32,
    #[serde(default = "default_visible")]
    pub visible: bool,
}

/// Parse payload JSON. Type errors (a string timestamp, a keyframe list that is not
/// an array...) surface as [`AnimatorError::InvalidPayload`].
pub fn parse_payload_json(s: &str) -> Result<AnimationPayload, AnimatorError> {
    Ok(serde_json::from_str(s)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_payload_parses_with_defaults() {
        let p = parse_payload_json(
            r#"{
                "characters": [{"id": "alice"}],
                "keyframes": [{"timestamp": 0, "characters": {"alice": {"joints": {}}}}]
            }"#,
        )
        .unwrap();
        assert_eq!(p.characters[0].color, "#000000");
        assert_eq!(p.keyframes[0].timestamp_ms, 0.0);
        assert!(p.props.is_empty());
        assert!(p.target_fps.is_none());
    }

    #[test]
    fn prop_state_defaults() {
        let s: PropStateSpec = serde_json::from_str(r#"{"x": 5}"#).unwrap();
        assert_eq!(s.x, 5.0);
        assert_eq!(s.scale, 1.0);
        assert!(s.visible);
    }

    #[test]
    fn wrong_types_are_invalid_payload() {
        let err = parse_payload_json(r#"{"keyframes": {"a": 1}}"#).unwrap_err();
        assert_eq!(err.category(), "payload");
    }

    #[test]
    fn character_order_is_preserved() {
        let p = parse_payload_json(
            r#"{"keyframes": [{"timestamp_ms": 1, "characters": {"z": {}, "a": {}, "m": {}}}]}"#,
        )
        .unwrap();
        let ids: Vec<_> = p.keyframes[0].characters.keys().cloned().collect();
        assert_eq!(ids, ["z", "a", "m"]);
    }
}
