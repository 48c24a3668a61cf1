//! Normalized, immutable animation model built once per `load`.

use indexmap::IndexMap;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::clock::StrategyKind;
use crate::config::Config;
use crate::error::AnimatorError;
use crate::ids::{CharacterId, PropId};
use crate::interp::Easing;
use crate::payload::{AnimationPayload, PropSpec};
use crate::pose::{self, PoseFormat, PoseVariant};

const DEFAULT_PROP_RADIUS: f32 = 10.0;

/// A declared character. `format` is the single pose format its timeline uses.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Character {
    pub id: CharacterId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub color: String,
    pub format: PoseFormat,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PropShape {
    Circle { radius: f32 },
    Path { data: String },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Prop {
    pub id: PropId,
    pub shape: PropShape,
    pub color: String,
}

/// Transform of a prop at one instant.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PropState {
    pub x: f32,
    pub y: f32,
    /// Degrees.
    pub rotation: f32,
    pub scale: f32,
    pub visible: bool,
}

impl Default for PropState {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            rotation: 0.0,
            scale: 1.0,
            visible: true,
        }
    }
}

/// One timestamped keyframe with normalized poses.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Keyframe {
    pub timestamp_ms: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    pub poses: IndexMap<CharacterId, PoseVariant>,
    #[serde(default)]
    pub props: IndexMap<PropId, PropState>,
    /// Curve for the segment that ends at this keyframe; `None` uses the configured default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ease: Option<Easing>,
}

/// A loaded animation. Keyframes are sorted by timestamp (stable).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Animation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub characters: Vec<Character>,
    pub props: Vec<Prop>,
    pub keyframes: Vec<Keyframe>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_fps: Option<f64>,
    /// Poses skipped at load for carrying neither `joints` nor `pose`.
    #[serde(default)]
    pub skipped_poses: usize,
}

impl Animation {
    /// Validate and normalize a payload.
    pub fn from_payload(payload: AnimationPayload, cfg: &Config) -> Result<Self, AnimatorError> {
        if payload.keyframes.is_empty() {
            return Err(AnimatorError::invalid("payload has no keyframes"));
        }
        if payload.characters.is_empty() {
            return Err(AnimatorError::invalid("payload declares no characters"));
        }
        if let Some(fps) = payload.target_fps {
            if !fps.is_finite() || fps <= 0.0 {
                return Err(AnimatorError::invalid(format!(
                    "target_fps must be a positive number, got {fps}"
                )));
            }
        }

        // Declared characters in payload order; format is fixed by the first pose seen.
        let mut declared: IndexMap<CharacterId, (Option<String>, String, Option<PoseFormat>)> =
            IndexMap::with_capacity(payload.characters.len());
        for c in payload.characters {
            let id = CharacterId(c.id);
            if declared.contains_key(&id) {
                warn!("duplicate character id '{id}', keeping the first declaration");
                continue;
            }
            declared.insert(id, (c.name, c.color, None));
        }

        let props = payload
            .props
            .into_iter()
            .map(build_prop)
            .collect::<Result<Vec<_>, _>>()?;

        let mut keyframes = Vec::with_capacity(payload.keyframes.len());
        let mut skipped_poses = 0usize;
        let mut usable = false;

        for (index, kf) in payload.keyframes.into_iter().enumerate() {
            if !kf.timestamp_ms.is_finite() || kf.timestamp_ms < 0.0 {
                return Err(AnimatorError::invalid(format!(
                    "keyframe {index} has invalid timestamp {}",
                    kf.timestamp_ms
                )));
            }

            let mut poses = IndexMap::with_capacity(kf.characters.len());
            for (raw_id, raw_pose) in &kf.characters {
                let id = CharacterId(raw_id.clone());
                let Some(entry) = declared.get_mut(&id) else {
                    warn!("keyframe {index}: pose for undeclared character '{id}' ignored");
                    continue;
                };
                let pose = match pose::normalize(raw_pose, &cfg.skeleton) {
                    Ok(p) => p,
                    Err(AnimatorError::UnknownPoseFormat) => {
                        warn!("keyframe {index}: character '{id}' has no `joints` or `pose`; skipped");
                        skipped_poses += 1;
                        continue;
                    }
                    Err(e) => return Err(e),
                };
                match entry.2 {
                    Some(fmt) if fmt != pose.format() => {
                        return Err(AnimatorError::invalid(format!(
                            "character '{id}' mixes pose formats ({fmt:?} then {:?} at keyframe {index})",
                            pose.format()
                        )));
                    }
                    Some(_) => {}
                    None => entry.2 = Some(pose.format()),
                }
                usable |= !pose.is_empty();
                poses.insert(id, pose);
            }

            let mut prop_states = IndexMap::with_capacity(kf.props.len());
            for (raw_id, s) in kf.props {
                let id = PropId(raw_id);
                if !props.iter().any(|p| p.id == id) {
                    warn!("keyframe {index}: state for undeclared prop '{id}' ignored");
                    continue;
                }
                prop_states.insert(
                    id,
                    PropState {
                        x: s.x,
                        y: s.y,
                        rotation: s.rotation,
                        scale: s.scale,
                        visible: s.visible,
                    },
                );
            }

            let ease = kf.ease.as_deref().and_then(|name| {
                let curve = Easing::from_name(name);
                if curve.is_none() {
                    warn!("keyframe {index}: unknown ease '{name}', using the default curve");
                }
                curve
            });

            keyframes.push(Keyframe {
                timestamp_ms: kf.timestamp_ms,
                text: kf.text,
                poses,
                props: prop_states,
                ease,
            });
        }

        if !usable {
            return Err(AnimatorError::invalid("no keyframe carries a usable pose"));
        }

        if keyframes
            .windows(2)
            .any(|w| w[1].timestamp_ms < w[0].timestamp_ms)
        {
            debug!("keyframes out of order; sorting by timestamp");
            keyframes.sort_by(|a, b| a.timestamp_ms.total_cmp(&b.timestamp_ms));
        }

        let characters = declared
            .into_iter()
            .filter_map(|(id, (name, color, format))| match format {
                Some(format) => Some(Character {
                    id,
                    name,
                    color,
                    format,
                }),
                None => {
                    debug!("character '{id}' never posed; no render target");
                    None
                }
            })
            .collect();

        Ok(Self {
            title: payload.title,
            description: payload.description,
            characters,
            props,
            keyframes,
            target_fps: payload.target_fps,
            skipped_poses,
        })
    }

    pub fn strategy_kind(&self) -> StrategyKind {
        if self.target_fps.is_some() {
            StrategyKind::Discrete
        } else {
            StrategyKind::Continuous
        }
    }

    /// Timeline length: the last keyframe's timestamp (time runs from 0).
    pub fn duration_ms(&self) -> f64 {
        self.keyframes.last().map_or(0.0, |k| k.timestamp_ms)
    }

    /// Per-frame offsets from the first frame's timestamp (discrete schedule).
    pub fn frame_offsets(&self) -> Vec<f64> {
        let first = self.keyframes.first().map_or(0.0, |k| k.timestamp_ms);
        self.keyframes
            .iter()
            .map(|k| k.timestamp_ms - first)
            .collect()
    }

    pub fn character(&self, id: &CharacterId) -> Option<&Character> {
        self.characters.iter().find(|c| &c.id == id)
    }
}

fn build_prop(decl: PropSpec) -> Result<Prop, AnimatorError> {
    let is_path = match decl.kind.as_deref() {
        Some("path") | Some("svg") => true,
        Some("circle") => false,
        Some(other) => {
            warn!("prop '{}': unknown type '{other}', inferring from fields", decl.id);
            decl.svg_data.is_some()
        }
        None => decl.svg_data.is_some(),
    };
    let shape = if is_path {
        let data = decl.svg_data.ok_or_else(|| {
            AnimatorError::invalid(format!("prop '{}' is a path without svg_data", decl.id))
        })?;
        PropShape::Path { data }
    } else {
        PropShape::Circle {
            radius: decl.radius.unwrap_or(DEFAULT_PROP_RADIUS),
        }
    };
    Ok(Prop {
        id: PropId(decl.id),
        shape,
        color: decl.color,
    })
}
