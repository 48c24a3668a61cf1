//! Pose model: normalizes the two wire pose shapes into one tagged representation.
//!
//! - `{"joints": {name: {x, y}}}` is the position format (up to 16 named joints).
//! - `{"pose": {part: {x1,y1,x2,y2} | {cx,cy,r}}}` is the segment format.
//! - `{"pose": {head_x, head_y, body_angle, ...}}` is the 6-DOF angle format; it is
//!   resolved into segment parts here, once, so nothing downstream sees angles.
//!
//! Format detection happens exactly once per pose. Everything after load matches
//! on [`PoseVariant`] instead of probing fields.

use indexmap::IndexMap;
use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::config::SkeletonConfig;
use crate::error::AnimatorError;

/// Joint names of the position topology.
pub const JOINT_NAMES: [&str; 16] = [
    "head",
    "neck",
    "chest",
    "waist",
    "left_shoulder",
    "left_elbow",
    "left_hand",
    "right_shoulder",
    "right_elbow",
    "right_hand",
    "left_hip",
    "left_knee",
    "left_foot",
    "right_hip",
    "right_knee",
    "right_foot",
];

/// Bones of the full position topology, drawn as lines between joint pairs.
pub const JOINT_BONES: [(&str, &str); 15] = [
    ("head", "neck"),
    ("neck", "chest"),
    ("chest", "waist"),
    ("chest", "left_shoulder"),
    ("left_shoulder", "left_elbow"),
    ("left_elbow", "left_hand"),
    ("chest", "right_shoulder"),
    ("right_shoulder", "right_elbow"),
    ("right_elbow", "right_hand"),
    ("waist", "left_hip"),
    ("left_hip", "left_knee"),
    ("left_knee", "left_foot"),
    ("waist", "right_hip"),
    ("right_hip", "right_knee"),
    ("right_knee", "right_foot"),
];

/// Part names of the segment topology. `head` is a circle, the rest are lines.
pub const PART_NAMES: [&str; 6] = [
    "head",
    "body",
    "left_arm",
    "right_arm",
    "left_leg",
    "right_leg",
];

struct Chain {
    /// First present joint becomes the root of the chain.
    anchors: &'static [&'static str],
    links: &'static [&'static str],
}

const CHAINS: [Chain; 5] = [
    Chain {
        anchors: &[],
        links: &["head", "neck", "chest", "waist"],
    },
    Chain {
        anchors: &["chest", "neck"],
        links: &["left_shoulder", "left_elbow", "left_hand"],
    },
    Chain {
        anchors: &["chest", "neck"],
        links: &["right_shoulder", "right_elbow", "right_hand"],
    },
    Chain {
        anchors: &["waist"],
        links: &["left_hip", "left_knee", "left_foot"],
    },
    Chain {
        anchors: &["waist"],
        links: &["right_hip", "right_knee", "right_foot"],
    },
];

/// 2D point in canvas pixels.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

/// Line segment in canvas pixels.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Circle {
    pub cx: f32,
    pub cy: f32,
    pub r: f32,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PartShape {
    Line(Segment),
    Circle(Circle),
}

/// One drawable body part of a segment-format pose.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Part {
    #[serde(flatten)]
    pub shape: PartShape,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke_width: Option<f32>,
}

pub type JointMap = IndexMap<String, Point>;
pub type PartMap = IndexMap<String, Part>;

/// Which of the two topologies a pose (or a whole character timeline) uses.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoseFormat {
    Joints,
    Segments,
}

/// A normalized pose. Serializes back to the wire shape (`{"joints": ..}` / `{"pose": ..}`).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum PoseVariant {
    #[serde(rename = "joints")]
    Joints(JointMap),
    #[serde(rename = "pose")]
    Segments(PartMap),
}

impl PoseVariant {
    pub fn format(&self) -> PoseFormat {
        match self {
            Self::Joints(_) => PoseFormat::Joints,
            Self::Segments(_) => PoseFormat::Segments,
        }
    }

    /// Number of joints or parts carried.
    pub fn len(&self) -> usize {
        match self {
            Self::Joints(j) => j.len(),
            Self::Segments(p) => p.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn joint(&self, name: &str) -> Option<Point> {
        match self {
            Self::Joints(j) => j.get(name).copied(),
            Self::Segments(_) => None,
        }
    }

    pub fn part(&self, name: &str) -> Option<Part> {
        match self {
            Self::Segments(p) => p.get(name).copied(),
            Self::Joints(_) => None,
        }
    }
}

/// Fields that mark a `pose` object as the 6-DOF angle form.
const ANGLE_KEYS: [&str; 7] = [
    "head_x",
    "head_y",
    "body_angle",
    "left_arm_angle",
    "right_arm_angle",
    "left_leg_angle",
    "right_leg_angle",
];

/// 6-DOF angle pose (degrees). Absent fields take the standing pose.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnglePose {
    pub head_x: f32,
    pub head_y: f32,
    pub body_angle: f32,
    pub left_arm_angle: f32,
    pub right_arm_angle: f32,
    pub left_leg_angle: f32,
    pub right_leg_angle: f32,
}

impl Default for AnglePose {
    fn default() -> Self {
        Self {
            head_x: 400.0,
            head_y: 300.0,
            body_angle: 0.0,
            left_arm_angle: -45.0,
            right_arm_angle: 45.0,
            left_leg_angle: -10.0,
            right_leg_angle: 10.0,
        }
    }
}

impl AnglePose {
    /// Forward kinematics: lay the limbs out from the head down.
    ///
    /// Body and legs measure angles from vertical, arms from horizontal.
    pub fn to_parts(&self, sk: &SkeletonConfig) -> PartMap {
        let body = self.body_angle.to_radians();
        let (bs, bc) = body.sin_cos();
        let at = |o: Point, dx: f32, dy: f32| Point {
            x: o.x + dx,
            y: o.y + dy,
        };

        let neck = Point {
            x: self.head_x,
            y: self.head_y + sk.head_radius,
        };
        let chest = at(neck, bs * sk.body_length * 0.33, bc * sk.body_length * 0.33);
        let waist = at(neck, bs * sk.body_length, bc * sk.body_length);

        let left_shoulder = at(chest, -bc * sk.shoulder_offset, bs * sk.shoulder_offset);
        let right_shoulder = at(chest, bc * sk.shoulder_offset, -bs * sk.shoulder_offset);
        let left_hip = at(waist, -bc * sk.hip_offset, bs * sk.hip_offset);
        let right_hip = at(waist, bc * sk.hip_offset, -bs * sk.hip_offset);

        let arm = |from: Point, deg: f32| {
            let (s, c) = deg.to_radians().sin_cos();
            at(from, c * sk.arm_length, s * sk.arm_length)
        };
        let leg = |from: Point, deg: f32| {
            let (s, c) = deg.to_radians().sin_cos();
            at(from, s * sk.leg_length, c * sk.leg_length)
        };

        let line = |a: Point, b: Point| Part {
            shape: PartShape::Line(Segment {
                x1: a.x,
                y1: a.y,
                x2: b.x,
                y2: b.y,
            }),
            stroke_width: None,
        };

        let mut parts = PartMap::with_capacity(PART_NAMES.len());
        parts.insert(
            "head".into(),
            Part {
                shape: PartShape::Circle(Circle {
                    cx: self.head_x,
                    cy: self.head_y,
                    r: sk.head_radius,
                }),
                stroke_width: None,
            },
        );
        parts.insert("body".into(), line(neck, waist));
        parts.insert(
            "left_arm".into(),
            line(left_shoulder, arm(left_shoulder, self.left_arm_angle)),
        );
        parts.insert(
            "right_arm".into(),
            line(right_shoulder, arm(right_shoulder, self.right_arm_angle)),
        );
        parts.insert(
            "left_leg".into(),
            line(left_hip, leg(left_hip, self.left_leg_angle)),
        );
        parts.insert(
            "right_leg".into(),
            line(right_hip, leg(right_hip, self.right_leg_angle)),
        );
        parts
    }
}

/// Normalize one raw character pose.
///
/// Errors:
/// - [`AnimatorError::UnknownPoseFormat`] when neither `joints` nor `pose` is present
///   (callers skip the pose).
/// - [`AnimatorError::InvalidPayload`] when the field is present but not an object.
///
/// Individual joints/parts that are not well-formed are dropped with a warning.
pub fn normalize(
    raw: &JsonValue,
    skeleton: &SkeletonConfig,
) -> Result<PoseVariant, AnimatorError> {
    let Some(obj) = raw.as_object() else {
        return Err(AnimatorError::UnknownPoseFormat);
    };

    if let Some(joints) = obj.get("joints") {
        let map = joints
            .as_object()
            .ok_or_else(|| AnimatorError::invalid("`joints` must be an object of {x, y} points"))?;
        return Ok(PoseVariant::Joints(parse_joints(map)));
    }

    if let Some(pose) = obj.get("pose") {
        let map = pose
            .as_object()
            .ok_or_else(|| AnimatorError::invalid("`pose` must be an object"))?;
        if ANGLE_KEYS.iter().any(|k| map.contains_key(*k)) {
            return Ok(PoseVariant::Segments(parse_angles(map).to_parts(skeleton)));
        }
        return Ok(PoseVariant::Segments(parse_parts(map)));
    }

    Err(AnimatorError::UnknownPoseFormat)
}

/// Bones to draw for a (possibly partial) joint map.
///
/// Follows [`JOINT_BONES`] but bridges gaps: a 12-joint skeleton without elbows
/// and knees still gets shoulder→hand and hip→foot, and arms hang from the neck
/// when there is no chest.
pub fn connected_bones(joints: &JointMap) -> Vec<(&'static str, &'static str)> {
    let mut bones = Vec::with_capacity(JOINT_BONES.len());
    for chain in &CHAINS {
        let mut prev = chain
            .anchors
            .iter()
            .copied()
            .find(|a| joints.contains_key(*a));
        for &link in chain.links {
            if !joints.contains_key(link) {
                continue;
            }
            if let Some(p) = prev {
                bones.push((p, link));
            }
            prev = Some(link);
        }
    }
    bones
}

fn num(obj: &Map<String, JsonValue>, key: &str) -> Option<f32> {
    obj.get(key)
        .and_then(JsonValue::as_f64)
        .filter(|v| v.is_finite())
        .map(|v| v as f32)
}

fn parse_joints(map: &Map<String, JsonValue>) -> JointMap {
    let mut out = JointMap::with_capacity(map.len());
    for (name, value) in map {
        let point = value.as_object().and_then(|p| {
            Some(Point {
                x: num(p, "x")?,
                y: num(p, "y")?,
            })
        });
        match point {
            Some(p) => {
                out.insert(name.clone(), p);
            }
            None => warn!("skipping joint '{name}': expected {{x, y}} numbers"),
        }
    }
    out
}

fn parse_parts(map: &Map<String, JsonValue>) -> PartMap {
    let mut out = PartMap::with_capacity(map.len());
    for (name, value) in map {
        match value.as_object().and_then(parse_part) {
            Some(part) => {
                out.insert(name.clone(), part);
            }
            None => warn!("skipping part '{name}': expected a line or circle"),
        }
    }
    out
}

/// Read the angle fields that are well-formed; the rest keep the standing pose.
fn parse_angles(map: &Map<String, JsonValue>) -> AnglePose {
    let mut pose = AnglePose::default();
    let fields: [(&str, &mut f32); 7] = [
        ("head_x", &mut pose.head_x),
        ("head_y", &mut pose.head_y),
        ("body_angle", &mut pose.body_angle),
        ("left_arm_angle", &mut pose.left_arm_angle),
        ("right_arm_angle", &mut pose.right_arm_angle),
        ("left_leg_angle", &mut pose.left_leg_angle),
        ("right_leg_angle", &mut pose.right_leg_angle),
    ];
    for (key, slot) in fields {
        if !map.contains_key(key) {
            continue;
        }
        match num(map, key) {
            Some(v) => *slot = v,
            None => warn!("angle field '{key}' is not a number; using {}", *slot),
        }
    }
    pose
}

fn parse_segment(p: &Map<String, JsonValue>) -> Option<Segment> {
    Some(Segment {
        x1: num(p, "x1")?,
        y1: num(p, "y1")?,
        x2: num(p, "x2")?,
        y2: num(p, "y2")?,
    })
}

fn parse_part(p: &Map<String, JsonValue>) -> Option<Part> {
    let stroke_width = num(p, "stroke_width")
        .or_else(|| num(p, "stroke-width"))
        .or_else(|| num(p, "strokeWidth"))
        .or_else(|| num(p, "width"));

    if let Some(seg) = parse_segment(p) {
        return Some(Part {
            shape: PartShape::Line(seg),
            stroke_width,
        });
    }

    let (cx, cy) = (num(p, "cx")?, num(p, "cy")?);
    Some(Part {
        shape: PartShape::Circle(Circle {
            cx,
            cy,
            r: num(p, "r").unwrap_or(SkeletonConfig::default().head_radius),
        }),
        stroke_width,
    })
}
