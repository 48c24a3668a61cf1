//! Render sink interface and an in-memory recording implementation.

use hashbrown::HashMap;
use indexmap::IndexMap;

use crate::data::{Character, Prop, PropState};
use crate::ids::{CharacterId, HandleAllocator, PropId, RenderHandle};
use crate::pose::{Circle, JointMap, Part, PartMap, PartShape, Point, Segment};

/// Where resolved poses go. Implementations own the visual elements; the engine
/// only keeps the handles they return.
///
/// Calls for one frame arrive in payload order (characters, then props, then text).
pub trait RenderSink {
    /// Create the visuals for a character. `character.format` tells which setters follow.
    fn create_character(&mut self, character: &Character) -> RenderHandle;
    fn create_prop(&mut self, prop: &Prop) -> RenderHandle;
    fn set_joint_position(&mut self, handle: RenderHandle, joint: &str, x: f32, y: f32);
    fn set_segment(
        &mut self,
        handle: RenderHandle,
        part: &str,
        segment: Segment,
        stroke_width: Option<f32>,
    );
    fn set_circle(
        &mut self,
        handle: RenderHandle,
        part: &str,
        circle: Circle,
        stroke_width: Option<f32>,
    );
    fn set_prop_transform(&mut self, handle: RenderHandle, transform: PropState);
    fn set_narration_text(&mut self, text: &str);
    /// Remove every element and the narration text. Handles become invalid.
    fn clear(&mut self);
}

/// One recorded sink call.
#[derive(Clone, Debug, PartialEq)]
pub enum SinkCall {
    CreateCharacter {
        id: CharacterId,
        handle: RenderHandle,
    },
    CreateProp {
        id: PropId,
        handle: RenderHandle,
    },
    Joint {
        handle: RenderHandle,
        joint: String,
        point: Point,
    },
    Segment {
        handle: RenderHandle,
        part: String,
        segment: Segment,
        stroke_width: Option<f32>,
    },
    Circle {
        handle: RenderHandle,
        part: String,
        circle: Circle,
        stroke_width: Option<f32>,
    },
    PropTransform {
        handle: RenderHandle,
        transform: PropState,
    },
    Narration(String),
    Clear,
}

/// Sink that records every call and keeps the latest drawn state.
/// Used by tests and for headless export.
#[derive(Debug, Default)]
pub struct RecordingSink {
    handles: HandleAllocator,
    calls: Vec<SinkCall>,
    characters: IndexMap<CharacterId, RenderHandle>,
    props: IndexMap<PropId, RenderHandle>,
    joints: HashMap<RenderHandle, JointMap>,
    parts: HashMap<RenderHandle, PartMap>,
    transforms: HashMap<RenderHandle, PropState>,
    narration: Option<String>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> &[SinkCall] {
        &self.calls
    }

    pub fn take_calls(&mut self) -> Vec<SinkCall> {
        std::mem::take(&mut self.calls)
    }

    pub fn character_handle(&self, id: &str) -> Option<RenderHandle> {
        self.characters.get(&CharacterId::from(id)).copied()
    }

    pub fn prop_handle(&self, id: &str) -> Option<RenderHandle> {
        self.props.get(&PropId::from(id)).copied()
    }

    /// Latest drawn position of `joint` on character `id`.
    pub fn joint(&self, id: &str, joint: &str) -> Option<Point> {
        let handle = self.character_handle(id)?;
        self.joints.get(&handle)?.get(joint).copied()
    }

    pub fn joints_of(&self, id: &str) -> Option<&JointMap> {
        self.joints.get(&self.character_handle(id)?)
    }

    pub fn part(&self, id: &str, part: &str) -> Option<Part> {
        let handle = self.character_handle(id)?;
        self.parts.get(&handle)?.get(part).copied()
    }

    pub fn prop(&self, id: &str) -> Option<PropState> {
        self.transforms.get(&self.prop_handle(id)?).copied()
    }

    pub fn narration(&self) -> Option<&str> {
        self.narration.as_deref()
    }

    pub fn character_count(&self) -> usize {
        self.characters.len()
    }

    pub fn count_calls(&self, pred: impl Fn(&SinkCall) -> bool) -> usize {
        self.calls.iter().filter(|c| pred(c)).count()
    }
}

impl RenderSink for RecordingSink {
    fn create_character(&mut self, character: &Character) -> RenderHandle {
        let handle = self.handles.alloc();
        self.characters.insert(character.id.clone(), handle);
        self.calls.push(SinkCall::CreateCharacter {
            id: character.id.clone(),
            handle,
        });
        handle
    }

    fn create_prop(&mut self, prop: &Prop) -> RenderHandle {
        let handle = self.handles.alloc();
        self.props.insert(prop.id.clone(), handle);
        self.calls.push(SinkCall::CreateProp {
            id: prop.id.clone(),
            handle,
        });
        handle
    }

    fn set_joint_position(&mut self, handle: RenderHandle, joint: &str, x: f32, y: f32) {
        let point = Point { x, y };
        self.joints
            .entry(handle)
            .or_default()
            .insert(joint.to_string(), point);
        self.calls.push(SinkCall::Joint {
            handle,
            joint: joint.to_string(),
            point,
        });
    }

    fn set_segment(
        &mut self,
        handle: RenderHandle,
        part: &str,
        segment: Segment,
        stroke_width: Option<f32>,
    ) {
        self.parts.entry(handle).or_default().insert(
            part.to_string(),
            Part {
                shape: PartShape::Line(segment),
                stroke_width,
            },
        );
        self.calls.push(SinkCall::Segment {
            handle,
            part: part.to_string(),
            segment,
            stroke_width,
        });
    }

    fn set_circle(
        &mut self,
        handle: RenderHandle,
        part: &str,
        circle: Circle,
        stroke_width: Option<f32>,
    ) {
        self.parts.entry(handle).or_default().insert(
            part.to_string(),
            Part {
                shape: PartShape::Circle(circle),
                stroke_width,
            },
        );
        self.calls.push(SinkCall::Circle {
            handle,
            part: part.to_string(),
            circle,
            stroke_width,
        });
    }

    fn set_prop_transform(&mut self, handle: RenderHandle, transform: PropState) {
        self.transforms.insert(handle, transform);
        self.calls.push(SinkCall::PropTransform { handle, transform });
    }

    fn set_narration_text(&mut self, text: &str) {
        self.narration = Some(text.to_string());
        self.calls.push(SinkCall::Narration(text.to_string()));
    }

    fn clear(&mut self) {
        self.handles.reset();
        self.characters.clear();
        self.props.clear();
        self.joints.clear();
        self.parts.clear();
        self.transforms.clear();
        self.narration = None;
        self.calls.push(SinkCall::Clear);
    }
}
