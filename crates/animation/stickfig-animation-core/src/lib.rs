//! Stickfig Animation Core (host-agnostic)
//!
//! Turns a sparse list of timestamped stick-figure keyframes into rendered poses:
//! - `pose`/`payload`/`data`: wire format and the normalized, immutable model;
//! - `interp`: easing curves and pose blending;
//! - `clock`/`schedule`: continuous timeline, discrete frame stepping, host timers;
//! - `engine`: playback state machine driving a [`RenderSink`];
//! - `export`: clock-free resolution for thumbnails and video export.

pub mod clock;
pub mod config;
pub mod data;
pub mod engine;
pub mod error;
pub mod export;
pub mod ids;
pub mod inputs;
pub mod interp;
pub mod outputs;
pub mod payload;
pub mod pose;
pub mod schedule;
pub mod sink;

// Re-exports for adapters
pub use clock::{PlaybackStatus, StrategyKind, FRAME_CALLBACK_STRIDE};
pub use config::{Config, SkeletonConfig};
pub use data::{Animation, Character, Keyframe, Prop, PropShape, PropState};
pub use engine::PlaybackEngine;
pub use error::AnimatorError;
pub use export::{FrameStream, ResolvedFrame};
pub use ids::{CharacterId, HandleAllocator, PropId, RenderHandle, TimerToken};
pub use inputs::{CommandQueue, PlaybackCommand, SeekTarget};
pub use interp::Easing;
pub use outputs::{PlaybackEvent, PlaybackSnapshot};
pub use payload::{parse_payload_json, AnimationPayload};
pub use pose::{
    connected_bones, Circle, JointMap, Part, PartMap, PartShape, Point, PoseFormat, PoseVariant,
    Segment, JOINT_BONES, JOINT_NAMES, PART_NAMES,
};
pub use schedule::{ManualTime, MonotonicTime, PendingTimer, TimeSource, TimerKind};
pub use sink::{RecordingSink, RenderSink, SinkCall};

/// Version of the adapter-facing API surface.
pub const ABI_VERSION: u32 = 1;
