//! Playback commands, either called directly on the engine or queued from a
//! callback through a [`CommandQueue`] handle.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeekTarget {
    /// Timeline position in ms (continuous), or the last frame at or before it (discrete).
    TimeMs(f64),
    /// Keyframe/frame index; in continuous mode seeks to that keyframe's timestamp.
    Frame(usize),
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackCommand {
    Play,
    Pause,
    Resume,
    Restart,
    Seek(SeekTarget),
}

/// Shared FIFO of commands. Cloning yields another handle onto the same queue.
#[derive(Clone, Debug, Default)]
pub struct CommandQueue(Rc<RefCell<VecDeque<PlaybackCommand>>>);

impl CommandQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, cmd: PlaybackCommand) {
        self.0.borrow_mut().push_back(cmd);
    }

    pub fn pop(&self) -> Option<PlaybackCommand> {
        self.0.borrow_mut().pop_front()
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    pub fn clear(&self) {
        self.0.borrow_mut().clear();
    }
}
