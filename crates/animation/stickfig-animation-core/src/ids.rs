//! Identifiers for payload entities, render targets and timers.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Character id as declared in the payload (`characters[].id`).
#[derive(Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CharacterId(pub String);

/// Prop id as declared in the payload (`props[].id`).
#[derive(Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropId(pub String);

impl CharacterId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl PropId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for CharacterId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<&str> for PropId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Display for CharacterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for PropId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque handle issued by a render sink for one character or prop.
/// The sink owns whatever the handle points at; the engine only passes it back.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct RenderHandle(pub u32);

/// Epoch-stamped token for the single pending timer of a session.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct TimerToken(pub u32);

/// Monotonic allocator for render handles. Sinks that have no native
/// element ids of their own can use it to mint handles.
#[derive(Default, Debug)]
pub struct HandleAllocator {
    next: u32,
}

impl HandleAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn alloc(&mut self) -> RenderHandle {
        let id = RenderHandle(self.next);
        self.next = self.next.wrapping_add(1);
        id
    }

    #[inline]
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
