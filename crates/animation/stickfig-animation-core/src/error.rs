//! Error types for loading and driving an animation.

use serde::{Deserialize, Serialize};

/// Errors surfaced by the core.
///
/// Only [`AnimatorError::InvalidPayload`] is ever returned from `load`; the other
/// variants are logged and reported as events, never thrown across the playback API.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum AnimatorError {
    /// Structural problem with the payload (no keyframes, no characters, bad timestamps...).
    #[error("Invalid animation payload: {reason}")]
    InvalidPayload { reason: String },

    /// A character pose carries neither a `joints` nor a `pose` field.
    #[error("Unknown pose format: expected a `joints` or `pose` field")]
    UnknownPoseFormat,

    /// A playback call arrived before any animation was loaded.
    #[error("No active session: `{op}` requires a loaded animation")]
    NoActiveSession { op: String },
}

impl AnimatorError {
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidPayload {
            reason: reason.into(),
        }
    }

    pub(crate) fn no_session(op: &str) -> Self {
        Self::NoActiveSession { op: op.to_string() }
    }

    /// Whether the session keeps running after this error.
    #[inline]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::UnknownPoseFormat | Self::NoActiveSession { .. }
        )
    }

    /// Error category for logging.
    #[inline]
    pub fn category(&self) -> &'static str {
        match self {
            Self::InvalidPayload { .. } => "payload",
            Self::UnknownPoseFormat => "pose",
            Self::NoActiveSession { .. } => "session",
        }
    }
}

impl From<serde_json::Error> for AnimatorError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidPayload {
            reason: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recoverability_and_categories() {
        assert!(!AnimatorError::invalid("x").is_recoverable());
        assert!(AnimatorError::UnknownPoseFormat.is_recoverable());
        assert_eq!(AnimatorError::no_session("play").category(), "session");
    }

    #[test]
    fn json_errors_become_invalid_payload() {
        let err: AnimatorError = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert!(matches!(err, AnimatorError::InvalidPayload { .. }));
    }

    #[test]
    fn display_names_the_operation() {
        let err = AnimatorError::no_session("resume");
        assert_eq!(
            err.to_string(),
            "No active session: `resume` requires a loaded animation"
        );
    }
}
