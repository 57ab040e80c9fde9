//! Canonical upstream status projection.
//!
//! The generation gateway has shipped several revisions of its status
//! payload. Every supported shape is normalized into [`NormalizedStatus`]
//! before the polling loop looks at it, so the loop only ever reasons
//! about one representation.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::Track;

/// Upstream generation status, collapsed to the states the polling loop
/// distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum GenerationStatus {
    /// Task accepted, nothing produced yet
    #[default]
    Pending,
    /// Task producing intermediate results (lyrics ready, first track ready)
    Partial,
    /// Task finished successfully
    Success,
    /// Task failed upstream
    Failed,
    /// Status string not recognized; treated as still in progress
    Unknown,
}

impl GenerationStatus {
    /// Get string representation of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationStatus::Pending => "pending",
            GenerationStatus::Partial => "partial",
            GenerationStatus::Success => "success",
            GenerationStatus::Failed => "failed",
            GenerationStatus::Unknown => "unknown",
        }
    }

    /// Check if this status ends polling.
    pub fn is_terminal(&self) -> bool {
        matches!(self, GenerationStatus::Success | GenerationStatus::Failed)
    }
}

impl std::fmt::Display for GenerationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Canonical projection of one raw status payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Default)]
pub struct NormalizedStatus {
    /// Collapsed status
    pub status: GenerationStatus,

    /// The upstream status string as received, for diagnostics and
    /// sub-stage progress mapping
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_status: Option<String>,

    /// Tracks with a playable audio URL, upstream order preserved
    pub tracks: Vec<Track>,

    /// Upstream error message, when present
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl NormalizedStatus {
    /// Check if this status ends polling.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(GenerationStatus::Success.is_terminal());
        assert!(GenerationStatus::Failed.is_terminal());
        assert!(!GenerationStatus::Pending.is_terminal());
        assert!(!GenerationStatus::Partial.is_terminal());
        assert!(!GenerationStatus::Unknown.is_terminal());
    }

    #[test]
    fn test_default_is_pending_with_no_tracks() {
        let status = NormalizedStatus::default();
        assert_eq!(status.status, GenerationStatus::Pending);
        assert!(status.tracks.is_empty());
        assert!(!status.is_terminal());
    }
}
