//! Progress update payload.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// One progress notification emitted while a generation is in flight.
///
/// `fraction` is only present when the upstream protocol exposes enough
/// sub-stage information to estimate completion; consumers must treat it
/// as optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ProgressUpdate {
    /// Human-readable description of the current stage
    pub message: String,

    /// Estimated completion in [0.0, 1.0]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fraction: Option<f32>,
}

impl ProgressUpdate {
    /// A message-only update.
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            fraction: None,
        }
    }

    /// An update with a completion estimate, clamped to [0.0, 1.0].
    pub fn with_fraction(message: impl Into<String>, fraction: f32) -> Self {
        Self {
            message: message.into(),
            fraction: Some(fraction.clamp(0.0, 1.0)),
        }
    }
}
