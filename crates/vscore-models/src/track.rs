//! Finished audio track data.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// One finished audio track returned by the generation provider.
///
/// A track without a playable audio URL is never constructed; entries
/// lacking one are filtered out during result extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Track {
    /// Track identifier (upstream id, or synthesized when absent)
    pub id: String,

    /// Playable audio URL
    pub audio_url: String,

    /// Cover image URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,

    /// Track title
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Prompt the track was generated from
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,

    /// Duration in seconds, when reported upstream
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<f64>,
}

impl Track {
    /// Create a track with just the required fields.
    pub fn new(id: impl Into<String>, audio_url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            audio_url: audio_url.into(),
            image_url: None,
            title: None,
            prompt: None,
            duration_secs: None,
        }
    }
}
