//! Script analysis data models.
//!
//! The analysis step sends the user's script (and optionally the video
//! itself) to a multimodal model and gets back the structured summary the
//! music prompt is built from. One request, one response — no polling.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Structured result of analyzing a script/video.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ScriptAnalysis {
    /// One-paragraph summary of the content
    pub summary: String,

    /// Dominant mood, e.g. "uplifting", "tense"
    pub mood: String,

    /// Suggested track title
    pub title: String,

    /// The prompt to hand to the music generation provider
    pub music_prompt: String,
}

/// Video payload attached to an analysis request, inlined as base64.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct VideoAttachment {
    /// MIME type, e.g. "video/mp4"
    pub mime_type: String,

    /// Base64-encoded video bytes
    pub data_base64: String,
}
