//! Gemini AI client for script analysis.
//!
//! Sends the user's script (and optionally the video itself, inlined as
//! base64) to Gemini and parses the structured analysis the music prompt
//! is built from. One request, one response — generation is the music
//! gateway's job, not Gemini's.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use vscore_models::{ScriptAnalysis, VideoAttachment};

use crate::error::{ApiError, ApiResult};

/// Models to try, in order, when a call fails.
const GEMINI_MODELS: [&str; 3] = [
    "gemini-2.5-flash",
    "gemini-2.5-flash-lite",
    "gemini-2.5-pro",
];

/// Gemini API client.
pub struct GeminiClient {
    api_key: String,
    client: Client,
}

/// Gemini API request.
#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

#[derive(Debug, Serialize)]
struct InlineData {
    #[serde(rename = "mimeType")]
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    #[serde(rename = "responseMimeType")]
    response_mime_type: String,
}

/// Gemini API response.
#[derive(Debug, Deserialize)]
struct GeminiResponse {
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: ResponseContent,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: String,
}

impl GeminiClient {
    /// Create a new Gemini client with an explicit credential.
    pub fn new(api_key: impl Into<String>) -> ApiResult<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(ApiError::internal("Gemini API key must not be empty"));
        }

        Ok(Self {
            api_key,
            client: Client::new(),
        })
    }

    /// Create a client from the `GEMINI_API_KEY` environment variable.
    pub fn from_env() -> ApiResult<Self> {
        let api_key = std::env::var("GEMINI_API_KEY")
            .map_err(|_| ApiError::internal("GEMINI_API_KEY not configured"))?;
        Self::new(api_key)
    }

    /// Analyze a script (and optionally the video it belongs to).
    pub async fn analyze(
        &self,
        script_text: &str,
        video: Option<&VideoAttachment>,
    ) -> ApiResult<ScriptAnalysis> {
        let mut last_error = None;

        for model in &GEMINI_MODELS {
            info!("Attempting Gemini analysis with model: {}", model);
            match self.call_gemini_api(model, script_text, video).await {
                Ok(analysis) => {
                    info!("Analysis succeeded with {}", model);
                    return Ok(analysis);
                }
                Err(e) => {
                    warn!("Analysis failed with model {}: {}", model, e);
                    last_error = Some(e);
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| ApiError::internal("All Gemini models failed. Please try again later.")))
    }

    /// Call Gemini API.
    async fn call_gemini_api(
        &self,
        model: &str,
        script_text: &str,
        video: Option<&VideoAttachment>,
    ) -> ApiResult<ScriptAnalysis> {
        let url = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent?key={}",
            model, self.api_key
        );

        let mut parts = vec![Part::Text {
            text: build_analysis_prompt(script_text),
        }];
        if let Some(attachment) = video {
            parts.push(Part::InlineData {
                inline_data: InlineData {
                    mime_type: attachment.mime_type.clone(),
                    data: attachment.data_base64.clone(),
                },
            });
        }

        let request = GeminiRequest {
            contents: vec![Content { parts }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json".to_string(),
            },
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| ApiError::internal(format!("Gemini API request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(ApiError::internal(format!(
                "Gemini API returned {}: {}",
                status, error_text
            )));
        }

        let gemini_response: GeminiResponse = response.json().await.map_err(|e| {
            ApiError::internal(format!("Failed to parse Gemini response: {}", e))
        })?;

        let text = gemini_response
            .candidates
            .first()
            .and_then(|c| c.content.parts.first())
            .map(|p| p.text.as_str())
            .ok_or_else(|| ApiError::internal("No content in Gemini response"))?;

        let analysis: ScriptAnalysis = serde_json::from_str(strip_code_fences(text))
            .map_err(|e| ApiError::internal(format!("Failed to parse analysis JSON: {}", e)))?;

        if analysis.music_prompt.trim().is_empty() {
            return Err(ApiError::internal("Analysis produced an empty music prompt"));
        }

        Ok(analysis)
    }
}

/// Strip markdown code fences the model sometimes wraps its JSON in.
fn strip_code_fences(text: &str) -> &str {
    let text = text.trim();
    let text = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"))
        .unwrap_or(text);
    let text = text.strip_suffix("```").unwrap_or(text);
    text.trim()
}

/// Build the analysis prompt for a script.
fn build_analysis_prompt(script_text: &str) -> String {
    format!(
        r#"You are a film music supervisor. Analyze the following script (and the attached video, if any) and design the soundtrack brief for it.

SCRIPT:
{}

IMPORTANT: You must strictly follow this output format.
Return ONLY a single JSON object with this schema:
{{
  "summary": "One-paragraph summary of the content",
  "mood": "Dominant mood in a few words",
  "title": "Suggested track title",
  "music_prompt": "A detailed prompt for a music generation model: genre, instrumentation, tempo, dynamics, and how the piece should evolve"
}}"#,
        script_text
    )
}
