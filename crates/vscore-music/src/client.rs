//! Suno gateway client: submission and status fetches.

use std::time::Duration;

use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};
use url::Url;

use vscore_models::TaskId;

use crate::error::{MusicError, MusicResult};

/// Default gateway base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.sunoapi.org";

/// Default generation model tag.
const DEFAULT_MODEL: &str = "V4_5";

/// The gateway requires a callback URL on every submission even when the
/// caller polls for the result instead. Results are never delivered here.
const DEFAULT_CALLBACK_URL: &str = "https://example.com/suno-callback";

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Music gateway configuration.
#[derive(Debug, Clone)]
pub struct MusicConfig {
    /// API credential, sent as a Bearer token
    pub api_key: String,
    /// Gateway base URL
    pub base_url: String,
    /// Generation model tag
    pub model: String,
    /// Callback URL submitted with every request (protocol requirement)
    pub callback_url: String,
    /// Per-request timeout for each HTTP round trip
    pub request_timeout: Duration,
}

impl MusicConfig {
    /// Create a config with the given credential and default settings.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            callback_url: DEFAULT_CALLBACK_URL.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Create config from environment variables.
    ///
    /// `SUNO_API_KEY` is required; `SUNO_API_BASE_URL`, `SUNO_MODEL`, and
    /// `SUNO_CALLBACK_URL` override the defaults.
    pub fn from_env() -> MusicResult<Self> {
        let api_key = std::env::var("SUNO_API_KEY")
            .map_err(|_| MusicError::config("SUNO_API_KEY not set"))?;

        let mut config = Self::new(api_key);
        if let Ok(base_url) = std::env::var("SUNO_API_BASE_URL") {
            config = config.with_base_url(&base_url)?;
        }
        if let Ok(model) = std::env::var("SUNO_MODEL") {
            config.model = model;
        }
        if let Ok(callback_url) = std::env::var("SUNO_CALLBACK_URL") {
            config.callback_url = callback_url;
        }
        Ok(config)
    }

    /// Override the gateway base URL. Trailing slashes are trimmed.
    pub fn with_base_url(mut self, base_url: &str) -> MusicResult<Self> {
        Url::parse(base_url)
            .map_err(|e| MusicError::config(format!("invalid base URL '{}': {}", base_url, e)))?;
        self.base_url = base_url.trim_end_matches('/').to_string();
        Ok(self)
    }
}

/// A music generation request.
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    /// The generation prompt, passed through unfiltered
    pub prompt: String,
    /// Request a track without vocals
    pub instrumental: bool,
    /// Style tags, e.g. "cinematic orchestral"
    pub style: Option<String>,
    /// Track title
    pub title: Option<String>,
}

impl GenerateRequest {
    /// Create an instrumental request with just a prompt.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            instrumental: true,
            style: None,
            title: None,
        }
    }

    /// Set whether the track should be instrumental.
    pub fn with_instrumental(mut self, instrumental: bool) -> Self {
        self.instrumental = instrumental;
        self
    }

    /// Set style tags.
    pub fn with_style(mut self, style: impl Into<String>) -> Self {
        self.style = Some(style.into());
        self
    }

    /// Set the track title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

/// Wire payload for the submission endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SubmitPayload<'a> {
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    style: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<&'a str>,
    custom_mode: bool,
    instrumental: bool,
    model: &'a str,
    call_back_url: &'a str,
}

/// Client for the Suno-compatible music generation gateway.
#[derive(Debug)]
pub struct SunoClient {
    config: MusicConfig,
    client: Client,
}

impl SunoClient {
    /// Create a new client. Fails if the credential is empty.
    pub fn new(config: MusicConfig) -> MusicResult<Self> {
        if config.api_key.trim().is_empty() {
            return Err(MusicError::config("music API key must not be empty"));
        }

        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self { config, client })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url, path)
    }

    /// Submit a generation request and return the upstream task id.
    ///
    /// Submission is never retried here: a failure surfaces immediately
    /// since re-submitting is not known to be idempotent upstream.
    pub async fn submit(&self, request: &GenerateRequest) -> MusicResult<TaskId> {
        let payload = SubmitPayload {
            prompt: &request.prompt,
            style: request.style.as_deref(),
            title: request.title.as_deref(),
            custom_mode: request.style.is_some() || request.title.is_some(),
            instrumental: request.instrumental,
            model: &self.config.model,
            call_back_url: &self.config.callback_url,
        };

        info!(
            instrumental = request.instrumental,
            model = %self.config.model,
            "Submitting music generation request"
        );

        let response = self
            .client
            .post(self.endpoint("/api/v1/generate"))
            .bearer_auth(&self.config.api_key)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MusicError::UpstreamRequest {
                status: status.as_u16(),
                body,
            });
        }

        let value: Value = response
            .json()
            .await
            .map_err(|e| MusicError::malformed(format!("submission response was not JSON: {}", e)))?;

        if let Some(code) = value.get("code").and_then(Value::as_i64) {
            if code != 200 {
                let message = value
                    .get("msg")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown upstream error")
                    .to_string();
                return Err(MusicError::UpstreamBusiness { code, message });
            }
        }

        let task_id = extract_task_id(&value)
            .ok_or_else(|| MusicError::malformed("no task identifier in submission response"))?;

        info!(task_id = %task_id, "Generation task accepted");
        Ok(task_id)
    }

    /// Fetch the raw status payload for a task.
    ///
    /// Returns the body as loosely-typed JSON; interpreting it is the
    /// normalizer's job so that one fetch path serves every payload
    /// revision the gateway has shipped.
    pub async fn fetch_status(&self, task_id: &TaskId) -> MusicResult<Value> {
        let response = self
            .client
            .get(self.endpoint("/api/v1/generate/record-info"))
            .query(&[("taskId", task_id.as_str())])
            .bearer_auth(&self.config.api_key)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MusicError::UpstreamRequest {
                status: status.as_u16(),
                body,
            });
        }

        let value: Value = response.json().await?;
        debug!(task_id = %task_id, "Fetched task status");
        Ok(value)
    }
}

/// The task id has lived under different field names across gateway
/// revisions; accept each in order of specificity.
fn extract_task_id(value: &Value) -> Option<TaskId> {
    let data = value.get("data");
    for key in ["taskId", "task_id", "id"] {
        if let Some(id) = data.and_then(|d| d.get(key)).and_then(Value::as_str) {
            if !id.is_empty() {
                return Some(TaskId::from_string(id));
            }
        }
    }
    value
        .get("taskId")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .map(TaskId::from_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_api_key_is_rejected() {
        let err = SunoClient::new(MusicConfig::new("  ")).unwrap_err();
        assert!(matches!(err, MusicError::Config(_)));
    }

    #[test]
    fn test_base_url_validation() {
        assert!(MusicConfig::new("k").with_base_url("not a url").is_err());
        let config = MusicConfig::new("k")
            .with_base_url("https://gateway.example.com/")
            .unwrap();
        assert_eq!(config.base_url, "https://gateway.example.com");
    }

    #[test]
    fn test_task_id_field_variants() {
        let current = json!({"code": 200, "data": {"taskId": "t-1"}});
        assert_eq!(extract_task_id(&current).unwrap().as_str(), "t-1");

        let snake = json!({"data": {"task_id": "t-2"}});
        assert_eq!(extract_task_id(&snake).unwrap().as_str(), "t-2");

        let bare = json!({"data": {"id": "t-3"}});
        assert_eq!(extract_task_id(&bare).unwrap().as_str(), "t-3");

        let top_level = json!({"taskId": "t-4"});
        assert_eq!(extract_task_id(&top_level).unwrap().as_str(), "t-4");

        let missing = json!({"data": {"status": "PENDING"}});
        assert!(extract_task_id(&missing).is_none());
    }

    #[test]
    fn test_submit_payload_wire_format() {
        let payload = SubmitPayload {
            prompt: "calm piano",
            style: Some("lofi"),
            title: None,
            custom_mode: true,
            instrumental: true,
            model: "V4_5",
            call_back_url: "https://example.com/cb",
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["customMode"], true);
        assert_eq!(json["callBackUrl"], "https://example.com/cb");
        assert!(json.get("title").is_none());
    }
}
