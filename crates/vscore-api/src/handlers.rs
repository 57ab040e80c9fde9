//! Request handlers.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use base64::Engine;
use serde::{Deserialize, Serialize};
use tracing::info;
use validator::Validate;

use vscore_models::{JobId, JobProgress, VideoAttachment};

use crate::error::{ApiError, ApiResult};
use crate::pipeline::run_generation;
use crate::state::AppState;

// ============================================================================
// Types
// ============================================================================

/// Health response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// Generation request from the front end.
#[derive(Debug, Deserialize, Validate)]
pub struct GenerateJobRequest {
    /// The script to score
    #[validate(length(min = 1, message = "script_text must not be empty"))]
    pub script_text: String,

    /// Base64-encoded video bytes, analyzed alongside the script
    pub video_base64: Option<String>,

    /// MIME type of the attached video
    pub video_mime_type: Option<String>,

    /// Request a track without vocals
    #[serde(default = "default_instrumental")]
    pub instrumental: bool,

    /// Style tags; defaults to the analyzed mood when omitted
    pub style: Option<String>,

    /// Track title; defaults to the analyzed title when omitted
    pub title: Option<String>,
}

fn default_instrumental() -> bool {
    true
}

impl GenerateJobRequest {
    /// Build the video attachment, validating the pair of fields.
    pub fn video_attachment(&self) -> ApiResult<Option<VideoAttachment>> {
        match (&self.video_base64, &self.video_mime_type) {
            (None, None) => Ok(None),
            (Some(data), Some(mime_type)) => {
                if !mime_type.starts_with("video/") {
                    return Err(ApiError::bad_request(format!(
                        "unsupported video MIME type '{}'",
                        mime_type
                    )));
                }
                base64::engine::general_purpose::STANDARD
                    .decode(data)
                    .map_err(|_| ApiError::bad_request("video_base64 is not valid base64"))?;
                Ok(Some(VideoAttachment {
                    mime_type: mime_type.clone(),
                    data_base64: data.clone(),
                }))
            }
            _ => Err(ApiError::bad_request(
                "video_base64 and video_mime_type must be provided together",
            )),
        }
    }
}

#[derive(Serialize)]
pub struct GenerateJobResponse {
    pub job_id: JobId,
}

#[derive(Serialize)]
pub struct CancelJobResponse {
    pub cancelled: bool,
}

// ============================================================================
// Handlers
// ============================================================================

/// Liveness probe.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Readiness probe. There are no warm-up dependencies: upstream clients
/// are constructed eagerly at startup.
pub async fn ready() -> StatusCode {
    StatusCode::OK
}

/// Accept a generation job and run its pipeline in the background.
pub async fn start_generation(
    State(state): State<AppState>,
    Json(request): Json<GenerateJobRequest>,
) -> ApiResult<(StatusCode, Json<GenerateJobResponse>)> {
    request
        .validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;
    // Reject a broken attachment before accepting the job.
    request.video_attachment()?;

    let (job_id, cancel) = state.jobs.create();
    info!(job_id = %job_id, "Accepted generation job");

    tokio::spawn(run_generation(
        state.clone(),
        job_id.clone(),
        request,
        cancel,
    ));

    Ok((StatusCode::ACCEPTED, Json(GenerateJobResponse { job_id })))
}

/// Poll a job's progress.
pub async fn get_job_status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<JobProgress>> {
    state
        .jobs
        .snapshot(&JobId::from_string(job_id))
        .map(Json)
        .ok_or_else(|| ApiError::not_found("unknown job"))
}

/// Cancel a running job. Idempotent: cancelling a finished job reports
/// `cancelled: false`.
pub async fn cancel_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<CancelJobResponse>> {
    let job_id = JobId::from_string(job_id);
    match state.jobs.cancel(&job_id) {
        None => Err(ApiError::not_found("unknown job")),
        Some(cancelled) => {
            if cancelled {
                info!(job_id = %job_id, "Cancellation requested");
            }
            Ok(Json(CancelJobResponse { cancelled }))
        }
    }
}
