//! The generation pipeline: analysis → submission → polling.
//!
//! One spawned task per accepted job. Every outcome — completion,
//! failure, cancellation, deadline — ends up in the job registry; the
//! task itself never reports over HTTP.

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use vscore_models::{GenerationJob, JobId, JobPhase, Track};
use vscore_music::{GenerateRequest, MusicError};

use crate::error::ApiError;
use crate::handlers::GenerateJobRequest;
use crate::jobs::RegistrySink;
use crate::state::AppState;

/// Run one generation job to completion, recording progress in the
/// registry. The whole pipeline races a wall-clock deadline; if the
/// deadline fires first the pipeline future is dropped and the job is
/// marked failed.
pub async fn run_generation(
    state: AppState,
    job_id: JobId,
    request: GenerateJobRequest,
    cancel: CancellationToken,
) {
    let deadline = state.config.generation_timeout;
    let outcome = tokio::time::timeout(deadline, drive(&state, &job_id, &request, &cancel)).await;

    match outcome {
        Ok(Ok(tracks)) => {
            info!(job_id = %job_id, tracks = tracks.len(), "Generation job completed");
            state.jobs.update(&job_id, |p| p.complete(tracks));
        }
        Ok(Err(ApiError::Music(MusicError::Cancelled))) => {
            info!(job_id = %job_id, "Generation job cancelled");
            state.jobs.update(&job_id, |p| p.cancel());
        }
        Ok(Err(e)) => {
            warn!(job_id = %job_id, "Generation job failed: {}", e);
            state.jobs.update(&job_id, |p| p.fail(e.to_string()));
        }
        Err(_) => {
            warn!(job_id = %job_id, ?deadline, "Generation job hit the wall-clock deadline");
            state
                .jobs
                .update(&job_id, |p| p.fail("Generation timed out. Please try again."));
        }
    }
}

async fn drive(
    state: &AppState,
    job_id: &JobId,
    request: &GenerateJobRequest,
    cancel: &CancellationToken,
) -> Result<Vec<Track>, ApiError> {
    state.jobs.update(job_id, |p| {
        p.set_phase(JobPhase::Analyzing);
        p.set_step("Analyzing script");
        p.set_progress(0.05);
    });

    let video = request.video_attachment()?;
    let analysis = state
        .gemini
        .analyze(&request.script_text, video.as_ref())
        .await?;

    if cancel.is_cancelled() {
        return Err(ApiError::Music(MusicError::Cancelled));
    }

    let mut generate = GenerateRequest::new(analysis.music_prompt.as_str())
        .with_instrumental(request.instrumental)
        .with_style(request.style.clone().unwrap_or_else(|| analysis.mood.clone()))
        .with_title(request.title.clone().unwrap_or_else(|| analysis.title.clone()));
    // The gateway rejects empty style/title fields outright.
    if generate.style.as_deref() == Some("") {
        generate.style = None;
    }
    if generate.title.as_deref() == Some("") {
        generate.title = None;
    }

    state.jobs.update(job_id, |p| {
        p.analysis = Some(analysis);
        p.set_phase(JobPhase::Generating);
        p.set_step("Submitting generation request");
        p.set_progress(0.1);
    });

    let task_id = state.music.submit(&generate).await?;
    let accepted = GenerationJob::new(
        task_id.clone(),
        generate.prompt.clone(),
        generate.instrumental,
    );
    state.jobs.update(job_id, |p| {
        p.set_step(format!("Generation task {} accepted", accepted.task_id));
        p.generation = Some(accepted);
    });

    let sink = RegistrySink::new(state.jobs.clone(), job_id.clone());
    let tracks = state
        .music
        .poll_for_tracks(&task_id, &state.config.poll, &sink, cancel)
        .await?;

    Ok(tracks)
}
