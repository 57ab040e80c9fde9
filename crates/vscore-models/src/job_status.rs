//! Job lifecycle tracking for progress polling.
//!
//! This module provides the in-memory record a front end polls while a
//! generation is in flight. Job state lives only for the lifetime of the
//! process; nothing is persisted.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{GenerationJob, JobId, ScriptAnalysis, Track};

/// Lifecycle phase of a generation job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobPhase {
    /// Accepted, pipeline not started yet
    #[default]
    Queued,
    /// Script/video analysis in progress
    Analyzing,
    /// Music generation submitted, polling upstream
    Generating,
    /// Finished with at least one playable track
    Completed,
    /// Failed with an error
    Failed,
    /// Cancelled by the caller
    Cancelled,
}

impl JobPhase {
    /// Get string representation of the phase.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobPhase::Queued => "queued",
            JobPhase::Analyzing => "analyzing",
            JobPhase::Generating => "generating",
            JobPhase::Completed => "completed",
            JobPhase::Failed => "failed",
            JobPhase::Cancelled => "cancelled",
        }
    }

    /// Check if this is a terminal phase (no more updates expected).
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobPhase::Completed | JobPhase::Failed | JobPhase::Cancelled
        )
    }
}

impl std::fmt::Display for JobPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Snapshot of a generation job, served by the status endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct JobProgress {
    /// Unique job identifier
    pub job_id: JobId,
    /// Current lifecycle phase
    pub phase: JobPhase,
    /// Completion estimate in [0.0, 1.0]; never decreases
    pub progress: f32,
    /// Current step description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_step: Option<String>,
    /// Error message if the job failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Analysis result, once available
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis: Option<ScriptAnalysis>,
    /// The upstream job, once submission was accepted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation: Option<GenerationJob>,
    /// Finished tracks, once available
    pub tracks: Vec<Track>,
    /// When the job was accepted
    pub started_at: DateTime<Utc>,
    /// When the record was last updated
    pub updated_at: DateTime<Utc>,
}

impl JobProgress {
    /// Create a fresh record in the queued phase.
    pub fn new(job_id: JobId) -> Self {
        let now = Utc::now();
        Self {
            job_id,
            phase: JobPhase::Queued,
            progress: 0.0,
            current_step: None,
            error_message: None,
            analysis: None,
            generation: None,
            tracks: Vec::new(),
            started_at: now,
            updated_at: now,
        }
    }

    /// Check if the job is in a terminal phase.
    pub fn is_terminal(&self) -> bool {
        self.phase.is_terminal()
    }

    /// Move to a new phase.
    pub fn set_phase(&mut self, phase: JobPhase) {
        self.phase = phase;
        self.updated_at = Utc::now();
    }

    /// Update the completion estimate. Regressions are ignored so the
    /// reported progress is monotone.
    pub fn set_progress(&mut self, progress: f32) {
        self.progress = self.progress.max(progress.clamp(0.0, 1.0));
        self.updated_at = Utc::now();
    }

    /// Update the step description.
    pub fn set_step(&mut self, step: impl Into<String>) {
        self.current_step = Some(step.into());
        self.updated_at = Utc::now();
    }

    /// Mark the job completed with its finished tracks.
    pub fn complete(&mut self, tracks: Vec<Track>) {
        self.phase = JobPhase::Completed;
        self.progress = 1.0;
        self.current_step = Some("Complete".into());
        self.tracks = tracks;
        self.updated_at = Utc::now();
    }

    /// Mark the job failed with an error message.
    pub fn fail(&mut self, error: impl Into<String>) {
        self.phase = JobPhase::Failed;
        self.error_message = Some(error.into());
        self.updated_at = Utc::now();
    }

    /// Mark the job cancelled.
    pub fn cancel(&mut self) {
        self.phase = JobPhase::Cancelled;
        self.current_step = Some("Cancelled".into());
        self.updated_at = Utc::now();
    }
}
