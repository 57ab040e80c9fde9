//! Generation job definitions.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a job tracked by this service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Generate a new random job ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque task identifier assigned by the upstream generation provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct TaskId(pub String);

impl TaskId {
    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A music generation job accepted by the upstream provider.
///
/// Immutable once created; its lifetime ends when polling for the task
/// terminates (success, failure, or timeout).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GenerationJob {
    /// Upstream task identifier
    pub task_id: TaskId,

    /// The prompt that was submitted
    pub prompt: String,

    /// Whether an instrumental track was requested
    pub instrumental: bool,

    /// When the job was accepted upstream
    pub created_at: DateTime<Utc>,
}

impl GenerationJob {
    /// Record a newly accepted generation job.
    pub fn new(task_id: TaskId, prompt: impl Into<String>, instrumental: bool) -> Self {
        Self {
            task_id,
            prompt: prompt.into(),
            instrumental,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_ids_are_unique() {
        assert_ne!(JobId::new(), JobId::new());
    }

    #[test]
    fn test_task_id_roundtrip() {
        let id = TaskId::from_string("task-abc123");
        assert_eq!(id.as_str(), "task-abc123");
        assert_eq!(id.to_string(), "task-abc123");
    }

    #[test]
    fn test_generation_job_creation() {
        let job = GenerationJob::new(
            TaskId::from_string("task-1"),
            "cinematic orchestral crescendo",
            true,
        );
        assert_eq!(job.task_id.as_str(), "task-1");
        assert!(job.instrumental);
    }
}
