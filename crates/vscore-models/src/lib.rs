//! Shared data models for the VideoScore backend.
//!
//! This crate provides Serde-serializable types for:
//! - Generation jobs and their upstream task identifiers
//! - The canonical (normalized) upstream status projection
//! - Finished audio tracks
//! - Script analysis results
//! - Job lifecycle tracking and progress updates

pub mod analysis;
pub mod job;
pub mod job_status;
pub mod progress;
pub mod status;
pub mod track;

// Re-export common types
pub use analysis::{ScriptAnalysis, VideoAttachment};
pub use job::{GenerationJob, JobId, TaskId};
pub use job_status::{JobPhase, JobProgress};
pub use progress::ProgressUpdate;
pub use status::{GenerationStatus, NormalizedStatus};
pub use track::Track;
