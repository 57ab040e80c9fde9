//! In-memory job registry.
//!
//! Holds the progress record and cancellation handle for every generation
//! job in this process. Nothing is persisted: a restart forgets all jobs,
//! which is the intended lifetime for this service.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tokio_util::sync::CancellationToken;

use vscore_models::{JobId, JobProgress, ProgressUpdate};
use vscore_music::ProgressSink;

struct JobEntry {
    progress: JobProgress,
    cancel: CancellationToken,
}

/// Registry of all generation jobs in this process.
#[derive(Default)]
pub struct JobRegistry {
    entries: RwLock<HashMap<JobId, JobEntry>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new job in the queued phase. Returns its id and the
    /// cancellation token the pipeline must honor.
    pub fn create(&self) -> (JobId, CancellationToken) {
        let job_id = JobId::new();
        let cancel = CancellationToken::new();
        let entry = JobEntry {
            progress: JobProgress::new(job_id.clone()),
            cancel: cancel.clone(),
        };
        self.entries.write().unwrap().insert(job_id.clone(), entry);
        (job_id, cancel)
    }

    /// Snapshot a job's current progress record.
    pub fn snapshot(&self, job_id: &JobId) -> Option<JobProgress> {
        self.entries
            .read()
            .unwrap()
            .get(job_id)
            .map(|entry| entry.progress.clone())
    }

    /// Apply a mutation to a job's progress record. Unknown ids are a
    /// no-op: the job may have raced with process shutdown.
    pub fn update<F>(&self, job_id: &JobId, f: F)
    where
        F: FnOnce(&mut JobProgress),
    {
        if let Some(entry) = self.entries.write().unwrap().get_mut(job_id) {
            f(&mut entry.progress);
        }
    }

    /// Trigger cancellation for a job.
    ///
    /// Returns `None` for an unknown id, `Some(false)` if the job had
    /// already reached a terminal phase, `Some(true)` if cancellation was
    /// triggered. The pipeline observes the token and records the
    /// cancelled phase itself.
    pub fn cancel(&self, job_id: &JobId) -> Option<bool> {
        let entries = self.entries.read().unwrap();
        let entry = entries.get(job_id)?;
        if entry.progress.is_terminal() {
            return Some(false);
        }
        entry.cancel.cancel();
        Some(true)
    }
}

/// Progress sink that writes polling updates into the registry.
pub struct RegistrySink {
    jobs: Arc<JobRegistry>,
    job_id: JobId,
}

impl RegistrySink {
    pub fn new(jobs: Arc<JobRegistry>, job_id: JobId) -> Self {
        Self { jobs, job_id }
    }
}

impl ProgressSink for RegistrySink {
    fn update(&self, update: ProgressUpdate) {
        self.jobs.update(&self.job_id, |progress| {
            if let Some(fraction) = update.fraction {
                progress.set_progress(fraction);
            }
            progress.set_step(update.message);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vscore_models::JobPhase;

    #[test]
    fn test_create_and_snapshot() {
        let registry = JobRegistry::new();
        let (job_id, _cancel) = registry.create();

        let snapshot = registry.snapshot(&job_id).unwrap();
        assert_eq!(snapshot.phase, JobPhase::Queued);
        assert_eq!(snapshot.job_id, job_id);
    }

    #[test]
    fn test_unknown_job_has_no_snapshot() {
        let registry = JobRegistry::new();
        assert!(registry.snapshot(&JobId::from_string("nope")).is_none());
    }

    #[test]
    fn test_update_mutates_record() {
        let registry = JobRegistry::new();
        let (job_id, _cancel) = registry.create();

        registry.update(&job_id, |p| p.set_phase(JobPhase::Generating));
        assert_eq!(
            registry.snapshot(&job_id).unwrap().phase,
            JobPhase::Generating
        );
    }

    #[test]
    fn test_cancel_triggers_token_once() {
        let registry = JobRegistry::new();
        let (job_id, cancel) = registry.create();

        assert_eq!(registry.cancel(&job_id), Some(true));
        assert!(cancel.is_cancelled());

        // Terminal jobs report that there was nothing left to cancel.
        registry.update(&job_id, |p| p.fail("gone"));
        assert_eq!(registry.cancel(&job_id), Some(false));

        assert_eq!(registry.cancel(&JobId::from_string("nope")), None);
    }

    #[test]
    fn test_registry_sink_writes_progress() {
        let registry = Arc::new(JobRegistry::new());
        let (job_id, _cancel) = registry.create();

        let sink = RegistrySink::new(Arc::clone(&registry), job_id.clone());
        sink.update(ProgressUpdate::with_fraction("First track ready", 0.7));

        let snapshot = registry.snapshot(&job_id).unwrap();
        assert_eq!(snapshot.progress, 0.7);
        assert_eq!(snapshot.current_step.as_deref(), Some("First track ready"));
    }
}
