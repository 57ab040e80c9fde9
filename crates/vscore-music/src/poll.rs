//! The polling state machine.
//!
//! One call to [`SunoClient::poll_for_tracks`] owns one task's polling
//! session: sleep a fixed interval, fetch status, classify the outcome,
//! report progress, and either continue, return tracks, or fail. Session
//! state is local to the call and discarded on return.

use std::time::Duration;

use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use vscore_models::{GenerationStatus, NormalizedStatus, ProgressUpdate, TaskId, Track};

use crate::client::{GenerateRequest, SunoClient};
use crate::error::{MusicError, MusicResult};
use crate::normalize::normalize;

/// Observer for in-flight generation progress.
pub trait ProgressSink: Send + Sync {
    /// Receive one progress notification.
    ///
    /// Called inline from the polling loop between attempts; it must not
    /// block, or it stalls the retry timer.
    fn update(&self, update: ProgressUpdate);
}

/// Sink that discards all updates.
pub struct NoopProgress;

impl ProgressSink for NoopProgress {
    fn update(&self, _update: ProgressUpdate) {}
}

/// Configuration for one polling session.
#[derive(Debug, Clone)]
pub struct PollConfig {
    /// Maximum number of status fetches before giving up with a timeout.
    pub max_attempts: u32,
    /// Fixed delay between attempts. Polling never backs off
    /// exponentially; raise this if the upstream is slow to converge.
    pub interval: Duration,
    /// Consecutive transient failures tolerated before aborting.
    pub error_budget: u32,
    /// Additional attempts tolerated after the upstream declares success
    /// with no playable audio, in case the track list lags the status
    /// flip. `0` fails on the first such response.
    pub success_grace_attempts: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            max_attempts: 60,
            interval: Duration::from_secs(5),
            error_budget: 5,
            success_grace_attempts: 5,
        }
    }
}

impl PollConfig {
    /// Set the attempt budget.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Set the delay between attempts.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Set the consecutive transient-failure budget.
    pub fn with_error_budget(mut self, error_budget: u32) -> Self {
        self.error_budget = error_budget;
        self
    }

    /// Set the empty-success grace window.
    pub fn with_success_grace_attempts(mut self, attempts: u32) -> Self {
        self.success_grace_attempts = attempts;
        self
    }
}

/// State owned by one polling session.
#[derive(Debug, Default)]
struct PollSession {
    consecutive_errors: u32,
    empty_success_seen: u32,
    last_status: Option<NormalizedStatus>,
}

impl SunoClient {
    /// Poll a task until it yields playable tracks or fails.
    ///
    /// Returns the finished tracks in upstream order. Transient upstream
    /// failures are retried silently up to `config.error_budget`
    /// consecutive occurrences; only their exhaustion surfaces. The
    /// cancellation token is honored before and during every sleep.
    pub async fn poll_for_tracks(
        &self,
        task_id: &TaskId,
        config: &PollConfig,
        progress: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> MusicResult<Vec<Track>> {
        let mut session = PollSession::default();
        let mut reported_fraction = 0.0_f32;

        for attempt in 1..=config.max_attempts {
            if cancel.is_cancelled() {
                return Err(MusicError::Cancelled);
            }
            tokio::select! {
                _ = cancel.cancelled() => return Err(MusicError::Cancelled),
                _ = tokio::time::sleep(config.interval) => {}
            }

            let payload = match self.fetch_status(task_id).await {
                Ok(payload) => payload,
                Err(e) if e.is_transient() => {
                    self.record_transient(&mut session, config, progress, &e)?;
                    continue;
                }
                Err(e) => return Err(e),
            };

            // A business-level failure envelope is budgeted like a
            // transport failure: the gateway answered, but not about the
            // task.
            if let Some(code) = payload.get("code").and_then(Value::as_i64) {
                if code != 200 {
                    let message = payload
                        .get("msg")
                        .and_then(Value::as_str)
                        .unwrap_or("unknown upstream error")
                        .to_string();
                    let err = MusicError::UpstreamBusiness { code, message };
                    self.record_transient(&mut session, config, progress, &err)?;
                    continue;
                }
            }

            let status = normalize(&payload);
            // A structurally valid response proves connectivity is
            // healthy, whatever the task status says.
            session.consecutive_errors = 0;

            debug!(
                task_id = %task_id,
                attempt,
                status = %status.status,
                tracks = status.tracks.len(),
                "Poll attempt"
            );

            if let Some(fraction) = stage_fraction(status.raw_status.as_deref()) {
                reported_fraction = reported_fraction.max(fraction);
                progress.update(ProgressUpdate::with_fraction(
                    describe(&status),
                    reported_fraction,
                ));
            } else {
                progress.update(ProgressUpdate::message(describe(&status)));
            }

            match status.status {
                GenerationStatus::Success => {
                    if !status.tracks.is_empty() {
                        return Ok(status.tracks);
                    }
                    // Declared success with no playable audio. Tolerate a
                    // bounded number of further polls in case the track
                    // list lags the status flip, then fail distinctly —
                    // never return an empty success.
                    if session.empty_success_seen >= config.success_grace_attempts {
                        return Err(MusicError::IncompleteSuccess);
                    }
                    session.empty_success_seen += 1;
                }
                GenerationStatus::Failed => {
                    let message = status
                        .error_message
                        .clone()
                        .unwrap_or_else(|| "no error message provided".to_string());
                    return Err(MusicError::GenerationFailed { message });
                }
                GenerationStatus::Pending
                | GenerationStatus::Partial
                | GenerationStatus::Unknown => {}
            }

            session.last_status = Some(status);
        }

        Err(MusicError::PollTimeout {
            last_status: session.last_status,
        })
    }

    /// Submit a request and poll it to completion.
    pub async fn generate(
        &self,
        request: &GenerateRequest,
        config: &PollConfig,
        progress: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> MusicResult<Vec<Track>> {
        let task_id = self.submit(request).await?;
        self.poll_for_tracks(&task_id, config, progress, cancel).await
    }

    fn record_transient(
        &self,
        session: &mut PollSession,
        config: &PollConfig,
        progress: &dyn ProgressSink,
        error: &MusicError,
    ) -> MusicResult<()> {
        session.consecutive_errors += 1;
        warn!(
            consecutive = session.consecutive_errors,
            budget = config.error_budget,
            "Transient failure while polling: {}",
            error
        );
        if session.consecutive_errors >= config.error_budget {
            return Err(MusicError::RepeatedUpstreamFailure {
                attempts: session.consecutive_errors,
            });
        }
        progress.update(ProgressUpdate::message(format!(
            "Temporary upstream error, retrying ({}/{})",
            session.consecutive_errors, config.error_budget
        )));
        Ok(())
    }
}

/// Completion estimate for the sub-stages the protocol exposes. Unknown
/// stages report no fraction rather than a guess.
fn stage_fraction(raw_status: Option<&str>) -> Option<f32> {
    match raw_status? {
        "PENDING" | "SUBMITTED" | "QUEUED" | "RUNNING" => Some(0.15),
        "TEXT_SUCCESS" => Some(0.4),
        "FIRST_SUCCESS" => Some(0.7),
        "SUCCESS" | "COMPLETE" => Some(1.0),
        _ => None,
    }
}

fn describe(status: &NormalizedStatus) -> String {
    match status.status {
        GenerationStatus::Pending => "Waiting in the generation queue".to_string(),
        GenerationStatus::Partial => match status.raw_status.as_deref() {
            Some("TEXT_SUCCESS") => "Lyrics ready, composing audio".to_string(),
            Some("FIRST_SUCCESS") => "First track ready, finishing the rest".to_string(),
            _ => "Generation in progress".to_string(),
        },
        GenerationStatus::Success => "Generation complete".to_string(),
        GenerationStatus::Failed => "Generation failed".to_string(),
        GenerationStatus::Unknown => match status.raw_status.as_deref() {
            Some(raw) => format!("Upstream reported '{}'", raw),
            None => "Waiting for the upstream to report a status".to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_fractions_are_monotone_across_stages() {
        let stages = ["PENDING", "TEXT_SUCCESS", "FIRST_SUCCESS", "SUCCESS"];
        let fractions: Vec<f32> = stages
            .iter()
            .map(|s| stage_fraction(Some(s)).unwrap())
            .collect();
        assert!(fractions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_unknown_stage_has_no_fraction() {
        assert_eq!(stage_fraction(Some("SOMETHING_NEW")), None);
        assert_eq!(stage_fraction(None), None);
    }

    #[test]
    fn test_describe_partial_stages() {
        let status = NormalizedStatus {
            status: GenerationStatus::Partial,
            raw_status: Some("FIRST_SUCCESS".into()),
            ..Default::default()
        };
        assert!(describe(&status).contains("First track"));
    }

    #[test]
    fn test_default_config() {
        let config = PollConfig::default();
        assert_eq!(config.error_budget, 5);
        assert_eq!(config.interval, Duration::from_secs(5));
    }
}
