//! Music client error types.

use thiserror::Error;

use vscore_models::NormalizedStatus;

pub type MusicResult<T> = Result<T, MusicError>;

#[derive(Debug, Error)]
pub enum MusicError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Upstream request failed with HTTP {status}: {body}")]
    UpstreamRequest { status: u16, body: String },

    #[error("Upstream rejected the request (code {code}): {message}")]
    UpstreamBusiness { code: i64, message: String },

    #[error("Malformed upstream response: {0}")]
    MalformedResponse(String),

    #[error("Gave up after {attempts} consecutive upstream failures")]
    RepeatedUpstreamFailure { attempts: u32 },

    #[error("Generation failed upstream: {message}")]
    GenerationFailed { message: String },

    #[error("Generation reported success but produced no playable audio")]
    IncompleteSuccess,

    #[error("Generation did not finish within the polling budget")]
    PollTimeout {
        /// Last status observed before the budget ran out, for diagnostics.
        last_status: Option<NormalizedStatus>,
    },

    #[error("Generation was cancelled")]
    Cancelled,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl MusicError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedResponse(msg.into())
    }

    /// Check whether the error is likely recoverable by retrying.
    ///
    /// Only the polling loop consults this: transient errors there are
    /// counted against a budget instead of surfaced. At submission every
    /// error is fatal (submission is not safe to blindly retry).
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            MusicError::Http(_)
                | MusicError::UpstreamRequest { .. }
                | MusicError::UpstreamBusiness { .. }
        )
    }
}
