//! Client for the Suno-compatible music generation gateway.
//!
//! Music generation is asynchronous upstream: a submission returns an
//! opaque task id, and the result is obtained by polling a status
//! endpoint until the task reaches a terminal state. This crate owns
//! that whole exchange:
//!
//! - [`client::SunoClient`] — submission and raw status fetches
//! - [`normalize`] — collapsing every gateway payload revision into one
//!   canonical status representation
//! - [`extract`] — filtering raw track entries to playable tracks
//! - [`poll`] — the fixed-interval polling state machine with attempt
//!   and error budgets, progress reporting, and cancellation

pub mod client;
pub mod error;
pub mod extract;
pub mod normalize;
pub mod poll;

pub use client::{GenerateRequest, MusicConfig, SunoClient};
pub use error::{MusicError, MusicResult};
pub use extract::extract_tracks;
pub use normalize::normalize;
pub use poll::{NoopProgress, PollConfig, ProgressSink};
