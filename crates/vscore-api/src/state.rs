//! Application state.

use std::sync::Arc;

use vscore_music::{MusicConfig, SunoClient};

use crate::config::ApiConfig;
use crate::jobs::JobRegistry;
use crate::services::GeminiClient;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub jobs: Arc<JobRegistry>,
    pub music: Arc<SunoClient>,
    pub gemini: Arc<GeminiClient>,
}

impl AppState {
    /// Create new application state.
    ///
    /// Clients are built once here from explicit configuration and shared
    /// through the state; nothing reads credentials lazily at call time.
    pub fn new(config: ApiConfig) -> anyhow::Result<Self> {
        let music = SunoClient::new(MusicConfig::from_env()?)?;
        let gemini = GeminiClient::from_env()?;

        Ok(Self {
            config,
            jobs: Arc::new(JobRegistry::new()),
            music: Arc::new(music),
            gemini: Arc::new(gemini),
        })
    }
}
