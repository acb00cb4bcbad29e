use std::time::Duration;

use crate::poller::PollConfig;

/// Default provider REST base.
pub const DEFAULT_GENERATION_API_BASE: &str = "https://api.wavespeed.ai/api/v3";

/// Generation provider configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct GenerationConfig {
    /// Bearer key. `None` leaves the server up; submissions then fail with
    /// a configuration error.
    pub api_key: Option<String>,
    pub api_base: String,
    pub poll: PollConfig,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: DEFAULT_GENERATION_API_BASE.to_string(),
            poll: PollConfig::default(),
        }
    }
}

impl GenerationConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                          | Default                           |
    /// |----------------------------------|-----------------------------------|
    /// | `GENERATION_API_KEY`             | unset                             |
    /// | `GENERATION_API_BASE`            | `https://api.wavespeed.ai/api/v3` |
    /// | `GENERATION_POLL_INTERVAL_MS`    | `3000`                            |
    /// | `GENERATION_POLL_TIMEOUT_SECS`   | `300`                             |
    pub fn from_env() -> Self {
        let non_empty = |key: &str| {
            std::env::var(key)
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let mut poll = PollConfig::default();
        if let Some(ms) = non_empty("GENERATION_POLL_INTERVAL_MS") {
            let ms: u64 = ms
                .parse()
                .expect("GENERATION_POLL_INTERVAL_MS must be a valid u64");
            poll.interval = Duration::from_millis(ms);
        }
        if let Some(secs) = non_empty("GENERATION_POLL_TIMEOUT_SECS") {
            let secs: u64 = secs
                .parse()
                .expect("GENERATION_POLL_TIMEOUT_SECS must be a valid u64");
            poll.budget = Duration::from_secs(secs);
        }

        Self {
            api_key: non_empty("GENERATION_API_KEY"),
            api_base: non_empty("GENERATION_API_BASE")
                .unwrap_or_else(|| DEFAULT_GENERATION_API_BASE.into()),
            poll,
        }
    }
}
