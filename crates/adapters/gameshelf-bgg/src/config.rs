use std::time::Duration;

/// Configuration for the BoardGameGeek XML API client.
#[derive(Debug, Clone)]
pub struct BggClientConfig {
    /// API root, without a trailing slash.
    pub base_url: String,
    /// Bearer token sent on every request when present.
    pub token: Option<String>,
    pub user_agent: String,
    pub timeout: Duration,
    /// Attempts per request while BGG answers 202 (queued).
    pub max_attempts: u32,
    pub retry_delay: Duration,
    /// Pause after each collection request.
    pub user_delay: Duration,
    /// Pause after each thing batch.
    pub batch_delay: Duration,
    /// Ids per `/thing` request.
    pub thing_batch_size: usize,
}

impl Default for BggClientConfig {
    fn default() -> Self {
        Self {
            base_url: "https://boardgamegeek.com/xmlapi2".to_string(),
            token: None,
            user_agent: concat!("gameshelf-gen/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout: Duration::from_secs(30),
            max_attempts: 25,
            retry_delay: Duration::from_millis(2000),
            user_delay: Duration::from_millis(300),
            batch_delay: Duration::from_millis(200),
            thing_batch_size: 20,
        }
    }
}

impl BggClientConfig {
    /// Zero every delay; used against local stub servers.
    pub fn without_delays(mut self) -> Self {
        self.retry_delay = Duration::ZERO;
        self.user_delay = Duration::ZERO;
        self.batch_delay = Duration::ZERO;
        self
    }
}
