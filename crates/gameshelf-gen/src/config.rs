use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use gameshelf_bgg::BggClientConfig;
use gameshelf_core::{GameId, GenerateOptions, JoinOptions, OutputOptions, OwnerLabel, UnmappedOwners};

/// Config file read when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "gameshelf.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Top-level generator configuration, loaded from `gameshelf.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub owner_map: PathBuf,
    pub output: PathBuf,
    pub extra_users: Vec<String>,
    pub game_ids: Vec<GameId>,
    pub unmapped_owners: UnmappedOwners,
    pub owner_label: OwnerLabel,
    pub output_options: OutputOptions,
    pub bgg: BggConfig,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            owner_map: PathBuf::from("users.js"),
            output: PathBuf::from("games.js"),
            extra_users: Vec::new(),
            game_ids: Vec::new(),
            unmapped_owners: UnmappedOwners::default(),
            owner_label: OwnerLabel::default(),
            output_options: OutputOptions::default(),
            bgg: BggConfig::default(),
        }
    }
}

/// `[bgg]` section of the config file.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BggConfig {
    pub base_url: String,
    pub token: Option<String>,
    pub user_agent: String,
    pub timeout_secs: u64,
    pub max_attempts: u32,
    pub retry_delay_ms: u64,
    pub user_delay_ms: u64,
    pub batch_delay_ms: u64,
    pub thing_batch_size: usize,
}

impl Default for BggConfig {
    fn default() -> Self {
        let client = BggClientConfig::default();
        Self {
            base_url: client.base_url,
            token: None,
            user_agent: client.user_agent,
            timeout_secs: client.timeout.as_secs(),
            max_attempts: client.max_attempts,
            retry_delay_ms: millis(client.retry_delay),
            user_delay_ms: millis(client.user_delay),
            batch_delay_ms: millis(client.batch_delay),
            thing_batch_size: client.thing_batch_size,
        }
    }
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

impl BggConfig {
    pub fn client_config(&self) -> BggClientConfig {
        BggClientConfig {
            base_url: self.base_url.trim_end_matches('/').to_string(),
            token: self.token.clone().filter(|t| !t.is_empty()),
            user_agent: self.user_agent.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
            max_attempts: self.max_attempts,
            retry_delay: Duration::from_millis(self.retry_delay_ms),
            user_delay: Duration::from_millis(self.user_delay_ms),
            batch_delay: Duration::from_millis(self.batch_delay_ms),
            thing_batch_size: self.thing_batch_size,
        }
    }
}

impl GeneratorConfig {
    /// Load config from `path` (must exist) or from `gameshelf.toml` if it
    /// exists, then apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            },
            None => {
                tracing::info!("No {DEFAULT_CONFIG_FILE} found, using defaults");
                Self::default()
            },
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Environment variable overrides. Empty values are ignored.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let var = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(token) = var("BGG_TOKEN") {
            self.bgg.token = Some(token);
        }
        if let Some(path) = var("GAMESHELF_OWNER_MAP") {
            self.owner_map = PathBuf::from(path);
        }
        if let Some(path) = var("GAMESHELF_OUTPUT") {
            self.output = PathBuf::from(path);
        }
        if let Some(url) = var("GAMESHELF_BGG_BASE_URL") {
            self.bgg.base_url = url;
        }
    }

    /// Reject unusable settings; log warnings for questionable ones.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.owner_map.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("owner_map must not be empty".to_string()));
        }
        if self.output.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("output must not be empty".to_string()));
        }
        if !(self.bgg.base_url.starts_with("http://") || self.bgg.base_url.starts_with("https://")) {
            return Err(ConfigError::Invalid(format!(
                "bgg.base_url must be an http(s) URL, got {:?}",
                self.bgg.base_url
            )));
        }
        if self.bgg.max_attempts == 0 {
            return Err(ConfigError::Invalid("bgg.max_attempts must be > 0".to_string()));
        }
        if self.bgg.thing_batch_size == 0 {
            return Err(ConfigError::Invalid("bgg.thing_batch_size must be > 0".to_string()));
        }
        if self.bgg.timeout_secs == 0 {
            return Err(ConfigError::Invalid("bgg.timeout_secs must be > 0".to_string()));
        }

        if self.bgg.token.as_deref().is_none_or(str::is_empty) {
            tracing::warn!("No BGG token configured; set BGG_TOKEN");
        }
        if !self.extra_users.is_empty() && self.unmapped_owners == UnmappedOwners::Drop {
            tracing::warn!(
                count = self.extra_users.len(),
                "extra_users are ignored while unmapped_owners = \"drop\""
            );
        }
        Ok(())
    }

    pub fn generate_options(&self) -> GenerateOptions {
        GenerateOptions {
            extra_users: self.extra_users.clone(),
            join: JoinOptions {
                unmapped: self.unmapped_owners,
                label: self.owner_label,
                game_ids: self.game_ids.clone(),
            },
        }
    }
}
