use std::collections::HashMap;

use reqwest::StatusCode;

use gameshelf_core::{Catalog, CatalogError, GameId};

use crate::config::BggClientConfig;
use crate::xml::{parse_collection, parse_things};

/// BoardGameGeek XML API v2 client.
pub struct BggClient {
    config: BggClientConfig,
    client: reqwest::Client,
}

impl BggClient {
    pub fn new(config: BggClientConfig) -> Result<Self, CatalogError> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.timeout)
            .build()
            .map_err(|e| CatalogError::Http(e.to_string()))?;
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &BggClientConfig {
        &self.config
    }

    /// GET an endpoint, retrying while BGG answers 202 (request queued).
    async fn get_xml(&self, endpoint: &str, query: &[(&str, String)]) -> Result<String, CatalogError> {
        let url = format!("{}/{endpoint}", self.config.base_url.trim_end_matches('/'));
        let attempts = self.config.max_attempts.max(1);

        for attempt in 1..=attempts {
            let mut request = self.client.get(&url).query(query);
            if let Some(token) = &self.config.token {
                request = request.bearer_auth(token);
            }
            let resp = request
                .send()
                .await
                .map_err(|e| CatalogError::Http(e.to_string()))?;

            let status = resp.status();
            if status == StatusCode::ACCEPTED {
                tracing::debug!(endpoint, attempt, "BGG queued request");
                if attempt < attempts {
                    tokio::time::sleep(self.config.retry_delay).await;
                }
                continue;
            }
            if !status.is_success() {
                return Err(CatalogError::Status(status.as_u16()));
            }
            return resp
                .text()
                .await
                .map_err(|e| CatalogError::Http(e.to_string()));
        }

        Err(CatalogError::StillQueued { attempts })
    }
}

impl Catalog for BggClient {
    async fn owned_game_ids(&self, username: &str) -> Result<Vec<GameId>, CatalogError> {
        let query = [
            ("username", username.to_string()),
            ("own", "1".to_string()),
            ("subtype", "boardgame".to_string()),
        ];
        let result = self.get_xml("collection", &query).await;
        tokio::time::sleep(self.config.user_delay).await;
        parse_collection(&result?)
    }

    async fn primary_names(&self, ids: &[GameId]) -> Result<HashMap<GameId, String>, CatalogError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let joined: Vec<String> = ids.iter().map(|id| id.to_string()).collect();
        let query = [("id", joined.join(",")), ("type", "boardgame".to_string())];
        let result = self.get_xml("thing", &query).await;
        tokio::time::sleep(self.config.batch_delay).await;
        parse_things(&result?)
    }

    fn batch_size(&self) -> usize {
        self.config.thing_batch_size
    }
}
