use std::collections::HashMap;

use crate::record::GameId;

/// Errors returned by a catalog backend for a single request.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("request failed: {0}")]
    Http(String),
    #[error("catalog returned HTTP {0}")]
    Status(u16),
    #[error("request still queued after {attempts} attempts")]
    StillQueued { attempts: u32 },
    #[error("catalog rejected request: {0}")]
    Rejected(String),
    #[error("malformed catalog response: {0}")]
    Xml(String),
}

/// Source of ownership and game metadata.
///
/// Implementations are called sequentially; a generator never has two
/// requests in flight.
#[allow(async_fn_in_trait)]
pub trait Catalog {
    /// Ids of base games the user marks as owned, first-seen order, no duplicates.
    async fn owned_game_ids(&self, username: &str) -> Result<Vec<GameId>, CatalogError>;

    /// Primary names for `ids`. Ids that are not base games are absent from the map.
    async fn primary_names(&self, ids: &[GameId]) -> Result<HashMap<GameId, String>, CatalogError>;

    /// Largest id slice `primary_names` accepts in one call.
    fn batch_size(&self) -> usize {
        20
    }
}
