pub mod catalog;
pub mod generate;
pub mod join;
pub mod output;
pub mod owners;
pub mod record;

pub use catalog::{Catalog, CatalogError};
pub use generate::{GenerateError, GenerateOptions, Generation, Generator};
pub use join::{JoinOptions, OwnerLabel, Ownership, UnmappedOwners, join};
pub use output::{OutputError, OutputFormat, OutputOptions};
pub use owners::{OwnerMap, OwnerMapError};
pub use record::{GameId, GameRecord};

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers {
    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex;

    use crate::catalog::{Catalog, CatalogError};
    use crate::owners::OwnerMap;
    use crate::record::GameId;

    /// In-memory catalog with canned collections and names.
    #[derive(Debug, Default)]
    pub struct FakeCatalog {
        pub collections: HashMap<String, Vec<GameId>>,
        pub names: HashMap<GameId, String>,
        /// Usernames whose collection request fails with HTTP 500.
        pub failing_users: HashSet<String>,
        /// A name lookup batch containing any of these ids fails with HTTP 500.
        pub failing_ids: HashSet<GameId>,
        pub batch_size: usize,
        /// Every call, in order: `collection:<user>` or `thing:<id,id,...>`.
        pub calls: Mutex<Vec<String>>,
    }

    impl FakeCatalog {
        pub fn new() -> Self {
            Self {
                batch_size: 20,
                ..Self::default()
            }
        }

        pub fn with_collection(mut self, username: &str, ids: &[GameId]) -> Self {
            self.collections.insert(username.to_string(), ids.to_vec());
            self
        }

        pub fn with_game(mut self, id: GameId, name: &str) -> Self {
            self.names.insert(id, name.to_string());
            self
        }

        pub fn with_failing_user(mut self, username: &str) -> Self {
            self.failing_users.insert(username.to_string());
            self
        }

        pub fn with_failing_id(mut self, id: GameId) -> Self {
            self.failing_ids.insert(id);
            self
        }

        pub fn with_batch_size(mut self, batch_size: usize) -> Self {
            self.batch_size = batch_size;
            self
        }

        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().map(|c| c.clone()).unwrap_or_default()
        }

        fn record(&self, call: String) {
            if let Ok(mut calls) = self.calls.lock() {
                calls.push(call);
            }
        }
    }

    impl Catalog for FakeCatalog {
        async fn owned_game_ids(&self, username: &str) -> Result<Vec<GameId>, CatalogError> {
            self.record(format!("collection:{username}"));
            if self.failing_users.contains(username) {
                return Err(CatalogError::Status(500));
            }
            Ok(self.collections.get(username).cloned().unwrap_or_default())
        }

        async fn primary_names(
            &self,
            ids: &[GameId],
        ) -> Result<HashMap<GameId, String>, CatalogError> {
            let joined: Vec<String> = ids.iter().map(|id| id.to_string()).collect();
            self.record(format!("thing:{}", joined.join(",")));
            if ids.iter().any(|id| self.failing_ids.contains(id)) {
                return Err(CatalogError::Status(500));
            }
            Ok(ids
                .iter()
                .filter_map(|id| self.names.get(id).map(|n| (*id, n.clone())))
                .collect())
        }

        fn batch_size(&self) -> usize {
            self.batch_size
        }
    }

    /// Build an owner map from `(username, display name)` pairs.
    pub fn owner_map(entries: &[(&str, &str)]) -> OwnerMap {
        OwnerMap::from_entries(
            entries
                .iter()
                .map(|(u, d)| (u.to_string(), d.to_string())),
        )
    }
}
