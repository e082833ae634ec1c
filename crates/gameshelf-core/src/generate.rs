use std::collections::{BTreeSet, HashMap};

use crate::catalog::Catalog;
use crate::join::{JoinOptions, Ownership, UnmappedOwners, join};
use crate::owners::OwnerMap;
use crate::record::{GameId, GameRecord};

#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    #[error("all {0} collection requests failed")]
    AllUsersFailed(usize),
}

#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    /// Catalog usernames queried in addition to the owner map.
    pub extra_users: Vec<String>,
    pub join: JoinOptions,
}

/// Outcome of one generation pass.
#[derive(Debug, Clone, Default)]
pub struct Generation {
    pub records: Vec<GameRecord>,
    /// Users whose collection request failed and were left out.
    pub skipped_users: Vec<String>,
    /// Ids that did not resolve to a base-game name.
    pub unresolved_ids: Vec<GameId>,
}

/// Sequential collect -> resolve -> join pipeline over a [`Catalog`].
pub struct Generator<C> {
    catalog: C,
    options: GenerateOptions,
}

impl<C: Catalog> Generator<C> {
    pub fn new(catalog: C, options: GenerateOptions) -> Self {
        Self { catalog, options }
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    /// Usernames to query: owner map order, then extras not already mapped.
    /// Unmapped extras are skipped under the drop policy since their
    /// ownership would be discarded anyway.
    pub fn queried_users(&self, owners: &OwnerMap) -> Vec<String> {
        let mut users: Vec<String> = owners.usernames().map(str::to_string).collect();
        let mut seen: BTreeSet<String> = users.iter().cloned().collect();
        for extra in &self.options.extra_users {
            let extra = extra.trim();
            if extra.is_empty() || seen.contains(extra) {
                continue;
            }
            if self.options.join.unmapped == UnmappedOwners::Drop {
                tracing::debug!(username = extra, "Skipping unmapped extra user under drop policy");
                continue;
            }
            seen.insert(extra.to_string());
            users.push(extra.to_string());
        }
        users
    }

    pub async fn run(&self, owners: &OwnerMap) -> Result<Generation, GenerateError> {
        let users = self.queried_users(owners);
        let total = users.len();

        let mut ownership = Vec::with_capacity(total);
        let mut skipped_users = Vec::new();
        for (i, username) in users.iter().enumerate() {
            tracing::info!(username = %username, index = i + 1, total, "Fetching owned games");
            match self.catalog.owned_game_ids(username).await {
                Ok(ids) => {
                    tracing::debug!(username = %username, count = ids.len(), "Fetched collection");
                    ownership.push(Ownership::new(username.clone(), ids));
                },
                Err(e) => {
                    tracing::warn!(username = %username, error = %e, "Skipping user");
                    skipped_users.push(username.clone());
                },
            }
        }
        if total > 0 && skipped_users.len() == total {
            return Err(GenerateError::AllUsersFailed(total));
        }

        // A configured id list restricts the output, so only those ids need names.
        let wanted: BTreeSet<GameId> = if self.options.join.game_ids.is_empty() {
            ownership
                .iter()
                .flat_map(|o| o.game_ids.iter().copied())
                .collect()
        } else {
            self.options.join.game_ids.iter().copied().collect()
        };
        let wanted: Vec<GameId> = wanted.into_iter().collect();
        let names = self.resolve_names(&wanted).await;

        let unresolved_ids: Vec<GameId> = wanted
            .iter()
            .copied()
            .filter(|id| !names.contains_key(id))
            .collect();
        if !unresolved_ids.is_empty() {
            tracing::debug!(count = unresolved_ids.len(), "Dropping ids that are not base games");
        }

        let records = join(owners, &ownership, &names, &self.options.join);
        tracing::info!(
            games = records.len(),
            users = total - skipped_users.len(),
            skipped = skipped_users.len(),
            "Generation complete"
        );

        Ok(Generation {
            records,
            skipped_users,
            unresolved_ids,
        })
    }

    /// Resolve names batch by batch; a failed batch leaves its ids unresolved.
    async fn resolve_names(&self, ids: &[GameId]) -> HashMap<GameId, String> {
        let mut names = HashMap::with_capacity(ids.len());
        for chunk in ids.chunks(self.catalog.batch_size().max(1)) {
            match self.catalog.primary_names(chunk).await {
                Ok(resolved) => names.extend(resolved),
                Err(e) => {
                    tracing::warn!(
                        first_id = chunk[0],
                        count = chunk.len(),
                        error = %e,
                        "Failed to resolve names for batch"
                    );
                },
            }
        }
        names
    }
}
