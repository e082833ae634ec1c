use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::owners::OwnerMap;
use crate::record::{GameId, GameRecord};

/// What to do with owners that have no owner-map entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnmappedOwners {
    /// Ignore their ownership entirely.
    #[default]
    Drop,
    /// Keep them, labelled by their catalog username.
    PassThrough,
}

/// How owners are rendered in the output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OwnerLabel {
    /// Catalog username; the page maps it through the same owner map.
    #[default]
    Username,
    DisplayName,
}

#[derive(Debug, Clone, Default)]
pub struct JoinOptions {
    pub unmapped: UnmappedOwners,
    pub label: OwnerLabel,
    /// When non-empty, the output is restricted to exactly these ids.
    pub game_ids: Vec<GameId>,
}

/// The games one catalog user owns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ownership {
    pub username: String,
    pub game_ids: Vec<GameId>,
}

impl Ownership {
    pub fn new(username: impl Into<String>, game_ids: Vec<GameId>) -> Self {
        Self {
            username: username.into(),
            game_ids,
        }
    }
}

/// Join per-user ownership with resolved names into sorted output records.
///
/// Ids without a resolved name are dropped. With a configured id list every
/// listed id that has a name yields exactly one record, owned or not.
pub fn join(
    owners: &OwnerMap,
    ownership: &[Ownership],
    names: &HashMap<GameId, String>,
    options: &JoinOptions,
) -> Vec<GameRecord> {
    let mut game_to_owners: BTreeMap<GameId, BTreeSet<&str>> = BTreeMap::new();
    for entry in ownership {
        if options.unmapped == UnmappedOwners::Drop && !owners.contains(&entry.username) {
            continue;
        }
        for &id in &entry.game_ids {
            game_to_owners
                .entry(id)
                .or_default()
                .insert(entry.username.as_str());
        }
    }

    let candidates: BTreeSet<GameId> = if options.game_ids.is_empty() {
        game_to_owners.keys().copied().collect()
    } else {
        options.game_ids.iter().copied().collect()
    };

    let mut records: Vec<GameRecord> = candidates
        .into_iter()
        .filter_map(|id| {
            let name = names.get(&id)?;
            let mut labels: Vec<String> = game_to_owners
                .get(&id)
                .map(|set| {
                    set.iter()
                        .map(|username| label_for(owners, username, options.label))
                        .collect()
                })
                .unwrap_or_default();
            labels.sort();
            labels.dedup();
            Some(GameRecord::new(id, name.clone(), labels))
        })
        .collect();

    records.sort_by_cached_key(GameRecord::sort_key);
    records
}

fn label_for(owners: &OwnerMap, username: &str, label: OwnerLabel) -> String {
    match label {
        OwnerLabel::Username => username.to_string(),
        OwnerLabel::DisplayName => owners.display_name(username).unwrap_or(username).to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::owner_map;

    fn names(pairs: &[(GameId, &str)]) -> HashMap<GameId, String> {
        pairs.iter().map(|(id, n)| (*id, n.to_string())).collect()
    }

    #[test]
    fn joins_and_sorts_by_name_then_id() {
        let owners = owner_map(&[("alice", "Alice"), ("bob", "Bob")]);
        let ownership = vec![
            Ownership::new("bob", vec![13, 822]),
            Ownership::new("alice", vec![13]),
        ];
        let names = names(&[(13, "Catan"), (822, "carcassonne")]);

        let out = join(&owners, &ownership, &names, &JoinOptions::default());
        assert_eq!(
            out,
            vec![
                GameRecord::new(822, "carcassonne", vec!["bob".into()]),
                GameRecord::new(13, "Catan", vec!["alice".into(), "bob".into()]),
            ]
        );
    }

    #[test]
    fn shared_display_name_is_listed_once() {
        let owners = owner_map(&[("berk1", "Berk"), ("berk2", "Berk"), ("alice", "Alice")]);
        let ownership = vec![
            Ownership::new("berk1", vec![1]),
            Ownership::new("berk2", vec![1]),
            Ownership::new("alice", vec![1]),
        ];
        let options = JoinOptions {
            label: OwnerLabel::DisplayName,
            ..JoinOptions::default()
        };

        let out = join(&owners, &ownership, &names(&[(1, "Go")]), &options);
        assert_eq!(out[0].owners, vec!["Alice".to_string(), "Berk".to_string()]);
    }

    #[test]
    fn unresolved_ids_are_dropped() {
        let owners = owner_map(&[("alice", "Alice")]);
        let ownership = vec![Ownership::new("alice", vec![1, 2])];
        let out = join(&owners, &ownership, &names(&[(1, "Go")]), &JoinOptions::default());
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id, 1);
    }

    #[test]
    fn unmapped_owner_dropped_by_default() {
        let owners = owner_map(&[("alice", "Alice")]);
        let ownership = vec![
            Ownership::new("alice", vec![1]),
            Ownership::new("guest", vec![1, 2]),
        ];
        let names = names(&[(1, "Go"), (2, "Hive")]);

        let out = join(&owners, &ownership, &names, &JoinOptions::default());
        assert_eq!(out, vec![GameRecord::new(1, "Go", vec!["alice".into()])]);
    }

    #[test]
    fn unmapped_owner_passed_through_verbatim() {
        let owners = owner_map(&[("alice", "Alice")]);
        let ownership = vec![
            Ownership::new("alice", vec![1]),
            Ownership::new("guest", vec![1, 2]),
        ];
        let names = names(&[(1, "Go"), (2, "Hive")]);
        let options = JoinOptions {
            unmapped: UnmappedOwners::PassThrough,
            label: OwnerLabel::DisplayName,
            ..JoinOptions::default()
        };

        let out = join(&owners, &ownership, &names, &options);
        assert_eq!(
            out,
            vec![
                GameRecord::new(1, "Go", vec!["Alice".into(), "guest".into()]),
                GameRecord::new(2, "Hive", vec!["guest".into()]),
            ]
        );
    }

    #[test]
    fn display_name_labels() {
        let owners = owner_map(&[("berkerol", "Berk Erol"), ("zed", "Anna")]);
        let ownership = vec![
            Ownership::new("berkerol", vec![5]),
            Ownership::new("zed", vec![5]),
        ];
        let options = JoinOptions {
            label: OwnerLabel::DisplayName,
            ..JoinOptions::default()
        };
        let out = join(&owners, &ownership, &names(&[(5, "Azul")]), &options);
        assert_eq!(out[0].owners, vec!["Anna".to_string(), "Berk Erol".to_string()]);
    }

    #[test]
    fn configured_id_without_owners_keeps_empty_record() {
        let owners = owner_map(&[("alice", "Alice")]);
        let ownership = vec![Ownership::new("alice", vec![1])];
        let names = names(&[(1, "Go"), (2, "Hive")]);
        let options = JoinOptions {
            game_ids: vec![2, 1, 2],
            ..JoinOptions::default()
        };

        let out = join(&owners, &ownership, &names, &options);
        assert_eq!(
            out,
            vec![
                GameRecord::new(1, "Go", vec!["alice".into()]),
                GameRecord::new(2, "Hive", vec![]),
            ]
        );
    }

    #[test]
    fn configured_ids_exclude_other_games() {
        let owners = owner_map(&[("alice", "Alice")]);
        let ownership = vec![Ownership::new("alice", vec![1, 2])];
        let options = JoinOptions {
            game_ids: vec![2],
            ..JoinOptions::default()
        };
        let out = join(&owners, &ownership, &names(&[(1, "Go"), (2, "Hive")]), &options);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id, 2);
    }

    #[test]
    fn owner_without_games_never_appears() {
        let owners = owner_map(&[("alice", "Alice"), ("idle", "Idle")]);
        let ownership = vec![
            Ownership::new("alice", vec![1]),
            Ownership::new("idle", vec![]),
        ];
        let out = join(&owners, &ownership, &names(&[(1, "Go")]), &JoinOptions::default());
        assert!(out.iter().all(|r| !r.owners.iter().any(|o| o == "idle")));
    }

    #[test]
    fn empty_ownership_yields_empty_output() {
        let owners = owner_map(&[("alice", "Alice")]);
        let out = join(&owners, &[], &HashMap::new(), &JoinOptions::default());
        assert!(out.is_empty());
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        const USERS: [&str; 5] = ["alice", "bob", "carol", "dave", "guest"];

        fn arb_ownership() -> impl Strategy<Value = Vec<Ownership>> {
            proptest::collection::vec(
                (0..USERS.len(), proptest::collection::vec(1u64..30, 0..12)),
                0..8,
            )
            .prop_map(|rows| {
                rows.into_iter()
                    .map(|(u, ids)| Ownership::new(USERS[u], ids))
                    .collect()
            })
        }

        fn mapped() -> OwnerMap {
            owner_map(&[("alice", "A"), ("bob", "B"), ("carol", "C"), ("dave", "D")])
        }

        fn all_names() -> HashMap<GameId, String> {
            (1u64..30)
                .filter(|id| id % 7 != 0)
                .map(|id| (id, format!("Game {}", id % 5)))
                .collect()
        }

        proptest! {
            #[test]
            fn at_most_one_record_per_id(
                ownership in arb_ownership(),
                game_ids in proptest::collection::vec(1u64..30, 0..10),
            ) {
                let options = JoinOptions { game_ids, ..JoinOptions::default() };
                let out = join(&mapped(), &ownership, &all_names(), &options);
                let unique: BTreeSet<GameId> = out.iter().map(|r| r.id).collect();
                prop_assert_eq!(unique.len(), out.len());
            }

            #[test]
            fn dropped_owners_are_all_mapped(ownership in arb_ownership()) {
                let owners = mapped();
                let out = join(&owners, &ownership, &all_names(), &JoinOptions::default());
                for record in &out {
                    for owner in &record.owners {
                        prop_assert!(owners.contains(owner), "unmapped owner {owner}");
                    }
                }
            }

            #[test]
            fn configured_ids_with_names_always_present(
                ownership in arb_ownership(),
                game_ids in proptest::collection::vec(1u64..30, 1..10),
            ) {
                let names = all_names();
                let options = JoinOptions { game_ids: game_ids.clone(), ..JoinOptions::default() };
                let out = join(&mapped(), &ownership, &names, &options);
                for id in game_ids {
                    let present = out.iter().any(|r| r.id == id);
                    prop_assert_eq!(present, names.contains_key(&id));
                }
            }

            #[test]
            fn join_is_deterministic(ownership in arb_ownership()) {
                let mut reversed = ownership.clone();
                reversed.reverse();
                let a = join(&mapped(), &ownership, &all_names(), &JoinOptions::default());
                let b = join(&mapped(), &reversed, &all_names(), &JoinOptions::default());
                prop_assert_eq!(a, b);
            }
        }
    }
}
