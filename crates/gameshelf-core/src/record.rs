use serde::{Deserialize, Serialize};

/// Catalog identifier of a game (BGG `objectid`).
pub type GameId = u64;

/// One row of the generated output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameRecord {
    pub id: GameId,
    pub name: String,
    /// Owner labels, sorted ascending.
    #[serde(default)]
    pub owners: Vec<String>,
}

impl GameRecord {
    pub fn new(id: GameId, name: impl Into<String>, owners: Vec<String>) -> Self {
        Self {
            id,
            name: name.into(),
            owners,
        }
    }

    /// Sort key: case-folded name first, id as tie-breaker.
    pub fn sort_key(&self) -> (String, GameId) {
        (fold_case(&self.name), self.id)
    }
}

/// Full case folding for the letters where it differs from lowercasing.
fn fold_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars().flat_map(char::to_lowercase) {
        match c {
            'ß' => out.push_str("ss"),
            'ς' => out.push('σ'),
            c => out.push(c),
        }
    }
    out
}
