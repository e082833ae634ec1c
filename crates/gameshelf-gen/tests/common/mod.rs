use std::path::PathBuf;

use gameshelf_bgg::stub::{StubData, StubServer};
use gameshelf_gen::config::GeneratorConfig;

pub const USERS_JS: &str = "const users = { // eslint-disable-line no-unused-vars
  'alice': 'Alice Liddell',
  'bob': 'Bob B.',
  'idle': 'Never Plays'
}
";

/// A temp site directory holding `users.js` and receiving the output.
pub struct Site {
    pub dir: tempfile::TempDir,
}

impl Site {
    pub fn new(users_js: &str) -> Self {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("users.js"), users_js).unwrap();
        Self { dir }
    }

    pub fn output_path(&self) -> PathBuf {
        self.dir.path().join("games.js")
    }

    pub fn read_output(&self) -> String {
        std::fs::read_to_string(self.output_path()).unwrap()
    }

    /// Config writing into this site and reading BGG from `stub`.
    pub fn config(&self, stub: &StubServer) -> GeneratorConfig {
        let mut config = GeneratorConfig {
            owner_map: self.dir.path().join("users.js"),
            output: self.output_path(),
            ..GeneratorConfig::default()
        };
        config.bgg.base_url = stub.base_url();
        config.bgg.token = Some("test-token".to_string());
        config.bgg.retry_delay_ms = 0;
        config.bgg.user_delay_ms = 0;
        config.bgg.batch_delay_ms = 0;
        config
    }
}

/// BGG data for the three users in [`USERS_JS`].
pub fn shelf() -> StubData {
    StubData::default()
        .with_collection("alice", &[13, 822, 28720])
        .with_collection("bob", &[13, 174430])
        .with_collection("idle", &[])
        .with_game(13, "CATAN")
        .with_game(822, "Carcassonne")
        .with_game(174430, "Gloomhaven")
}
