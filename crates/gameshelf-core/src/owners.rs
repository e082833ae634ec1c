use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::de::{Deserialize, Deserializer, MapAccess, Visitor};

/// Failure to load the owner map. Always fatal to a run.
#[derive(Debug, thiserror::Error)]
pub enum OwnerMapError {
    #[error("failed to read owner map {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("owner map syntax error on line {line}: {message}")]
    Syntax { line: usize, message: String },
    #[error("invalid owner map JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid owner map TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("owner map contains no usernames")]
    Empty,
    #[error("unsupported owner map format: {0}")]
    UnsupportedFormat(String),
}

/// Catalog username -> human display name, in source order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OwnerMap {
    entries: Vec<(String, String)>,
    index: HashMap<String, usize>,
}

impl OwnerMap {
    /// Build a map from pairs. Empty usernames are skipped and the first
    /// entry for a repeated username wins.
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut map = Self::default();
        for (username, display) in entries {
            let username = username.trim().to_string();
            if username.is_empty() || map.index.contains_key(&username) {
                continue;
            }
            map.index.insert(username.clone(), map.entries.len());
            map.entries.push((username, display));
        }
        map
    }

    /// Load from disk, choosing the parser by file extension
    /// (`.js`, `.json` or `.toml`). A map with no usernames is an error.
    pub fn load(path: &Path) -> Result<Self, OwnerMapError> {
        let content = std::fs::read_to_string(path).map_err(|source| OwnerMapError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let map = match ext.as_str() {
            "js" | "mjs" => Self::parse_js(&content)?,
            "json" => Self::parse_json(&content)?,
            "toml" => Self::parse_toml(&content)?,
            other => return Err(OwnerMapError::UnsupportedFormat(other.to_string())),
        };
        if map.is_empty() {
            return Err(OwnerMapError::Empty);
        }
        tracing::debug!(path = %path.display(), count = map.len(), "Loaded owner map");
        Ok(map)
    }

    /// Parse the object literal of a `users.js` file:
    ///
    /// ```text
    /// const users = { // eslint-disable-line no-unused-vars
    ///   'berkerol': 'Berk Erol',
    ///   "alice": "Alice A."
    /// }
    /// ```
    pub fn parse_js(src: &str) -> Result<Self, OwnerMapError> {
        let entries = JsObjectScanner::new(src).entries()?;
        Ok(Self::from_entries(entries))
    }

    /// Parse a flat JSON object of strings, keeping key order.
    pub fn parse_json(src: &str) -> Result<Self, OwnerMapError> {
        let table: FlatEntries = serde_json::from_str(src)?;
        Ok(Self::from_entries(table.0))
    }

    /// Parse a flat TOML table of strings, keeping key order.
    pub fn parse_toml(src: &str) -> Result<Self, OwnerMapError> {
        let table: FlatEntries = toml::from_str(src)?;
        Ok(Self::from_entries(table.0))
    }

    pub fn display_name(&self, username: &str) -> Option<&str> {
        self.index
            .get(username)
            .map(|&i| self.entries[i].1.as_str())
    }

    pub fn contains(&self, username: &str) -> bool {
        self.index.contains_key(username)
    }

    /// Usernames in source order.
    pub fn usernames(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(u, _)| u.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// String-to-string map entries in document order, duplicates included.
struct FlatEntries(Vec<(String, String)>);

impl<'de> Deserialize<'de> for FlatEntries {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct EntriesVisitor;

        impl<'de> Visitor<'de> for EntriesVisitor {
            type Value = FlatEntries;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a flat map of username to display name")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<FlatEntries, A::Error> {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some(entry) = map.next_entry::<String, String>()? {
                    entries.push(entry);
                }
                Ok(FlatEntries(entries))
            }
        }

        deserializer.deserialize_map(EntriesVisitor)
    }
}

/// Minimal scanner for a flat JS object literal of string keys and values.
struct JsObjectScanner<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
    line: usize,
}

impl<'a> JsObjectScanner<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            chars: src.chars().peekable(),
            line: 1,
        }
    }

    fn entries(mut self) -> Result<Vec<(String, String)>, OwnerMapError> {
        self.seek_open_brace()?;
        let mut out = Vec::new();
        loop {
            self.skip_trivia()?;
            match self.chars.peek().copied() {
                Some('}') => return Ok(out),
                Some(',') => {
                    self.bump();
                },
                Some(_) => {
                    let key = self.key()?;
                    self.skip_trivia()?;
                    if self.bump() != Some(':') {
                        return Err(self.error(format!("expected ':' after key '{key}'")));
                    }
                    self.skip_trivia()?;
                    let value = match self.chars.peek() {
                        Some('\'' | '"') => self.string()?,
                        _ => return Err(self.error(format!("expected string value for '{key}'"))),
                    };
                    out.push((key, value));
                },
                None => return Err(self.error("unterminated object literal".to_string())),
            }
        }
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.next();
        if c == Some('\n') {
            self.line += 1;
        }
        c
    }

    fn error(&self, message: String) -> OwnerMapError {
        OwnerMapError::Syntax {
            line: self.line,
            message,
        }
    }

    fn seek_open_brace(&mut self) -> Result<(), OwnerMapError> {
        loop {
            self.skip_trivia()?;
            match self.bump() {
                Some('{') => return Ok(()),
                Some('\'' | '"') => {
                    return Err(self.error("string literal before object literal".to_string()));
                },
                Some(_) => {},
                None => return Err(self.error("no object literal found".to_string())),
            }
        }
    }

    /// Whitespace and `//` or `/* */` comments.
    fn skip_trivia(&mut self) -> Result<(), OwnerMapError> {
        loop {
            match self.chars.peek().copied() {
                Some(c) if c.is_whitespace() => {
                    self.bump();
                },
                Some('/') => {
                    let mut ahead = self.chars.clone();
                    ahead.next();
                    match ahead.next() {
                        Some('/') => {
                            while let Some(c) = self.bump() {
                                if c == '\n' {
                                    break;
                                }
                            }
                        },
                        Some('*') => {
                            self.bump();
                            self.bump();
                            let mut prev = '\0';
                            loop {
                                match self.bump() {
                                    Some('/') if prev == '*' => break,
                                    Some(c) => prev = c,
                                    None => {
                                        return Err(self.error("unterminated comment".to_string()));
                                    },
                                }
                            }
                        },
                        _ => return Ok(()),
                    }
                },
                _ => return Ok(()),
            }
        }
    }

    fn key(&mut self) -> Result<String, OwnerMapError> {
        match self.chars.peek().copied() {
            Some('\'' | '"') => self.string(),
            Some(c) if is_ident_char(c) => {
                let mut key = String::new();
                while let Some(&c) = self.chars.peek() {
                    if !is_ident_char(c) {
                        break;
                    }
                    key.push(c);
                    self.bump();
                }
                Ok(key)
            },
            Some(c) => Err(self.error(format!("unexpected character '{c}'"))),
            None => Err(self.error("unterminated object literal".to_string())),
        }
    }

    fn string(&mut self) -> Result<String, OwnerMapError> {
        let quote = self.bump();
        let mut out = String::new();
        loop {
            if matches!(self.chars.peek(), Some('\n') | None) {
                return Err(self.error("unterminated string literal".to_string()));
            }
            match self.bump() {
                Some(c) if Some(c) == quote => return Ok(out),
                Some('\\') => out.push(self.escape()?),
                Some(c) => out.push(c),
                None => return Err(self.error("unterminated string literal".to_string())),
            }
        }
    }

    fn escape(&mut self) -> Result<char, OwnerMapError> {
        match self.bump() {
            Some('n') => Ok('\n'),
            Some('t') => Ok('\t'),
            Some('r') => Ok('\r'),
            Some('0') => Ok('\0'),
            Some(c @ ('\\' | '\'' | '"' | '/')) => Ok(c),
            Some('u') => {
                let mut hex = String::with_capacity(4);
                for _ in 0..4 {
                    match self.bump() {
                        Some(h) if h.is_ascii_hexdigit() => hex.push(h),
                        _ => return Err(self.error("invalid \\u escape".to_string())),
                    }
                }
                u32::from_str_radix(&hex, 16)
                    .ok()
                    .and_then(char::from_u32)
                    .ok_or_else(|| self.error(format!("invalid code point \\u{hex}")))
            },
            Some(c) => Err(self.error(format!("invalid escape '\\{c}'"))),
            None => Err(self.error("unterminated string literal".to_string())),
        }
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

#[cfg(test)]
mod tests {
    use super::*;

    const USERS_JS: &str = r#"const users = { // eslint-disable-line no-unused-vars
  'berkerol': 'Berk Erol',
  "alice": "Alice A.",
  /* guests */
  bob_42: 'Bob',
}
"#;

    #[test]
    fn parses_users_js() {
        let map = OwnerMap::parse_js(USERS_JS).unwrap();
        assert_eq!(map.len(), 3);
        assert_eq!(map.display_name("berkerol"), Some("Berk Erol"));
        assert_eq!(map.display_name("alice"), Some("Alice A."));
        assert_eq!(map.display_name("bob_42"), Some("Bob"));
        assert!(!map.contains("carol"));
    }

    #[test]
    fn preserves_source_order() {
        let map = OwnerMap::parse_js(USERS_JS).unwrap();
        let names: Vec<&str> = map.usernames().collect();
        assert_eq!(names, vec!["berkerol", "alice", "bob_42"]);
    }

    #[test]
    fn first_duplicate_wins() {
        let map = OwnerMap::parse_js("{ 'a': 'First', 'a': 'Second' }").unwrap();
        assert_eq!(map.len(), 1);
        assert_eq!(map.display_name("a"), Some("First"));
    }

    #[test]
    fn keys_are_trimmed_and_blank_keys_skipped() {
        let map = OwnerMap::parse_js("{ ' padded ': 'P', '  ': 'Blank' }").unwrap();
        assert_eq!(map.len(), 1);
        assert!(map.contains("padded"));
    }

    #[test]
    fn unescapes_strings() {
        let map = OwnerMap::parse_js(r#"{ 'o\'neil': "Tab\there é", "q": 'say \"hi\"' }"#)
            .unwrap();
        assert_eq!(map.display_name("o'neil"), Some("Tab\there é"));
        assert_eq!(map.display_name("q"), Some("say \"hi\""));
    }

    #[test]
    fn empty_object_parses_to_empty_map() {
        let map = OwnerMap::parse_js("const users = {}").unwrap();
        assert!(map.is_empty());
    }

    #[test]
    fn unterminated_string_reports_line() {
        let err = OwnerMap::parse_js("const users = {\n  'alice': 'Alice\n}").unwrap_err();
        match err {
            OwnerMapError::Syntax { line, .. } => assert_eq!(line, 2),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_colon_is_syntax_error() {
        let err = OwnerMap::parse_js("{ 'alice' 'Alice' }").unwrap_err();
        assert!(matches!(err, OwnerMapError::Syntax { .. }));
    }

    #[test]
    fn non_string_value_is_syntax_error() {
        let err = OwnerMap::parse_js("{ 'alice': 42 }").unwrap_err();
        assert!(matches!(err, OwnerMapError::Syntax { .. }));
    }

    #[test]
    fn missing_object_is_syntax_error() {
        let err = OwnerMap::parse_js("const users = null;").unwrap_err();
        assert!(matches!(err, OwnerMapError::Syntax { .. }));
    }

    #[test]
    fn invalid_escape_is_syntax_error() {
        let err = OwnerMap::parse_js(r"{ 'a': 'bad \q' }").unwrap_err();
        assert!(matches!(err, OwnerMapError::Syntax { .. }));
    }

    #[test]
    fn parses_json_and_toml() {
        let json = OwnerMap::parse_json(r#"{"alice": "Alice", "bob": "Bob"}"#).unwrap();
        assert_eq!(json.display_name("bob"), Some("Bob"));

        let toml = OwnerMap::parse_toml("alice = \"Alice\"\nbob = \"Bob\"\n").unwrap();
        assert_eq!(toml.len(), 2);
        assert_eq!(toml.display_name("alice"), Some("Alice"));
    }

    #[test]
    fn json_keeps_file_order_and_first_duplicate() {
        let map = OwnerMap::parse_json(r#"{"zed": "Z", "alice": "First", "alice": "Second"}"#)
            .unwrap();
        assert_eq!(map.usernames().collect::<Vec<_>>(), vec!["zed", "alice"]);
        assert_eq!(map.display_name("alice"), Some("First"));
    }

    #[test]
    fn toml_keeps_file_order() {
        let map = OwnerMap::parse_toml("zed = \"Z\"\nalice = \"Alice\"\nmike = \"M\"\n").unwrap();
        assert_eq!(map.usernames().collect::<Vec<_>>(), vec!["zed", "alice", "mike"]);
    }

    #[test]
    fn json_with_non_string_value_fails() {
        assert!(matches!(
            OwnerMap::parse_json(r#"{"alice": 1}"#),
            Err(OwnerMapError::Json(_))
        ));
    }

    #[test]
    fn load_dispatches_on_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users.js");
        std::fs::write(&path, USERS_JS).unwrap();
        assert_eq!(OwnerMap::load(&path).unwrap().len(), 3);

        let path = dir.path().join("users.yaml");
        std::fs::write(&path, "alice: Alice").unwrap();
        assert!(matches!(
            OwnerMap::load(&path),
            Err(OwnerMapError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn load_rejects_empty_map() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users.js");
        std::fs::write(&path, "const users = { }").unwrap();
        assert!(matches!(OwnerMap::load(&path), Err(OwnerMapError::Empty)));
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let err = OwnerMap::load(Path::new("/nonexistent/users.js")).unwrap_err();
        assert!(matches!(err, OwnerMapError::Io { .. }));
    }
}
