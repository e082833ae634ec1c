use std::io::Write;
use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::record::GameRecord;

#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize games: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// `window.GAMES = [...]`, loaded by the page with a `<script>` tag.
    #[default]
    Js,
    Json,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct OutputOptions {
    pub format: OutputFormat,
    /// Adds a `generated_at` line; repeated runs then differ across days.
    pub stamp_date: bool,
}

const JS_BANNER: &str = "// AUTO-GENERATED. DO NOT EDIT.\n// Generated by gameshelf-gen\n";

/// Render records in the configured format. `generated_on` is only used
/// by the JS format.
pub fn render(
    records: &[GameRecord],
    format: OutputFormat,
    generated_on: Option<NaiveDate>,
) -> Result<String, OutputError> {
    match format {
        OutputFormat::Js => Ok(render_js(records, generated_on)),
        OutputFormat::Json => {
            let mut out = serde_json::to_string_pretty(records)?;
            out.push('\n');
            Ok(out)
        },
    }
}

fn render_js(records: &[GameRecord], generated_on: Option<NaiveDate>) -> String {
    let mut out = String::from(JS_BANNER);
    if let Some(date) = generated_on {
        out.push_str(&format!("// generated_at: {}\n", date.format("%Y-%m-%d")));
    }
    out.push_str("\nwindow.GAMES = [\n");
    for record in records {
        let owners: Vec<String> = record
            .owners
            .iter()
            .map(|o| format!("\"{}\"", js_escape(o)))
            .collect();
        out.push_str(&format!(
            "  {{ id: {}, name: \"{}\", owners: [{}] }},\n",
            record.id,
            js_escape(&record.name),
            owners.join(", ")
        ));
    }
    out.push_str("];\n");
    out
}

fn js_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out
}

/// Replace `path` with `contents` via a temp file in the same directory,
/// so readers never observe a partial write.
pub fn write_atomic(path: &Path, contents: &str) -> Result<(), OutputError> {
    let io_err = |source| OutputError::Io {
        path: path.display().to_string(),
        source,
    };
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(io_err)?;
    tmp.write_all(contents.as_bytes()).map_err(io_err)?;
    // The temp file is created owner-only; the page server must still read it.
    let permissions = match std::fs::metadata(path) {
        Ok(meta) => Some(meta.permissions()),
        Err(_) => default_permissions(),
    };
    if let Some(permissions) = permissions {
        tmp.as_file().set_permissions(permissions).map_err(io_err)?;
    }
    tmp.as_file().sync_all().map_err(io_err)?;
    tmp.persist(path).map_err(|e| io_err(e.error))?;
    tracing::debug!(path = %path.display(), bytes = contents.len(), "Wrote output");
    Ok(())
}

#[cfg(unix)]
fn default_permissions() -> Option<std::fs::Permissions> {
    use std::os::unix::fs::PermissionsExt;
    Some(std::fs::Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn default_permissions() -> Option<std::fs::Permissions> {
    None
}
