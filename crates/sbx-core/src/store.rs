//! Local entity files
//!
//! Component files live in `<dir>/components` (when present) and `<dir>`;
//! preset files in `<dir>/presets` and `<dir>`. Files that fail to parse or
//! lack required fields are skipped with one summarized warning per kind.

use std::collections::BTreeSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use sbx_api::{Component, Preset};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tempfile::NamedTempFile;

use crate::{Error, Result};

/// Names shown before a skipped-file list is truncated
const SUMMARY_LIMIT: usize = 3;

/// A component and the file it was loaded from
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentFile {
    pub path: PathBuf,
    pub component: Component,
}

/// A preset and the file it was loaded from
#[derive(Debug, Clone, PartialEq)]
pub struct PresetFile {
    pub path: PathBuf,
    pub preset: Preset,
}

/// `<base>/<sub>` if it is a directory, followed by `<base>`
pub fn candidate_dirs(base: &Path, sub: &str) -> Vec<PathBuf> {
    let nested = base.join(sub);
    let mut dirs = Vec::with_capacity(2);
    if nested.is_dir() {
        dirs.push(nested);
    }
    dirs.push(base.to_path_buf());
    dirs
}

/// All `*.json` files in the candidate directories, sorted and deduplicated
pub fn discover_json(base: &Path, sub: &str) -> Result<Vec<PathBuf>> {
    let mut files = BTreeSet::new();
    for dir in candidate_dirs(base, sub) {
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
            Err(e) => return Err(Error::io(&dir, e)),
        };
        for entry in entries {
            let entry = entry.map_err(|e| Error::io(&dir, e))?;
            let path = entry.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
                files.insert(path);
            }
        }
    }
    Ok(files.into_iter().collect())
}

/// Load every component file under `dir` that has a name and a schema
pub fn load_components(dir: &Path) -> Result<Vec<ComponentFile>> {
    let mut skipped = Skipped::default();
    let mut components = Vec::new();

    for path in discover_json(dir, "components")? {
        match read_json::<Component>(&path) {
            Ok(component) if component.is_complete() => components.push(ComponentFile { path, component }),
            Ok(_) => skipped.incomplete.push(file_name(&path)),
            Err(e) => skipped.unparsable.push(format!("{} ({})", file_name(&path), source_message(&e))),
        }
    }

    skipped.warn("component", "name/schema");
    Ok(components)
}

/// Load every preset file under `dir` that has a name and a preset value
pub fn load_presets(dir: &Path) -> Result<Vec<PresetFile>> {
    let mut skipped = Skipped::default();
    let mut presets = Vec::new();

    for path in discover_json(dir, "presets")? {
        match read_json::<Preset>(&path) {
            Ok(preset) if preset.is_complete() => presets.push(PresetFile { path, preset }),
            Ok(_) => skipped.incomplete.push(file_name(&path)),
            Err(e) => skipped.unparsable.push(format!("{} ({})", file_name(&path), source_message(&e))),
        }
    }

    skipped.warn("preset", "name/preset");
    Ok(presets)
}

#[derive(Default)]
struct Skipped {
    unparsable: Vec<String>,
    incomplete: Vec<String>,
}

impl Skipped {
    fn warn(&self, kind: &str, required: &str) {
        if !self.unparsable.is_empty() {
            tracing::warn!(
                "Skipped {} {} files with parse errors: {}",
                self.unparsable.len(),
                kind,
                summarize_list(&self.unparsable, SUMMARY_LIMIT)
            );
        }
        if !self.incomplete.is_empty() {
            tracing::warn!(
                "Skipped {} {} files missing {}: {}",
                self.incomplete.len(),
                kind,
                required,
                summarize_list(&self.incomplete, SUMMARY_LIMIT)
            );
        }
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn source_message(err: &Error) -> String {
    match err {
        Error::Json { source, .. } => source.to_string(),
        Error::Io { source, .. } => source.to_string(),
        other => other.to_string(),
    }
}

/// Join the first `limit` items, noting how many were left out
pub fn summarize_list(items: &[String], limit: usize) -> String {
    let limit = if limit == 0 { SUMMARY_LIMIT } else { limit };
    if items.len() <= limit {
        return items.join(", ");
    }
    format!("{} (+{} more)", items[..limit].join(", "), items.len() - limit)
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read(path).map_err(|e| Error::io(path, e))?;
    serde_json::from_slice(&content).map_err(|e| Error::json(path, e))
}

/// Write `value` as pretty JSON, replacing `path` atomically.
///
/// The content goes to a temporary file next to the target first and is then
/// renamed over it, so readers never observe a partial file.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let mut content = serde_json::to_vec_pretty(value).map_err(|e| Error::json(path, e))?;
    content.push(b'\n');

    let parent = match path.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(parent) => parent,
        None => Path::new("."),
    };
    fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;

    // Dropping the temp file on any error path removes it
    let mut file = NamedTempFile::new_in(parent).map_err(|e| Error::io(parent, e))?;
    file.write_all(&content).map_err(|e| Error::io(file.path(), e))?;
    file.as_file().sync_all().map_err(|e| Error::io(file.path(), e))?;

    file.persist(path).map_err(|e| Error::io(path, e.error))?;
    Ok(())
}
