//! On-disk entity files for store and push tests

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Value, json};
use tempfile::TempDir;

/// A temporary schema directory laid out as `components/` and `presets/`
pub struct SchemaDir {
    temp_dir: TempDir,
}

impl Default for SchemaDir {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaDir {
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().unwrap(),
        }
    }

    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Write raw content relative to the root, creating parent directories
    pub fn write(&self, relative: &str, content: &str) -> PathBuf {
        let path = self.root().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        path
    }

    /// Write `components/<file>.json`
    pub fn add_component(&self, file: &str, body: &Value) -> PathBuf {
        self.write(
            &format!("components/{}.json", file),
            &serde_json::to_string_pretty(body).unwrap(),
        )
    }

    /// Write `presets/<file>.json`
    pub fn add_preset(&self, file: &str, body: &Value) -> PathBuf {
        self.write(
            &format!("presets/{}.json", file),
            &serde_json::to_string_pretty(body).unwrap(),
        )
    }
}

/// A minimal valid component file body
pub fn component_json(name: &str) -> Value {
    json!({
        "name": name,
        "display_name": name,
        "schema": {"title": {"type": "text", "pos": 0}},
        "is_root": false,
        "is_nestable": true
    })
}

/// A minimal valid preset file body owned by `component`
pub fn preset_json(id: u64, name: &str, component: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "preset": {"component": component, "title": name}
    })
}
