//! Test Helper Utilities
//!
//! Temporary data roots laid out the way the store expects them:
//! `shows.json`, `reviews/<showId>/<file>.json`.

use anyhow::Result;
use curtain_reviews::{AuditReport, Command, CurtainConfig, Pipeline, ReferenceTables, RunMode, StoreError};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use walkdir::WalkDir;

/// Data root in a temp directory; the directory lives as long as this value
pub struct TestRoot {
    dir: TempDir,
}

impl TestRoot {
    /// Root with a registry of `shows` (id, openingDate, previewsStartDate)
    pub fn with_shows(shows: &[(&str, Option<&str>, Option<&str>)]) -> Result<Self> {
        let dir = TempDir::new()?;
        let registry: Vec<Value> = shows
            .iter()
            .map(|(id, opening, previews)| {
                json!({
                    "id": id,
                    "title": id,
                    "openingDate": opening,
                    "previewsStartDate": previews,
                })
            })
            .collect();
        std::fs::write(dir.path().join("shows.json"), serde_json::to_vec_pretty(&registry)?)?;
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write `reviews/<relative>`
    pub fn write_review(&self, relative: &str, record: Value) -> Result<PathBuf> {
        self.write_raw(relative, &serde_json::to_vec_pretty(&record)?)
    }

    pub fn write_raw(&self, relative: &str, bytes: &[u8]) -> Result<PathBuf> {
        let path = self.path().join("reviews").join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, bytes)?;
        Ok(path)
    }

    pub fn read_review(&self, relative: &str) -> Result<Value> {
        let bytes = std::fs::read(self.path().join("reviews").join(relative))?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    pub fn review_exists(&self, relative: &str) -> bool {
        self.path().join("reviews").join(relative).is_file()
    }

    /// Bytes of every file under `reviews/` and `consolidated/`, keyed by path
    pub fn snapshot(&self) -> BTreeMap<String, Vec<u8>> {
        let mut files = BTreeMap::new();
        for dir in ["reviews", "consolidated"] {
            let base = self.path().join(dir);
            for entry in WalkDir::new(&base).into_iter().filter_map(|e| e.ok()) {
                if entry.file_type().is_file() {
                    let key = entry
                        .path()
                        .strip_prefix(self.path())
                        .unwrap_or(entry.path())
                        .display()
                        .to_string();
                    files.insert(key, std::fs::read(entry.path()).unwrap_or_default());
                }
            }
        }
        files
    }

    /// Run one command with default config and the builtin tables
    pub async fn run(&self, command: Command, mode: RunMode) -> Result<AuditReport, StoreError> {
        let config = CurtainConfig::default();
        let tables = ReferenceTables::builtin().expect("builtin tables parse");
        Pipeline::new(&config, &tables, mode).execute(command, self.path()).await
    }
}
