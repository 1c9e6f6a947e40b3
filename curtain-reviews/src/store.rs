//! File-backed review store
//!
//! Layout under the root folder:
//! - `shows.json`: show registry (array)
//! - `reviews/<showId>/<file>.json`: one review sighting per file
//!
//! Loading never fails because of a single bad file: it is skipped with a
//! warning and listed in [`ReviewStore::skipped`]. Writes happen only for
//! records that changed, and only when the serialized bytes differ from
//! what is on disk.

use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::models::{ReviewRecord, Show, ShowRegistry};

pub const REGISTRY_FILE: &str = "shows.json";
pub const REVIEWS_DIR: &str = "reviews";
pub const CONSOLIDATED_DIR: &str = "consolidated";
pub const REPORTS_DIR: &str = "reports";

/// Review store errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// Show registry missing or unparseable (fatal for a run)
    #[error("Show registry {0}: {1}")]
    Registry(PathBuf, String),

    /// Review file is not valid JSON for a review
    #[error("Failed to parse {0}: {1}")]
    Parse(PathBuf, String),

    /// Write or delete failed
    #[error("Failed to write {0}: {1}")]
    Write(PathBuf, String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A file left out of the batch, with the error that caused it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedFile {
    pub path: String,
    pub error: String,
}

/// One review file and its in-memory record
#[derive(Debug, Clone)]
pub struct StoredReview {
    pub path: PathBuf,
    /// Path relative to the reviews directory (`<showId>/<file>.json`)
    pub relative: String,
    pub record: ReviewRecord,
    /// Record as loaded; a write happens only if `record` differs
    loaded: ReviewRecord,
}

impl StoredReview {
    pub fn is_modified(&self) -> bool {
        self.record != self.loaded
    }
}

/// Counts from one persist call
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistSummary {
    pub written: usize,
    pub unchanged: usize,
    pub failed: Vec<SkippedFile>,
}

/// Pretty JSON with a trailing newline
pub fn to_json_bytes<T: Serialize>(value: &T) -> serde_json::Result<Vec<u8>> {
    let mut bytes = serde_json::to_vec_pretty(value)?;
    bytes.push(b'\n');
    Ok(bytes)
}

/// Write `value` as JSON unless the file already holds the same bytes
///
/// Parent directories are created as needed.
///
/// # Returns
/// `true` if the file was written
pub async fn write_json_if_changed<T: Serialize>(path: &Path, value: &T) -> Result<bool, StoreError> {
    let bytes = to_json_bytes(value).map_err(|e| StoreError::Write(path.to_path_buf(), e.to_string()))?;

    match tokio::fs::read(path).await {
        Ok(existing) if existing == bytes => return Ok(false),
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(StoreError::Write(path.to_path_buf(), e.to_string())),
    }

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| StoreError::Write(parent.to_path_buf(), e.to_string()))?;
    }
    tokio::fs::write(path, &bytes)
        .await
        .map_err(|e| StoreError::Write(path.to_path_buf(), e.to_string()))?;
    Ok(true)
}

/// Load `<root>/shows.json`
pub async fn load_registry(root: &Path) -> Result<ShowRegistry, StoreError> {
    let path = root.join(REGISTRY_FILE);
    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|e| StoreError::Registry(path.clone(), e.to_string()))?;
    let shows: Vec<Show> =
        serde_json::from_slice(&bytes).map_err(|e| StoreError::Registry(path.clone(), e.to_string()))?;
    info!("Loaded {} shows from {}", shows.len(), path.display());
    Ok(ShowRegistry::new(shows))
}

/// All review files under one root, loaded into memory
#[derive(Debug, Default)]
pub struct ReviewStore {
    root: PathBuf,
    pub reviews: Vec<StoredReview>,
    pub skipped: Vec<SkippedFile>,
}

impl ReviewStore {
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn reviews_dir(root: &Path) -> PathBuf {
        root.join(REVIEWS_DIR)
    }

    /// Review files in deterministic (sorted path) order
    fn discover(reviews_dir: &Path, skipped: &mut Vec<SkippedFile>) -> Vec<PathBuf> {
        let mut files = Vec::new();
        let walker = WalkDir::new(reviews_dir)
            .follow_links(false)
            .min_depth(2)
            .max_depth(2)
            .sort_by_file_name();

        for entry in walker {
            match entry {
                Ok(entry) => {
                    let is_json = entry.path().extension().is_some_and(|ext| ext == "json");
                    if entry.file_type().is_file() && is_json {
                        files.push(entry.into_path());
                    }
                }
                Err(e) => {
                    let path = e.path().map(|p| p.display().to_string()).unwrap_or_default();
                    warn!("Skipping unreadable entry {}: {}", path, e);
                    skipped.push(SkippedFile {
                        path,
                        error: e.to_string(),
                    });
                }
            }
        }
        files
    }

    /// Load every review under `<root>/reviews`
    ///
    /// A missing reviews directory yields an empty store.
    pub async fn load(root: &Path) -> Self {
        let reviews_dir = Self::reviews_dir(root);
        let mut store = Self {
            root: root.to_path_buf(),
            ..Default::default()
        };
        if !reviews_dir.is_dir() {
            warn!("No reviews directory at {}", reviews_dir.display());
            return store;
        }

        for path in Self::discover(&reviews_dir, &mut store.skipped) {
            match Self::read_review(&reviews_dir, &path).await {
                Ok(review) => store.reviews.push(review),
                Err(e) => {
                    warn!("Skipping review file: {}", e);
                    store.skipped.push(SkippedFile {
                        path: path.display().to_string(),
                        error: e.to_string(),
                    });
                }
            }
        }

        info!(
            "Loaded {} reviews from {} ({} skipped)",
            store.reviews.len(),
            reviews_dir.display(),
            store.skipped.len()
        );
        store
    }

    async fn read_review(reviews_dir: &Path, path: &Path) -> Result<StoredReview, StoreError> {
        let bytes = tokio::fs::read(path).await?;
        let mut record: ReviewRecord =
            serde_json::from_slice(&bytes).map_err(|e| StoreError::Parse(path.to_path_buf(), e.to_string()))?;

        let relative = path
            .strip_prefix(reviews_dir)
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/");

        // Files without a showId belong to the directory they sit in
        if record.show_id.trim().is_empty() {
            if let Some(dir) = relative.split('/').next() {
                record.show_id = dir.to_string();
            }
        }

        Ok(StoredReview {
            path: path.to_path_buf(),
            relative,
            loaded: record.clone(),
            record,
        })
    }

    pub fn len(&self) -> usize {
        self.reviews.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reviews.is_empty()
    }

    /// Records in store order
    pub fn records(&self) -> Vec<&ReviewRecord> {
        self.reviews.iter().map(|r| &r.record).collect()
    }

    /// Mutable records in store order (indices match [`Self::records`])
    pub fn records_mut(&mut self) -> Vec<&mut ReviewRecord> {
        self.reviews.iter_mut().map(|r| &mut r.record).collect()
    }

    /// Write every modified record; per-file failures are collected, not raised
    pub async fn persist(&mut self) -> PersistSummary {
        let mut summary = PersistSummary::default();
        for review in &mut self.reviews {
            if !review.is_modified() {
                summary.unchanged += 1;
                continue;
            }
            match write_json_if_changed(&review.path, &review.record).await {
                Ok(true) => {
                    debug!("Wrote {}", review.relative);
                    review.loaded = review.record.clone();
                    summary.written += 1;
                }
                Ok(false) => {
                    review.loaded = review.record.clone();
                    summary.unchanged += 1;
                }
                Err(e) => {
                    warn!("{}", e);
                    summary.failed.push(SkippedFile {
                        path: review.relative.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }
        info!(
            "Persisted reviews: {} written, {} unchanged, {} failed",
            summary.written,
            summary.unchanged,
            summary.failed.len()
        );
        summary
    }

    /// Delete a review file and drop it from the store
    pub async fn delete(&mut self, index: usize) -> Result<StoredReview, StoreError> {
        let Some(review) = self.reviews.get(index) else {
            return Err(StoreError::Write(self.root.clone(), format!("no review at index {}", index)));
        };
        tokio::fs::remove_file(&review.path)
            .await
            .map_err(|e| StoreError::Write(review.path.clone(), e.to_string()))?;
        Ok(self.reviews.remove(index))
    }
}
