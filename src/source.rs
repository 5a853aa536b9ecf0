use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::catalog::CatalogEntry;
use crate::core::Category;
use crate::error::{SpriteMixError, SpriteMixResult};

/// Result of polling an in-flight image load.
#[derive(Clone, Debug)]
pub enum LoadPoll {
    /// Still loading; poll again on the next pump.
    Pending,
    /// Raw encoded image bytes, ready to decode.
    Ready(Vec<u8>),
    /// The load failed and will not complete.
    Failed(String),
}

/// The crate's only IO seam.
///
/// Everything downstream of the catalog and the per-item image bytes is
/// deterministic and IO-free; a source hides network, filesystem, or test
/// fixtures behind the same three calls. Loads are split into
/// `begin_load`/`poll_load` so several keys can be in flight at once and the
/// cache can observe `Pending` across pumps.
pub trait SheetSource {
    /// Fetch the catalog document. Called once at session startup; failure is
    /// fatal to initialization.
    fn fetch_catalog(&mut self) -> SpriteMixResult<Vec<CatalogEntry>>;

    /// Start loading one item's sheet. Called at most once per key per
    /// session by the cache.
    fn begin_load(&mut self, category: Category, item_name: &str);

    /// Poll an in-flight load.
    fn poll_load(&mut self, category: Category, item_name: &str) -> LoadPoll;
}

/// Directory-backed source: a catalog JSON file plus `<category>/<file>`
/// images under one root.
#[derive(Clone, Debug)]
pub struct FsSheetSource {
    root: PathBuf,
    catalog_file: String,
}

impl FsSheetSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            catalog_file: "assets.json".to_string(),
        }
    }

    /// Override the catalog file name (default `assets.json`).
    pub fn with_catalog_file(mut self, name: impl Into<String>) -> Self {
        self.catalog_file = name.into();
        self
    }
}

impl SheetSource for FsSheetSource {
    fn fetch_catalog(&mut self) -> SpriteMixResult<Vec<CatalogEntry>> {
        let path = self.root.join(&self.catalog_file);
        let bytes = std::fs::read(&path).map_err(|e| {
            SpriteMixError::catalog_fetch(format!("read '{}': {e}", path.display()))
        })?;
        serde_json::from_slice(&bytes).map_err(|e| {
            SpriteMixError::catalog_fetch(format!("parse '{}': {e}", path.display()))
        })
    }

    fn begin_load(&mut self, _category: Category, _item_name: &str) {
        // Filesystem loads resolve synchronously on the first poll.
    }

    fn poll_load(&mut self, category: Category, item_name: &str) -> LoadPoll {
        let path = self.root.join(category.as_str()).join(item_name);
        match std::fs::read(&path) {
            Ok(bytes) => LoadPoll::Ready(bytes),
            Err(e) => LoadPoll::Failed(format!("read '{}': {e}", path.display())),
        }
    }
}

/// In-memory source for tests and debugging.
///
/// Loads resolve from a scripted map; keys can be marked as failing or
/// withheld for a number of polls so pending/dirty interleavings are
/// observable.
#[derive(Clone, Debug, Default)]
pub struct MemorySheetSource {
    entries: Vec<CatalogEntry>,
    images: BTreeMap<(Category, String), Vec<u8>>,
    failures: BTreeMap<(Category, String), String>,
    withheld: BTreeMap<(Category, String), u32>,
    begun: BTreeMap<(Category, String), u32>,
}

impl MemorySheetSource {
    pub fn new(entries: Vec<CatalogEntry>) -> Self {
        Self {
            entries,
            ..Self::default()
        }
    }

    /// Provide encoded image bytes for one item.
    pub fn insert_image(&mut self, category: Category, item_name: &str, bytes: Vec<u8>) {
        self.images.insert((category, item_name.to_string()), bytes);
    }

    /// Script a load failure for one item.
    pub fn fail(&mut self, category: Category, item_name: &str, reason: &str) {
        self.failures
            .insert((category, item_name.to_string()), reason.to_string());
    }

    /// Keep one item `Pending` for the next `polls` polls before it resolves.
    pub fn withhold(&mut self, category: Category, item_name: &str, polls: u32) {
        self.withheld.insert((category, item_name.to_string()), polls);
    }

    /// How many times `begin_load` was called for one item.
    pub fn begin_count(&self, category: Category, item_name: &str) -> u32 {
        self.begun
            .get(&(category, item_name.to_string()))
            .copied()
            .unwrap_or(0)
    }
}

impl SheetSource for MemorySheetSource {
    fn fetch_catalog(&mut self) -> SpriteMixResult<Vec<CatalogEntry>> {
        Ok(self.entries.clone())
    }

    fn begin_load(&mut self, category: Category, item_name: &str) {
        *self.begun.entry((category, item_name.to_string())).or_insert(0) += 1;
    }

    fn poll_load(&mut self, category: Category, item_name: &str) -> LoadPoll {
        let key = (category, item_name.to_string());
        if let Some(polls) = self.withheld.get_mut(&key)
            && *polls > 0
        {
            *polls -= 1;
            return LoadPoll::Pending;
        }
        if let Some(reason) = self.failures.get(&key) {
            return LoadPoll::Failed(reason.clone());
        }
        match self.images.get(&key) {
            Some(bytes) => LoadPoll::Ready(bytes.clone()),
            None => LoadPoll::Failed(format!("no image for {category}/{item_name}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_source_scripts_pending_then_ready() {
        let mut source = MemorySheetSource::new(vec![]);
        source.insert_image(Category::Body, "a.png", vec![1, 2, 3]);
        source.withhold(Category::Body, "a.png", 2);

        assert!(matches!(
            source.poll_load(Category::Body, "a.png"),
            LoadPoll::Pending
        ));
        assert!(matches!(
            source.poll_load(Category::Body, "a.png"),
            LoadPoll::Pending
        ));
        let LoadPoll::Ready(bytes) = source.poll_load(Category::Body, "a.png") else {
            panic!("expected ready");
        };
        assert_eq!(bytes, vec![1, 2, 3]);
    }

    #[test]
    fn memory_source_reports_missing_items_as_failed() {
        let mut source = MemorySheetSource::new(vec![]);
        assert!(matches!(
            source.poll_load(Category::Head, "missing.png"),
            LoadPoll::Failed(_)
        ));
    }

    #[test]
    fn fs_source_missing_catalog_is_a_fetch_error() {
        let mut source = FsSheetSource::new("/nonexistent/spritemix-test");
        let err = source.fetch_catalog().unwrap_err();
        assert!(matches!(err, SpriteMixError::CatalogFetch(_)));
    }
}
