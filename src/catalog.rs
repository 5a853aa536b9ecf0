use std::collections::{BTreeMap, BTreeSet};

use crate::core::Category;
use crate::error::{SpriteMixError, SpriteMixResult};

/// One entry of the fetched catalog document: a category name and its item
/// filenames, in display order.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct CatalogEntry {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub src: Vec<String>,
}

/// Immutable per-category view of the available items.
///
/// Built once from the fetched catalog document; item order defines the
/// index-based addressing used by selection and the cache.
#[derive(Clone, Debug)]
pub struct AssetCatalog {
    items: BTreeMap<Category, Vec<String>>,
}

impl AssetCatalog {
    /// Parse a raw catalog document (`[{ "type": ..., "src": [...] }, ...]`).
    pub fn from_json(bytes: &[u8]) -> SpriteMixResult<Self> {
        let entries: Vec<CatalogEntry> = serde_json::from_slice(bytes)
            .map_err(|e| SpriteMixError::catalog_format(format!("parse catalog JSON: {e}")))?;
        Self::from_entries(entries)
    }

    /// Build the catalog from parsed entries.
    ///
    /// Entries with an unrecognized category or no items are skipped with a
    /// warning. Duplicate categories or duplicate item names within a
    /// category are format errors. Zero usable categories is fatal.
    pub fn from_entries(entries: Vec<CatalogEntry>) -> SpriteMixResult<Self> {
        let mut items = BTreeMap::new();

        for entry in entries {
            let Some(category) = Category::parse(&entry.kind) else {
                tracing::warn!(kind = %entry.kind, "skipping catalog entry with unrecognized category");
                continue;
            };
            if entry.src.is_empty() {
                tracing::warn!(category = %category, "skipping catalog entry with no items");
                continue;
            }

            // Catalog authors sometimes list full paths; addressing only ever
            // uses the file name.
            let names: Vec<String> = entry
                .src
                .iter()
                .map(|s| s.rsplit('/').next().unwrap_or(s).to_string())
                .collect();

            let mut seen = BTreeSet::new();
            for name in &names {
                if !seen.insert(name.as_str()) {
                    return Err(SpriteMixError::catalog_format(format!(
                        "duplicate item '{name}' in category '{category}'"
                    )));
                }
            }

            if items.insert(category, names).is_some() {
                return Err(SpriteMixError::catalog_format(format!(
                    "duplicate catalog entry for category '{category}'"
                )));
            }
        }

        if items.is_empty() {
            return Err(SpriteMixError::catalog_empty(
                "no usable categories in catalog",
            ));
        }

        Ok(Self { items })
    }

    /// Item names for a category. Absent categories yield an empty slice.
    pub fn items(&self, category: Category) -> &[String] {
        self.items.get(&category).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of items in a category (0 when absent).
    pub fn count(&self, category: Category) -> usize {
        self.items(category).len()
    }

    /// Bounds-checked item lookup.
    pub fn item_name(&self, category: Category, index: usize) -> SpriteMixResult<&str> {
        self.items(category).get(index).map(String::as_str).ok_or_else(|| {
            SpriteMixError::invalid_identifier(format!(
                "no item {index} in category '{category}' ({} items)",
                self.count(category)
            ))
        })
    }

    /// Categories that contributed at least one item, in draw order.
    pub fn present_categories(&self) -> impl Iterator<Item = Category> + '_ {
        Category::DRAW_ORDER
            .into_iter()
            .filter(|c| self.items.contains_key(c))
    }
}
