use std::collections::BTreeMap;

use rand::Rng as _;

use crate::catalog::AssetCatalog;
use crate::core::Category;
use crate::error::{SpriteMixError, SpriteMixResult};

/// The `(category, index)` pairs a mutation actually changed.
///
/// The session uses the delta to request newly selected images and to mark
/// the composite dirty; an empty delta implies neither side effect.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SelectionDelta {
    pub changed: Vec<(Category, usize)>,
}

impl SelectionDelta {
    pub fn is_empty(&self) -> bool {
        self.changed.is_empty()
    }

    fn single(category: Category, index: usize) -> Self {
        Self {
            changed: vec![(category, index)],
        }
    }
}

/// Current item index per category.
///
/// Every category carries an index; categories with zero items stay pinned at
/// the sentinel 0 and are immune to mutation. Selection never owns image
/// data.
#[derive(Debug)]
pub struct SelectionState {
    counts: BTreeMap<Category, usize>,
    current: BTreeMap<Category, usize>,
}

impl SelectionState {
    pub fn new(catalog: &AssetCatalog) -> Self {
        let mut counts = BTreeMap::new();
        let mut current = BTreeMap::new();
        for category in Category::DRAW_ORDER {
            counts.insert(category, catalog.count(category));
            current.insert(category, 0);
        }
        Self { counts, current }
    }

    /// Item count for a category.
    pub fn count(&self, category: Category) -> usize {
        self.counts.get(&category).copied().unwrap_or(0)
    }

    /// The selected index, or `None` for a category with no items.
    pub fn selected(&self, category: Category) -> Option<usize> {
        if self.count(category) == 0 {
            return None;
        }
        self.current.get(&category).copied()
    }

    /// Index per category, sentinel 0 included for empty categories.
    pub fn current_config(&self) -> BTreeMap<Category, usize> {
        self.current.clone()
    }

    /// Advance to the next item, wrapping modulo the item count.
    pub fn next(&mut self, category: Category) -> SelectionDelta {
        self.step(category, 1)
    }

    /// Step back to the previous item, wrapping modulo the item count.
    pub fn prev(&mut self, category: Category) -> SelectionDelta {
        let count = self.count(category);
        if count == 0 {
            return SelectionDelta::default();
        }
        self.step(category, count - 1)
    }

    fn step(&mut self, category: Category, delta: usize) -> SelectionDelta {
        let count = self.count(category);
        if count == 0 {
            return SelectionDelta::default();
        }
        let cur = self.current[&category];
        let next = (cur + delta) % count;
        if next == cur {
            return SelectionDelta::default();
        }
        self.current.insert(category, next);
        SelectionDelta::single(category, next)
    }

    /// Jump straight to an index. Out-of-range indices are reported, never
    /// silently applied.
    pub fn set_index(&mut self, category: Category, index: usize) -> SpriteMixResult<SelectionDelta> {
        let count = self.count(category);
        if index >= count {
            return Err(SpriteMixError::invalid_identifier(format!(
                "index {index} out of range for category '{category}' ({count} items)"
            )));
        }
        let cur = self.current[&category];
        if index == cur {
            return Ok(SelectionDelta::default());
        }
        self.current.insert(category, index);
        Ok(SelectionDelta::single(category, index))
    }

    /// Draw one uniformly random index for a category. No seed contract.
    pub fn randomize(&mut self, category: Category) -> SelectionDelta {
        let count = self.count(category);
        if count == 0 {
            return SelectionDelta::default();
        }
        let index = rand::rng().random_range(0..count);
        let cur = self.current[&category];
        if index == cur {
            return SelectionDelta::default();
        }
        self.current.insert(category, index);
        SelectionDelta::single(category, index)
    }

    /// Randomize every category independently (not a joint distribution).
    /// Categories with no items stay at the sentinel.
    pub fn randomize_all(&mut self) -> SelectionDelta {
        let mut rng = rand::rng();
        let mut changed = Vec::new();
        for category in Category::DRAW_ORDER {
            let count = self.count(category);
            if count == 0 {
                continue;
            }
            let index = rng.random_range(0..count);
            if index != self.current[&category] {
                self.current.insert(category, index);
                changed.push((category, index));
            }
        }
        SelectionDelta { changed }
    }
}
