use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::sync::Arc;

use crate::core::Category;
use crate::error::{SpriteMixError, SpriteMixResult};
use crate::source::{LoadPoll, SheetSource};

/// Decoded part sheet in premultiplied RGBA8 form.
#[derive(Clone, Debug)]
pub struct PreparedSheet {
    /// Natural width in pixels.
    pub width: u32,
    /// Natural height in pixels.
    pub height: u32,
    /// Premultiplied RGBA8, row-major, tightly packed.
    pub rgba8_premul: Arc<Vec<u8>>,
}

/// State of one cached `(category, item index)` image.
#[derive(Clone, Debug)]
pub enum CacheEntry {
    /// Load in flight; `polls` counts pumps survived (feeds the timeout).
    Pending { polls: u32 },
    Ready(PreparedSheet),
    /// Load or decode failed; never retried unless the key is cleared.
    Failed(String),
}

impl CacheEntry {
    pub fn is_pending(&self) -> bool {
        matches!(self, CacheEntry::Pending { .. })
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, CacheEntry::Ready(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, CacheEntry::Failed(_))
    }

    pub fn sheet(&self) -> Option<&PreparedSheet> {
        match self {
            CacheEntry::Ready(sheet) => Some(sheet),
            _ => None,
        }
    }
}

/// Cache configuration.
#[derive(Clone, Copy, Debug)]
pub struct ImageCacheOpts {
    /// A key still pending after this many pumps resolves to `Failed`, so a
    /// never-resolving load cannot leave its layer missing forever. `None`
    /// disables the timeout.
    pub timeout_polls: Option<u32>,
}

impl Default for ImageCacheOpts {
    fn default() -> Self {
        // ~10 seconds of pumps at a 60 Hz host loop.
        Self {
            timeout_polls: Some(600),
        }
    }
}

/// Counts reported by one [`ImageCache::pump`] pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PumpReport {
    /// Keys that transitioned to `Ready` this pump. The session turns a
    /// non-zero count into a composite `mark_dirty`.
    pub newly_ready: usize,
    /// Keys that transitioned to `Failed` this pump (load error, decode
    /// error, or timeout).
    pub newly_failed: usize,
    /// Keys still pending after this pump.
    pub still_pending: usize,
}

/// Memoized image loader keyed by `(category, item index)`.
///
/// The loader is invoked at most once per key per session: concurrent
/// requests for the same key share the single in-flight load. Failures are
/// recorded, never propagated — the system stays usable with partial assets.
/// Entries grow monotonically; the only eviction is an explicit per-key
/// [`clear`](ImageCache::clear), which permits a retry.
#[derive(Debug)]
pub struct ImageCache {
    entries: BTreeMap<(Category, usize), CacheEntry>,
    item_names: BTreeMap<(Category, usize), String>,
    loads_started: BTreeMap<(Category, usize), u32>,
    opts: ImageCacheOpts,
}

impl ImageCache {
    pub fn new(opts: ImageCacheOpts) -> Self {
        Self {
            entries: BTreeMap::new(),
            item_names: BTreeMap::new(),
            loads_started: BTreeMap::new(),
            opts,
        }
    }

    /// Request one item's sheet, starting a load on first use.
    ///
    /// Re-requesting a key that is pending, ready, or failed is a no-op that
    /// returns the current entry.
    pub fn request(
        &mut self,
        source: &mut dyn SheetSource,
        category: Category,
        index: usize,
        item_name: &str,
    ) -> &CacheEntry {
        let key = (category, index);
        match self.entries.entry(key) {
            Entry::Occupied(e) => e.into_mut(),
            Entry::Vacant(v) => {
                tracing::debug!(category = %category, index, item = item_name, "starting image load");
                source.begin_load(category, item_name);
                self.item_names.insert(key, item_name.to_string());
                *self.loads_started.entry(key).or_insert(0) += 1;
                v.insert(CacheEntry::Pending { polls: 0 })
            }
        }
    }

    /// Current state of a key, if it was ever requested.
    pub fn entry(&self, category: Category, index: usize) -> Option<&CacheEntry> {
        self.entries.get(&(category, index))
    }

    /// The prepared sheet for a key, when ready.
    pub fn ready_sheet(&self, category: Category, index: usize) -> Option<&PreparedSheet> {
        self.entry(category, index).and_then(CacheEntry::sheet)
    }

    /// Cumulative count of loads started for a key (the memoization
    /// instrumentation point: 1 unless the key was cleared and re-requested).
    pub fn loads_started(&self, category: Category, index: usize) -> u32 {
        self.loads_started
            .get(&(category, index))
            .copied()
            .unwrap_or(0)
    }

    /// Drop one key so the next request re-triggers its load. Unrelated keys
    /// are untouched.
    pub fn clear(&mut self, category: Category, index: usize) {
        let key = (category, index);
        self.entries.remove(&key);
        self.item_names.remove(&key);
    }

    /// Poll every pending key once, decoding sheets that arrived and applying
    /// the timeout.
    pub fn pump(&mut self, source: &mut dyn SheetSource) -> PumpReport {
        let mut report = PumpReport::default();

        let pending: Vec<(Category, usize)> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_pending())
            .map(|(key, _)| *key)
            .collect();

        for key in pending {
            let (category, index) = key;
            let Some(item_name) = self.item_names.get(&key).cloned() else {
                continue;
            };

            match source.poll_load(category, &item_name) {
                LoadPoll::Pending => {
                    let polls = match self.entries.get(&key) {
                        Some(CacheEntry::Pending { polls }) => polls + 1,
                        _ => 1,
                    };
                    if self.opts.timeout_polls.is_some_and(|limit| polls > limit) {
                        tracing::warn!(
                            category = %category,
                            index,
                            item = %item_name,
                            polls,
                            "image load timed out"
                        );
                        self.entries
                            .insert(key, CacheEntry::Failed("load timed out".to_string()));
                        report.newly_failed += 1;
                    } else {
                        self.entries.insert(key, CacheEntry::Pending { polls });
                        report.still_pending += 1;
                    }
                }
                LoadPoll::Ready(bytes) => match decode_sheet(&bytes) {
                    Ok(sheet) => {
                        tracing::debug!(
                            category = %category,
                            index,
                            width = sheet.width,
                            height = sheet.height,
                            "image ready"
                        );
                        self.entries.insert(key, CacheEntry::Ready(sheet));
                        report.newly_ready += 1;
                    }
                    Err(e) => {
                        tracing::warn!(category = %category, index, item = %item_name, error = %e, "image decode failed");
                        self.entries.insert(key, CacheEntry::Failed(e.to_string()));
                        report.newly_failed += 1;
                    }
                },
                LoadPoll::Failed(reason) => {
                    tracing::warn!(category = %category, index, item = %item_name, reason = %reason, "image load failed");
                    self.entries.insert(key, CacheEntry::Failed(reason));
                    report.newly_failed += 1;
                }
            }
        }

        report
    }
}

/// Decode encoded image bytes into a premultiplied sheet.
///
/// Pixels are premultiplied at ingest; compositing assumes it.
pub(crate) fn decode_sheet(bytes: &[u8]) -> SpriteMixResult<PreparedSheet> {
    let dyn_img = image::load_from_memory(bytes)
        .map_err(|e| SpriteMixError::image_load(format!("decode image: {e}")))?;
    let rgba = dyn_img.to_rgba8();
    let (width, height) = rgba.dimensions();

    let mut rgba8_premul = rgba.into_raw();
    premultiply_rgba8_in_place(&mut rgba8_premul);

    Ok(PreparedSheet {
        width,
        height,
        rgba8_premul: Arc::new(rgba8_premul),
    })
}

fn premultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a == 0 {
            px[0] = 0;
            px[1] = 0;
            px[2] = 0;
            continue;
        }
        px[0] = ((px[0] as u16 * a + 127) / 255) as u8;
        px[1] = ((px[1] as u16 * a + 127) / 255) as u8;
        px[2] = ((px[2] as u16 * a + 127) / 255) as u8;
    }
}
