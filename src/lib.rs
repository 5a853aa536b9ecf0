#![forbid(unsafe_code)]

pub mod animation;
pub mod cache;
pub mod catalog;
pub mod composite;
pub mod core;
pub mod error;
pub mod export;
pub mod preview;
pub mod selection;
pub mod session;
pub mod source;

pub use crate::animation::{
    AnimationClock, DEFAULT_FRAME_COUNT, DEFAULT_SPEED, SourceRect, WalkCycle,
};
pub use crate::cache::{CacheEntry, ImageCache, ImageCacheOpts, PreparedSheet, PumpReport};
pub use crate::catalog::{AssetCatalog, CatalogEntry};
pub use crate::composite::{CompositeBuilder, CompositeOpts, RebuildOutcome};
pub use crate::core::{Category, SheetGeometry, SheetRgba};
pub use crate::error::{SpriteMixError, SpriteMixResult};
pub use crate::export::{
    CropRect, HostCommand, MessageTransport, OriginPolicy, RecordingTransport, SpriteUpdate,
    composite_data_url, crop_data_url, encode_composite, encode_crop, encode_png,
    eyewear_crop_rect,
};
pub use crate::preview::{PreviewOpts, PreviewRenderer};
pub use crate::selection::{SelectionDelta, SelectionState};
pub use crate::session::{CreatorSession, SessionOpts};
pub use crate::source::{FsSheetSource, LoadPoll, MemorySheetSource, SheetSource};
