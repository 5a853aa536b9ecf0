use std::time::Duration;

use crate::animation::{AnimationClock, DEFAULT_SPEED, WalkCycle};
use crate::cache::{ImageCache, ImageCacheOpts, PumpReport};
use crate::catalog::AssetCatalog;
use crate::composite::{CompositeBuilder, CompositeOpts, RebuildOutcome};
use crate::core::{Category, SheetGeometry, SheetRgba};
use crate::error::SpriteMixResult;
use crate::export::{
    self, HostCommand, MessageTransport, OriginPolicy, SpriteUpdate, eyewear_crop_rect,
};
use crate::preview::{PreviewOpts, PreviewRenderer};
use crate::selection::{SelectionDelta, SelectionState};
use crate::source::SheetSource;

/// Session construction options.
#[derive(Clone, Debug)]
pub struct SessionOpts {
    pub geometry: SheetGeometry,
    pub cache: ImageCacheOpts,
    pub composite: CompositeOpts,
    pub preview: PreviewOpts,
    pub walk: WalkCycle,
    /// Host ticks per animation frame.
    pub speed: u32,
    pub origin: OriginPolicy,
    /// Start from a random character, like the original UI. Disable for
    /// deterministic setups.
    pub randomize_on_start: bool,
}

impl Default for SessionOpts {
    fn default() -> Self {
        Self {
            geometry: SheetGeometry::default(),
            cache: ImageCacheOpts::default(),
            composite: CompositeOpts::default(),
            preview: PreviewOpts::default(),
            walk: WalkCycle::default(),
            speed: DEFAULT_SPEED,
            origin: OriginPolicy::default(),
            randomize_on_start: true,
        }
    }
}

/// One character-customization session.
///
/// Owns the catalog, selection, cache, composite, and clock; preview and
/// export read through it. All cross-component effects flow through here:
/// selection deltas request images and dirty the composite, and a pump that
/// readies images dirties it too — nothing else pushes.
#[derive(Debug)]
pub struct CreatorSession {
    catalog: AssetCatalog,
    selection: SelectionState,
    cache: ImageCache,
    composite: CompositeBuilder,
    clock: AnimationClock,
    preview: PreviewRenderer,
    origin: OriginPolicy,
}

impl CreatorSession {
    /// Fetch the catalog and build a session around it.
    ///
    /// Catalog fetch, format, and empty failures are fatal — without a
    /// catalog there is nothing to render. The first item of every category
    /// is preloaded, then the character is randomized unless disabled.
    #[tracing::instrument(skip_all)]
    pub fn initialize(source: &mut dyn SheetSource, opts: SessionOpts) -> SpriteMixResult<Self> {
        let entries = source.fetch_catalog()?;
        let catalog = AssetCatalog::from_entries(entries)?;

        let selection = SelectionState::new(&catalog);
        let cache = ImageCache::new(opts.cache);
        let composite = CompositeBuilder::new(opts.geometry, opts.composite);
        let clock = AnimationClock::new(opts.walk, opts.speed)?;
        let preview = PreviewRenderer::new(opts.preview);

        let mut session = Self {
            catalog,
            selection,
            cache,
            composite,
            clock,
            preview,
            origin: opts.origin,
        };

        let present: Vec<Category> = session.catalog.present_categories().collect();
        for category in present {
            session.request_image(source, category, 0)?;
        }

        if opts.randomize_on_start {
            session.randomize_all(source)?;
        }

        tracing::debug!(
            categories = session.catalog.present_categories().count(),
            "session initialized"
        );
        Ok(session)
    }

    pub fn catalog(&self) -> &AssetCatalog {
        &self.catalog
    }

    pub fn selection(&self) -> &SelectionState {
        &self.selection
    }

    pub fn cache(&self) -> &ImageCache {
        &self.cache
    }

    pub fn composite(&self) -> &CompositeBuilder {
        &self.composite
    }

    pub fn clock(&self) -> &AnimationClock {
        &self.clock
    }

    fn request_image(
        &mut self,
        source: &mut dyn SheetSource,
        category: Category,
        index: usize,
    ) -> SpriteMixResult<()> {
        let item_name = self.catalog.item_name(category, index)?.to_string();
        self.cache.request(source, category, index, &item_name);
        Ok(())
    }

    fn apply_delta(
        &mut self,
        source: &mut dyn SheetSource,
        delta: SelectionDelta,
    ) -> SpriteMixResult<()> {
        if delta.is_empty() {
            return Ok(());
        }
        for (category, index) in &delta.changed {
            self.request_image(source, *category, *index)?;
        }
        self.composite.mark_dirty();
        Ok(())
    }

    pub fn next_part(
        &mut self,
        source: &mut dyn SheetSource,
        category: Category,
    ) -> SpriteMixResult<()> {
        let delta = self.selection.next(category);
        self.apply_delta(source, delta)
    }

    pub fn prev_part(
        &mut self,
        source: &mut dyn SheetSource,
        category: Category,
    ) -> SpriteMixResult<()> {
        let delta = self.selection.prev(category);
        self.apply_delta(source, delta)
    }

    pub fn set_part(
        &mut self,
        source: &mut dyn SheetSource,
        category: Category,
        index: usize,
    ) -> SpriteMixResult<()> {
        let delta = self.selection.set_index(category, index)?;
        self.apply_delta(source, delta)
    }

    pub fn randomize_part(
        &mut self,
        source: &mut dyn SheetSource,
        category: Category,
    ) -> SpriteMixResult<()> {
        let delta = self.selection.randomize(category);
        self.apply_delta(source, delta)
    }

    pub fn randomize_all(&mut self, source: &mut dyn SheetSource) -> SpriteMixResult<()> {
        let delta = self.selection.randomize_all();
        self.apply_delta(source, delta)
    }

    /// Poll in-flight loads. A load that became ready dirties the composite;
    /// the next rebuild re-reads the *current* selection, so stale loads can
    /// never force stale output.
    pub fn pump_loads(&mut self, source: &mut dyn SheetSource) -> PumpReport {
        let report = self.cache.pump(source);
        if report.newly_ready > 0 {
            self.composite.mark_dirty();
        }
        report
    }

    /// Advance the animation clock one host tick. Never blocked by loads.
    pub fn tick(&mut self) {
        self.clock.tick();
    }

    /// Rebuild the composite now, regardless of preview pull timing.
    pub fn rebuild_composite(&mut self) -> RebuildOutcome {
        self.composite.rebuild(&self.selection, &self.cache)
    }

    /// Render the current animation frame into `surface`.
    pub fn render_preview(
        &mut self,
        surface: &mut SheetRgba,
        elapsed: Duration,
    ) -> Option<RebuildOutcome> {
        self.preview.render_frame(
            &mut self.composite,
            &self.selection,
            &self.cache,
            &self.clock,
            surface,
            elapsed,
        )
    }

    /// Build the outbound payload: the composite sheet plus the isolated
    /// eyewear crop when glasses are selected and their image is ready.
    pub fn sprite_update(&mut self) -> SpriteMixResult<SpriteUpdate> {
        if self.composite.is_dirty() {
            let _ = self.composite.rebuild(&self.selection, &self.cache);
        }
        let spritesheet = export::composite_data_url(&self.composite)?;

        let eyewear = match self.selection.selected(Category::Glasses) {
            Some(index) if self.cache.ready_sheet(Category::Glasses, index).is_some() => {
                Some(export::crop_data_url(
                    &self.cache,
                    Category::Glasses,
                    index,
                    eyewear_crop_rect(self.composite.geometry()),
                )?)
            }
            _ => None,
        };

        Ok(SpriteUpdate::new(spritesheet, eyewear))
    }

    /// Export and post the current character to the host.
    pub fn send_to_host(&mut self, transport: &mut dyn MessageTransport) -> SpriteMixResult<()> {
        let payload = self.sprite_update()?;
        let origin = self.origin.resolve()?;
        transport.post(&payload, &origin)
    }

    /// Handle an inbound host command.
    pub fn handle_command(
        &mut self,
        command: HostCommand,
        source: &mut dyn SheetSource,
        transport: &mut dyn MessageTransport,
    ) -> SpriteMixResult<()> {
        match command {
            HostCommand::GenerateRandom => {
                self.randomize_all(source)?;
                self.pump_loads(source);
                self.send_to_host(transport)
            }
        }
    }
}
