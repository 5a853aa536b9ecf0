use std::time::Duration;

use crate::animation::AnimationClock;
use crate::cache::ImageCache;
use crate::composite::{CompositeBuilder, RebuildOutcome};
use crate::core::SheetRgba;
use crate::selection::SelectionState;

/// Preview rendering options.
#[derive(Clone, Copy, Debug)]
pub struct PreviewOpts {
    /// Integer nearest-neighbor scale factor for the blit.
    pub scale: u32,
    /// Enable the cosmetic vertical bob.
    pub bob: bool,
    /// Bob amplitude in destination pixels.
    pub bob_amplitude_px: f64,
    /// Bob angular velocity in radians per second of wall-clock time.
    pub bob_rad_per_sec: f64,
    /// Reuse a clean composite across frames. When disabled the composite is
    /// rebuilt on every rendered frame regardless of the dirty flag.
    pub cache_composite_across_frames: bool,
}

impl Default for PreviewOpts {
    fn default() -> Self {
        Self {
            scale: 3,
            bob: true,
            bob_amplitude_px: 3.0,
            bob_rad_per_sec: 3.0,
            cache_composite_across_frames: true,
        }
    }
}

/// Blits the current walk-cycle frame of the composite to a display surface.
///
/// The renderer pulls: if the composite is dirty it rebuilds first, and a
/// rebuild that still draws nothing simply shows the stale (possibly empty)
/// surface. Frame selection never waits on loads.
#[derive(Debug)]
pub struct PreviewRenderer {
    opts: PreviewOpts,
}

impl PreviewRenderer {
    pub fn new(opts: PreviewOpts) -> Self {
        Self { opts }
    }

    pub fn opts(&self) -> &PreviewOpts {
        &self.opts
    }

    /// Render the clock's current frame into `surface`, centered and scaled.
    ///
    /// `elapsed` is wall-clock time used only for the cosmetic bob; passing
    /// `Duration::ZERO` renders without offset. Returns the rebuild outcome
    /// when this call rebuilt the composite.
    pub fn render_frame(
        &self,
        composite: &mut CompositeBuilder,
        selection: &SelectionState,
        cache: &ImageCache,
        clock: &AnimationClock,
        surface: &mut SheetRgba,
        elapsed: Duration,
    ) -> Option<RebuildOutcome> {
        let outcome = if !self.opts.cache_composite_across_frames || composite.is_dirty() {
            Some(composite.rebuild(selection, cache))
        } else {
            None
        };
        if composite.is_dirty() {
            tracing::debug!("previewing a stale composite; awaiting image loads");
        }

        surface.data.fill(0);

        let src_rect = clock.source_rect(composite.geometry());
        let scale = self.opts.scale.max(1);
        let dest_w = src_rect.width * scale;
        let dest_h = src_rect.height * scale;

        let bob = if self.opts.bob {
            (elapsed.as_secs_f64() * self.opts.bob_rad_per_sec).sin() * self.opts.bob_amplitude_px
        } else {
            0.0
        };

        let dest_x0 = (i64::from(surface.width) - i64::from(dest_w)) / 2;
        let dest_y0 = (i64::from(surface.height) - i64::from(dest_h)) / 2 + bob.round() as i64;

        let src = composite.surface();
        for dy in 0..dest_h {
            let ty = dest_y0 + i64::from(dy);
            if ty < 0 || ty >= i64::from(surface.height) {
                continue;
            }
            let sy = src_rect.y + dy / scale;
            for dx in 0..dest_w {
                let tx = dest_x0 + i64::from(dx);
                if tx < 0 || tx >= i64::from(surface.width) {
                    continue;
                }
                let sx = src_rect.x + dx / scale;
                let px = src.pixel(sx, sy);
                let di = (ty as usize * surface.width as usize + tx as usize) * 4;
                surface.data[di..di + 4].copy_from_slice(&px);
            }
        }

        outcome
    }
}
