use std::sync::Arc;

use crate::cache::{ImageCache, PreparedSheet};
use crate::core::{Category, SheetGeometry, SheetRgba};
use crate::selection::SelectionState;

pub(crate) type PremulRgba8 = [u8; 4];

/// Porter-Duff `over` for premultiplied RGBA8.
///
/// Opaque source pixels exactly replace the destination, which is what makes
/// the fixed draw order observable: later layers win wherever both are
/// opaque.
pub(crate) fn over(dst: PremulRgba8, src: PremulRgba8) -> PremulRgba8 {
    if src[3] == 0 {
        return dst;
    }
    if src[3] == 255 {
        return src;
    }

    let inv = 255u16 - u16::from(src[3]);
    let mut out = [0u8; 4];
    for i in 0..4 {
        out[i] = src[i].saturating_add(mul_div255(u16::from(dst[i]), inv));
    }
    out
}

fn mul_div255(x: u16, y: u16) -> u8 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u8
}

/// Blend an entire part sheet over the destination at the origin.
///
/// Part sheets normally share the composite's dimensions; off-grid sheets are
/// nearest-neighbor scaled to cover the full surface, mirroring a full-size
/// canvas draw.
fn blend_sheet_over(dst: &mut SheetRgba, src: &[u8], src_w: u32, src_h: u32) {
    if src_w == 0 || src_h == 0 || dst.width == 0 || dst.height == 0 {
        return;
    }

    if src_w == dst.width && src_h == dst.height && src.len() == dst.data.len() {
        for (d, s) in dst.data.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
            let out = over([d[0], d[1], d[2], d[3]], [s[0], s[1], s[2], s[3]]);
            d.copy_from_slice(&out);
        }
        return;
    }

    for y in 0..dst.height {
        let sy = (u64::from(y) * u64::from(src_h) / u64::from(dst.height)) as u32;
        for x in 0..dst.width {
            let sx = (u64::from(x) * u64::from(src_w) / u64::from(dst.width)) as u32;
            let si = (sy as usize * src_w as usize + sx as usize) * 4;
            let di = (y as usize * dst.width as usize + x as usize) * 4;
            if si + 4 > src.len() {
                continue;
            }
            let s = [src[si], src[si + 1], src[si + 2], src[si + 3]];
            let d = [
                dst.data[di],
                dst.data[di + 1],
                dst.data[di + 2],
                dst.data[di + 3],
            ];
            let out = over(d, s);
            dst.data[di..di + 4].copy_from_slice(&out);
        }
    }
}

/// Composite options; the variant differences of the source UIs collapse into
/// these flags.
#[derive(Clone, Copy, Debug, Default)]
pub struct CompositeOpts {
    /// Blit a transparent placeholder sheet for selected-but-unready layers
    /// instead of skipping them outright. Placeholder blits never count as
    /// drawn layers.
    pub use_placeholder_on_miss: bool,
}

/// What one rebuild actually did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RebuildOutcome {
    /// Layers drawn from ready images.
    pub layers_drawn: usize,
    /// Selected layers skipped because their image was pending or failed.
    pub layers_skipped: usize,
}

/// Owner of the composite sprite sheet.
///
/// The surface is rebuilt in place (clear + redraw), never reallocated, and
/// is mutated by nothing else. `dirty` tracks whether the surface reflects
/// the latest selections and cache contents; a rebuild that draws zero layers
/// leaves it dirty so a later attempt is not skipped.
#[derive(Debug)]
pub struct CompositeBuilder {
    geometry: SheetGeometry,
    surface: SheetRgba,
    dirty: bool,
    placeholder: Option<PreparedSheet>,
}

impl CompositeBuilder {
    pub fn new(geometry: SheetGeometry, opts: CompositeOpts) -> Self {
        let width = geometry.sheet_width();
        let height = geometry.sheet_height();
        let placeholder = opts.use_placeholder_on_miss.then(|| PreparedSheet {
            width,
            height,
            rgba8_premul: Arc::new(vec![0u8; width as usize * height as usize * 4]),
        });
        Self {
            geometry,
            surface: SheetRgba::transparent(width, height),
            dirty: true,
            placeholder,
        }
    }

    pub fn geometry(&self) -> SheetGeometry {
        self.geometry
    }

    /// The composite surface. Readers may slice a stale surface; it shows the
    /// previous layering until the next successful rebuild.
    pub fn surface(&self) -> &SheetRgba {
        &self.surface
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Clear and redraw every ready selected layer in draw order.
    ///
    /// Idempotent: rebuilding twice with no intervening selection or cache
    /// change produces a bitmap-identical surface. Reflects the cache state
    /// at the instant it runs.
    pub fn rebuild(&mut self, selection: &SelectionState, cache: &ImageCache) -> RebuildOutcome {
        self.surface.data.fill(0);

        let mut outcome = RebuildOutcome::default();
        for category in Category::DRAW_ORDER {
            let Some(index) = selection.selected(category) else {
                continue;
            };
            match cache.ready_sheet(category, index) {
                Some(sheet) => {
                    blend_sheet_over(&mut self.surface, &sheet.rgba8_premul, sheet.width, sheet.height);
                    outcome.layers_drawn += 1;
                }
                None => {
                    outcome.layers_skipped += 1;
                    if let Some(ph) = &self.placeholder {
                        blend_sheet_over(&mut self.surface, &ph.rgba8_premul, ph.width, ph.height);
                    }
                }
            }
        }

        if outcome.layers_drawn > 0 {
            self.dirty = false;
        }
        tracing::debug!(
            layers_drawn = outcome.layers_drawn,
            layers_skipped = outcome.layers_skipped,
            dirty = self.dirty,
            "composite rebuilt"
        );
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn over_src_alpha_0_is_noop() {
        let dst = [10, 20, 30, 40];
        let src = [255, 255, 255, 0];
        assert_eq!(over(dst, src), dst);
    }

    #[test]
    fn over_src_opaque_replaces_dst() {
        let dst = [0, 0, 0, 255];
        let src = [255, 0, 0, 255];
        assert_eq!(over(dst, src), src);
    }

    #[test]
    fn over_dst_transparent_returns_src() {
        let dst = [0, 0, 0, 0];
        let src = [100, 110, 120, 200];
        assert_eq!(over(dst, src), src);
    }

    #[test]
    fn blend_scales_off_grid_sheets_to_cover_the_surface() {
        let mut dst = SheetRgba::transparent(4, 4);
        // 2x2 opaque red, half the destination size in each axis.
        let src = vec![
            255, 0, 0, 255, 255, 0, 0, 255, //
            255, 0, 0, 255, 255, 0, 0, 255,
        ];
        blend_sheet_over(&mut dst, &src, 2, 2);
        assert_eq!(dst.pixel(0, 0), [255, 0, 0, 255]);
        assert_eq!(dst.pixel(3, 3), [255, 0, 0, 255]);
    }
}
