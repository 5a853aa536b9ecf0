use crate::error::{SpriteMixError, SpriteMixResult};

/// A layer slot in a character.
///
/// The set is closed: catalogs may omit categories, but never introduce new
/// ones. Serde names match the lowercase spellings used by catalog documents.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Background,
    Body,
    BelowTheBelt,
    Shoes,
    Head,
    Accessory,
    Glasses,
    Hands,
}

impl Category {
    /// Back-to-front compositing order. Background first, hands topmost.
    pub const DRAW_ORDER: [Category; 8] = [
        Category::Background,
        Category::Body,
        Category::BelowTheBelt,
        Category::Shoes,
        Category::Head,
        Category::Accessory,
        Category::Glasses,
        Category::Hands,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Background => "background",
            Category::Body => "body",
            Category::BelowTheBelt => "belowthebelt",
            Category::Shoes => "shoes",
            Category::Head => "head",
            Category::Accessory => "accessory",
            Category::Glasses => "glasses",
            Category::Hands => "hands",
        }
    }

    /// Parse a catalog category name. Unknown names return `None` so callers
    /// can skip rather than fail.
    pub fn parse(s: &str) -> Option<Category> {
        Category::DRAW_ORDER
            .into_iter()
            .find(|c| c.as_str() == s)
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Frame grid shared by every part sheet and the composite.
///
/// The composite surface is `columns * frame_width` by `rows * frame_height`
/// pixels; animation cycles slice frames out of a single row.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SheetGeometry {
    /// Width of one animation frame in pixels.
    pub frame_width: u32,
    /// Height of one animation frame in pixels.
    pub frame_height: u32,
    /// Frames per sheet row.
    pub columns: u32,
    /// Rows in the sheet.
    pub rows: u32,
}

impl SheetGeometry {
    /// Create a validated geometry with all dimensions non-zero.
    pub fn new(frame_width: u32, frame_height: u32, columns: u32, rows: u32) -> SpriteMixResult<Self> {
        if frame_width == 0 || frame_height == 0 {
            return Err(SpriteMixError::validation(
                "frame dimensions must be > 0",
            ));
        }
        if columns == 0 || rows == 0 {
            return Err(SpriteMixError::validation("sheet grid must be > 0"));
        }
        Ok(Self {
            frame_width,
            frame_height,
            columns,
            rows,
        })
    }

    /// Full sheet width in pixels.
    pub fn sheet_width(self) -> u32 {
        self.columns * self.frame_width
    }

    /// Full sheet height in pixels.
    pub fn sheet_height(self) -> u32 {
        self.rows * self.frame_height
    }
}

impl Default for SheetGeometry {
    /// The 48x48 walk-cycle grid: 16 columns by 8 rows (768x384 sheet).
    fn default() -> Self {
        Self {
            frame_width: 48,
            frame_height: 48,
            columns: 16,
            rows: 8,
        }
    }
}

/// An owned RGBA8 pixel buffer, row-major, tightly packed.
///
/// Compositing and preview surfaces are **premultiplied alpha**; the flag
/// makes the convention explicit at API boundaries. Straight alpha appears
/// only at encode boundaries.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SheetRgba {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// RGBA8 bytes, `width * height * 4` long.
    pub data: Vec<u8>,
    /// Whether `data` is premultiplied alpha.
    pub premultiplied: bool,
}

impl SheetRgba {
    /// Fully transparent buffer of the given dimensions.
    pub fn transparent(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0u8; width as usize * height as usize * 4],
            premultiplied: true,
        }
    }

    /// Read one pixel. Out-of-bounds coordinates return transparent black.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        if x >= self.width || y >= self.height {
            return [0; 4];
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        [self.data[i], self.data[i + 1], self.data[i + 2], self.data[i + 3]]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_names_round_trip() {
        for category in Category::DRAW_ORDER {
            assert_eq!(Category::parse(category.as_str()), Some(category));
        }
        assert_eq!(Category::parse("hat"), None);
    }

    #[test]
    fn category_serde_uses_catalog_spellings() {
        let json = serde_json::to_string(&Category::BelowTheBelt).unwrap();
        assert_eq!(json, "\"belowthebelt\"");
        let back: Category = serde_json::from_str("\"glasses\"").unwrap();
        assert_eq!(back, Category::Glasses);
    }

    #[test]
    fn default_geometry_matches_walk_sheet() {
        let g = SheetGeometry::default();
        assert_eq!(g.sheet_width(), 768);
        assert_eq!(g.sheet_height(), 384);
    }

    #[test]
    fn geometry_rejects_zero_dimensions() {
        assert!(SheetGeometry::new(0, 48, 16, 8).is_err());
        assert!(SheetGeometry::new(48, 48, 16, 0).is_err());
    }

    #[test]
    fn transparent_sheet_reads_back_zero() {
        let sheet = SheetRgba::transparent(2, 2);
        assert_eq!(sheet.pixel(1, 1), [0; 4]);
        assert_eq!(sheet.pixel(5, 5), [0; 4]);
    }
}
