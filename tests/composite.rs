use std::io::Cursor;

use spritemix::{
    AssetCatalog, CatalogEntry, Category, CompositeBuilder, CompositeOpts, ImageCache,
    ImageCacheOpts, MemorySheetSource, SelectionState, SheetGeometry,
};

fn png_rgba(width: u32, height: u32, rgba: [u8; 4]) -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(width, height, image::Rgba(rgba));
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

fn entry(kind: &str, src: &[&str]) -> CatalogEntry {
    CatalogEntry {
        kind: kind.to_string(),
        src: src.iter().map(|s| s.to_string()).collect(),
    }
}

/// 2x2 frames, 2 columns, 2 rows: a 4x4 composite surface.
fn small_geometry() -> SheetGeometry {
    SheetGeometry::new(2, 2, 2, 2).unwrap()
}

#[test]
fn later_layers_occlude_earlier_ones() {
    let catalog = AssetCatalog::from_entries(vec![
        entry("body", &["b0.png"]),
        entry("glasses", &["g0.png"]),
    ])
    .unwrap();
    let selection = SelectionState::new(&catalog);

    let mut source = MemorySheetSource::new(vec![]);
    source.insert_image(Category::Body, "b0.png", png_rgba(4, 4, [255, 0, 0, 255]));
    source.insert_image(Category::Glasses, "g0.png", png_rgba(4, 4, [0, 0, 255, 255]));

    let mut cache = ImageCache::new(ImageCacheOpts::default());
    cache.request(&mut source, Category::Body, 0, "b0.png");
    cache.request(&mut source, Category::Glasses, 0, "g0.png");
    cache.pump(&mut source);

    let mut composite = CompositeBuilder::new(small_geometry(), CompositeOpts::default());
    let outcome = composite.rebuild(&selection, &cache);

    assert_eq!(outcome.layers_drawn, 2);
    // Glasses draw after body; where both are opaque, glasses win everywhere.
    for y in 0..4 {
        for x in 0..4 {
            assert_eq!(composite.surface().pixel(x, y), [0, 0, 255, 255]);
        }
    }
}

#[test]
fn rebuild_is_idempotent_and_stays_clean() {
    let catalog = AssetCatalog::from_entries(vec![entry("body", &["b0.png"])]).unwrap();
    let selection = SelectionState::new(&catalog);

    let mut source = MemorySheetSource::new(vec![]);
    source.insert_image(Category::Body, "b0.png", png_rgba(4, 4, [10, 20, 30, 255]));

    let mut cache = ImageCache::new(ImageCacheOpts::default());
    cache.request(&mut source, Category::Body, 0, "b0.png");
    cache.pump(&mut source);

    let mut composite = CompositeBuilder::new(small_geometry(), CompositeOpts::default());
    assert!(composite.is_dirty());

    let first = composite.rebuild(&selection, &cache);
    assert_eq!(first.layers_drawn, 1);
    assert!(!composite.is_dirty());
    let first_pixels = composite.surface().data.clone();

    let second = composite.rebuild(&selection, &cache);
    assert_eq!(second, first);
    assert!(!composite.is_dirty());
    assert_eq!(composite.surface().data, first_pixels);
}

#[test]
fn zero_drawn_layers_leaves_the_composite_dirty() {
    let catalog = AssetCatalog::from_entries(vec![entry("body", &["b0.png"])]).unwrap();
    let selection = SelectionState::new(&catalog);
    let cache = ImageCache::new(ImageCacheOpts::default());

    let mut composite = CompositeBuilder::new(small_geometry(), CompositeOpts::default());
    let outcome = composite.rebuild(&selection, &cache);

    assert_eq!(outcome.layers_drawn, 0);
    assert!(composite.is_dirty(), "a later rebuild attempt must not be skipped");
}

#[test]
fn pending_and_failed_layers_are_skipped_silently() {
    let catalog = AssetCatalog::from_entries(vec![
        entry("body", &["b0.png"]),
        entry("glasses", &["g0.png"]),
        entry("head", &["h0.png"]),
    ])
    .unwrap();
    let selection = SelectionState::new(&catalog);

    let mut source = MemorySheetSource::new(vec![]);
    source.insert_image(Category::Body, "b0.png", png_rgba(4, 4, [255, 0, 0, 255]));
    source.insert_image(Category::Glasses, "g0.png", png_rgba(4, 4, [0, 0, 255, 255]));
    source.withhold(Category::Glasses, "g0.png", 10);
    source.fail(Category::Head, "h0.png", "gone");

    let mut cache = ImageCache::new(ImageCacheOpts::default());
    cache.request(&mut source, Category::Body, 0, "b0.png");
    cache.request(&mut source, Category::Glasses, 0, "g0.png");
    cache.request(&mut source, Category::Head, 0, "h0.png");
    cache.pump(&mut source);

    let mut composite = CompositeBuilder::new(small_geometry(), CompositeOpts::default());
    let outcome = composite.rebuild(&selection, &cache);

    assert_eq!(outcome.layers_drawn, 1);
    assert_eq!(outcome.layers_skipped, 2);
    assert!(!composite.is_dirty());
    assert_eq!(composite.surface().pixel(0, 0), [255, 0, 0, 255]);
}

#[test]
fn unselected_categories_contribute_nothing() {
    // Glasses has an empty item list and is skipped at catalog build; body
    // alone composites without touching the missing layer.
    let catalog = AssetCatalog::from_entries(vec![
        entry("body", &["b0.png"]),
        entry("glasses", &[]),
    ])
    .unwrap();
    let selection = SelectionState::new(&catalog);

    let mut source = MemorySheetSource::new(vec![]);
    source.insert_image(Category::Body, "b0.png", png_rgba(4, 4, [9, 9, 9, 255]));

    let mut cache = ImageCache::new(ImageCacheOpts::default());
    cache.request(&mut source, Category::Body, 0, "b0.png");
    cache.pump(&mut source);

    let mut composite = CompositeBuilder::new(small_geometry(), CompositeOpts::default());
    let outcome = composite.rebuild(&selection, &cache);
    assert_eq!(outcome.layers_drawn, 1);
    assert_eq!(outcome.layers_skipped, 0);
}

#[test]
fn placeholder_blits_never_count_as_drawn() {
    let catalog = AssetCatalog::from_entries(vec![entry("body", &["b0.png"])]).unwrap();
    let selection = SelectionState::new(&catalog);
    let cache = ImageCache::new(ImageCacheOpts::default());

    let mut composite = CompositeBuilder::new(
        small_geometry(),
        CompositeOpts {
            use_placeholder_on_miss: true,
        },
    );
    let outcome = composite.rebuild(&selection, &cache);

    assert_eq!(outcome.layers_drawn, 0);
    assert_eq!(outcome.layers_skipped, 1);
    assert!(composite.is_dirty());
    assert_eq!(composite.surface().pixel(0, 0), [0, 0, 0, 0]);
}
