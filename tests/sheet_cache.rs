use std::io::Cursor;

use spritemix::{Category, ImageCache, ImageCacheOpts, MemorySheetSource};

fn png_rgba(width: u32, height: u32, rgba: [u8; 4]) -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(width, height, image::Rgba(rgba));
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

#[test]
fn concurrent_requests_share_one_load() {
    let mut source = MemorySheetSource::new(vec![]);
    source.insert_image(Category::Body, "b0.png", png_rgba(4, 4, [255, 0, 0, 255]));

    let mut cache = ImageCache::new(ImageCacheOpts::default());
    // Two call sites ask for the same key before the load resolves.
    assert!(cache.request(&mut source, Category::Body, 0, "b0.png").is_pending());
    assert!(cache.request(&mut source, Category::Body, 0, "b0.png").is_pending());

    assert_eq!(cache.loads_started(Category::Body, 0), 1);
    assert_eq!(source.begin_count(Category::Body, "b0.png"), 1);

    let report = cache.pump(&mut source);
    assert_eq!(report.newly_ready, 1);

    // Both observers now see the same ready entry.
    let sheet = cache.ready_sheet(Category::Body, 0).unwrap();
    assert_eq!((sheet.width, sheet.height), (4, 4));
    assert_eq!(cache.loads_started(Category::Body, 0), 1);
}

#[test]
fn failed_loads_are_recorded_not_retried() {
    let mut source = MemorySheetSource::new(vec![]);
    source.insert_image(Category::Body, "b0.png", png_rgba(4, 4, [255, 0, 0, 255]));
    source.fail(Category::Glasses, "g0.png", "404");

    let mut cache = ImageCache::new(ImageCacheOpts::default());
    cache.request(&mut source, Category::Body, 0, "b0.png");
    cache.request(&mut source, Category::Glasses, 0, "g0.png");

    let report = cache.pump(&mut source);
    assert_eq!(report.newly_ready, 1);
    assert_eq!(report.newly_failed, 1);

    // The failure is local to its key and survives further pumps untouched.
    assert!(cache.entry(Category::Glasses, 0).unwrap().is_failed());
    assert!(cache.ready_sheet(Category::Body, 0).is_some());
    assert_eq!(cache.pump(&mut source), spritemix::PumpReport::default());
    assert_eq!(source.begin_count(Category::Glasses, "g0.png"), 1);
}

#[test]
fn decode_failures_resolve_to_failed() {
    let mut source = MemorySheetSource::new(vec![]);
    source.insert_image(Category::Head, "h0.png", b"not a png".to_vec());

    let mut cache = ImageCache::new(ImageCacheOpts::default());
    cache.request(&mut source, Category::Head, 0, "h0.png");
    let report = cache.pump(&mut source);

    assert_eq!(report.newly_failed, 1);
    assert!(cache.entry(Category::Head, 0).unwrap().is_failed());
}

#[test]
fn overlapping_loads_resolve_independently() {
    let mut source = MemorySheetSource::new(vec![]);
    source.insert_image(Category::Body, "b0.png", png_rgba(4, 4, [255, 0, 0, 255]));
    source.insert_image(Category::Body, "b1.png", png_rgba(4, 4, [0, 0, 255, 255]));
    source.withhold(Category::Body, "b0.png", 1);

    let mut cache = ImageCache::new(ImageCacheOpts::default());
    cache.request(&mut source, Category::Body, 0, "b0.png");
    cache.request(&mut source, Category::Body, 1, "b1.png");

    // The slow key stays pending while the fast one lands.
    let report = cache.pump(&mut source);
    assert_eq!(report.newly_ready, 1);
    assert_eq!(report.still_pending, 1);
    assert!(cache.entry(Category::Body, 0).unwrap().is_pending());
    assert!(cache.ready_sheet(Category::Body, 1).is_some());

    let report = cache.pump(&mut source);
    assert_eq!(report.newly_ready, 1);
    assert!(cache.ready_sheet(Category::Body, 0).is_some());
}
