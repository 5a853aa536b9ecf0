use std::io::Cursor;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;

use crate::cache::ImageCache;
use crate::composite::CompositeBuilder;
use crate::core::{Category, SheetGeometry, SheetRgba};
use crate::error::{SpriteMixError, SpriteMixResult};

/// Message type discriminator expected by hosting pages.
pub const SPRITE_UPDATE_TYPE: &str = "spriteUpdate";

/// Outbound payload handed to the hosting context.
///
/// Field names are the wire contract of the hosting page and must not change;
/// `noggleDataUrl` carries the isolated eyewear crop when glasses are
/// selected and ready, else null.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SpriteUpdate {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(rename = "spritesheetDataUrl")]
    pub spritesheet_data_url: String,
    #[serde(rename = "noggleDataUrl")]
    pub eyewear_data_url: Option<String>,
}

impl SpriteUpdate {
    pub fn new(spritesheet_data_url: String, eyewear_data_url: Option<String>) -> Self {
        Self {
            kind: SPRITE_UPDATE_TYPE.to_string(),
            spritesheet_data_url,
            eyewear_data_url,
        }
    }
}

/// Inbound command from the hosting context.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HostCommand {
    /// Randomize and send immediately, without any confirmation hook.
    GenerateRandom,
}

impl HostCommand {
    /// Parse a host message. Unknown or malformed messages return `None` and
    /// are ignored.
    pub fn parse(json: &str) -> Option<HostCommand> {
        let value: serde_json::Value = serde_json::from_str(json).ok()?;
        match value.get("type")?.as_str()? {
            "generateRandom" => Some(HostCommand::GenerateRandom),
            _ => None,
        }
    }
}

/// Destination-origin policy for outbound messages.
///
/// Prefer an explicit trusted origin. The wildcard fallback is opt-in and
/// logged, because it widens delivery to any embedding page.
#[derive(Clone, Debug, Default)]
pub struct OriginPolicy {
    pub trusted: Option<String>,
    pub allow_wildcard: bool,
}

impl OriginPolicy {
    pub fn trusted(origin: impl Into<String>) -> Self {
        Self {
            trusted: Some(origin.into()),
            allow_wildcard: false,
        }
    }

    /// Resolve the destination origin for one send.
    pub fn resolve(&self) -> SpriteMixResult<String> {
        if let Some(origin) = &self.trusted {
            return Ok(origin.clone());
        }
        if self.allow_wildcard {
            tracing::warn!(
                "no trusted destination origin configured; falling back to wildcard '*'"
            );
            return Ok("*".to_string());
        }
        Err(SpriteMixError::validation(
            "no trusted destination origin and wildcard fallback not enabled",
        ))
    }
}

/// Delivery seam for outbound payloads (the postMessage channel, a file, a
/// test recorder).
pub trait MessageTransport {
    fn post(&mut self, payload: &SpriteUpdate, destination_origin: &str) -> SpriteMixResult<()>;
}

/// In-memory transport for tests and debugging.
#[derive(Debug, Default)]
pub struct RecordingTransport {
    posted: Vec<(SpriteUpdate, String)>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Payloads posted so far, in order, with their resolved origins.
    pub fn posted(&self) -> &[(SpriteUpdate, String)] {
        &self.posted
    }
}

impl MessageTransport for RecordingTransport {
    fn post(&mut self, payload: &SpriteUpdate, destination_origin: &str) -> SpriteMixResult<()> {
        self.posted
            .push((payload.clone(), destination_origin.to_string()));
        Ok(())
    }
}

/// A crop region within a part sheet.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CropRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// The first frame of a sheet — where the eyewear icon lives.
pub fn eyewear_crop_rect(geometry: SheetGeometry) -> CropRect {
    CropRect {
        x: 0,
        y: 0,
        width: geometry.frame_width,
        height: geometry.frame_height,
    }
}

/// Encode a pixel buffer as PNG, converting back to straight alpha at the
/// boundary.
pub fn encode_png(sheet: &SheetRgba) -> SpriteMixResult<Vec<u8>> {
    let mut data = sheet.data.clone();
    if sheet.premultiplied {
        unpremultiply_rgba8_in_place(&mut data);
    }
    let img = image::RgbaImage::from_raw(sheet.width, sheet.height, data).ok_or_else(|| {
        SpriteMixError::export_encoding("pixel buffer does not match sheet dimensions")
    })?;

    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .map_err(|e| SpriteMixError::export_encoding(format!("encode png: {e}")))?;
    Ok(buf)
}

/// Encode the whole composite sprite sheet.
pub fn encode_composite(composite: &CompositeBuilder) -> SpriteMixResult<Vec<u8>> {
    encode_png(composite.surface())
}

/// Encode a crop of an already-cached part sheet. No new loads.
pub fn encode_crop(
    cache: &ImageCache,
    category: Category,
    index: usize,
    rect: CropRect,
) -> SpriteMixResult<Vec<u8>> {
    let sheet = cache.ready_sheet(category, index).ok_or_else(|| {
        SpriteMixError::invalid_identifier(format!(
            "no ready image cached for '{category}' item {index}"
        ))
    })?;
    if rect.width == 0 || rect.height == 0 {
        return Err(SpriteMixError::validation("crop must be non-empty"));
    }
    if rect.x + rect.width > sheet.width || rect.y + rect.height > sheet.height {
        return Err(SpriteMixError::validation(format!(
            "crop {}x{}+{}+{} exceeds sheet {}x{}",
            rect.width, rect.height, rect.x, rect.y, sheet.width, sheet.height
        )));
    }

    let mut out = SheetRgba::transparent(rect.width, rect.height);
    for y in 0..rect.height {
        let src_off = ((rect.y + y) as usize * sheet.width as usize + rect.x as usize) * 4;
        let dst_off = y as usize * rect.width as usize * 4;
        let row = rect.width as usize * 4;
        out.data[dst_off..dst_off + row]
            .copy_from_slice(&sheet.rgba8_premul[src_off..src_off + row]);
    }
    encode_png(&out)
}

/// The composite encoded as a `data:image/png;base64` URL.
pub fn composite_data_url(composite: &CompositeBuilder) -> SpriteMixResult<String> {
    Ok(to_data_url(&encode_composite(composite)?))
}

/// A cached-part crop encoded as a `data:image/png;base64` URL.
pub fn crop_data_url(
    cache: &ImageCache,
    category: Category,
    index: usize,
    rect: CropRect,
) -> SpriteMixResult<String> {
    Ok(to_data_url(&encode_crop(cache, category, index, rect)?))
}

fn to_data_url(png: &[u8]) -> String {
    format!("data:image/png;base64,{}", BASE64.encode(png))
}

fn unpremultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = u32::from(px[3]);
        if a == 0 {
            px[0] = 0;
            px[1] = 0;
            px[2] = 0;
            continue;
        }
        for i in 0..3 {
            px[i] = ((u32::from(px[i]) * 255 + a / 2) / a).min(255) as u8;
        }
    }
}
