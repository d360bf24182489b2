//! Turn a hand-drawn signature capture into a PNG with a transparent background.
//!
//! Only pixels that are exactly white `(255, 255, 255)` are keyed out. There is
//! no tolerance and no feathering, so anti-aliased stroke edges keep a light
//! fringe. This matches what the drawing surface produces (black strokes on a
//! white fill) and is a known limitation.

use crate::Error;
use png::{BitDepth, ColorType};

const DATA_URL_PREFIX: &str = "data:image/";
const BASE64_MARKER: &str = ";base64,";

/// The raw image bytes of a signature, as captured from the drawing surface.
#[derive(Debug, Clone)]
pub struct SignatureCapture {
    /// Subtype from the data URL, for example `png`.
    pub format: String,
    pub image_data: Vec<u8>,
}

impl SignatureCapture {
    /// Parse `data:image/<fmt>;base64,<payload>`.
    pub fn from_data_url(data_url: &str) -> Result<Self, Error> {
        let rest = data_url.trim().strip_prefix(DATA_URL_PREFIX).ok_or_else(|| {
            Error::InvalidSignatureData("Capture is not an image data URL.".to_owned())
        })?;
        let marker = rest.find(BASE64_MARKER).ok_or_else(|| {
            Error::InvalidSignatureData("Capture data URL is not base64 encoded.".to_owned())
        })?;
        let format = &rest[..marker];
        if format.is_empty() {
            return Err(Error::InvalidSignatureData(
                "Capture data URL has no image format.".to_owned(),
            ));
        }
        let payload = &rest[marker + BASE64_MARKER.len()..];
        let image_data = base64::decode(payload).map_err(|err| {
            Error::InvalidSignatureData(format!("Capture payload is not valid base64: {}", err))
        })?;
        if image_data.is_empty() {
            return Err(Error::InvalidSignatureData(
                "Capture payload is empty.".to_owned(),
            ));
        }

        Ok(SignatureCapture {
            format: format.to_owned(),
            image_data,
        })
    }

    pub fn extract(&self) -> Result<SignatureAsset, Error> {
        extract(&self.image_data)
    }
}

/// A signature image with a transparent background, PNG encoded (8-bit RGBA).
#[derive(Debug, Clone)]
pub struct SignatureAsset {
    width: u32,
    height: u32,
    png_data: Vec<u8>,
}

impl SignatureAsset {
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn as_png_bytes(&self) -> &[u8] {
        &self.png_data
    }
}

/// Decode any supported image, key pure white to transparent and re-encode as PNG.
pub fn extract(raw_image_data: &[u8]) -> Result<SignatureAsset, Error> {
    let image = image::load_from_memory(raw_image_data)?;
    let mut rgba = image.to_rgba8();
    let (width, height) = rgba.dimensions();
    if width == 0 || height == 0 {
        return Err(Error::InvalidSignatureData(
            "Signature image has no pixels.".to_owned(),
        ));
    }

    let mut keyed = 0usize;
    for pixel in rgba.pixels_mut() {
        if pixel[0] == 255 && pixel[1] == 255 && pixel[2] == 255 {
            pixel[3] = 0;
            keyed += 1;
        }
    }
    log::debug!(
        "Signature image {}x{}: {} white pixels made transparent.",
        width,
        height,
        keyed
    );

    let png_data = encode_rgba_png(width, height, rgba.as_raw())?;
    Ok(SignatureAsset {
        width,
        height,
        png_data,
    })
}

fn encode_rgba_png(width: u32, height: u32, pixels: &[u8]) -> Result<Vec<u8>, Error> {
    let mut png_data = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut png_data, width, height);
        encoder.set_color(ColorType::Rgba);
        encoder.set_depth(BitDepth::Eight);
        let mut writer = encoder.write_header()?;
        writer.write_image_data(pixels)?;
        writer.finish()?;
    }
    Ok(png_data)
}
