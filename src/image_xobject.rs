// This code is inspired by https://github.com/fschutt/printpdf/blob/2bebdc65d06dafbe926ed4b43fedd10f966c59d3/src/xobject.rs

use crate::Error;
use lopdf::ObjectId;
use png::{BitDepth, ColorType, Transformations};
use std::io::Read;

#[derive(Debug, Clone)]
pub struct ImageXObject {
    /// Width of the image (original width, not scaled width)
    pub width: u32,
    /// Height of the image (original height, not scaled height)
    pub height: u32,
    /// Color space (Greyscale, RGB)
    pub color_space: ColorType,
    /// Bits per color component. Always 8, the decoder strips 16 bit images.
    pub bits_per_component: BitDepth,
    /// Should the image be interpolated when scaled?
    pub interpolate: bool,
    /// The actual data from the image
    pub image_data: Vec<u8>,
    /// Image used as a soft mask. (transparency)
    pub s_mask: Option<ObjectId>,
}

impl ImageXObject {
    /// Returns 1 or 2 images. The first is the color images.
    /// The second is (if present) the mask/alpha channel of the image.
    pub fn try_from<R: Read>(
        mut image_decoder: png::Decoder<R>,
    ) -> Result<(Self, Option<Self>), Error> {
        // Palette and low bit depth images are expanded, 16 bit is reduced to 8.
        image_decoder.set_transformations(Transformations::EXPAND | Transformations::STRIP_16);
        let mut image_reader = image_decoder.read_info()?;
        // Allocate the output buffer.
        let mut buf = vec![0; image_reader.output_buffer_size()];
        // Read the first frame. An APNG might contain multiple frames.
        let info = image_reader.next_frame(&mut buf)?;
        let image_data = &buf[..info.buffer_size()];
        if info.width == 0 || info.height == 0 {
            return Err(Error::InvalidSignatureData(
                "Signature image has no pixels.".to_owned(),
            ));
        }

        let (color_type, image_color_data, alpha_data) = match info.color_type {
            ColorType::Rgba => {
                let (rgb, alpha) = Self::split_channels(image_data, 4, 3);
                (ColorType::Rgb, rgb, Some(alpha))
            }
            ColorType::GrayscaleAlpha => {
                let (gray, alpha) = Self::split_channels(image_data, 2, 1);
                (ColorType::Grayscale, gray, Some(alpha))
            }
            ColorType::Rgb | ColorType::Grayscale => (info.color_type, image_data.to_vec(), None),
            ColorType::Indexed => {
                return Err(Error::InvalidSignatureData(
                    "Indexed PNG was not expanded.".to_owned(),
                ))
            }
        };

        Ok((
            Self {
                width: info.width,
                height: info.height,
                color_space: color_type,
                bits_per_component: BitDepth::Eight,
                image_data: image_color_data,
                interpolate: false,
                s_mask: None, // This should be filled in later
            },
            alpha_data.map(|alpha_data| Self {
                width: info.width,
                height: info.height,
                color_space: ColorType::Grayscale,
                bits_per_component: BitDepth::Eight,
                image_data: alpha_data,
                interpolate: false,
                s_mask: None,
            }),
        ))
    }

    /// Split interleaved 8 bit samples into the first `color` samples of
    /// every pixel and the remaining samples.
    /// Returns `(color_samples, other_samples)`.
    fn split_channels(data: &[u8], samples_per_pixel: usize, color: usize) -> (Vec<u8>, Vec<u8>) {
        let pixels = data.len() / samples_per_pixel;
        let mut color_data = Vec::with_capacity(pixels * color);
        let mut rest_data = Vec::with_capacity(pixels * (samples_per_pixel - color));
        for pixel in data.chunks_exact(samples_per_pixel) {
            color_data.extend_from_slice(&pixel[..color]);
            rest_data.extend_from_slice(&pixel[color..]);
        }
        (color_data, rest_data)
    }
}

// Inspired and derived from: https://github.com/fschutt/printpdf/blob/2bebdc65d06dafbe926ed4b43fedd10f966c59d3/src/xobject.rs#L245
impl From<ImageXObject> for lopdf::Stream {
    fn from(image: ImageXObject) -> Self {
        use lopdf::Object::*;

        let cs: &'static str = match image.color_space {
            ColorType::Rgb | ColorType::Rgba => "DeviceRGB",
            ColorType::Grayscale | ColorType::GrayscaleAlpha => "DeviceGray",
            ColorType::Indexed => "Indexed",
        };

        let mut dict = lopdf::Dictionary::from_iter(vec![
            ("Type", Name("XObject".as_bytes().to_vec())),
            ("Subtype", Name("Image".as_bytes().to_vec())),
            ("Width", Integer(image.width as i64)),
            ("Height", Integer(image.height as i64)),
            ("Interpolate", image.interpolate.into()),
            ("BitsPerComponent", Integer(image.bits_per_component as i64)),
            ("ColorSpace", Name(cs.as_bytes().to_vec())),
        ]);
        if let Some(s_mask) = image.s_mask {
            dict.set("SMask", Reference(s_mask));
        }

        lopdf::Stream::new(dict, image.image_data)
    }
}

impl From<ImageXObject> for lopdf::Object {
    fn from(image: ImageXObject) -> Self {
        lopdf::Object::Stream(image.into())
    }
}
