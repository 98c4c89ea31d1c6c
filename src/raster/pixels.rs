// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/iprmark

//! Decoded raster buffer.
//!
//! Images are decoded into an interleaved `u16` sample buffer in their
//! native layout (gray, gray+alpha, RGB or RGBA at 8 or 16 bits) and
//! encoded back into the same layout and container format, so pixels the
//! markers do not touch come back bit-exact for lossless formats.

use std::io::Cursor;

use image::{DynamicImage, ImageBuffer, ImageFormat, ImageOutputFormat};
use tracing::warn;

use crate::engine::error::{MarkError, Result};

/// JPEG quality used when writing JPEG output.
pub const JPEG_QUALITY: u8 = 95;

/// Bits per sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Depth {
    Eight,
    Sixteen,
}

impl Depth {
    /// Largest sample value.
    pub fn max_value(self) -> u16 {
        match self {
            Self::Eight => u8::MAX as u16,
            Self::Sixteen => u16::MAX,
        }
    }

    /// Factor from 8-bit units to this depth.
    pub fn scale(self) -> f64 {
        match self {
            Self::Eight => 1.0,
            Self::Sixteen => 257.0,
        }
    }
}

/// Formats accepted for raster input and output.
pub fn is_supported(format: ImageFormat) -> bool {
    matches!(format, ImageFormat::Png | ImageFormat::Tiff | ImageFormat::Bmp | ImageFormat::Jpeg)
}

/// Interleaved image samples plus the metadata needed to re-encode them.
#[derive(Debug, Clone, PartialEq)]
pub struct Raster {
    pub width: u32,
    pub height: u32,
    /// Samples per pixel, alpha included.
    pub channels: u8,
    pub has_alpha: bool,
    pub depth: Depth,
    pub samples: Vec<u16>,
    pub format: ImageFormat,
}

fn widen(v: Vec<u8>) -> Vec<u16> {
    v.into_iter().map(u16::from).collect()
}

impl Raster {
    /// Decode PNG, TIFF, BMP or JPEG bytes.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let format = image::guess_format(bytes)?;
        if !is_supported(format) {
            return Err(MarkError::UnsupportedFormat(format!("{format:?} images are not supported")));
        }
        let img = image::load_from_memory_with_format(bytes, format)?;
        let (width, height) = (img.width(), img.height());
        let (channels, depth, samples) = match img {
            DynamicImage::ImageLuma8(b) => (1, Depth::Eight, widen(b.into_raw())),
            DynamicImage::ImageLumaA8(b) => (2, Depth::Eight, widen(b.into_raw())),
            DynamicImage::ImageRgb8(b) => (3, Depth::Eight, widen(b.into_raw())),
            DynamicImage::ImageRgba8(b) => (4, Depth::Eight, widen(b.into_raw())),
            DynamicImage::ImageLuma16(b) => (1, Depth::Sixteen, b.into_raw()),
            DynamicImage::ImageLumaA16(b) => (2, Depth::Sixteen, b.into_raw()),
            DynamicImage::ImageRgb16(b) => (3, Depth::Sixteen, b.into_raw()),
            DynamicImage::ImageRgba16(b) => (4, Depth::Sixteen, b.into_raw()),
            other => {
                return Err(MarkError::UnsupportedFormat(format!(
                    "pixel layout {:?} is not supported",
                    other.color()
                )))
            }
        };
        Ok(Self { width, height, channels, has_alpha: channels % 2 == 0, depth, samples, format })
    }

    /// Samples per pixel that carry colour (alpha excluded).
    pub fn color_channels(&self) -> usize {
        self.channels as usize - usize::from(self.has_alpha)
    }

    /// Offset of the first sample of pixel `(x, y)`.
    pub fn offset(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * self.channels as usize
    }

    pub fn max_value(&self) -> u16 {
        self.depth.max_value()
    }

    fn narrow(&self) -> Vec<u8> {
        self.samples.iter().map(|&s| s.min(255) as u8).collect()
    }

    fn to_dynamic(&self) -> Result<DynamicImage> {
        let (w, h) = (self.width, self.height);
        let mismatch = || MarkError::UnsupportedFormat("sample buffer does not match image size".into());
        let img = match (self.depth, self.channels) {
            (Depth::Eight, 1) => DynamicImage::ImageLuma8(ImageBuffer::from_raw(w, h, self.narrow()).ok_or_else(mismatch)?),
            (Depth::Eight, 2) => DynamicImage::ImageLumaA8(ImageBuffer::from_raw(w, h, self.narrow()).ok_or_else(mismatch)?),
            (Depth::Eight, 3) => DynamicImage::ImageRgb8(ImageBuffer::from_raw(w, h, self.narrow()).ok_or_else(mismatch)?),
            (Depth::Eight, 4) => DynamicImage::ImageRgba8(ImageBuffer::from_raw(w, h, self.narrow()).ok_or_else(mismatch)?),
            (Depth::Sixteen, 1) => DynamicImage::ImageLuma16(ImageBuffer::from_raw(w, h, self.samples.clone()).ok_or_else(mismatch)?),
            (Depth::Sixteen, 2) => DynamicImage::ImageLumaA16(ImageBuffer::from_raw(w, h, self.samples.clone()).ok_or_else(mismatch)?),
            (Depth::Sixteen, 3) => DynamicImage::ImageRgb16(ImageBuffer::from_raw(w, h, self.samples.clone()).ok_or_else(mismatch)?),
            (Depth::Sixteen, 4) => DynamicImage::ImageRgba16(ImageBuffer::from_raw(w, h, self.samples.clone()).ok_or_else(mismatch)?),
            _ => return Err(mismatch()),
        };
        Ok(img)
    }

    /// Encode in the format the image was decoded from.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let img = self.to_dynamic()?;
        let output = match self.format {
            ImageFormat::Jpeg => {
                warn!("writing JPEG output, pixel values are not preserved exactly");
                ImageOutputFormat::Jpeg(JPEG_QUALITY)
            }
            other => ImageOutputFormat::from(other),
        };
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, output)?;
        Ok(out.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn png_bytes(img: DynamicImage) -> Vec<u8> {
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageOutputFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn rgb_round_trip_is_exact() {
        let img = RgbImage::from_fn(13, 7, |x, y| Rgb([x as u8 * 9, y as u8 * 30, 200]));
        let bytes = png_bytes(DynamicImage::ImageRgb8(img));
        let raster = Raster::decode(&bytes).unwrap();
        assert_eq!((raster.width, raster.height, raster.channels), (13, 7, 3));
        assert!(!raster.has_alpha);
        assert_eq!(raster.samples[raster.offset(2, 1)], 18);
        let again = Raster::decode(&raster.encode().unwrap()).unwrap();
        assert_eq!(again.samples, raster.samples);
    }

    #[test]
    fn sixteen_bit_gray_alpha() {
        let img = ImageBuffer::<image::LumaA<u16>, Vec<u16>>::from_fn(4, 4, |x, _| image::LumaA([x as u16 * 1000, 65535]));
        let raster = Raster::decode(&png_bytes(DynamicImage::ImageLumaA16(img))).unwrap();
        assert_eq!(raster.depth, Depth::Sixteen);
        assert_eq!(raster.color_channels(), 1);
        assert!(raster.has_alpha);
        assert_eq!(raster.samples[raster.offset(3, 0)], 3000);
    }

    #[test]
    fn jpeg_input_is_written_back_as_jpeg() {
        let img = RgbImage::from_fn(16, 16, |x, y| Rgb([x as u8 * 10, y as u8 * 10, 128]));
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img).write_to(&mut out, ImageOutputFormat::Jpeg(90)).unwrap();
        let raster = Raster::decode(&out.into_inner()).unwrap();
        assert_eq!(raster.format, ImageFormat::Jpeg);
        let again = Raster::decode(&raster.encode().unwrap()).unwrap();
        assert_eq!((again.width, again.height, again.format), (16, 16, ImageFormat::Jpeg));
    }

    #[test]
    fn garbage_is_unsupported() {
        assert!(matches!(Raster::decode(b"definitely not an image"), Err(MarkError::UnsupportedFormat(_))));
    }
}
