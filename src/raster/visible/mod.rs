// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/iprmark

//! Visible overlay watermark.
//!
//! Embed only: the overlay is composited onto the image and the result is
//! written back in the input's format and pixel layout. There is no keyed
//! component and nothing to detect.

pub mod compositor;
pub mod overlay;
pub mod position;

use tracing::debug;

use crate::engine::context::AssetContext;
use crate::engine::error::{MarkError, Result};
use crate::engine::outcome::{DetectResult, EmbedReport, EmbedResult};
use crate::engine::{Asset, AssetKind, Marker};
use crate::keystream::SecretKey;
use crate::raster::pixels::Raster;

pub use overlay::{Fit, OverlayConfig, OverlayMark};
pub use position::{Anchor, Placement, Size};

/// Composite `config`'s overlay onto the encoded image `image`.
pub fn apply(image: &[u8], config: &OverlayConfig) -> Result<Vec<u8>> {
    config.validate()?;
    let mut raster = Raster::decode(image)?;
    let target = Size::new(raster.width, raster.height);
    let overlay = overlay::prepare(config, target)?;
    let wm = Size::new(overlay.width(), overlay.height());

    let spots = position::positions(config.placement, target, wm);
    let changed: usize =
        spots.iter().map(|&(x, y)| compositor::blend_onto(&mut raster, &overlay, x, y, config.opacity)).sum();
    debug!(
        width = raster.width,
        height = raster.height,
        overlay_width = wm.width,
        overlay_height = wm.height,
        copies = spots.len(),
        changed,
        "overlay applied"
    );
    raster.encode()
}

#[derive(Debug, Clone, Copy, Default)]
pub struct VisibleMarker;

impl Marker for VisibleMarker {
    type Params = OverlayConfig;

    fn embed(&self, bytes: &[u8], _key: &SecretKey, params: &OverlayConfig) -> Result<EmbedResult> {
        let (out, degenerate) = if bytes.is_empty() {
            params.validate()?;
            (Vec::new(), true)
        } else {
            (apply(bytes, params)?, false)
        };
        Ok(EmbedResult {
            asset: Asset::new(AssetKind::RasterVisible, out),
            context: None,
            report: EmbedReport::RasterVisible,
            degenerate,
        })
    }

    fn detect(
        &self,
        _bytes: &[u8],
        _key: &SecretKey,
        _context: Option<&AssetContext>,
        _original: Option<&[u8]>,
        _params: &OverlayConfig,
    ) -> Result<DetectResult> {
        Err(MarkError::DetectionUnsupported(AssetKind::RasterVisible))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageOutputFormat, Rgba, RgbaImage, Rgb, RgbImage};
    use std::io::Cursor;

    fn png(img: DynamicImage) -> Vec<u8> {
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageOutputFormat::Png).unwrap();
        out.into_inner()
    }

    fn logo() -> Vec<u8> {
        png(DynamicImage::ImageRgba8(RgbaImage::from_pixel(10, 5, Rgba([255, 255, 255, 255]))))
    }

    #[test]
    fn anchored_overlay_changes_only_its_area() {
        let base = png(DynamicImage::ImageRgb8(RgbImage::from_pixel(40, 30, Rgb([0, 0, 0]))));
        let config = OverlayConfig {
            fit: Fit::Original,
            placement: Placement::Anchored { anchor: Anchor::TopLeft, margin: 2 },
            ..OverlayConfig::image(logo())
        };
        let out = Raster::decode(&apply(&base, &config).unwrap()).unwrap();
        assert_eq!((out.width, out.height, out.channels), (40, 30, 3));
        let inside = out.offset(3, 3);
        assert_eq!(out.samples[inside], 255);
        let outside = out.offset(20, 20);
        assert_eq!(out.samples[outside], 0);
    }

    #[test]
    fn detect_is_unsupported() {
        let key = SecretKey::new(b"k".to_vec()).unwrap();
        let err = VisibleMarker.detect(b"x", &key, None, None, &OverlayConfig::image(logo())).unwrap_err();
        assert!(matches!(err, MarkError::DetectionUnsupported(AssetKind::RasterVisible)));
    }

    #[test]
    fn empty_input_is_degenerate() {
        let key = SecretKey::new(b"k".to_vec()).unwrap();
        let r = VisibleMarker.embed(&[], &key, &OverlayConfig::image(logo())).unwrap();
        assert!(r.degenerate);
        assert!(r.asset.bytes.is_empty());
    }
}
