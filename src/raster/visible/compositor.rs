// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/iprmark

//! Porter-Duff "over" of an 8-bit RGBA overlay onto a native raster.
//!
//! Blending happens in normalized `[0, 1]` space and the result is written
//! back at the raster's own depth and channel layout. Gray targets take the
//! overlay's luma. Pixels the overlay does not cover, or covers with zero
//! effective alpha, are left untouched.

use image::RgbaImage;

use crate::raster::pixels::Raster;

/// Rec. 601 luma of an 8-bit RGB triple, in `[0, 1]`.
pub fn luma(rgb: [u8; 3]) -> f32 {
    (0.299 * rgb[0] as f32 + 0.587 * rgb[1] as f32 + 0.114 * rgb[2] as f32) / 255.0
}

/// Blend `fg` over `bg`, both as `(colour, alpha)` in `[0, 1]`.
///
/// Returns the composite colour and alpha. A fully transparent result is
/// black with zero alpha.
pub fn over(bg: f32, bg_alpha: f32, fg: f32, fg_alpha: f32) -> (f32, f32) {
    let out_alpha = fg_alpha + bg_alpha * (1.0 - fg_alpha);
    if out_alpha < 0.001 {
        return (0.0, 0.0);
    }
    let out = (fg * fg_alpha + bg * bg_alpha * (1.0 - fg_alpha)) / out_alpha;
    (out, out_alpha)
}

/// Composite `overlay` onto `target` with its top-left corner at `(x, y)`,
/// scaling every overlay alpha by `opacity`.
///
/// Returns the number of target pixels changed.
pub fn blend_onto(target: &mut Raster, overlay: &RgbaImage, x: i32, y: i32, opacity: f32) -> usize {
    let max = target.max_value() as f32;
    let color_channels = target.color_channels();
    let has_alpha = target.has_alpha;

    let x0 = x.max(0);
    let y0 = y.max(0);
    let x1 = (x as i64 + overlay.width() as i64).min(target.width as i64) as i32;
    let y1 = (y as i64 + overlay.height() as i64).min(target.height as i64) as i32;

    let mut changed = 0;
    for ty in y0..y1 {
        for tx in x0..x1 {
            let px = overlay.get_pixel((tx - x) as u32, (ty - y) as u32).0;
            let fg_alpha = px[3] as f32 / 255.0 * opacity;
            if fg_alpha <= 0.0 {
                continue;
            }

            let base = target.offset(tx as u32, ty as u32);
            let bg_alpha = if has_alpha { target.samples[base + color_channels] as f32 / max } else { 1.0 };

            let fg: [f32; 3] = if color_channels == 1 {
                [luma([px[0], px[1], px[2]]); 3]
            } else {
                [px[0] as f32 / 255.0, px[1] as f32 / 255.0, px[2] as f32 / 255.0]
            };

            let mut out_alpha = bg_alpha;
            for c in 0..color_channels {
                let bg = target.samples[base + c] as f32 / max;
                let (value, alpha) = over(bg, bg_alpha, fg[c], fg_alpha);
                target.samples[base + c] = (value * max).round().clamp(0.0, max) as u16;
                out_alpha = alpha;
            }
            if has_alpha {
                target.samples[base + color_channels] = (out_alpha * max).round().clamp(0.0, max) as u16;
            }
            changed += 1;
        }
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::pixels::Depth;
    use image::{ImageFormat, Rgba};

    fn raster(channels: u8, depth: Depth, fill: u16) -> Raster {
        Raster {
            width: 8,
            height: 6,
            channels,
            has_alpha: channels % 2 == 0,
            depth,
            samples: vec![fill; 8 * 6 * channels as usize],
            format: ImageFormat::Png,
        }
    }

    #[test]
    fn opaque_overlay_replaces_pixels() {
        let mut target = raster(3, Depth::Eight, 10);
        let overlay = RgbaImage::from_pixel(2, 2, Rgba([200, 100, 50, 255]));
        assert_eq!(blend_onto(&mut target, &overlay, 3, 2, 1.0), 4);
        let o = target.offset(3, 2);
        assert_eq!(&target.samples[o..o + 3], &[200, 100, 50]);
        let untouched = target.offset(0, 0);
        assert_eq!(&target.samples[untouched..untouched + 3], &[10, 10, 10]);
    }

    #[test]
    fn half_opacity_mixes() {
        let mut target = raster(3, Depth::Eight, 0);
        let overlay = RgbaImage::from_pixel(1, 1, Rgba([255, 255, 255, 255]));
        blend_onto(&mut target, &overlay, 0, 0, 0.5);
        assert_eq!(target.samples[0], 128);
    }

    #[test]
    fn zero_opacity_changes_nothing() {
        let mut target = raster(4, Depth::Eight, 77);
        let before = target.clone();
        let overlay = RgbaImage::from_pixel(8, 6, Rgba([255, 0, 0, 255]));
        assert_eq!(blend_onto(&mut target, &overlay, 0, 0, 0.0), 0);
        assert_eq!(target, before);
    }

    #[test]
    fn clipped_at_edges() {
        let mut target = raster(1, Depth::Eight, 0);
        let overlay = RgbaImage::from_pixel(4, 4, Rgba([255, 255, 255, 255]));
        assert_eq!(blend_onto(&mut target, &overlay, -2, 4, 1.0), 4);
        assert_eq!(blend_onto(&mut target, &overlay, 20, 20, 1.0), 0);
    }

    #[test]
    fn sixteen_bit_uses_full_range() {
        let mut target = raster(1, Depth::Sixteen, 0);
        let overlay = RgbaImage::from_pixel(1, 1, Rgba([255, 255, 255, 255]));
        blend_onto(&mut target, &overlay, 0, 0, 1.0);
        assert_eq!(target.samples[0], u16::MAX);
    }

    #[test]
    fn transparent_background_takes_overlay_alpha() {
        let mut target = raster(2, Depth::Eight, 0);
        let overlay = RgbaImage::from_pixel(1, 1, Rgba([255, 255, 255, 255]));
        blend_onto(&mut target, &overlay, 0, 0, 0.5);
        // colour is pure overlay, alpha is the overlay's effective alpha
        assert_eq!(target.samples[0], 255);
        assert_eq!(target.samples[1], 128);
    }

    #[test]
    fn over_of_nothing_is_transparent() {
        assert_eq!(over(0.7, 0.0, 0.3, 0.0), (0.0, 0.0));
    }
}
