// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/iprmark

//! Overlay configuration and preparation.
//!
//! An overlay starts as either a decoded image or a line of text rendered
//! with a caller-supplied TrueType/OpenType font. It is then fitted to the
//! target, optionally desaturated, and rotated clockwise about its centre.
//! The result is an 8-bit RGBA buffer ready for the compositor.

use ab_glyph::{point, Font, FontRef, GlyphId, PxScale, ScaleFont};
use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};
use serde::{Deserialize, Serialize};

use crate::engine::error::{MarkError, Result};
use crate::raster::visible::compositor::luma;
use crate::raster::visible::position::{Placement, Size};

pub const DEFAULT_TEXT_SIZE: f32 = 24.0;
pub const DEFAULT_TEXT_COLOR: &str = "#FFFFFF";

fn default_text_size() -> f32 {
    DEFAULT_TEXT_SIZE
}

fn default_text_color() -> String {
    DEFAULT_TEXT_COLOR.to_string()
}

/// The picture that gets stamped onto the target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OverlayMark {
    /// Any image the `image` crate can decode.
    Image { bytes: Vec<u8> },
    /// A single line of text.
    Text {
        text: String,
        /// TrueType or OpenType font file.
        font: Vec<u8>,
        #[serde(default = "default_text_size")]
        size: f32,
        /// `#RGB` or `#RRGGBB`.
        #[serde(default = "default_text_color")]
        color: String,
    },
}

impl Default for OverlayMark {
    fn default() -> Self {
        Self::Image { bytes: Vec::new() }
    }
}

/// How an anchored overlay is scaled against the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Fit {
    /// Keep the overlay's own size.
    Original,
    /// Scale to the target width, keeping the aspect ratio.
    #[default]
    Width,
    /// Scale to the target height, keeping the aspect ratio.
    Height,
    /// Scale to exactly the target size.
    Stretch,
}

/// Visible watermark settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    pub mark: OverlayMark,
    /// Ignored for tiled placement, where every copy keeps its own size.
    pub fit: Fit,
    pub placement: Placement,
    /// Multiplier on the overlay's own alpha, in `[0, 1]`.
    pub opacity: f32,
    /// Clockwise rotation applied after fitting.
    pub rotation_degrees: f32,
    /// Desaturate the overlay before compositing.
    pub grayscale: bool,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            mark: OverlayMark::default(),
            fit: Fit::default(),
            placement: Placement::default(),
            opacity: 1.0,
            rotation_degrees: 0.0,
            grayscale: true,
        }
    }
}

impl OverlayConfig {
    /// An image overlay with default settings.
    pub fn image(bytes: Vec<u8>) -> Self {
        Self { mark: OverlayMark::Image { bytes }, ..Default::default() }
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.opacity.is_finite() && (0.0..=1.0).contains(&self.opacity)) {
            return Err(MarkError::InvalidParams(format!("opacity must be in [0, 1], got {}", self.opacity)));
        }
        if !self.rotation_degrees.is_finite() {
            return Err(MarkError::InvalidParams("rotation must be finite".into()));
        }
        match &self.mark {
            OverlayMark::Image { bytes } if bytes.is_empty() => {
                Err(MarkError::InvalidParams("overlay image is empty".into()))
            }
            OverlayMark::Image { .. } => Ok(()),
            OverlayMark::Text { text, font, size, color } => {
                if text.is_empty() {
                    return Err(MarkError::InvalidParams("overlay text is empty".into()));
                }
                if font.is_empty() {
                    return Err(MarkError::InvalidParams("overlay text needs a font".into()));
                }
                if !(size.is_finite() && *size > 0.0) {
                    return Err(MarkError::InvalidParams(format!("text size must be positive, got {size}")));
                }
                parse_hex_color(color).map_err(|e| MarkError::InvalidParams(e.to_string()))?;
                Ok(())
            }
        }
    }
}

/// Parse `#RGB` or `#RRGGBB`.
pub fn parse_hex_color(hex: &str) -> Result<[u8; 3]> {
    let digits = hex
        .strip_prefix('#')
        .ok_or_else(|| MarkError::Render(format!("color must start with '#', got {hex:?}")))?;
    let channel = |s: &str| {
        u8::from_str_radix(s, 16).map_err(|_| MarkError::Render(format!("invalid hex digit in {hex:?}")))
    };
    if !digits.is_ascii() {
        return Err(MarkError::Render(format!("invalid hex digit in {hex:?}")));
    }
    match digits.len() {
        3 => Ok([channel(&digits[0..1])? * 17, channel(&digits[1..2])? * 17, channel(&digits[2..3])? * 17]),
        6 => Ok([channel(&digits[0..2])?, channel(&digits[2..4])?, channel(&digits[4..6])?]),
        n => Err(MarkError::Render(format!("color must be #RGB or #RRGGBB, got {n} digits"))),
    }
}

/// Render `text` on a transparent canvas just large enough to hold it.
pub fn render_text(text: &str, font: &[u8], size: f32, color: [u8; 3]) -> Result<RgbaImage> {
    let font = FontRef::try_from_slice(font).map_err(|e| MarkError::Render(format!("invalid font: {e}")))?;
    let scale = PxScale::from(size);
    let scaled = font.as_scaled(scale);

    let mut advance = 0.0f32;
    let mut prev: Option<GlyphId> = None;
    for c in text.chars() {
        let id = scaled.glyph_id(c);
        if let Some(p) = prev {
            advance += scaled.kern(p, id);
        }
        advance += scaled.h_advance(id);
        prev = Some(id);
    }
    let padding = 2;
    let width = (advance.ceil() as u32 + padding).max(1);
    let height = (scaled.height().ceil() as u32 + padding).max(1);

    let mut canvas = RgbaImage::new(width, height);
    let baseline = scaled.ascent();
    let mut cursor = 0.0f32;
    let mut prev: Option<GlyphId> = None;
    for c in text.chars() {
        let id = scaled.glyph_id(c);
        if let Some(p) = prev {
            cursor += scaled.kern(p, id);
        }
        let glyph = id.with_scale_and_position(scale, point(cursor, baseline));
        if let Some(outlined) = font.outline_glyph(glyph) {
            let bounds = outlined.px_bounds();
            outlined.draw(|px, py, coverage| {
                let x = px as i32 + bounds.min.x as i32;
                let y = py as i32 + bounds.min.y as i32;
                if x >= 0 && y >= 0 && (x as u32) < width && (y as u32) < height {
                    let alpha = (coverage.clamp(0.0, 1.0) * 255.0).round() as u8;
                    let pixel = canvas.get_pixel_mut(x as u32, y as u32);
                    // overlapping glyph edges keep the stronger coverage
                    pixel.0 = [color[0], color[1], color[2], pixel.0[3].max(alpha)];
                }
            });
        }
        cursor += scaled.h_advance(id);
        prev = Some(id);
    }
    Ok(canvas)
}

/// Decode or render the mark.
pub fn render_mark(mark: &OverlayMark) -> Result<RgbaImage> {
    match mark {
        OverlayMark::Image { bytes } => image::load_from_memory(bytes)
            .map(|img| img.to_rgba8())
            .map_err(|e| MarkError::Render(format!("overlay image: {e}"))),
        OverlayMark::Text { text, font, size, color } => render_text(text, font, *size, parse_hex_color(color)?),
    }
}

/// Target size of the overlay for `fit`.
pub fn fitted_size(fit: Fit, overlay: Size, target: Size) -> Size {
    let (ow, oh) = (overlay.width.max(1) as f64, overlay.height.max(1) as f64);
    let (tw, th) = (target.width as f64, target.height as f64);
    let size = match fit {
        Fit::Original => overlay,
        Fit::Stretch => target,
        Fit::Width => Size::new(target.width, (oh * tw / ow).round() as u32),
        Fit::Height => Size::new((ow * th / oh).round() as u32, target.height),
    };
    Size::new(size.width.max(1), size.height.max(1))
}

/// Resize for `fit`, then centre-crop anything that overhangs the target.
pub fn fit_to(overlay: RgbaImage, fit: Fit, target: Size) -> RgbaImage {
    let size = fitted_size(fit, Size::new(overlay.width(), overlay.height()), target);
    let resized = if (size.width, size.height) == overlay.dimensions() {
        overlay
    } else {
        imageops::resize(&overlay, size.width, size.height, FilterType::Triangle)
    };

    let crop_w = resized.width().min(target.width.max(1));
    let crop_h = resized.height().min(target.height.max(1));
    if (crop_w, crop_h) == resized.dimensions() {
        return resized;
    }
    let left = (resized.width() - crop_w) / 2;
    let top = (resized.height() - crop_h) / 2;
    imageops::crop_imm(&resized, left, top, crop_w, crop_h).to_image()
}

/// Replace colour with luma, keeping alpha.
pub fn desaturate(overlay: &mut RgbaImage) {
    for px in overlay.pixels_mut() {
        let l = (luma([px[0], px[1], px[2]]) * 255.0).round().clamp(0.0, 255.0) as u8;
        *px = Rgba([l, l, l, px[3]]);
    }
}

/// Rotate clockwise by `degrees` with bilinear sampling. The canvas grows
/// to the rotated bounding box; uncovered corners are transparent.
pub fn rotate(image: &RgbaImage, degrees: f32) -> RgbaImage {
    let radians = degrees.to_radians();
    let (cos, sin) = (radians.cos(), radians.sin());

    let src_w = image.width() as f32;
    let src_h = image.height() as f32;
    let (cx, cy) = (src_w / 2.0, src_h / 2.0);

    let corners = [(-cx, -cy), (src_w - cx, -cy), (-cx, src_h - cy), (src_w - cx, src_h - cy)];
    let (mut min_x, mut max_x, mut min_y, mut max_y) = (f32::INFINITY, f32::NEG_INFINITY, f32::INFINITY, f32::NEG_INFINITY);
    for (x, y) in corners {
        let (rx, ry) = (x * cos - y * sin, x * sin + y * cos);
        min_x = min_x.min(rx);
        max_x = max_x.max(rx);
        min_y = min_y.min(ry);
        max_y = max_y.max(ry);
    }
    // shave float noise so exact quarter turns keep integral sizes
    let dst_w = ((max_x - min_x - 1e-3).ceil() as u32).max(1);
    let dst_h = ((max_y - min_y - 1e-3).ceil() as u32).max(1);
    let (dst_cx, dst_cy) = (dst_w as f32 / 2.0, dst_h as f32 / 2.0);

    let mut rotated = RgbaImage::new(dst_w, dst_h);
    for dy in 0..dst_h {
        for dx in 0..dst_w {
            let rx = dx as f32 + 0.5 - dst_cx;
            let ry = dy as f32 + 0.5 - dst_cy;
            // inverse rotation back into source pixel-centre coordinates
            let sx = rx * cos + ry * sin + cx - 0.5;
            let sy = -rx * sin + ry * cos + cy - 0.5;
            if sx < 0.0 || sy < 0.0 || sx > src_w - 1.0 || sy > src_h - 1.0 {
                continue;
            }
            let x0 = sx.floor() as u32;
            let y0 = sy.floor() as u32;
            let x1 = (x0 + 1).min(image.width() - 1);
            let y1 = (y0 + 1).min(image.height() - 1);
            let (fx, fy) = (sx - x0 as f32, sy - y0 as f32);

            let (p00, p10, p01, p11) =
                (image.get_pixel(x0, y0), image.get_pixel(x1, y0), image.get_pixel(x0, y1), image.get_pixel(x1, y1));
            let sample = |c: usize| {
                let v = p00[c] as f32 * (1.0 - fx) * (1.0 - fy)
                    + p10[c] as f32 * fx * (1.0 - fy)
                    + p01[c] as f32 * (1.0 - fx) * fy
                    + p11[c] as f32 * fx * fy;
                v.round().clamp(0.0, 255.0) as u8
            };
            rotated.put_pixel(dx, dy, Rgba([sample(0), sample(1), sample(2), sample(3)]));
        }
    }
    rotated
}

/// Produce the final RGBA overlay for a target of size `target`.
pub fn prepare(config: &OverlayConfig, target: Size) -> Result<RgbaImage> {
    let mut overlay = render_mark(&config.mark)?;
    if let Placement::Anchored { .. } = config.placement {
        overlay = fit_to(overlay, config.fit, target);
    }
    if config.grayscale {
        desaturate(&mut overlay);
    }
    if config.rotation_degrees.rem_euclid(360.0) != 0.0 {
        overlay = rotate(&overlay, config.rotation_degrees);
    }
    Ok(overlay)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_colors() {
        assert_eq!(parse_hex_color("#FFF").unwrap(), [255, 255, 255]);
        assert_eq!(parse_hex_color("#1a2B3c").unwrap(), [0x1a, 0x2b, 0x3c]);
        assert!(matches!(parse_hex_color("FFF"), Err(MarkError::Render(_))));
        assert!(matches!(parse_hex_color("#GGG"), Err(MarkError::Render(_))));
        assert!(matches!(parse_hex_color("#1234"), Err(MarkError::Render(_))));
        assert!(parse_hex_color("#é12").is_err());
    }

    #[test]
    fn bad_font_is_a_render_error() {
        let err = render_text("hi", b"not a font", 20.0, [0, 0, 0]).unwrap_err();
        assert!(matches!(err, MarkError::Render(_)));
    }

    #[test]
    fn fit_sizes() {
        let wm = Size::new(200, 100);
        let img = Size::new(400, 300);
        assert_eq!(fitted_size(Fit::Original, wm, img), wm);
        assert_eq!(fitted_size(Fit::Stretch, wm, img), img);
        assert_eq!(fitted_size(Fit::Width, wm, img), Size::new(400, 200));
        assert_eq!(fitted_size(Fit::Height, wm, img), Size::new(600, 300));
    }

    #[test]
    fn height_fit_is_cropped_to_target() {
        let wm = RgbaImage::from_pixel(200, 100, Rgba([1, 2, 3, 255]));
        let fitted = fit_to(wm, Fit::Height, Size::new(400, 300));
        assert_eq!(fitted.dimensions(), (400, 300));
    }

    #[test]
    fn desaturate_keeps_alpha() {
        let mut img = RgbaImage::from_pixel(1, 1, Rgba([255, 0, 0, 90]));
        desaturate(&mut img);
        let p = img.get_pixel(0, 0);
        assert_eq!(p[0], p[1]);
        assert_eq!(p[1], p[2]);
        assert_eq!(p[3], 90);
        assert_eq!(p[0], 76);
    }

    #[test]
    fn quarter_turn_swaps_dimensions() {
        let img = RgbaImage::from_fn(40, 10, |x, _| Rgba([x as u8, 0, 0, 255]));
        let r = rotate(&img, 90.0);
        assert_eq!(r.dimensions(), (10, 40));
        // clockwise: the left edge of the source ends up on top
        assert!(r.get_pixel(5, 1)[0] < r.get_pixel(5, 38)[0]);
    }

    #[test]
    fn validate_rejects_bad_settings() {
        assert!(OverlayConfig::default().validate().is_err());
        let ok = OverlayConfig::image(vec![1]);
        ok.validate().unwrap();
        assert!(OverlayConfig { opacity: 1.5, ..ok.clone() }.validate().is_err());
        assert!(OverlayConfig { rotation_degrees: f32::NAN, ..ok.clone() }.validate().is_err());
        let text = OverlayConfig {
            mark: OverlayMark::Text { text: "©".into(), font: vec![0], size: 12.0, color: "red".into() },
            ..ok
        };
        assert!(matches!(text.validate(), Err(MarkError::InvalidParams(_))));
    }

    #[test]
    fn config_from_json_defaults() {
        let cfg: OverlayConfig = serde_json::from_str(
            r#"{"mark":{"type":"image","bytes":[1,2,3]},"placement":{"mode":"tiled","dx":5,"dy":6},"opacity":0.4}"#,
        )
        .unwrap();
        assert_eq!(cfg.placement, Placement::Tiled { dx: 5, dy: 6 });
        assert_eq!(cfg.fit, Fit::Width);
        assert!(cfg.grayscale);
        assert_eq!(cfg.opacity, 0.4);
    }
}
