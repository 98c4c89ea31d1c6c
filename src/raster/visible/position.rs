// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/iprmark

//! Where overlay copies land on the target image.
//!
//! Coordinates are the top-left corner of the overlay in target pixels and
//! may be negative or run past the far edge; the compositor clips.

use serde::{Deserialize, Serialize};

/// Nine-grid anchor for a single overlay copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Anchor {
    TopLeft,
    TopCenter,
    TopRight,
    CenterLeft,
    #[default]
    Center,
    CenterRight,
    BottomLeft,
    BottomCenter,
    BottomRight,
}

/// How overlay copies are laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Placement {
    /// One copy at a nine-grid anchor, `margin` pixels in from the edges it touches.
    Anchored { anchor: Anchor, margin: u32 },
    /// Copies repeated across the image, `dx`/`dy` pixels apart and inset by the same amount.
    Tiled { dx: u32, dy: u32 },
}

impl Default for Placement {
    fn default() -> Self {
        Self::Anchored { anchor: Anchor::Center, margin: 0 }
    }
}

/// Width and height in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Top-left corner of the overlay for a nine-grid anchor.
pub fn anchored_position(anchor: Anchor, image: Size, overlay: Size, margin: u32) -> (i32, i32) {
    let (img_w, img_h) = (image.width as i32, image.height as i32);
    let (wm_w, wm_h) = (overlay.width as i32, overlay.height as i32);
    let m = margin as i32;

    let left = m;
    let center_x = (img_w - wm_w) / 2;
    let right = img_w - wm_w - m;
    let top = m;
    let center_y = (img_h - wm_h) / 2;
    let bottom = img_h - wm_h - m;

    match anchor {
        Anchor::TopLeft => (left, top),
        Anchor::TopCenter => (center_x, top),
        Anchor::TopRight => (right, top),
        Anchor::CenterLeft => (left, center_y),
        Anchor::Center => (center_x, center_y),
        Anchor::CenterRight => (right, center_y),
        Anchor::BottomLeft => (left, bottom),
        Anchor::BottomCenter => (center_x, bottom),
        Anchor::BottomRight => (right, bottom),
    }
}

/// Positions of every tiled copy, row by row.
///
/// The first copy sits at `(dx, dy)`; the next one in a row starts `dx`
/// pixels after the previous one ends, and rows are `dy` apart.
pub fn tiled_positions(image: Size, overlay: Size, dx: u32, dy: u32) -> Vec<(i32, i32)> {
    let step_x = overlay.width.max(1) as i64 + dx as i64;
    let step_y = overlay.height.max(1) as i64 + dy as i64;

    let mut positions = Vec::new();
    let mut y = dy as i64;
    while y < image.height as i64 {
        let mut x = dx as i64;
        while x < image.width as i64 {
            positions.push((x as i32, y as i32));
            x += step_x;
        }
        y += step_y;
    }
    positions
}

/// All positions for `placement`.
pub fn positions(placement: Placement, image: Size, overlay: Size) -> Vec<(i32, i32)> {
    match placement {
        Placement::Anchored { anchor, margin } => vec![anchored_position(anchor, image, overlay, margin)],
        Placement::Tiled { dx, dy } => tiled_positions(image, overlay, dx, dy),
    }
}
