// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/iprmark

//! Hidden-message capacity.
//!
//! Every frame bit needs `redundancy` sites, and the frame adds a length
//! prefix and CRC on top of the message, so the largest message an image can
//! carry is `sites / redundancy / 8 - 6` bytes, capped at the `u16` length
//! prefix.

use crate::engine::params::HiddenParams;
use crate::raster::frame::FRAME_OVERHEAD;
use crate::raster::permute::SiteGrid;

/// Sites needed to embed a message of `message_len` bytes. Saturates at
/// `usize::MAX`, which no image can provide.
pub fn sites_needed(message_len: usize, redundancy: usize) -> usize {
    message_len
        .saturating_add(FRAME_OVERHEAD)
        .saturating_mul(8)
        .saturating_mul(redundancy)
}

/// Largest message, in bytes, that fits an image of the given size.
pub fn capacity_bytes(width: u32, height: u32, params: &HiddenParams) -> usize {
    let sites = SiteGrid::new(width, height, params.block_size).len();
    let frame_bytes = sites / params.redundancy.max(1) / 8;
    frame_bytes.saturating_sub(FRAME_OVERHEAD).min(u16::MAX as usize)
}
