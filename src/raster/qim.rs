// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/iprmark

//! Dithered quantization index modulation on block means.
//!
//! Bit 0 lives on the lattice `{n * step + d}`, bit 1 on
//! `{n * step + step / 2 + d}`, where `d` is the keyed per-site dither.

/// Quantize `value` onto the lattice for `bit`.
pub fn qim_embed(value: f64, step: f64, dither: f64, bit: u8) -> f64 {
    let offset = if bit == 0 { 0.0 } else { step / 2.0 };
    let shifted = value - dither - offset;
    (shifted / step).round() * step + offset + dither
}

/// Soft extraction: positive for bit 0, negative for bit 1, magnitude up
/// to `step / 2` indicating confidence.
pub fn qim_extract_soft(value: f64, step: f64, dither: f64) -> f64 {
    let half = step / 2.0;
    let v = value - dither;
    let dist0 = (v - (v / step).round() * step).abs();
    let dist1 = (v - (((v - half) / step).round() * step + half)).abs();
    dist1 - dist0
}
