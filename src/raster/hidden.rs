// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/iprmark

//! Hidden message embedding in the pixel domain (parameter set v1).
//!
//! Each site is a `block_size × block_size` block. Its value is the mean of
//! the block's colour samples (alpha excluded), and one bit is carried by
//! quantizing that mean with dithered QIM:
//!
//! - step `Δ = step` for 8-bit images, `257 · step` for 16-bit images
//! - per-site dither `d = next_float · Δ` from the `"dither"` child stream,
//!   positioned at the site index
//! - the block is moved by shifting every colour sample by the same integer
//!   amount; when clamping at black or white keeps the mean `Δ/4` or more
//!   away from the target, the neighbouring lattice points `target ± Δ`
//!   (same bit) are tried
//!
//! Bits are laid out with [`repetition`](super::repetition): copy `c` of
//! frame bit `i` goes to site `order[i · r + c]`, where `order` is the keyed
//! site permutation from the `"sites"` child stream. The frame carries a
//! length prefix and CRC-32 (see [`frame`](super::frame)).

use tracing::{debug, trace};

use crate::engine::context::{AssetContext, RasterContext};
use crate::engine::error::{MarkError, Result};
use crate::engine::outcome::{DetectPayload, DetectResult, EmbedReport, EmbedResult, Verdict};
use crate::engine::params::HiddenParams;
use crate::engine::{Asset, AssetKind, Marker};
use crate::keystream::{KeyStream, SecretKey};
use crate::raster::capacity::sites_needed;
use crate::raster::frame::{bits_to_bytes, build_frame, bytes_to_bits, frame_len, parse_frame, HEADER_BITS};
use crate::raster::permute::{SiteGrid, SiteOrder};
use crate::raster::pixels::Raster;
use crate::raster::qim::{qim_embed, qim_extract_soft};
use crate::raster::repetition::{repetition_decode_soft_with_quality, repetition_encode};

/// Keyed state shared by embed and detect for one image.
struct SiteCodec {
    grid: SiteGrid,
    order: SiteOrder,
    dither: KeyStream,
    step: f64,
}

impl SiteCodec {
    fn new(key: &SecretKey, ctx: &RasterContext, raster: &Raster, params: &HiddenParams) -> Self {
        let root = KeyStream::derive(key, &AssetContext::Raster(*ctx));
        let grid = SiteGrid::new(ctx.width, ctx.height, ctx.block_size);
        Self {
            order: SiteOrder::new(grid.len(), root.fork("sites", 0)),
            dither: root.fork("dither", 0),
            step: params.step * raster.depth.scale(),
            grid,
        }
    }

    fn dither_for(&mut self, site: usize) -> f64 {
        self.dither.seek(site as u64);
        self.dither.next_float() * self.step
    }
}

fn block_sum(raster: &Raster, grid: &SiteGrid, site: usize, shift: i64) -> (f64, usize) {
    let (x0, y0) = grid.origin(site);
    let colors = raster.color_channels();
    let max = raster.max_value() as i64;
    let mut sum = 0i64;
    for y in y0..y0 + grid.block_size {
        for x in x0..x0 + grid.block_size {
            let o = raster.offset(x, y);
            for c in 0..colors {
                sum += (raster.samples[o + c] as i64 + shift).clamp(0, max);
            }
        }
    }
    let n = (grid.block_size * grid.block_size) as usize * colors;
    (sum as f64, n)
}

/// Mean colour value of a site after shifting by `shift` with clamping.
fn block_mean(raster: &Raster, grid: &SiteGrid, site: usize, shift: i64) -> f64 {
    let (sum, n) = block_sum(raster, grid, site, shift);
    sum / n as f64
}

fn shift_block(raster: &mut Raster, grid: &SiteGrid, site: usize, shift: i64) {
    let (x0, y0) = grid.origin(site);
    let colors = raster.color_channels();
    let max = raster.max_value() as i64;
    for y in y0..y0 + grid.block_size {
        for x in x0..x0 + grid.block_size {
            let o = raster.offset(x, y);
            for c in 0..colors {
                let v = &mut raster.samples[o + c];
                *v = (*v as i64 + shift).clamp(0, max) as u16;
            }
        }
    }
}

/// Move one site onto the lattice for `bit`.
fn embed_site(raster: &mut Raster, grid: &SiteGrid, site: usize, bit: u8, step: f64, dither: f64) {
    let mean = block_mean(raster, grid, site, 0);
    let target = qim_embed(mean, step, dither, bit);
    let tolerance = step / 4.0;

    let mut best: Option<(i64, f64)> = None;
    for candidate in [target, target - step, target + step] {
        let shift = (candidate - mean).round() as i64;
        let err = (block_mean(raster, grid, site, shift) - candidate).abs();
        if best.map_or(true, |(_, e)| err < e) {
            best = Some((shift, err));
        }
        if err < tolerance {
            break;
        }
    }
    if let Some((shift, err)) = best {
        if err >= tolerance {
            trace!(site, err, "site saturated");
        }
        shift_block(raster, grid, site, shift);
    }
}

fn read_llrs(raster: &Raster, codec: &mut SiteCodec, sites: &[usize]) -> Vec<f64> {
    sites
        .iter()
        .map(|&site| {
            let dither = codec.dither_for(site);
            qim_extract_soft(block_mean(raster, &codec.grid, site, 0), codec.step, dither)
        })
        .collect()
}

/// Hidden-message marker for PNG, TIFF, BMP and JPEG images.
#[derive(Debug, Clone, Copy, Default)]
pub struct HiddenMarker;

impl HiddenMarker {
    fn context(raster: &Raster, block_size: u32) -> RasterContext {
        RasterContext { width: raster.width, height: raster.height, channels: raster.channels, block_size }
    }
}

impl Marker for HiddenMarker {
    type Params = HiddenParams;

    fn embed(&self, bytes: &[u8], key: &SecretKey, params: &HiddenParams) -> Result<EmbedResult> {
        params.validate()?;
        if bytes.is_empty() {
            return Ok(EmbedResult {
                asset: Asset::new(AssetKind::RasterHidden, Vec::new()),
                context: None,
                report: EmbedReport::RasterHidden { sites_used: 0, sites_available: 0, redundancy: params.redundancy },
                degenerate: true,
            });
        }

        let mut raster = Raster::decode(bytes)?;
        let ctx = Self::context(&raster, params.block_size);
        let mut codec = SiteCodec::new(key, &ctx, &raster, params);

        let r = params.redundancy;
        let needed = sites_needed(params.message.len(), r);
        let available = codec.grid.len();
        if needed > available {
            return Err(MarkError::CapacityExceeded { needed, available });
        }

        let bits = repetition_encode(&bytes_to_bits(&build_frame(&params.message)), r);
        let sites = codec.order.prefix(needed).to_vec();
        for (&site, &bit) in sites.iter().zip(&bits) {
            let dither = codec.dither_for(site);
            embed_site(&mut raster, &codec.grid, site, bit, codec.step, dither);
        }

        debug!(width = ctx.width, height = ctx.height, sites_used = needed, available, redundancy = r, "hidden embed");

        Ok(EmbedResult {
            asset: Asset::new(AssetKind::RasterHidden, raster.encode()?),
            context: Some(AssetContext::Raster(ctx)),
            report: EmbedReport::RasterHidden { sites_used: needed, sites_available: available, redundancy: r },
            degenerate: false,
        })
    }

    fn detect(
        &self,
        bytes: &[u8],
        key: &SecretKey,
        context: Option<&AssetContext>,
        original: Option<&[u8]>,
        params: &HiddenParams,
    ) -> Result<DetectResult> {
        let raster = Raster::decode(bytes)?;

        if let Some(original) = original {
            let orig = Raster::decode(original)?;
            if (orig.width, orig.height) != (raster.width, raster.height) {
                return Err(MarkError::ContextMismatch(format!(
                    "image is {}x{}, the original is {}x{}",
                    raster.width, raster.height, orig.width, orig.height
                )));
            }
        }
        let block_size = match context {
            None => params.block_size,
            Some(AssetContext::Raster(c)) if (c.width, c.height) == (raster.width, raster.height) => c.block_size,
            Some(AssetContext::Raster(c)) => {
                return Err(MarkError::ContextMismatch(format!(
                    "image is {}x{}, the stored context says {}x{}",
                    raster.width, raster.height, c.width, c.height
                )))
            }
            Some(other) => {
                return Err(MarkError::ContextMismatch(format!(
                    "expected a raster context, got {}",
                    other.modality()
                )))
            }
        };

        let ctx = Self::context(&raster, block_size);
        let mut codec = SiteCodec::new(key, &ctx, &raster, params);
        let r = params.redundancy;
        let available = codec.grid.len();
        let absent = |agreement: f64| DetectResult {
            verdict: Verdict::Absent,
            agreement,
            payload: DetectPayload::Message(None),
        };

        let header_sites = HEADER_BITS.saturating_mul(r);
        if header_sites > available {
            debug!(available, "hidden detect: image too small for a header");
            return Ok(absent(0.0));
        }
        let sites = codec.order.prefix(header_sites).to_vec();
        let mut llrs = read_llrs(&raster, &mut codec, &sites);
        let (header_bits, _) = repetition_decode_soft_with_quality(&llrs, r);
        let header = bits_to_bytes(&header_bits);
        let total_bits = frame_len([header[0], header[1]]) * 8;

        let half_step = codec.step / 2.0;
        let normalise = move |avg: f64| (avg / half_step).clamp(0.0, 1.0);
        if total_bits.saturating_mul(r) > available {
            let (_, quality) = repetition_decode_soft_with_quality(&llrs, r);
            debug!(total_bits, available, "hidden detect: length prefix exceeds capacity");
            return Ok(absent(normalise(quality.avg_abs_llr_per_copy)));
        }

        let rest = codec.order.prefix(total_bits * r)[header_sites..].to_vec();
        llrs.extend(read_llrs(&raster, &mut codec, &rest));
        let (bits, quality) = repetition_decode_soft_with_quality(&llrs, r);
        let agreement = normalise(quality.avg_abs_llr_per_copy);

        match parse_frame(&bits_to_bytes(&bits)) {
            Some(message) => {
                debug!(bytes = message.len(), agreement, "hidden detect: valid frame");
                Ok(DetectResult { verdict: Verdict::Present, agreement, payload: DetectPayload::Message(Some(message)) })
            }
            None => {
                debug!(agreement, "hidden detect: checksum mismatch");
                Ok(absent(agreement))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::pixels::Depth;
    use image::ImageFormat;

    fn flat_raster(width: u32, height: u32, value: u16) -> Raster {
        Raster {
            width,
            height,
            channels: 3,
            has_alpha: false,
            depth: Depth::Eight,
            samples: vec![value; (width * height * 3) as usize],
            format: ImageFormat::Png,
        }
    }

    #[test]
    fn embedded_site_reads_back() {
        let mut raster = flat_raster(8, 8, 128);
        let grid = SiteGrid::new(8, 8, 4);
        for (site, bit) in [(0usize, 0u8), (1, 1), (2, 1), (3, 0)] {
            embed_site(&mut raster, &grid, site, bit, 12.0, 4.25);
        }
        for (site, bit) in [(0usize, 0u8), (1, 1), (2, 1), (3, 0)] {
            let llr = qim_extract_soft(block_mean(&raster, &grid, site, 0), 12.0, 4.25);
            assert_eq!(if llr >= 0.0 { 0 } else { 1 }, bit);
            assert!(llr.abs() >= 5.0);
        }
    }

    #[test]
    fn saturated_block_uses_neighbouring_lattice_point() {
        let mut raster = flat_raster(4, 4, 255);
        let grid = SiteGrid::new(4, 4, 4);
        embed_site(&mut raster, &grid, 0, 1, 12.0, 0.0);
        let llr = qim_extract_soft(block_mean(&raster, &grid, 0, 0), 12.0, 0.0);
        assert!(llr < 0.0);
        assert!(raster.samples.iter().all(|&s| s <= 255));
    }

    #[test]
    fn alpha_is_never_touched() {
        let mut raster = Raster {
            width: 4,
            height: 4,
            channels: 4,
            has_alpha: true,
            depth: Depth::Eight,
            samples: [100u16, 110, 120, 77].repeat(16),
            format: ImageFormat::Png,
        };
        embed_site(&mut raster, &SiteGrid::new(4, 4, 4), 0, 1, 12.0, 0.0);
        assert!(raster.samples.chunks(4).all(|px| px[3] == 77));
    }
}
