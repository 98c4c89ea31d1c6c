// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/iprmark

//! Embedding site grid and keyed site order.
//!
//! Sites are the non-overlapping `block_size × block_size` pixel blocks of
//! the image in raster order; partial blocks at the right and bottom edges
//! are not used. The keyed order is a partial Fisher-Yates shuffle that is
//! extended on demand: the first `n` sites of the order are the same no
//! matter how far the shuffle is later extended.
//!
//! # Cross-platform portability
//!
//! Swap targets come from `KeyStream::next_int` with a `u64` bound, so the
//! order is identical on 32-bit and 64-bit targets.

use crate::keystream::KeyStream;

/// Geometry of the site grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SiteGrid {
    pub blocks_wide: u32,
    pub blocks_tall: u32,
    pub block_size: u32,
}

impl SiteGrid {
    pub fn new(width: u32, height: u32, block_size: u32) -> Self {
        let block_size = block_size.max(1);
        Self { blocks_wide: width / block_size, blocks_tall: height / block_size, block_size }
    }

    /// Number of sites.
    pub fn len(&self) -> usize {
        self.blocks_wide as usize * self.blocks_tall as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Top-left pixel of site `index`.
    pub fn origin(&self, index: usize) -> (u32, u32) {
        let bw = self.blocks_wide as usize;
        (((index % bw) as u32) * self.block_size, ((index / bw) as u32) * self.block_size)
    }
}

/// Lazily extended keyed permutation of the site indices.
#[derive(Debug, Clone)]
pub struct SiteOrder {
    order: Vec<usize>,
    fixed: usize,
    stream: KeyStream,
}

impl SiteOrder {
    pub fn new(sites: usize, stream: KeyStream) -> Self {
        Self { order: (0..sites).collect(), fixed: 0, stream }
    }

    /// Fix the first `count` entries of the order and return them.
    pub fn prefix(&mut self, count: usize) -> &[usize] {
        let count = count.min(self.order.len());
        if count > self.fixed {
            self.stream.shuffle_span(&mut self.order, self.fixed, count);
            self.fixed = count;
        }
        &self.order[..count]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keystream::SecretKey;

    fn stream(label: &[u8]) -> KeyStream {
        KeyStream::from_material(&SecretKey::new(b"perm".to_vec()).unwrap(), label)
    }

    #[test]
    fn grid_ignores_partial_blocks() {
        let g = SiteGrid::new(66, 33, 4);
        assert_eq!((g.blocks_wide, g.blocks_tall), (16, 8));
        assert_eq!(g.len(), 128);
        assert_eq!(g.origin(17), (4, 4));
        assert!(SiteGrid::new(3, 100, 4).is_empty());
    }

    #[test]
    fn incremental_equals_one_shot() {
        let mut a = SiteOrder::new(500, stream(b"x"));
        a.prefix(16);
        a.prefix(40);
        let inc = a.prefix(120).to_vec();
        let mut b = SiteOrder::new(500, stream(b"x"));
        assert_eq!(inc, b.prefix(120));
    }

    #[test]
    fn order_is_a_permutation() {
        let mut o = SiteOrder::new(64, stream(b"y"));
        let mut all = o.prefix(64).to_vec();
        all.sort_unstable();
        assert_eq!(all, (0..64).collect::<Vec<_>>());
    }

    #[test]
    fn different_streams_differ() {
        let a = SiteOrder::new(1000, stream(b"a")).prefix(50).to_vec();
        let b = SiteOrder::new(1000, stream(b"b")).prefix(50).to_vec();
        assert_ne!(a, b);
    }

    #[test]
    fn prefix_clamped_to_universe() {
        let mut o = SiteOrder::new(10, stream(b"z"));
        assert_eq!(o.prefix(25).len(), 10);
    }
}
