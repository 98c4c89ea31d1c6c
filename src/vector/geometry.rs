// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/iprmark

//! Edge enumeration, interpolation and source-precision rounding.

use crate::vector::geojson::{Path, Position};

/// Powers of ten for rounding to at most 15 decimals.
const POW10: [f64; 16] = [
    1e0, 1e1, 1e2, 1e3, 1e4, 1e5, 1e6, 1e7, 1e8, 1e9, 1e10, 1e11, 1e12, 1e13, 1e14, 1e15,
];

/// Maximum decimals considered when rounding to source precision.
pub const MAX_DECIMALS: u32 = 15;

/// A non-degenerate edge of a feature.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edge<'a> {
    /// Path index within the feature.
    pub path: usize,
    /// Index of the start vertex within the path.
    pub start: usize,
    pub a: &'a Position,
    pub b: &'a Position,
}

/// Edges of a feature, path by path. Zero-length edges are skipped, and
/// paths with fewer than two vertices contribute nothing.
pub fn edges(paths: &[Path]) -> Vec<Edge<'_>> {
    paths
        .iter()
        .enumerate()
        .flat_map(|(path, vertices)| {
            vertices.windows(2).enumerate().filter_map(move |(start, pair)| {
                (pair[0] != pair[1]).then(|| Edge { path, start, a: &pair[0], b: &pair[1] })
            })
        })
        .collect()
}

/// `a + t (b - a)` in every dimension.
pub fn lerp(a: &[f64], b: &[f64], t: f64) -> Position {
    a.iter().zip(b).map(|(&x, &y)| x + t * (y - x)).collect()
}

/// Shift `p` by `offset` along the left normal of `a -> b` in the x/y plane.
pub fn offset_perpendicular(p: &mut [f64], a: &[f64], b: &[f64], offset: f64) {
    let dx = b[0] - a[0];
    let dy = b[1] - a[1];
    let len = (dx * dx + dy * dy).sqrt();
    if len > 0.0 {
        p[0] -= dy / len * offset;
        p[1] += dx / len * offset;
    }
}

/// Decimals in the shortest round-trip representation of `v`, capped.
pub fn decimals_of(v: f64) -> u32 {
    let s = format!("{v}");
    match s.split_once('.') {
        Some((_, frac)) => (frac.len() as u32).min(MAX_DECIMALS),
        None => 0,
    }
}

/// Largest decimal count over all coordinates of both endpoints.
pub fn source_decimals(a: &[f64], b: &[f64]) -> u32 {
    a.iter().chain(b).map(|&c| decimals_of(c)).max().unwrap_or(0)
}

/// Round every coordinate to `decimals` places.
pub fn round_to(p: &[f64], decimals: u32) -> Position {
    let scale = POW10[decimals.min(MAX_DECIMALS) as usize];
    p.iter().map(|&c| (c * scale).round() / scale).collect()
}

/// Planar distance between two positions (x and y only).
pub fn distance_xy(p: &[f64], q: &[f64]) -> f64 {
    let dx = p[0] - q[0];
    let dy = p[1] - q[1];
    (dx * dx + dy * dy).sqrt()
}

/// Projection parameter of `p` onto `a -> b` and its perpendicular distance
/// from that line, both in the x/y plane.
pub fn segment_offset(p: &[f64], a: &[f64], b: &[f64]) -> (f64, f64) {
    let dx = b[0] - a[0];
    let dy = b[1] - a[1];
    let len2 = dx * dx + dy * dy;
    if len2 == 0.0 {
        return (0.0, distance_xy(p, a));
    }
    let px = p[0] - a[0];
    let py = p[1] - a[1];
    ((px * dx + py * dy) / len2, (px * dy - py * dx).abs() / len2.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edges_skip_short_paths_and_zero_length() {
        let paths: Vec<Path> = vec![
            vec![vec![0.0, 0.0]],
            vec![vec![0.0, 0.0], vec![1.0, 0.0], vec![1.0, 0.0], vec![1.0, 1.0]],
        ];
        let e = edges(&paths);
        assert_eq!(e.len(), 2);
        assert_eq!((e[0].path, e[0].start), (1, 0));
        assert_eq!((e[1].path, e[1].start), (1, 2));
    }

    #[test]
    fn lerp_is_on_segment() {
        let p = lerp(&[0.0, 0.0, 10.0], &[4.0, 2.0, 20.0], 0.25);
        assert_eq!(p, vec![1.0, 0.5, 12.5]);
    }

    #[test]
    fn perpendicular_offset() {
        let mut p = vec![1.0, 0.0];
        offset_perpendicular(&mut p, &[0.0, 0.0], &[2.0, 0.0], 0.5);
        assert_eq!(p, vec![1.0, 0.5]);
    }

    #[test]
    fn decimals_and_rounding() {
        assert_eq!(decimals_of(12.3456), 4);
        assert_eq!(decimals_of(7.0), 0);
        assert_eq!(decimals_of(0.1 + 0.2), 15);
        assert_eq!(source_decimals(&[1.5, 2.0], &[3.125, 4.0]), 3);
        assert_eq!(round_to(&[1.23456, -0.00049], 3), vec![1.235, -0.0]);
    }

    #[test]
    fn planar_distance_ignores_z() {
        assert_eq!(distance_xy(&[0.0, 0.0, 5.0], &[3.0, 4.0, -5.0]), 5.0);
    }

    #[test]
    fn offset_from_segment() {
        let (t, d) = segment_offset(&[25.0, 1.0], &[0.0, 0.0], &[100.0, 0.0]);
        assert_eq!(t, 0.25);
        assert_eq!(d, 1.0);
        let (t, d) = segment_offset(&[1.0, 1.0], &[0.0, 0.0], &[2.0, 2.0]);
        assert!((t - 0.5).abs() < 1e-12);
        assert!(d < 1e-12);
    }
}
