// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/iprmark

//! Repetition coding with soft majority voting.
//!
//! Copies are laid out bit-major: copy `c` of bit `i` sits at unit
//! `i * r + c`. Bit `i` therefore occupies the same units whatever the
//! message length, which lets the decoder read the length prefix before it
//! knows how long the frame is.

/// Repeat every bit `r` times, bit-major.
pub fn repetition_encode(bits: &[u8], r: usize) -> Vec<u8> {
    bits.iter().flat_map(|&bit| std::iter::repeat(bit).take(r)).collect()
}

/// Stats from repetition decode for signal quality measurement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RepetitionQuality {
    /// Average |LLR| per copy per bit.
    ///
    /// For each bit the LLRs of its `r` copies are summed, the absolute value
    /// is divided by `r`, and the result is averaged over all bits. The
    /// reference value for an untouched embedding is `step / 2`.
    pub avg_abs_llr_per_copy: f64,
}

/// Soft majority voting over `llrs.len() / r` bits with quality statistics.
///
/// Positive LLR means bit 0. A total of exactly zero decodes as 0.
pub fn repetition_decode_soft_with_quality(llrs: &[f64], r: usize) -> (Vec<u8>, RepetitionQuality) {
    if r == 0 || llrs.len() < r {
        return (Vec::new(), RepetitionQuality { avg_abs_llr_per_copy: 0.0 });
    }

    let mut voted = Vec::with_capacity(llrs.len() / r);
    let mut sum_abs_llr_per_copy = 0.0;
    for copies in llrs.chunks_exact(r) {
        let total: f64 = copies.iter().sum();
        voted.push(if total >= 0.0 { 0 } else { 1 });
        sum_abs_llr_per_copy += total.abs() / r as f64;
    }

    let avg_abs_llr_per_copy = sum_abs_llr_per_copy / voted.len() as f64;
    (voted, RepetitionQuality { avg_abs_llr_per_copy })
}
