// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/iprmark

//! Keyed, reproducible decision stream.
//!
//! Every pseudorandom decision made by the markers comes from a [`KeyStream`].
//! The stream is HMAC-SHA256 run in counter mode:
//!
//! ```text
//! seed    = HMAC-SHA256(secret_key, "iprmark/keystream/v1" || context_material)
//! block_b = HMAC-SHA256(seed, b as u64 big-endian)          (32 bytes)
//! word_i  = little-endian u64 at offset (i % 4) * 8 of block_(i / 4)
//! ```
//!
//! The draw index counts 64-bit words. Each `next_float`/`next_int` call
//! consumes exactly one word and `next_bytes(n)` consumes `ceil(n / 8)` words,
//! so a stream can be resumed at any draw index with [`KeyStream::resume`]
//! and produces exactly what a contiguous run would have produced.
//!
//! # Cross-platform portability
//!
//! Only integer arithmetic and a single exact `u64 -> f64` conversion sit on
//! the decision path. `next_int` takes a `u64` bound (never `usize`) so 32-bit
//! and 64-bit targets consume identical entropy.

use core::fmt;

use hmac::{Hmac, Mac};
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::engine::context::AssetContext;
use crate::engine::error::{MarkError, Result};

type HmacSha256 = Hmac<Sha256>;

/// Domain separation label for the stream seed.
const STREAM_LABEL: &[u8] = b"iprmark/keystream/v1";

/// Domain separation label for forked child streams.
const FORK_LABEL: &[u8] = b"iprmark/fork/v1";

/// 64-bit words per HMAC-SHA256 block.
const WORDS_PER_BLOCK: u64 = 4;

/// 2^-53, the spacing of the floats produced by `next_float`.
const FLOAT_SCALE: f64 = 1.0 / (1u64 << 53) as f64;

/// The secret shared between embed and detect.
///
/// Held in zeroizing memory and never printed. The engine treats it as an
/// opaque capability: no derivation from passphrases, no persistence.
#[derive(Clone)]
pub struct SecretKey(Zeroizing<Vec<u8>>);

impl SecretKey {
    /// Wrap raw key bytes. Empty keys are rejected.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Result<Self> {
        let bytes = Zeroizing::new(bytes.into());
        if bytes.is_empty() {
            return Err(MarkError::InvalidParams("secret key must not be empty".into()));
        }
        Ok(Self(bytes))
    }

    /// Number of key bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false; empty keys cannot be constructed.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub(crate) fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretKey(<redacted, {} bytes>)", self.0.len())
    }
}

fn hmac(key: &[u8]) -> HmacSha256 {
    HmacSha256::new_from_slice(key).expect("HMAC accepts keys of any length")
}

/// Counter-mode keyed stream of uniform decisions.
///
/// Owned by exactly one embed or detect call. Cloning a stream duplicates its
/// position; both clones then produce the same continuation.
#[derive(Clone)]
pub struct KeyStream {
    seed: Zeroizing<[u8; 32]>,
    index: u64,
    cached_block: Option<(u64, Zeroizing<[u8; 32]>)>,
}

impl fmt::Debug for KeyStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyStream").field("index", &self.index).finish_non_exhaustive()
    }
}

impl KeyStream {
    /// Derive the stream for a key and an asset context.
    pub fn derive(key: &SecretKey, context: &AssetContext) -> Self {
        Self::from_material(key, &context.seed_material())
    }

    /// Derive from raw context material. `derive` is the usual entry point.
    pub fn from_material(key: &SecretKey, material: &[u8]) -> Self {
        let mut mac = hmac(key.as_bytes());
        mac.update(STREAM_LABEL);
        mac.update(material);
        Self::from_seed(mac.finalize().into_bytes().as_slice())
    }

    /// Derive and position the stream at `index` in one step.
    pub fn resume(key: &SecretKey, context: &AssetContext, index: u64) -> Self {
        let mut stream = Self::derive(key, context);
        stream.seek(index);
        stream
    }

    fn from_seed(bytes: &[u8]) -> Self {
        let mut seed = Zeroizing::new([0u8; 32]);
        seed.copy_from_slice(bytes);
        Self { seed, index: 0, cached_block: None }
    }

    /// Independent child stream for sub-task `index` under `label`.
    ///
    /// Forking does not consume draws from the parent, so children can be
    /// produced in any order (or concurrently) with identical results.
    pub fn fork(&self, label: &str, index: u64) -> Self {
        let mut mac = hmac(&*self.seed);
        mac.update(FORK_LABEL);
        mac.update(&(label.len() as u64).to_be_bytes());
        mac.update(label.as_bytes());
        mac.update(&index.to_be_bytes());
        Self::from_seed(mac.finalize().into_bytes().as_slice())
    }

    /// Current draw index (number of words consumed so far).
    pub fn position(&self) -> u64 {
        self.index
    }

    /// Move to an absolute draw index.
    pub fn seek(&mut self, index: u64) {
        self.index = index;
    }

    fn block(&mut self, block_no: u64) -> &[u8; 32] {
        let fresh = !matches!(&self.cached_block, Some((n, _)) if *n == block_no);
        if fresh {
            let mut mac = hmac(&*self.seed);
            mac.update(&block_no.to_be_bytes());
            let mut block = Zeroizing::new([0u8; 32]);
            block.copy_from_slice(mac.finalize().into_bytes().as_slice());
            self.cached_block = Some((block_no, block));
        }
        match &self.cached_block {
            Some((_, block)) => block,
            None => unreachable!("block cache populated above"),
        }
    }

    /// Next raw 64-bit word.
    pub fn next_word(&mut self) -> u64 {
        let index = self.index;
        let offset = ((index % WORDS_PER_BLOCK) * 8) as usize;
        let block = self.block(index / WORDS_PER_BLOCK);
        let mut word = [0u8; 8];
        word.copy_from_slice(&block[offset..offset + 8]);
        self.index += 1;
        u64::from_le_bytes(word)
    }

    /// Uniform float in `[0, 1)` with 53 bits of resolution.
    pub fn next_float(&mut self) -> f64 {
        (self.next_word() >> 11) as f64 * FLOAT_SCALE
    }

    /// Uniform integer in `[0, bound)`; `0` when `bound == 0`.
    ///
    /// Uses the high half of a widening multiply, one word per call. The bias
    /// is below `bound / 2^64`.
    pub fn next_int(&mut self, bound: u64) -> u64 {
        let word = self.next_word();
        ((word as u128 * bound as u128) >> 64) as u64
    }

    /// `next_int` for index-sized bounds.
    pub fn next_index(&mut self, bound: usize) -> usize {
        self.next_int(bound as u64) as usize
    }

    /// `n` pseudorandom bytes.
    pub fn next_bytes(&mut self, n: usize) -> Vec<u8> {
        let mut out = Vec::with_capacity(n.div_ceil(8) * 8);
        while out.len() < n {
            out.extend_from_slice(&self.next_word().to_le_bytes());
        }
        out.truncate(n);
        out
    }

    /// `k` distinct indices from `0..n`, in draw order.
    ///
    /// Rejection on collision: a repeated draw is discarded and redrawn.
    /// `k` is clamped to `n`.
    pub fn distinct_indices(&mut self, n: usize, k: usize) -> Vec<usize> {
        let k = k.min(n);
        let mut seen = std::collections::HashSet::with_capacity(k);
        let mut picked = Vec::with_capacity(k);
        while picked.len() < k {
            let candidate = self.next_index(n);
            if seen.insert(candidate) {
                picked.push(candidate);
            }
        }
        picked
    }

    /// Partial Fisher-Yates: after the call `items[..count]` is a keyed
    /// uniform sample in keyed order. Consumes exactly `count` draws, so the
    /// first `n` picked items do not depend on `count` as long as `n <= count`.
    pub fn shuffle_prefix<T>(&mut self, items: &mut [T], count: usize) {
        self.shuffle_span(items, 0, count);
    }

    /// Continue a partial Fisher-Yates: fixes positions `start..end`, given
    /// that `..start` was fixed by earlier calls on this stream.
    pub fn shuffle_span<T>(&mut self, items: &mut [T], start: usize, end: usize) {
        let len = items.len();
        for i in start..end.min(len) {
            let j = i + self.next_index(len - i);
            items.swap(i, j);
        }
    }
}

impl rand::RngCore for KeyStream {
    fn next_u32(&mut self) -> u32 {
        (self.next_word() >> 32) as u32
    }

    fn next_u64(&mut self) -> u64 {
        self.next_word()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        let bytes = self.next_bytes(dest.len());
        dest.copy_from_slice(&bytes);
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> core::result::Result<(), rand::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}
