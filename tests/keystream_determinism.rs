// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/iprmark

//! Key stream determinism and separation.
//!
//! Every keyed decision in every marker is a function of the stream, so a
//! change to any draw here silently breaks detection of previously
//! watermarked assets.

use iprmark_core::engine::{AssetContext, RasterContext, VectorContext};
use iprmark_core::{KeyStream, SecretKey};
use proptest::prelude::*;

fn key(bytes: &[u8]) -> SecretKey {
    SecretKey::new(bytes.to_vec()).unwrap()
}

fn raster_ctx() -> AssetContext {
    AssetContext::Raster(RasterContext { width: 640, height: 480, channels: 3, block_size: 4 })
}

fn draws(stream: &mut KeyStream, n: usize) -> Vec<u64> {
    (0..n).map(|_| stream.next_word()).collect()
}

#[test]
fn same_inputs_same_stream() {
    let a = draws(&mut KeyStream::derive(&key(b"owner"), &raster_ctx()), 1000);
    let b = draws(&mut KeyStream::derive(&key(b"owner"), &raster_ctx()), 1000);
    assert_eq!(a, b);
}

#[test]
fn one_key_bit_changes_the_stream() {
    let base = b"owner-secret".to_vec();
    let reference = draws(&mut KeyStream::derive(&key(&base), &raster_ctx()), 1000);
    for bit in [0usize, 7, 40, 95] {
        let mut flipped = base.clone();
        flipped[bit / 8] ^= 1 << (bit % 8);
        let other = draws(&mut KeyStream::derive(&key(&flipped), &raster_ctx()), 1000);
        let equal = reference.iter().zip(&other).filter(|(a, b)| a == b).count();
        assert_eq!(equal, 0, "bit {bit}");
    }
}

#[test]
fn context_separates_streams() {
    let k = key(b"owner");
    let raster = draws(&mut KeyStream::derive(&k, &raster_ctx()), 64);
    let vector = AssetContext::Vector(VectorContext { feature_count: 640, vertex_counts: vec![480] });
    let other = draws(&mut KeyStream::derive(&k, &vector), 64);
    assert_ne!(raster, other);
}

#[test]
fn resume_continues_where_a_stream_left_off() {
    let k = key(b"resume");
    let mut full = KeyStream::derive(&k, &raster_ctx());
    let head = draws(&mut full, 37);
    let tail = draws(&mut full, 50);
    assert_eq!(head.len(), 37);

    let mut resumed = KeyStream::resume(&k, &raster_ctx(), 37);
    assert_eq!(resumed.position(), 37);
    assert_eq!(draws(&mut resumed, 50), tail);
}

#[test]
fn forks_are_stable_and_distinct() {
    let parent = KeyStream::derive(&key(b"fork"), &raster_ctx());
    let a1 = draws(&mut parent.fork("feature", 3), 16);
    let a2 = draws(&mut parent.fork("feature", 3), 16);
    let b = draws(&mut parent.fork("feature", 4), 16);
    let c = draws(&mut parent.fork("sites", 3), 16);
    assert_eq!(a1, a2);
    assert_ne!(a1, b);
    assert_ne!(a1, c);
    assert_eq!(parent.position(), 0);
}

#[test]
fn floats_are_roughly_uniform() {
    let mut s = KeyStream::derive(&key(b"uniform"), &raster_ctx());
    let mut buckets = [0usize; 10];
    for _ in 0..10_000 {
        buckets[(s.next_float() * 10.0) as usize] += 1;
    }
    for count in buckets {
        assert!((800..1200).contains(&count), "bucket count {count}");
    }
}

proptest! {
    #[test]
    fn next_int_stays_below_bound(seed in proptest::collection::vec(any::<u8>(), 1..32), bound in 1u64..u64::MAX) {
        let mut s = KeyStream::from_material(&SecretKey::new(seed).unwrap(), b"prop");
        for _ in 0..32 {
            prop_assert!(s.next_int(bound) < bound);
        }
    }

    #[test]
    fn next_float_in_unit_interval(seed in proptest::collection::vec(any::<u8>(), 1..32)) {
        let mut s = KeyStream::from_material(&SecretKey::new(seed).unwrap(), b"prop");
        for _ in 0..32 {
            let f = s.next_float();
            prop_assert!((0.0..1.0).contains(&f));
        }
    }

    #[test]
    fn distinct_indices_are_distinct(n in 1usize..200, k in 0usize..250) {
        let mut s = KeyStream::from_material(&SecretKey::new(b"distinct".to_vec()).unwrap(), b"prop");
        let picks = s.distinct_indices(n, k);
        prop_assert_eq!(picks.len(), k.min(n));
        let mut sorted = picks.clone();
        sorted.sort_unstable();
        sorted.dedup();
        prop_assert_eq!(sorted.len(), picks.len());
        prop_assert!(picks.iter().all(|&i| i < n));
    }

    #[test]
    fn shuffle_prefix_is_stable(len in 1usize..100, a in 0usize..100, b in 0usize..100) {
        let (short, long) = (a.min(b).min(len), a.max(b).min(len));
        let k = SecretKey::new(b"prefix".to_vec()).unwrap();
        let mut x: Vec<usize> = (0..len).collect();
        let mut y = x.clone();
        KeyStream::from_material(&k, b"p").shuffle_prefix(&mut x, short);
        KeyStream::from_material(&k, b"p").shuffle_prefix(&mut y, long);
        prop_assert_eq!(&x[..short], &y[..short]);
    }
}
