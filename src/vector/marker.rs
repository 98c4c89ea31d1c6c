// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/iprmark

//! Collinear vertex augmentation.
//!
//! Embedding:
//! 1. Features with at least one edge are eligible. A keyed partial
//!    Fisher-Yates picks `ceil(eligible * feature_fraction)` of them.
//! 2. Each picked feature draws from its own child stream
//!    `fork("feature", index)`, so features are independent of each other
//!    and of processing order.
//! 3. Per feature, `m = clamp(round(edges * density), 1, min(max_points,
//!    edges))` distinct edges are drawn; each gets `t` in `(0, 1)` and a
//!    vertex at `a + t (b - a)`, optionally pushed off the edge by up to
//!    `jitter`, then rounded to the precision of the edge endpoints unless
//!    that would land on an endpoint.
//!
//! Detection replays the plan on the original collection and looks for a
//! candidate vertex within `epsilon` of each expected point.

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::engine::context::{AssetContext, VectorContext};
use crate::engine::error::{MarkError, Result};
use crate::engine::outcome::{DetectPayload, DetectResult, DetectedVertex, EmbedReport, EmbedResult, Verdict};
use crate::engine::params::VectorParams;
use crate::engine::{Asset, AssetKind, Marker};
use crate::keystream::{KeyStream, SecretKey};
use crate::vector::geojson::{FeatureCollection, Insertion, Path, Position};
use crate::vector::geometry::{
    distance_xy, edges, lerp, offset_perpendicular, round_to, segment_offset, source_decimals, Edge,
};

/// A vertex inserted on an existing edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeometryAugmentation {
    pub feature: usize,
    /// Index into the feature's edge list.
    pub edge: usize,
    pub t: f64,
    pub point: Position,
    /// Path and start vertex of the edge in the original feature.
    pub path: usize,
    pub start: usize,
}

fn plan_feature(
    mut stream: KeyStream,
    feature: usize,
    feature_edges: &[Edge<'_>],
    params: &VectorParams,
) -> Vec<GeometryAugmentation> {
    let n = feature_edges.len();
    let wanted = (n as f64 * params.density).round() as usize;
    let m = wanted.clamp(1, params.max_points.min(n));

    let picks = stream.distinct_indices(n, m);
    let mut planned = Vec::with_capacity(m);
    for edge in picks {
        let mut t = stream.next_float();
        while t == 0.0 {
            t = stream.next_float();
        }
        let Edge { path, start, a, b } = feature_edges[edge];
        let mut point = lerp(a, b, t);
        if params.jitter > 0.0 {
            let u = stream.next_float();
            offset_perpendicular(&mut point, a, b, (2.0 * u - 1.0) * params.jitter);
        }
        if params.round_to_source {
            let rounded = round_to(&point, source_decimals(a, b));
            if keeps_shape(&rounded, a, b, params) {
                point = rounded;
            }
        }
        planned.push(GeometryAugmentation { feature, edge, t, point, path, start });
    }
    planned.sort_by_key(|g| g.edge);
    planned
}

/// A rounded vertex is kept only if it stays strictly inside the edge and no
/// further from its line than `epsilon` (or `jitter`, when jitter is on).
fn keeps_shape(rounded: &[f64], a: &[f64], b: &[f64], params: &VectorParams) -> bool {
    let allowed = if params.jitter > 0.0 { params.jitter } else { params.epsilon };
    let (t, off) = segment_offset(rounded, a, b);
    t > 0.0 && t < 1.0 && off <= allowed && rounded != a && rounded != b
}

/// Recompute the augmentations for a collection.
pub fn plan_augmentations(
    key: &SecretKey,
    context: &VectorContext,
    features: &[Vec<Path>],
    params: &VectorParams,
) -> Vec<GeometryAugmentation> {
    let mut stream = KeyStream::derive(key, &AssetContext::Vector(context.clone()));
    let edge_lists: Vec<Vec<Edge<'_>>> = features.iter().map(|paths| edges(paths)).collect();

    let mut eligible: Vec<usize> = (0..edge_lists.len()).filter(|&i| !edge_lists[i].is_empty()).collect();
    let count = ((eligible.len() as f64 * params.feature_fraction).ceil() as usize).min(eligible.len());
    stream.shuffle_prefix(&mut eligible, count);
    let mut chosen = eligible[..count].to_vec();
    chosen.sort_unstable();

    let plan_one = |&feature: &usize| {
        plan_feature(stream.fork("feature", feature as u64), feature, &edge_lists[feature], params)
    };

    #[cfg(feature = "parallel")]
    let per_feature: Vec<Vec<GeometryAugmentation>> = chosen.par_iter().map(plan_one).collect();
    #[cfg(not(feature = "parallel"))]
    let per_feature: Vec<Vec<GeometryAugmentation>> = chosen.iter().map(plan_one).collect();

    per_feature.into_iter().flatten().collect()
}

fn apply(collection: &mut FeatureCollection, plan: &[GeometryAugmentation]) -> Result<()> {
    for group in plan.chunk_by(|a, b| a.feature == b.feature) {
        let insertions: Vec<Insertion<'_>> = group
            .iter()
            .map(|g| Insertion { path: g.path, after: g.start, point: &g.point })
            .collect();
        collection.insert(group[0].feature, &insertions)?;
    }
    Ok(())
}

/// Collinear-vertex marker for GeoJSON feature collections.
#[derive(Debug, Clone, Copy, Default)]
pub struct VectorMarker;

impl Marker for VectorMarker {
    type Params = VectorParams;

    fn embed(&self, bytes: &[u8], key: &SecretKey, params: &VectorParams) -> Result<EmbedResult> {
        params.validate()?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(degenerate(bytes, None));
        }
        let mut collection = FeatureCollection::parse(bytes)?;
        let context = collection.context();
        if collection.is_empty() {
            return Ok(degenerate(bytes, Some(context)));
        }

        let plan = plan_augmentations(key, &context, collection.features(), params);
        apply(&mut collection, &plan)?;
        debug!(features = context.feature_count, inserted = plan.len(), "vector embed");

        Ok(EmbedResult {
            asset: Asset::new(AssetKind::Vector, collection.to_bytes()?),
            context: Some(AssetContext::Vector(context)),
            report: EmbedReport::Vector { augmentations: plan },
            degenerate: false,
        })
    }

    fn detect(
        &self,
        bytes: &[u8],
        key: &SecretKey,
        context: Option<&AssetContext>,
        original: Option<&[u8]>,
        params: &VectorParams,
    ) -> Result<DetectResult> {
        let original = FeatureCollection::parse(original.ok_or(MarkError::OriginalRequired)?)?;
        let expected_ctx = original.context();
        match context {
            None => {}
            Some(AssetContext::Vector(stored)) if *stored == expected_ctx => {}
            Some(AssetContext::Vector(_)) => {
                return Err(MarkError::ContextMismatch("stored context does not describe the original".into()))
            }
            Some(other) => {
                return Err(MarkError::ContextMismatch(format!(
                    "expected a vector context, got {}",
                    other.modality()
                )))
            }
        }

        let candidate = FeatureCollection::parse(bytes)?;
        if candidate.len() as u64 != expected_ctx.feature_count {
            return Err(MarkError::ContextMismatch(format!(
                "collection has {} features, the original had {}",
                candidate.len(),
                expected_ctx.feature_count
            )));
        }

        let plan = plan_augmentations(key, &expected_ctx, original.features(), params);
        let mut found = Vec::new();
        for g in &plan {
            let hit = candidate
                .vertices(g.feature)
                .enumerate()
                .find(|(_, v)| distance_xy(v, &g.point) <= params.epsilon);
            if let Some((vertex_index, v)) = hit {
                trace!(feature = g.feature, edge = g.edge, vertex_index, "augmented vertex matched");
                found.push(DetectedVertex {
                    feature: g.feature,
                    edge: g.edge,
                    t: g.t,
                    position: [v[0], v[1]],
                    vertex_index,
                });
            }
        }

        let expected = plan.len();
        let agreement = if expected == 0 { 0.0 } else { found.len() as f64 / expected as f64 };
        let verdict = Verdict::from_agreement(agreement, expected, params.present_threshold, params.absent_threshold);
        debug!(expected, matched = found.len(), ?verdict, "vector detect");
        Ok(DetectResult { verdict, agreement, payload: DetectPayload::Vertices(found) })
    }
}

fn degenerate(bytes: &[u8], context: Option<VectorContext>) -> EmbedResult {
    EmbedResult {
        asset: Asset::new(AssetKind::Vector, bytes.to_vec()),
        context: context.map(AssetContext::Vector),
        report: EmbedReport::Vector { augmentations: Vec::new() },
        degenerate: true,
    }
}
