// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/iprmark

//! Embed and detect result records.

use serde::{Deserialize, Serialize};

use crate::engine::context::AssetContext;
use crate::engine::Asset;
use crate::tabular::marker::FictitiousEntry;
use crate::vector::marker::GeometryAugmentation;

/// Three-valued detection outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Verdict {
    Present,
    Absent,
    Inconclusive,
}

impl Verdict {
    /// Map an agreement ratio onto a verdict. With nothing to check
    /// (`expected == 0`) the result is always inconclusive.
    pub fn from_agreement(agreement: f64, expected: usize, present: f64, absent: f64) -> Self {
        if expected == 0 {
            Self::Inconclusive
        } else if agreement >= present {
            Self::Present
        } else if agreement <= absent {
            Self::Absent
        } else {
            Self::Inconclusive
        }
    }
}

/// What an embed call did, per modality.
#[derive(Debug, Clone, PartialEq)]
pub enum EmbedReport {
    Tabular { entries: Vec<FictitiousEntry> },
    Vector { augmentations: Vec<GeometryAugmentation> },
    RasterHidden { sites_used: usize, sites_available: usize, redundancy: usize },
    RasterVisible,
}

/// Output of a successful embed call.
#[derive(Debug, Clone)]
pub struct EmbedResult {
    /// Watermarked asset, same kind and encoding as the input.
    pub asset: Asset,
    /// Context to store for later detection. Not secret.
    pub context: Option<AssetContext>,
    pub report: EmbedReport,
    /// True when the input was empty and came back unchanged.
    pub degenerate: bool,
}

/// A recovered augmented vertex.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectedVertex {
    pub feature: usize,
    pub edge: usize,
    pub t: f64,
    pub position: [f64; 2],
    /// Index of the matching vertex in the candidate feature's flattened
    /// coordinate list.
    pub vertex_index: usize,
}

/// Recovered evidence, per modality.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DetectPayload {
    None,
    /// Row indices (0-based, excluding the header) holding fictitious rows.
    Rows(Vec<usize>),
    Vertices(Vec<DetectedVertex>),
    /// Decoded message; `None` when no valid frame was found.
    Message(Option<Vec<u8>>),
}

/// Output of a detect call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectResult {
    pub verdict: Verdict,
    /// Fraction of expected evidence that was found, in `[0, 1]`.
    pub agreement: f64,
    pub payload: DetectPayload,
}

impl DetectResult {
    pub fn is_present(&self) -> bool {
        self.verdict == Verdict::Present
    }
}
