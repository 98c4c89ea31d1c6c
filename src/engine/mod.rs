// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/iprmark

//! Uniform embed/detect façade over the four markers.
//!
//! The caller tags each asset with an [`AssetKind`]; [`WatermarkEngine`]
//! selects the marker with an exhaustive match, so adding a modality is a
//! compile error until every call site handles it.
//!
//! Each call is self-contained: the engine holds no state, derives its own
//! [`KeyStream`](crate::keystream::KeyStream), and drops every buffer on
//! return. The engine is `Send + Sync` and independent calls may run on any
//! number of threads.

pub mod context;
pub mod error;
pub mod outcome;
pub mod params;
pub mod state;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::keystream::SecretKey;
use crate::raster::hidden::HiddenMarker;
use crate::raster::visible::VisibleMarker;
use crate::tabular::TabularMarker;
use crate::vector::VectorMarker;

pub use context::{AssetContext, RasterContext, TableContext, VectorContext};
pub use error::{MarkError, Result};
pub use outcome::{DetectPayload, DetectResult, DetectedVertex, EmbedReport, EmbedResult, Verdict};
pub use params::{HiddenParams, MarkParams, TabularParams, VectorParams, PARAMS_VERSION};
pub use state::{Lifecycle, Phase};

/// Closed set of supported modalities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetKind {
    /// Delimited text table with a header row.
    Tabular,
    /// GeoJSON feature collection.
    Vector,
    /// Raster image receiving a visible overlay.
    RasterVisible,
    /// Raster image receiving a hidden message.
    RasterHidden,
}

/// Asset bytes tagged with their kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    pub kind: AssetKind,
    pub bytes: Vec<u8>,
}

impl Asset {
    pub fn new(kind: AssetKind, bytes: impl Into<Vec<u8>>) -> Self {
        Self { kind, bytes: bytes.into() }
    }
}

/// Inputs to a detect call besides the candidate asset and key.
#[derive(Debug, Clone)]
pub struct DetectRequest<'a> {
    /// Context stored at embed time.
    pub context: Option<AssetContext>,
    /// The original, un-watermarked asset.
    pub original: Option<&'a [u8]>,
    pub params: MarkParams,
}

impl<'a> DetectRequest<'a> {
    pub fn new(params: MarkParams) -> Self {
        Self { context: None, original: None, params }
    }

    pub fn with_context(mut self, context: AssetContext) -> Self {
        self.context = Some(context);
        self
    }

    pub fn with_original(mut self, original: &'a [u8]) -> Self {
        self.original = Some(original);
        self
    }
}

/// The embed/detect capability pair implemented by every modality.
pub trait Marker {
    type Params;

    /// Watermark `bytes`. All-or-nothing: on error nothing was produced.
    fn embed(&self, bytes: &[u8], key: &SecretKey, params: &Self::Params) -> Result<EmbedResult>;

    /// Look for this marker's watermark in `bytes`.
    fn detect(
        &self,
        bytes: &[u8],
        key: &SecretKey,
        context: Option<&AssetContext>,
        original: Option<&[u8]>,
        params: &Self::Params,
    ) -> Result<DetectResult>;
}

/// Stateless dispatcher selecting the marker for an asset kind.
#[derive(Debug, Clone, Copy, Default)]
pub struct WatermarkEngine;

fn params_mismatch(kind: AssetKind, params: &MarkParams) -> MarkError {
    MarkError::InvalidParams(format!(
        "{:?} parameters given for a {:?} asset",
        params.kind(),
        kind
    ))
}

impl WatermarkEngine {
    pub fn new() -> Self {
        Self
    }

    /// Embed a watermark into `asset`.
    pub fn embed(&self, asset: &Asset, key: &SecretKey, params: &MarkParams) -> Result<EmbedResult> {
        let mut lifecycle = Lifecycle::embedding();
        lifecycle.advance(Phase::Embedding);
        debug!(kind = ?asset.kind, bytes = asset.bytes.len(), "embed start");

        let result = params.validate().and_then(|()| match (asset.kind, params) {
            (AssetKind::Tabular, MarkParams::Tabular(p)) => TabularMarker.embed(&asset.bytes, key, p),
            (AssetKind::Vector, MarkParams::Vector(p)) => VectorMarker.embed(&asset.bytes, key, p),
            (AssetKind::RasterVisible, MarkParams::RasterVisible(p)) => {
                VisibleMarker.embed(&asset.bytes, key, p)
            }
            (AssetKind::RasterHidden, MarkParams::RasterHidden(p)) => {
                HiddenMarker.embed(&asset.bytes, key, p)
            }
            (kind, params) => Err(params_mismatch(kind, params)),
        });

        match &result {
            Ok(r) => {
                lifecycle.advance(Phase::Embedded);
                debug!(kind = ?asset.kind, phase = ?lifecycle.phase(), degenerate = r.degenerate, "embed done");
            }
            Err(e) => {
                lifecycle.advance(Phase::Failed);
                debug!(kind = ?asset.kind, phase = ?lifecycle.phase(), error = %e, "embed failed");
            }
        }
        result
    }

    /// Detect a watermark in `asset`.
    pub fn detect(&self, asset: &Asset, key: &SecretKey, request: &DetectRequest<'_>) -> Result<DetectResult> {
        let mut lifecycle = Lifecycle::detecting();
        lifecycle.advance(Phase::Detecting);
        debug!(kind = ?asset.kind, bytes = asset.bytes.len(), "detect start");

        let context = request.context.as_ref();
        let original = request.original;
        let result = request.params.validate().and_then(|()| match (asset.kind, &request.params) {
            (AssetKind::Tabular, MarkParams::Tabular(p)) => {
                TabularMarker.detect(&asset.bytes, key, context, original, p)
            }
            (AssetKind::Vector, MarkParams::Vector(p)) => {
                VectorMarker.detect(&asset.bytes, key, context, original, p)
            }
            (AssetKind::RasterVisible, MarkParams::RasterVisible(p)) => {
                VisibleMarker.detect(&asset.bytes, key, context, original, p)
            }
            (AssetKind::RasterHidden, MarkParams::RasterHidden(p)) => {
                HiddenMarker.detect(&asset.bytes, key, context, original, p)
            }
            (kind, params) => Err(params_mismatch(kind, params)),
        });

        match &result {
            Ok(r) => {
                lifecycle.advance(r.verdict.into());
                debug!(kind = ?asset.kind, phase = ?lifecycle.phase(), agreement = r.agreement, "detect done");
            }
            Err(e) => {
                lifecycle.advance(Phase::Failed);
                debug!(kind = ?asset.kind, phase = ?lifecycle.phase(), error = %e, "detect failed");
            }
        }
        result
    }
}
