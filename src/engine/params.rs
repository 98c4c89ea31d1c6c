// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/iprmark

//! Versioned parameter sets.
//!
//! Every constant that embed and detect must agree on lives here. Changing a
//! default changes which marks can be detected, so defaults are pinned by
//! [`PARAMS_VERSION`].

use serde::{Deserialize, Serialize};

use crate::engine::error::{MarkError, Result};
use crate::engine::AssetKind;
use crate::raster::visible::overlay::OverlayConfig;

/// Version of the parameter set and seeding scheme.
pub const PARAMS_VERSION: u32 = 1;

/// Default fraction of fictitious rows.
pub const DEFAULT_TABLE_DENSITY: f64 = 0.01;
/// Agreement at or above which a mark is reported present.
pub const DEFAULT_PRESENT_THRESHOLD: f64 = 0.9;
/// Agreement at or below which a mark is reported absent.
pub const DEFAULT_ABSENT_THRESHOLD: f64 = 0.2;
/// Upper bound on the ±k row search window around an expected row.
pub const DEFAULT_MAX_WINDOW: usize = 64;

/// Default fraction of edges that receive an extra vertex.
pub const DEFAULT_VECTOR_DENSITY: f64 = 0.15;
/// Maximum number of inserted vertices per feature.
pub const DEFAULT_MAX_POINTS: usize = 5;
/// Match distance for inserted vertices, in native units.
pub const DEFAULT_EPSILON: f64 = 1e-6;

/// Default number of copies per message bit.
pub const DEFAULT_REDUNDANCY: usize = 5;
/// Default site edge length in pixels.
pub const DEFAULT_BLOCK_SIZE: u32 = 4;
/// Default QIM step for 8-bit samples. Scaled by 257 for 16-bit samples.
pub const DEFAULT_QIM_STEP: f64 = 12.0;

fn check_fraction(name: &str, v: f64) -> Result<()> {
    if v.is_finite() && v > 0.0 && v <= 1.0 {
        Ok(())
    } else {
        Err(MarkError::InvalidParams(format!("{name} must be in (0, 1], got {v}")))
    }
}

fn check_thresholds(present: f64, absent: f64) -> Result<()> {
    let ok = (0.0..=1.0).contains(&present) && (0.0..=1.0).contains(&absent) && absent < present;
    if ok {
        Ok(())
    } else {
        Err(MarkError::InvalidParams(format!(
            "thresholds must satisfy 0 <= absent < present <= 1, got absent={absent} present={present}"
        )))
    }
}

/// Options for fictitious-row marking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TabularParams {
    pub density: f64,
    pub present_threshold: f64,
    pub absent_threshold: f64,
    /// Numeric match tolerance. `None` means half a unit in the column's
    /// last decimal place.
    pub tolerance: Option<f64>,
    pub delimiter: u8,
    pub max_window: usize,
}

impl Default for TabularParams {
    fn default() -> Self {
        Self {
            density: DEFAULT_TABLE_DENSITY,
            present_threshold: DEFAULT_PRESENT_THRESHOLD,
            absent_threshold: DEFAULT_ABSENT_THRESHOLD,
            tolerance: None,
            delimiter: b',',
            max_window: DEFAULT_MAX_WINDOW,
        }
    }
}

impl TabularParams {
    pub fn validate(&self) -> Result<()> {
        check_fraction("density", self.density)?;
        check_thresholds(self.present_threshold, self.absent_threshold)?;
        if let Some(t) = self.tolerance {
            if !(t.is_finite() && t >= 0.0) {
                return Err(MarkError::InvalidParams(format!("tolerance must be >= 0, got {t}")));
            }
        }
        if matches!(self.delimiter, b'"' | b'\r' | b'\n') {
            return Err(MarkError::InvalidParams("delimiter cannot be a quote or newline".into()));
        }
        Ok(())
    }
}

/// Options for collinear vertex augmentation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorParams {
    pub density: f64,
    pub feature_fraction: f64,
    pub max_points: usize,
    pub epsilon: f64,
    /// Maximum perpendicular offset of an inserted vertex. 0 keeps vertices
    /// exactly on the edge.
    pub jitter: f64,
    /// Round inserted coordinates to the precision of the edge endpoints.
    pub round_to_source: bool,
    pub present_threshold: f64,
    pub absent_threshold: f64,
}

impl Default for VectorParams {
    fn default() -> Self {
        Self {
            density: DEFAULT_VECTOR_DENSITY,
            feature_fraction: 1.0,
            max_points: DEFAULT_MAX_POINTS,
            epsilon: DEFAULT_EPSILON,
            jitter: 0.0,
            round_to_source: true,
            present_threshold: DEFAULT_PRESENT_THRESHOLD,
            absent_threshold: DEFAULT_ABSENT_THRESHOLD,
        }
    }
}

impl VectorParams {
    pub fn validate(&self) -> Result<()> {
        check_fraction("density", self.density)?;
        check_fraction("feature_fraction", self.feature_fraction)?;
        check_thresholds(self.present_threshold, self.absent_threshold)?;
        if self.max_points == 0 {
            return Err(MarkError::InvalidParams("max_points must be >= 1".into()));
        }
        if !(self.epsilon.is_finite() && self.epsilon > 0.0) {
            return Err(MarkError::InvalidParams(format!("epsilon must be > 0, got {}", self.epsilon)));
        }
        if !(self.jitter.is_finite() && self.jitter >= 0.0) {
            return Err(MarkError::InvalidParams(format!("jitter must be >= 0, got {}", self.jitter)));
        }
        Ok(())
    }
}

/// Options for the hidden pixel-domain message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HiddenParams {
    /// Message to embed. Ignored by detect.
    pub message: Vec<u8>,
    pub redundancy: usize,
    pub block_size: u32,
    /// QIM step for 8-bit samples.
    pub step: f64,
}

impl Default for HiddenParams {
    fn default() -> Self {
        Self {
            message: Vec::new(),
            redundancy: DEFAULT_REDUNDANCY,
            block_size: DEFAULT_BLOCK_SIZE,
            step: DEFAULT_QIM_STEP,
        }
    }
}

impl HiddenParams {
    /// Parameters carrying `message`, defaults otherwise.
    pub fn with_message(message: impl Into<Vec<u8>>) -> Self {
        Self { message: message.into(), ..Self::default() }
    }

    pub fn validate(&self) -> Result<()> {
        if self.redundancy == 0 {
            return Err(MarkError::InvalidParams("redundancy must be >= 1".into()));
        }
        if self.block_size == 0 {
            return Err(MarkError::InvalidParams("block_size must be >= 1".into()));
        }
        if !(self.step.is_finite() && self.step > 0.0 && self.step <= 128.0) {
            return Err(MarkError::InvalidParams(format!("step must be in (0, 128], got {}", self.step)));
        }
        if self.message.len() > u16::MAX as usize {
            return Err(MarkError::InvalidParams(format!(
                "message of {} bytes exceeds the 65535 byte frame limit",
                self.message.len()
            )));
        }
        Ok(())
    }
}

/// Parameters for one embed or detect call, one variant per asset kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "params", rename_all = "snake_case")]
pub enum MarkParams {
    Tabular(TabularParams),
    Vector(VectorParams),
    RasterVisible(OverlayConfig),
    RasterHidden(HiddenParams),
}

impl MarkParams {
    /// Load a parameter set from JSON and validate it.
    ///
    /// ```text
    /// {"kind": "tabular", "params": {"density": 0.02}}
    /// ```
    pub fn from_json(s: &str) -> Result<Self> {
        let params: Self =
            serde_json::from_str(s).map_err(|e| MarkError::InvalidParams(e.to_string()))?;
        params.validate()?;
        Ok(params)
    }

    /// The asset kind these parameters apply to.
    pub fn kind(&self) -> AssetKind {
        match self {
            Self::Tabular(_) => AssetKind::Tabular,
            Self::Vector(_) => AssetKind::Vector,
            Self::RasterVisible(_) => AssetKind::RasterVisible,
            Self::RasterHidden(_) => AssetKind::RasterHidden,
        }
    }

    /// Default parameters for `kind`.
    pub fn default_for(kind: AssetKind) -> Self {
        match kind {
            AssetKind::Tabular => Self::Tabular(TabularParams::default()),
            AssetKind::Vector => Self::Vector(VectorParams::default()),
            AssetKind::RasterVisible => Self::RasterVisible(OverlayConfig::default()),
            AssetKind::RasterHidden => Self::RasterHidden(HiddenParams::default()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Tabular(p) => p.validate(),
            Self::Vector(p) => p.validate(),
            Self::RasterVisible(p) => p.validate(),
            Self::RasterHidden(p) => p.validate(),
        }
    }
}
