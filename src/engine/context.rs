// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/iprmark

//! Asset contexts: the non-secret descriptors that seed the key stream.
//!
//! A context must be identical at embed and detect time. Callers usually
//! store the context returned by `embed` next to the asset; for kinds that
//! need the original asset at detect time it can also be recomputed from
//! the original.
//!
//! The seed material is a canonical, length-prefixed byte string:
//!
//! ```text
//! [u32 BE version][u32 BE len][label]( [u64 BE field] | [u32 BE len][bytes] )*
//! ```

use serde::{Deserialize, Serialize};

use crate::engine::params::PARAMS_VERSION;
use crate::tabular::profile::ColumnProfile;

/// Descriptor of an asset, tagged by modality.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AssetContext {
    Tabular(TableContext),
    Vector(VectorContext),
    Raster(RasterContext),
}

/// Row count and column schema of the original table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableContext {
    pub row_count: u64,
    pub delimiter: u8,
    pub columns: Vec<ColumnProfile>,
}

/// Feature count and per-feature vertex counts of the original collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorContext {
    pub feature_count: u64,
    pub vertex_counts: Vec<u32>,
}

/// Image geometry. `block_size` fixes the site grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RasterContext {
    pub width: u32,
    pub height: u32,
    pub channels: u8,
    pub block_size: u32,
}

struct Material(Vec<u8>);

impl Material {
    fn new(label: &str) -> Self {
        let mut m = Material(Vec::with_capacity(64));
        m.0.extend_from_slice(&PARAMS_VERSION.to_be_bytes());
        m.bytes(label.as_bytes());
        m
    }

    fn u64(&mut self, v: u64) -> &mut Self {
        self.0.extend_from_slice(&v.to_be_bytes());
        self
    }

    fn bytes(&mut self, b: &[u8]) -> &mut Self {
        self.0.extend_from_slice(&(b.len() as u32).to_be_bytes());
        self.0.extend_from_slice(b);
        self
    }
}

impl AssetContext {
    /// Canonical byte encoding fed into the key stream seed.
    pub fn seed_material(&self) -> Vec<u8> {
        match self {
            Self::Tabular(t) => {
                let mut m = Material::new("tabular");
                m.u64(t.row_count).u64(t.columns.len() as u64);
                for col in &t.columns {
                    m.bytes(col.name.as_bytes()).bytes(col.kind.tag().as_bytes());
                }
                m.0
            }
            Self::Vector(v) => {
                let mut m = Material::new("vector");
                m.u64(v.feature_count).u64(v.vertex_counts.len() as u64);
                for &n in &v.vertex_counts {
                    m.u64(n as u64);
                }
                m.0
            }
            Self::Raster(r) => {
                let mut m = Material::new("raster");
                m.u64(r.width as u64).u64(r.height as u64).u64(r.block_size as u64);
                m.0
            }
        }
    }

    /// Short name of the modality, for logs and error messages.
    pub fn modality(&self) -> &'static str {
        match self {
            Self::Tabular(_) => "tabular",
            Self::Vector(_) => "vector",
            Self::Raster(_) => "raster",
        }
    }

    /// Serialize for storage next to the asset.
    pub fn to_json(&self) -> crate::engine::error::Result<String> {
        serde_json::to_string(self)
            .map_err(|e| crate::engine::error::MarkError::InvalidParams(format!("context: {e}")))
    }

    /// Load a stored context.
    pub fn from_json(s: &str) -> crate::engine::error::Result<Self> {
        serde_json::from_str(s)
            .map_err(|e| crate::engine::error::MarkError::InvalidParams(format!("context: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tabular::profile::ColumnKind;

    fn column(name: &str, kind: ColumnKind) -> ColumnProfile {
        ColumnProfile {
            name: name.into(),
            kind,
            min: 0.0,
            max: 10.0,
            decimals: 0,
            min_len: 0,
            max_len: 0,
            observed: 5,
        }
    }

    #[test]
    fn material_depends_on_every_field() {
        let base = AssetContext::Raster(RasterContext { width: 256, height: 256, channels: 3, block_size: 4 });
        let wider = AssetContext::Raster(RasterContext { width: 257, height: 256, channels: 3, block_size: 4 });
        let coarser = AssetContext::Raster(RasterContext { width: 256, height: 256, channels: 3, block_size: 8 });
        assert_ne!(base.seed_material(), wider.seed_material());
        assert_ne!(base.seed_material(), coarser.seed_material());
    }

    #[test]
    fn length_prefix_separates_column_names() {
        let a = AssetContext::Tabular(TableContext {
            row_count: 3,
            delimiter: b',',
            columns: vec![column("ab", ColumnKind::Text), column("c", ColumnKind::Text)],
        });
        let b = AssetContext::Tabular(TableContext {
            row_count: 3,
            delimiter: b',',
            columns: vec![column("a", ColumnKind::Text), column("bc", ColumnKind::Text)],
        });
        assert_ne!(a.seed_material(), b.seed_material());
    }

    #[test]
    fn modalities_never_share_material() {
        let v = AssetContext::Vector(VectorContext { feature_count: 0, vertex_counts: vec![] });
        let r = AssetContext::Raster(RasterContext { width: 0, height: 0, channels: 0, block_size: 0 });
        assert_ne!(v.seed_material()[..16], r.seed_material()[..16]);
    }

    #[test]
    fn json_round_trip() {
        let ctx = AssetContext::Vector(VectorContext { feature_count: 2, vertex_counts: vec![5, 11] });
        let json = ctx.to_json().unwrap();
        assert!(json.contains("\"kind\":\"vector\""));
        assert_eq!(AssetContext::from_json(&json).unwrap(), ctx);
    }
}
