// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/iprmark

//! # iprmark-core
//!
//! Keyed watermarking for intellectual-property protection of geospatial
//! and tabular data. Four modalities share one embed/detect surface:
//!
//! - **Tabular**: fictitious rows, synthesized from per-column statistics,
//!   are inserted into a delimited table at keyed positions.
//! - **Vector**: extra vertices are inserted on keyed edges of GeoJSON
//!   geometries without changing their shape.
//! - **Raster, hidden**: a short message is spread over keyed pixel blocks
//!   with dithered QIM and repetition coding.
//! - **Raster, visible**: an image or text overlay is composited onto the
//!   picture.
//!
//! Every keyed decision comes from a [`KeyStream`](keystream::KeyStream):
//! HMAC-SHA256 in counter mode over a seed bound to the secret key and the
//! asset's structural context. Re-deriving the stream from the same key and
//! context at detect time reproduces every decision.
//!
//! # Quick start
//!
//! ```rust,ignore
//! use iprmark_core::{Asset, AssetKind, DetectRequest, MarkParams, SecretKey, WatermarkEngine};
//!
//! let key = SecretKey::new(b"owner secret".to_vec())?;
//! let table = std::fs::read("parcels.csv")?;
//! let params = MarkParams::default_for(AssetKind::Tabular);
//!
//! let marked = WatermarkEngine.embed(&Asset::new(AssetKind::Tabular, table.clone()), &key, &params)?;
//! let request = DetectRequest::new(params).with_original(&table);
//! let result = WatermarkEngine.detect(&marked.asset, &key, &request)?;
//! assert!(result.is_present());
//! ```

pub mod engine;
pub mod keystream;
pub mod raster;
pub mod tabular;
pub mod vector;

pub use engine::{
    Asset, AssetContext, AssetKind, DetectPayload, DetectRequest, DetectResult, EmbedReport, EmbedResult,
    HiddenParams, MarkError, MarkParams, Marker, Phase, Result, TabularParams, Verdict, VectorParams,
    WatermarkEngine,
};
pub use keystream::{KeyStream, SecretKey};
pub use raster::{capacity_bytes, HiddenMarker, OverlayConfig, VisibleMarker};
pub use tabular::TabularMarker;
pub use vector::VectorMarker;
