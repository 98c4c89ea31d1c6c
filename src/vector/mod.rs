// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/iprmark

//! Vector assets: GeoJSON feature collections marked with extra collinear
//! vertices.

pub mod geojson;
pub mod geometry;
pub mod marker;

pub use geojson::FeatureCollection;
pub use marker::{plan_augmentations, GeometryAugmentation, VectorMarker};
