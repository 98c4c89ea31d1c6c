// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/iprmark

//! GeoJSON feature collections.
//!
//! The document is kept as a `serde_json::Value` so properties, ids, foreign
//! members and member order survive untouched. Geometry coordinates are
//! additionally read into flat paths (one per line string or ring) for the
//! marker to work on; only paths that receive new vertices are rewritten.
//!
//! Path order per geometry type:
//!
//! | type            | paths                                   |
//! |-----------------|-----------------------------------------|
//! | Point           | one single-vertex path                  |
//! | MultiPoint      | one single-vertex path per point        |
//! | LineString      | the line                                |
//! | Polygon         | rings, exterior first                   |
//! | MultiLineString | lines in order                          |
//! | MultiPolygon    | rings of polygon 0, then polygon 1, ... |

use serde_json::{Number, Value};

use crate::engine::context::VectorContext;
use crate::engine::error::{MarkError, Result};

/// One coordinate tuple (x, y and optionally z or more).
pub type Position = Vec<f64>;

/// Vertices of one line string or ring.
pub type Path = Vec<Position>;

fn bad(msg: impl Into<String>) -> MarkError {
    MarkError::UnsupportedFormat(msg.into())
}

fn as_array<'a>(v: &'a Value, what: &str) -> Result<&'a Vec<Value>> {
    v.as_array().ok_or_else(|| bad(format!("{what} must be an array")))
}

fn read_position(v: &Value) -> Result<Position> {
    let coords = as_array(v, "position")?;
    if coords.len() < 2 {
        return Err(bad("position needs at least two coordinates"));
    }
    coords
        .iter()
        .map(|c| c.as_f64().filter(|f| f.is_finite()).ok_or_else(|| bad("coordinate is not a finite number")))
        .collect()
}

fn read_path(v: &Value) -> Result<Path> {
    as_array(v, "coordinate list")?.iter().map(read_position).collect()
}

fn read_geometry(geometry: &Value) -> Result<Vec<Path>> {
    if geometry.is_null() {
        return Ok(Vec::new());
    }
    let kind = geometry
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| bad("geometry without a type"))?;
    if kind == "GeometryCollection" {
        return Err(bad("GeometryCollection is not supported"));
    }
    let coords = geometry
        .get("coordinates")
        .ok_or_else(|| bad(format!("{kind} without coordinates")))?;

    match kind {
        "Point" => Ok(vec![vec![read_position(coords)?]]),
        "MultiPoint" => as_array(coords, "MultiPoint")?
            .iter()
            .map(|p| read_position(p).map(|p| vec![p]))
            .collect(),
        "LineString" => Ok(vec![read_path(coords)?]),
        "Polygon" | "MultiLineString" => as_array(coords, kind)?.iter().map(read_path).collect(),
        "MultiPolygon" => {
            let mut paths = Vec::new();
            for polygon in as_array(coords, kind)? {
                for ring in as_array(polygon, "Polygon")? {
                    paths.push(read_path(ring)?);
                }
            }
            Ok(paths)
        }
        other => Err(bad(format!("unknown geometry type {other:?}"))),
    }
}

/// Mutable coordinate arrays of the paths that can carry edges, in the same
/// order as [`read_geometry`] yields them.
fn path_arrays_mut(geometry: &mut Value) -> Vec<&mut Vec<Value>> {
    let kind = geometry.get("type").and_then(Value::as_str).unwrap_or_default().to_owned();
    let Some(coords) = geometry.get_mut("coordinates").and_then(Value::as_array_mut) else {
        return Vec::new();
    };
    match kind.as_str() {
        "LineString" => vec![coords],
        "Polygon" | "MultiLineString" => coords.iter_mut().filter_map(Value::as_array_mut).collect(),
        "MultiPolygon" => coords
            .iter_mut()
            .filter_map(Value::as_array_mut)
            .flat_map(|rings| rings.iter_mut().filter_map(Value::as_array_mut))
            .collect(),
        _ => Vec::new(),
    }
}

fn position_value(p: &[f64]) -> Value {
    Value::Array(
        p.iter()
            .map(|&c| Number::from_f64(c).map_or(Value::Null, Value::Number))
            .collect(),
    )
}

/// A vertex to insert: after vertex `after` of path `path`.
#[derive(Debug, Clone, PartialEq)]
pub struct Insertion<'a> {
    pub path: usize,
    pub after: usize,
    pub point: &'a [f64],
}

/// A parsed feature collection.
#[derive(Debug, Clone)]
pub struct FeatureCollection {
    doc: Value,
    features: Vec<Vec<Path>>,
}

impl FeatureCollection {
    /// Parse and validate a `FeatureCollection` document.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let doc: Value = serde_json::from_slice(bytes)?;
        if doc.get("type").and_then(Value::as_str) != Some("FeatureCollection") {
            return Err(bad("top-level object must be a FeatureCollection"));
        }
        let features = as_array(doc.get("features").unwrap_or(&Value::Null), "features")?
            .iter()
            .map(|f| read_geometry(f.get("geometry").unwrap_or(&Value::Null)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { doc, features })
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Paths of every feature, in document order.
    pub fn features(&self) -> &[Vec<Path>] {
        &self.features
    }

    /// All vertices of feature `idx`, flattened in path order.
    pub fn vertices(&self, idx: usize) -> impl Iterator<Item = &Position> {
        self.features.get(idx).into_iter().flatten().flatten()
    }

    /// Feature count and per-feature vertex counts.
    pub fn context(&self) -> VectorContext {
        VectorContext {
            feature_count: self.features.len() as u64,
            vertex_counts: self
                .features
                .iter()
                .map(|paths| paths.iter().map(Vec::len).sum::<usize>() as u32)
                .collect(),
        }
    }

    /// Insert vertices into feature `feature`.
    ///
    /// Insertions are applied from the back of each path so earlier vertex
    /// indices stay valid; `after` always refers to the unmodified path.
    pub fn insert(&mut self, feature: usize, insertions: &[Insertion<'_>]) -> Result<()> {
        let mut ordered: Vec<&Insertion<'_>> = insertions.iter().collect();
        ordered.sort_by(|a, b| (b.path, b.after).cmp(&(a.path, a.after)));

        let geometry = self
            .doc
            .get_mut("features")
            .and_then(|f| f.get_mut(feature))
            .and_then(|f| f.get_mut("geometry"))
            .ok_or_else(|| bad(format!("feature {feature} has no geometry")))?;
        let mut arrays = path_arrays_mut(geometry);
        let paths = &mut self.features[feature];

        for ins in ordered {
            let array = arrays
                .get_mut(ins.path)
                .ok_or_else(|| bad(format!("feature {feature} has no path {}", ins.path)))?;
            if ins.after + 1 >= array.len() {
                return Err(bad(format!("vertex {} is not an edge start", ins.after)));
            }
            array.insert(ins.after + 1, position_value(ins.point));
            paths[ins.path].insert(ins.after + 1, ins.point.to_vec());
        }
        Ok(())
    }

    /// Serialize the document.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(&self.doc)?)
    }
}
